/*!
# True608

A refrigerant-logging compliance web application, built in Rust.

## Overview

True608 gives HVAC service companies a lightweight way to meet EPA
Section 608 record-keeping requirements: technicians log every
refrigerant-handling event from a phone in the field, and the office
watches a live dashboard of consumption broken down by gas type, job
site, and day, with one-click CSV/XLSX export for audits.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- **Technologies**: static HTML/CSS/JS, served embedded
- **Key Components**:
  - Field Entry Form - Location, equipment ID, refrigerant, and amount
  - Admin Dashboard - Stat tiles, records table, charts, and exports
  - Realtime Feed - `EventSource` subscription that refetches on change
  - Login/Signup - Cookie-session authentication forms

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Log Store - Append-only record collection with compressed snapshots
  - Aggregator - Pure derivations of every dashboard metric
  - Auth - Argon2 credentials, session map, route-guard middleware
  - Realtime Hub - Broadcast change feed fanned out over SSE
  - Chart Renderer - Server-side PNG bar/area charts
  - Exporter - CSV and XLSX serialization of the raw records

### Data Persistence Layer
- Log snapshots with Gzip compression and bincode serialization
- User registry as pretty-printed JSON

## Modules

- **record**: LogRecord, entry validation, asset-tag normalization
- **analytics**: dashboard metric derivations (the Aggregator)
- **store**: log persistence and lifecycle (insert, delete, snapshot)
- **login**: user authentication and session management
- **exporter**: export functionality (CSV, XLSX)
- **chart**: chart generation from aggregated data
- **realtime**: change-event broadcast and SSE fan-out
- **app**: routing and middleware

## REST API Endpoints

- `GET /api/logs` - Full record snapshot, newest first
- `POST /api/logs` - Record a field entry
- `DELETE /api/logs/{id}` - Remove an entry
- `GET /api/stats` - Summary counters and all derived views
- `GET /api/events` - SSE change feed
- `GET /api/export/csv`, `GET /api/export/xlsx` - Audit exports
- `GET /api/chart/refrigerant.png`, `GET /api/chart/timeline.png` -
  Rendered charts
*/

// Re-export all modules so they appear in the documentation
pub mod analytics;
pub mod app;
pub mod chart;
pub mod exporter;
pub mod login;
pub mod realtime;
pub mod record;
pub mod store;

/// Re-export everything from the core modules to make them easier to use
pub use analytics::*;
pub use exporter::*;
pub use login::*;
pub use record::*;
pub use store::*;
