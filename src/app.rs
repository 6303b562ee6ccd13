#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::sse::{Event, KeepAlive, Sse},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::analytics::{self, DayUsage, GasUsage, SiteCount, SiteUsage, Stats, UNKNOWN};
use crate::chart::{self, ChartOptions};
use crate::exporter;
use crate::login::{self, Auth};
use crate::realtime::{ChangeEvent, Hub};
use crate::record::{LogRecord, NewLogEntry};
use crate::store::{LOGS_FILE, LogStore};

/// Shared application state.
///
/// The store is the single mutable resource; handlers lock it, mutate,
/// checkpoint, and release before publishing the change event.
pub struct AppState {
    pub store: Mutex<LogStore>,
    pub hub: Hub,
    pub auth: Auth,
    data_dir: PathBuf,
}

impl AppState {
    fn logs_path(&self) -> PathBuf {
        self.data_dir.join(LOGS_FILE)
    }
}

/// Everything the dashboard needs in one response: summary counters plus
/// all four derived views, recomputed from the current snapshot.
#[derive(Serialize)]
struct DashboardData {
    stats: Stats,
    by_refrigerant: Vec<GasUsage>,
    by_location: Vec<SiteCount>,
    leaderboard: Vec<SiteUsage>,
    timeline: Vec<DayUsage>,
}

pub async fn run(port: u16, data_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let auth = Auth::new(&data_dir);
    auth.init_database()?;

    let store = LogStore::open(&data_dir.join(LOGS_FILE))?;
    log::info!("loaded {} log entries from {}", store.len(), data_dir.display());

    // Setup app state
    let app_state = Arc::new(AppState {
        store: Mutex::new(store),
        hub: Hub::default(),
        auth,
        data_dir,
    });

    // Build router
    let app = Router::new()
        .route("/", get(serve_landing))
        .route("/sales", get(serve_sales))
        .route("/terms", get(serve_terms))
        .route("/privacy", get(serve_privacy))
        .route("/log", get(serve_log_form))
        .route("/admin", get(serve_admin))
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route(
            "/signup",
            get(login::serve_signup_page).post(login::handle_signup),
        )
        .route("/logout", get(login::handle_logout))
        .route("/change-password", post(login::handle_change_password))
        .route("/api/logs", get(get_logs).post(create_log))
        .route("/api/logs/:id", delete(delete_log))
        .route("/api/stats", get(get_stats))
        .route("/api/events", get(sse_events))
        .route("/api/export/csv", get(export_csv))
        .route("/api/export/xlsx", get(export_xlsx))
        .route("/api/chart/refrigerant.png", get(chart_refrigerant))
        .route("/api/chart/timeline.png", get(chart_timeline))
        .nest_service("/static", ServeDir::new("static"))
        .layer(axum::middleware::from_fn(login::require_auth))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/landing.html"))
}

async fn serve_sales() -> Html<&'static str> {
    Html(include_str!("./static/sales.html"))
}

async fn serve_terms() -> Html<&'static str> {
    Html(include_str!("./static/terms.html"))
}

async fn serve_privacy() -> Html<&'static str> {
    Html(include_str!("./static/privacy.html"))
}

async fn serve_log_form() -> Html<&'static str> {
    Html(include_str!("./static/log.html"))
}

async fn serve_admin() -> Html<&'static str> {
    Html(include_str!("./static/admin.html"))
}

/// Full record snapshot, newest first.
async fn get_logs(State(state): State<Arc<AppState>>) -> Json<Vec<LogRecord>> {
    let records = state.store.lock().unwrap().snapshot();
    Json(records)
}

/// Record a field entry.
///
/// Validates, normalizes the scanned asset tag, appends, checkpoints, and
/// publishes the insert to realtime subscribers.
async fn create_log(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<NewLogEntry>,
) -> Response {
    if let Err(message) = entry.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response();
    }

    let record = {
        let mut store = state.store.lock().unwrap();
        let record = store.insert(entry);
        if let Err(e) = store.save(&state.logs_path()) {
            log::warn!("failed to checkpoint log store: {e}");
        }
        record
    };

    log::info!(
        "entry {} recorded: {} lbs of {} at {}",
        record.id,
        record.amount.unwrap_or(0.0),
        record.refrigerant.as_deref().unwrap_or(UNKNOWN),
        record.location.as_deref().unwrap_or(UNKNOWN),
    );

    state.hub.publish(ChangeEvent::Inserted(record.clone()));

    (StatusCode::CREATED, Json(record)).into_response()
}

/// Admin delete action.
async fn delete_log(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Response {
    let deleted = {
        let mut store = state.store.lock().unwrap();
        let deleted = store.delete(id);
        if deleted {
            if let Err(e) = store.save(&state.logs_path()) {
                log::warn!("failed to checkpoint log store: {e}");
            }
        }
        deleted
    };

    if deleted {
        log::info!("entry {id} deleted");
        state.hub.publish(ChangeEvent::Deleted(id));
        Json(json!({ "status": "ok" })).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "message": "Log entry not found" })),
        )
            .into_response()
    }
}

/// Dashboard metrics, recomputed in full from the current snapshot.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<DashboardData> {
    let records = state.store.lock().unwrap().snapshot();

    Json(DashboardData {
        stats: analytics::summarize(&records),
        by_refrigerant: analytics::by_refrigerant(&records),
        by_location: analytics::by_location(&records),
        leaderboard: analytics::leaderboard(&records),
        timeline: analytics::timeline(&records),
    })
}

/// Realtime change feed.
///
/// Each insert/delete becomes one SSE frame carrying the JSON-encoded
/// event; the dashboard refetches logs and stats on every frame.
async fn sse_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.hub.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|change| {
        // A lagged subscriber just misses events; the next frame triggers
        // a full refetch anyway.
        let change = change.ok()?;
        let payload = serde_json::to_string(&change).ok()?;
        Some(Ok::<_, Infallible>(
            Event::default().event("change").data(payload),
        ))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn export_csv(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = state.store.lock().unwrap().snapshot();
    let csv = exporter::to_csv(&records);

    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"true608_logs.csv\"",
            ),
        ],
        csv,
    )
}

async fn export_xlsx(State(state): State<Arc<AppState>>) -> Response {
    let records = state.store.lock().unwrap().snapshot();

    match exporter::to_xlsx(&records) {
        Ok(bytes) => (
            [
                (
                    header::CONTENT_TYPE,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"true608_logs.xlsx\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            log::error!("xlsx export failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn chart_refrigerant(State(state): State<Arc<AppState>>) -> Response {
    let records = state.store.lock().unwrap().snapshot();
    let groups = analytics::by_refrigerant(&records);

    let options = ChartOptions {
        title: "Usage by Refrigerant".to_string(),
        x_label: "Refrigerant".to_string(),
        ..ChartOptions::default()
    };

    png_response(chart::gas_bar_chart(&groups, &options))
}

async fn chart_timeline(State(state): State<Arc<AppState>>) -> Response {
    let records = state.store.lock().unwrap().snapshot();
    let days = analytics::timeline(&records);

    let options = ChartOptions {
        title: "Daily Usage".to_string(),
        x_label: "Day".to_string(),
        ..ChartOptions::default()
    };

    png_response(chart::timeline_area_chart(&days, &options))
}

fn png_response(result: Result<Vec<u8>, Box<dyn std::error::Error>>) -> Response {
    match result {
        Ok(png) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            png,
        )
            .into_response(),
        Err(e) => {
            log::error!("chart rendering failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
