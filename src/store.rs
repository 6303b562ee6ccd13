use bincode::{deserialize_from, serialize_into};
use chrono::Utc;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::record::{LogRecord, NewLogEntry, normalize_asset_tag};

/// File name of the on-disk snapshot inside the data directory.
pub const LOGS_FILE: &str = "logs.bin.gz";

/// In-memory log collection with gzip-compressed bincode checkpointing.
///
/// Records are append-only; the only other mutation is the admin delete
/// action. Readers get a newest-first snapshot and never observe partial
/// mutations (the caller serializes access).
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct LogStore {
    records: Vec<LogRecord>,
    next_id: u64,
}

impl LogStore {
    /// Load the store from `path`, or start empty if no snapshot exists.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = std::io::BufWriter::new(encoder);

        serialize_into(&mut writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        Ok(())
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let decoder = GzDecoder::new(file);
        let mut reader = std::io::BufReader::new(decoder);

        let store: LogStore = deserialize_from(&mut reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        Ok(store)
    }

    /// Append a validated entry, assigning its id and timestamp.
    ///
    /// The equipment ID is normalized from a possible QR-scanned URL
    /// payload; an empty refrigerant selection is stored as missing.
    pub fn insert(&mut self, entry: NewLogEntry) -> LogRecord {
        self.next_id += 1;

        let location = entry.location.trim();
        let refrigerant = entry.refrigerant.trim();

        let record = LogRecord {
            id: self.next_id,
            created_at: Utc::now(),
            location: if location.is_empty() {
                None
            } else {
                Some(location.to_string())
            },
            unit_id: normalize_asset_tag(&entry.unit_id),
            refrigerant: if refrigerant.is_empty() {
                None
            } else {
                Some(refrigerant.to_string())
            },
            amount: entry.amount,
        };

        self.records.push(record.clone());
        record
    }

    /// Remove the record with the given id. Returns false if absent.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        self.records.len() != before
    }

    /// Clone of the full record set, newest first.
    ///
    /// Ties on `created_at` break toward the higher id so same-instant
    /// inserts still read newest-first.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
