//! Durable, append-only log of finished runs.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use sysgauge_types::RunRecord;
use tracing::{debug, info, warn};

use crate::error::{EngineError, StorageError};
use crate::storage::{MemoryStorage, Storage, HISTORY_KEY};

const HOUR_MS: u64 = 60 * 60 * 1000;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Preset windows for browsing history, relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    LastHour,
    Last24Hours,
    Last7Days,
    Last30Days,
    All,
}

impl TimeRange {
    /// Length of the window in milliseconds, or `None` for [`TimeRange::All`].
    pub fn span_ms(&self) -> Option<u64> {
        match self {
            TimeRange::LastHour => Some(HOUR_MS),
            TimeRange::Last24Hours => Some(DAY_MS),
            TimeRange::Last7Days => Some(7 * DAY_MS),
            TimeRange::Last30Days => Some(30 * DAY_MS),
            TimeRange::All => None,
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeRange::LastHour),
            "24h" | "1d" => Ok(TimeRange::Last24Hours),
            "7d" => Ok(TimeRange::Last7Days),
            "30d" => Ok(TimeRange::Last30Days),
            "all" => Ok(TimeRange::All),
            other => Err(format!("unknown range '{}' (expected 1h, 24h, 7d, 30d or all)", other)),
        }
    }
}

/// Append-only history of [`RunRecord`]s backed by durable storage.
///
/// Every append rewrites the full log to storage before returning. If the
/// write fails the record is removed again, so memory and storage never
/// disagree. Appends hold the write lock across the durable write, which
/// serializes writers and keeps readers from observing a record that might
/// still be rolled back.
#[derive(Debug)]
pub struct HistoryStore {
    storage: Arc<dyn Storage>,
    records: RwLock<Vec<RunRecord>>,
}

impl HistoryStore {
    /// Open the store, loading whatever the backend holds.
    ///
    /// A missing or unreadable log starts empty rather than failing.
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let records = match storage.read(HISTORY_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<RunRecord>>(&bytes) {
                Ok(records) => {
                    info!("Loaded {} history records", records.len());
                    records
                }
                Err(e) => {
                    warn!("History store is corrupt, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("No history stored yet");
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to read history store, starting empty: {}", e);
                Vec::new()
            }
        };

        Self {
            storage,
            records: RwLock::new(records),
        }
    }

    /// An empty store backed by [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStorage::new()))
    }

    /// Persist an exported blob into `storage` and open a store over it.
    ///
    /// Fails with [`EngineError::InvalidExport`] if the blob does not parse,
    /// or [`EngineError::PersistenceWriteFailure`] if it cannot be written.
    pub fn restore(storage: Arc<dyn Storage>, exported: &[u8]) -> Result<Self, EngineError> {
        let records = Self::import(exported)?;
        let bytes = encode(&records)?;
        storage
            .write(HISTORY_KEY, &bytes)
            .map_err(EngineError::PersistenceWriteFailure)?;

        Ok(Self {
            storage,
            records: RwLock::new(records),
        })
    }

    /// Append a record and flush the log to durable storage.
    pub fn append(&self, record: RunRecord) -> Result<(), EngineError> {
        let mut records = self.records.write();
        records.push(record);

        let written = encode(&records).and_then(|bytes| {
            self.storage
                .write(HISTORY_KEY, &bytes)
                .map_err(EngineError::PersistenceWriteFailure)
        });

        if let Err(e) = written {
            records.pop();
            warn!("History append rolled back: {}", e);
            return Err(e);
        }

        debug!("History now holds {} records", records.len());
        Ok(())
    }

    /// Records with `since <= timestamp <= until`, in append order.
    ///
    /// A `None` bound is open on that side. The log is never reordered, so
    /// the last record returned is the one [`HistoryStore::latest`] reports
    /// even if the clock stepped backwards between runs.
    pub fn query(&self, since: Option<u64>, until: Option<u64>) -> Vec<RunRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| since.map_or(true, |s| r.timestamp >= s))
            .filter(|r| until.map_or(true, |u| r.timestamp <= u))
            .cloned()
            .collect()
    }

    /// Records inside a preset window ending at `now_ms`.
    pub fn query_range(&self, range: TimeRange, now_ms: u64) -> Vec<RunRecord> {
        match range.span_ms() {
            Some(span) => self.query(Some(now_ms.saturating_sub(span)), Some(now_ms)),
            None => self.query(None, None),
        }
    }

    /// The full log as a pretty-printed JSON array.
    pub fn export_all(&self) -> Result<Vec<u8>, EngineError> {
        encode(&self.records.read())
    }

    /// Parse a blob produced by [`HistoryStore::export_all`].
    pub fn import(exported: &[u8]) -> Result<Vec<RunRecord>, EngineError> {
        Ok(serde_json::from_slice(exported)?)
    }

    /// The most recently appended record.
    pub fn latest(&self) -> Option<RunRecord> {
        self.records.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn encode(records: &[RunRecord]) -> Result<Vec<u8>, EngineError> {
    serde_json::to_vec_pretty(records)
        .map_err(|e| EngineError::PersistenceWriteFailure(StorageError::Rejected(e.to_string())))
}
