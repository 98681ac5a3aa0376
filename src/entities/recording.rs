//! Recording: the finished, immutable output of one capture session, plus
//! the set of loaded recordings playback cycles through.
//!
//! # Persistence
//!
//! The core only needs `to_bytes` / `from_bytes`; where the bytes live
//! (disk, asset bundle, network) is the caller's concern. Malformed or
//! empty blobs are excluded at load time and reported, never a crash.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use super::frame::Tick;
use super::item::RecordItem;

/// Persistence / validation errors
#[derive(Debug)]
pub enum DataError {
    Encode(String),
    Decode(String),
    /// Deserialized fine but holds zero recorded entities
    Empty,
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Encode(e) => write!(f, "encode error: {}", e),
            DataError::Decode(e) => write!(f, "decode error: {}", e),
            DataError::Empty => write!(f, "recording holds no items"),
        }
    }
}

impl std::error::Error for DataError {}

/// One finished capture session. Immutable after `finalize`; read-only
/// during playback except for track cursors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub uuid: Uuid,
    pub name: String,
    /// Unix seconds at finalize time
    pub timestamp: u64,
    pub tick_rate: u32,
    /// Last tick reached by the capture session; valid ticks are
    /// `0..=tick_count`.
    pub tick_count: Tick,
    pub items: Vec<RecordItem>,
}

impl Recording {
    pub fn new(name: impl Into<String>, tick_rate: u32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            timestamp: 0,
            tick_rate: tick_rate.max(1),
            tick_count: 0,
            items: Vec::new(),
        }
    }

    /// Stamp the session end: final tick count plus wall-clock timestamp.
    pub fn finalize(&mut self, tick_count: Tick, items: Vec<RecordItem>) {
        self.tick_count = tick_count.max(0);
        self.items = items;
        self.timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
    }

    pub fn duration_secs(&self) -> f64 {
        self.tick_count as f64 / self.tick_rate as f64
    }

    pub fn find_item(&self, descriptor: &str) -> Option<(usize, &RecordItem)> {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| item.descriptor == descriptor)
    }

    pub fn reset_cursors(&mut self) {
        for item in &mut self.items {
            item.reset_cursors();
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DataError> {
        serde_json::to_vec(self).map_err(|e| DataError::Encode(e.to_string()))
    }

    /// Decode and validate. A recording with zero items is rejected — there
    /// is nothing playback could drive with it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DataError> {
        let mut rec: Recording =
            serde_json::from_slice(bytes).map_err(|e| DataError::Decode(e.to_string()))?;
        if rec.items.is_empty() {
            return Err(DataError::Empty);
        }
        rec.reset_cursors();
        Ok(rec)
    }
}

/// Per-blob outcome of a batch load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    /// (blob index, error) for every excluded file
    pub errors: Vec<(usize, DataError)>,
}

/// Ordered set of loaded recordings; playback loops through them in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSet {
    recordings: Vec<Recording>,
}

impl RecordingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, recording: Recording) {
        info!(
            "Loaded recording '{}': {} items, {} ticks @ {} tps",
            recording.name,
            recording.items.len(),
            recording.tick_count,
            recording.tick_rate
        );
        self.recordings.push(recording);
    }

    /// Decode a batch of blobs, excluding invalid ones. Never fails as a
    /// whole — the report says what loaded and what was rejected.
    pub fn load_all<I, B>(&mut self, blobs: I) -> LoadReport
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut report = LoadReport::default();
        for (idx, blob) in blobs.into_iter().enumerate() {
            match Recording::from_bytes(blob.as_ref()) {
                Ok(rec) => {
                    self.push(rec);
                    report.loaded += 1;
                }
                Err(e) => {
                    warn!("Excluding recording blob {}: {}", idx, e);
                    report.errors.push((idx, e));
                }
            }
        }
        report
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Recording> {
        self.recordings.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Recording> {
        self.recordings.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recording> {
        self.recordings.iter()
    }
}
