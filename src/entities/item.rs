//! RecordItem: everything recorded for one entity — its property tracks,
//! active/inactive status transitions, and string-tagged message events.
//!
//! **Used by**: producers (fill during capture), playback (read-only except
//! track cursors), editor tooling (status/message queries).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::frame::Tick;
use super::track::Track;

/// One active/inactive transition of a recorded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub tick: Tick,
    pub active: bool,
}

/// Recorded state of a single entity.
///
/// `descriptor` is the unique key within a recording session; `type_tag`
/// identifies the producer/consumer kind so playback can refuse mismatched
/// bindings. All sequences are append-only during capture and immutable
/// once the recording is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordItem {
    pub descriptor: String,
    pub type_tag: String,
    pub tracks: Vec<Track>,
    statuses: Vec<StatusEvent>,
    /// Message label → ticks it fired at (strictly increasing per label).
    messages: IndexMap<String, Vec<Tick>>,
}

impl RecordItem {
    pub fn new(descriptor: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            type_tag: type_tag.into(),
            tracks: Vec::new(),
            statuses: Vec::new(),
            messages: IndexMap::new(),
        }
    }

    /// Add a track, returning its index (stable for the item's lifetime).
    pub fn add_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn track_mut(&mut self, idx: usize) -> Option<&mut Track> {
        self.tracks.get_mut(idx)
    }

    pub fn statuses(&self) -> &[StatusEvent] {
        &self.statuses
    }

    /// Record a status transition. Capture appends from a monotonic tick
    /// source; re-recording at the same tick overwrites instead of
    /// duplicating.
    pub fn set_status(&mut self, tick: Tick, active: bool) {
        if let Some(last) = self.statuses.last_mut()
            && last.tick == tick
        {
            last.active = active;
            return;
        }
        self.statuses.push(StatusEvent { tick, active });
    }

    /// Latest status at or before `tick`, `None` if nothing recorded yet.
    pub fn status_at(&self, tick: Tick) -> Option<bool> {
        let n = self.statuses.partition_point(|s| s.tick <= tick);
        n.checked_sub(1).map(|i| self.statuses[i].active)
    }

    /// Record a message event. The same label accumulates ticks rather
    /// than duplicating entries; repeats at the same tick are collapsed.
    pub fn add_message(&mut self, label: impl Into<String>, tick: Tick) {
        let ticks = self.messages.entry(label.into()).or_default();
        if ticks.last() != Some(&tick) {
            ticks.push(tick);
        }
    }

    /// Whether message `label` fired exactly at `tick`.
    pub fn has_message(&self, label: &str, tick: Tick) -> bool {
        self.messages
            .get(label)
            .is_some_and(|ticks| ticks.binary_search(&tick).is_ok())
    }

    /// Labels of all messages that fired exactly at `tick`, in recording order.
    pub fn messages_at(&self, tick: Tick) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(_, ticks)| ticks.binary_search(&tick).is_ok())
            .map(|(label, _)| label.as_str())
            .collect()
    }

    pub fn message_labels(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn message_ticks(&self, label: &str) -> Option<&[Tick]> {
        self.messages.get(label).map(Vec::as_slice)
    }

    /// Unset every track cursor (file switch, playback restart).
    pub fn reset_cursors(&mut self) {
        for track in &mut self.tracks {
            track.reset_cursor();
        }
    }
}
