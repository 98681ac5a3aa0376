//! Producer / Consumer contracts — the seams between the engine and the
//! application-specific recorders it drives.
//!
//! The engine never understands entity internals: producers append frames
//! to their own tracks each capture tick, consumers receive resolved frames
//! each playback tick. Both run on the respective tick thread and must not
//! block.

use super::frame::{Frame, Tick};
use super::item::RecordItem;

/// Capture-time errors surfaced by producers. Isolated per entity per tick:
/// the engine logs and skips, it never aborts the session.
#[derive(Debug)]
pub struct CaptureError(pub String);

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CaptureError {}

impl CaptureError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Supplies values to be recorded, one entity per producer.
///
/// Lifecycle: `begin_capture` once at session start (may fail — e.g. a
/// required sub-object is missing — which excludes the producer from the
/// session), `capture_tick` once per recorder tick, `end_capture` once at
/// stop, handing ownership of the finished item to the engine.
pub trait Producer: Send {
    /// Unique key within one recording session. Validated before start.
    fn descriptor(&self) -> &str;

    /// Kind identity matched against consumers at playback time.
    fn type_tag(&self) -> &str;

    fn begin_capture(&mut self) -> Result<(), CaptureError>;

    /// Append zero or more frames (record-on-change) to the owned item.
    /// Must be cheap and non-blocking.
    fn capture_tick(&mut self, tick: Tick) -> Result<(), CaptureError>;

    fn end_capture(&mut self) -> RecordItem;
}

/// Receives resolved frames during playback, one entity per consumer.
pub trait Consumer: Send {
    fn descriptor(&self) -> &str;

    fn type_tag(&self) -> &str;

    /// Called when the active recording changes. `None` means the new
    /// recording has no matching item — the entity keeps its last state
    /// and is simply no longer driven.
    fn bind(&mut self, item: Option<&RecordItem>);

    /// Called once when playback (re)starts from tick 0.
    fn begin_playback(&mut self) {}

    /// Called once per changed track per tick with the newly resolved frame.
    fn apply(&mut self, track: usize, frame: &Frame);

    /// Called once per tick after all changed tracks were applied, so the
    /// entity can react once to a batch of property updates.
    fn after_tick(&mut self, _tick: Tick) {}

    /// Called when the entity's recorded active/inactive status changes.
    fn set_active(&mut self, _tick: Tick, _active: bool) {}

    /// Called for every message event that fired exactly at this tick.
    fn on_message(&mut self, _tick: Tick, _label: &str) {}
}
