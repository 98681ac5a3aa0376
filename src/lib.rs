//! REWIND - tick-synchronized object state recording and replay engine.
//!
//! A background capture thread advances a logical clock at a fixed tick
//! rate and asks registered producers to record changed values into sparse,
//! tick-ordered tracks. A playback thread resolves those tracks to any
//! target tick — playing forward, scrubbing backward, or seeking to zero —
//! and drives live consumers with the resolved frames.

// Engine (clocks, recorder, player, scrub, workers)
pub mod core;

// Data model + producer/consumer contracts
pub mod entities;

pub mod config;

// Re-export commonly used types
pub use config::{PlayerConfig, RecorderConfig};
pub use core::clock::{TickClock, WallClock};
pub use core::events::{EventSender, PlaybackEvent, RecordEvent};
pub use core::player::Player;
pub use core::recorder::{ConfigError, Recorder, SavedRecording};
pub use core::scrub::ScrubDebounce;
pub use core::workers::Workers;
pub use entities::{
    Binder, CaptureError, Consumer, DataError, Frame, LoadReport, Producer, RecordItem, Recording,
    RecordingSet, Seek, StatusEvent, Tick, Track, TrackError, Value,
};
