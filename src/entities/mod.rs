//! Data model: frames, tracks, record items, recordings, binders, and the
//! producer/consumer contracts.
//!
//! `core/` depends on `entities`, never the other way around.

pub mod binder;
pub mod frame;
pub mod item;
pub mod recording;
pub mod track;
pub mod traits;

pub use binder::Binder;
pub use frame::{Frame, Tick, Value};
pub use item::{RecordItem, StatusEvent};
pub use recording::{DataError, LoadReport, Recording, RecordingSet};
pub use track::{Seek, Track, TrackError};
pub use traits::{CaptureError, Consumer, Producer};
