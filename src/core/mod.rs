//! Engine modules - clocks, scrub debounce, recorder, player, workers.
//!
//! These form the tick-synchronized engine, independent of any host UI.

pub mod clock;
pub mod events;
pub mod player;
pub mod recorder;
pub mod scrub;
pub mod workers;

// Re-exports for convenience
pub use clock::{TickClock, WallClock};
pub use events::{EventSender, PlaybackEvent, RecordEvent};
pub use player::Player;
pub use recorder::{ConfigError, Recorder, SavedRecording};
pub use scrub::ScrubDebounce;
pub use workers::Workers;
