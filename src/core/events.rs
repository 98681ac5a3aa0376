//! Engine event stream for editor tooling (timelines, statistics panels).
//!
//! Events are emitted by the tick threads when significant state changes
//! occur and drained by observers at their own pace. The engine works fine
//! with no observer at all — a dummy sender swallows everything.

use crossbeam::channel::Sender;

use crate::entities::frame::Tick;

/// Events emitted by the capture thread.
#[derive(Debug, Clone)]
pub enum RecordEvent {
    Started { tick_rate: u32 },
    Paused { tick: Tick },
    Resumed { tick: Tick },
    /// Session finished; serialization continues in the background.
    Stopped { tick_count: Tick },
}

/// Events emitted by the playback thread.
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    TickAdvanced { tick: Tick },
    /// A debounced scrub landed.
    ScrubApplied { tick: Tick },
    /// The playhead wrapped past the end of the active recording.
    Looped { file: usize },
    /// The active recording changed (manual switch or loop advance).
    FileSwitched { file: usize },
    /// Reached the end with looping disabled.
    EndReached { tick: Tick },
}

/// Optional event sender held by the engines.
///
/// Send errors are ignored — a dropped receiver must never stall a tick
/// thread.
#[derive(Debug, Clone, Default)]
pub struct EventSender<E> {
    sender: Option<Sender<E>>,
}

impl<E> EventSender<E> {
    pub fn new(sender: Sender<E>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// No-op sender for tests or headless use.
    pub fn dummy() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: E) {
        if let Some(ref tx) = self.sender {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;

    #[test]
    fn emit_delivers_to_receiver() {
        let (tx, rx) = unbounded();
        let sender = EventSender::new(tx);
        sender.emit(PlaybackEvent::TickAdvanced { tick: 7 });
        assert!(matches!(
            rx.try_recv(),
            Ok(PlaybackEvent::TickAdvanced { tick: 7 })
        ));
    }

    #[test]
    fn dummy_and_dropped_receiver_are_silent() {
        let sender: EventSender<PlaybackEvent> = EventSender::dummy();
        sender.emit(PlaybackEvent::Looped { file: 0 });

        let (tx, rx) = unbounded::<PlaybackEvent>();
        drop(rx);
        let sender = EventSender::new(tx);
        sender.emit(PlaybackEvent::Looped { file: 0 });
    }
}
