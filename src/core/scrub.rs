//! Scrub debounce - coalesces rapid seek requests into one applied jump.
//!
//! When the playhead is dragged, seek requests arrive far faster than they
//! are worth applying. Instead:
//! 1. Each request replaces the pending target and resets a short timer
//! 2. When the timer elapses, the playback thread applies one jump
//!
//! This keeps a drag across 300 ticks from resolving 300 seeks.

use std::time::{Duration, Instant};

use crate::entities::frame::Tick;

/// Debounced scrub target for the playback tick thread.
///
/// # Usage
/// ```ignore
/// // On each drag event:
/// scrub.schedule(target_tick);
///
/// // In the tick loop:
/// if let Some(target) = scrub.fire() {
///     jump_to(target);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScrubDebounce {
    delay: Duration,
    /// Pending jump: (target tick, trigger time)
    pending: Option<(Tick, Instant)>,
}

impl Default for ScrubDebounce {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ScrubDebounce {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: None,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Request a jump. Replaces any pending target and resets the timer.
    pub fn schedule(&mut self, target: Tick) {
        self.pending = Some((target, Instant::now() + self.delay));
        log::trace!("Scrub scheduled to tick {}", target);
    }

    /// Discard any pending jump (file switch, stop).
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Returns the target when the debounce delay has elapsed, clearing the
    /// pending state. Otherwise `None`.
    pub fn fire(&mut self) -> Option<Tick> {
        let (target, trigger_at) = self.pending?;
        if Instant::now() >= trigger_at {
            self.pending = None;
            log::trace!("Scrub firing: tick {}", target);
            Some(target)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_target(&self) -> Option<Tick> {
        self.pending.map(|(t, _)| t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_fire_before_delay() {
        let mut scrub = ScrubDebounce::new(100);
        scrub.schedule(30);
        assert!(scrub.is_pending());
        assert_eq!(scrub.fire(), None);
    }

    #[test]
    fn fires_after_delay() {
        let mut scrub = ScrubDebounce::new(10);
        scrub.schedule(30);
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(scrub.fire(), Some(30));
        assert!(!scrub.is_pending());
    }

    #[test]
    fn rapid_requests_coalesce_to_last_target() {
        let mut scrub = ScrubDebounce::new(30);
        scrub.schedule(10);
        scrub.schedule(20);
        scrub.schedule(30);
        assert_eq!(scrub.pending_target(), Some(30));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(scrub.fire(), Some(30));
        // Exactly one jump came out of three requests.
        assert_eq!(scrub.fire(), None);
    }

    #[test]
    fn reschedule_resets_timer() {
        let mut scrub = ScrubDebounce::new(50);
        scrub.schedule(10);
        std::thread::sleep(Duration::from_millis(30));
        scrub.schedule(99);
        assert_eq!(scrub.fire(), None);
        assert_eq!(scrub.pending_target(), Some(99));
    }

    #[test]
    fn cancel_discards_pending() {
        let mut scrub = ScrubDebounce::new(10);
        scrub.schedule(10);
        scrub.cancel();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(scrub.fire(), None);
    }
}
