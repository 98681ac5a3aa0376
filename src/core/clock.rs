//! Logical tick timing: a wall clock published by the host thread and a
//! per-engine accumulator that converts wall-clock deltas into ticks.
//!
//! # Timing Model
//!
//! The host (UI/main) thread publishes "now" as a single atomic scalar each
//! frame; tick threads sample it without locks. A one-iteration-stale read
//! merely delays a tick by under a millisecond — acceptable by design.
//! Microseconds in a u64 keep the publish/sample pair torn-read-free.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Wall-clock scalar with a single writer (the host thread) and any number
/// of lock-free readers (the tick threads).
#[derive(Debug)]
pub struct WallClock {
    origin: Instant,
    micros: AtomicU64,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            micros: AtomicU64::new(0),
        }
    }

    /// Publish the current wall time. Call once per host frame.
    pub fn publish_now(&self) {
        self.publish_micros(self.origin.elapsed().as_micros() as u64);
    }

    /// Publish an explicit time, in microseconds since the clock's origin.
    /// Lets tests drive simulated time without sleeping.
    pub fn publish_micros(&self, micros: u64) {
        self.micros.store(micros, Ordering::Release);
    }

    /// Most recently published time, microseconds since origin.
    pub fn sample(&self) -> u64 {
        self.micros.load(Ordering::Acquire)
    }
}

/// Fixed-rate tick accumulator.
///
/// Feed it sampled wall times; it accumulates the deltas (scaled by a rate
/// multiplier) and pays out whole ticks whenever a full tick period has
/// elapsed. Owned exclusively by one tick thread.
#[derive(Debug)]
pub struct TickClock {
    /// Seconds per tick
    period: f64,
    accumulator: f64,
    last_micros: Option<u64>,
}

impl TickClock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            period: 1.0 / tick_rate.max(1) as f64,
            accumulator: 0.0,
            last_micros: None,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        (1.0 / self.period).round() as u32
    }

    /// Accumulate the delta since the last sample, scaled by `rate`, and
    /// return how many whole ticks elapsed. `rate` 0.0 freezes advancement
    /// without losing the sample position.
    pub fn advance(&mut self, now_micros: u64, rate: f64) -> u32 {
        let Some(last) = self.last_micros else {
            self.last_micros = Some(now_micros);
            return 0;
        };
        self.last_micros = Some(now_micros);

        let delta = now_micros.saturating_sub(last) as f64 / 1_000_000.0;
        self.accumulator += delta * rate.max(0.0);

        let mut ticks = 0u32;
        while self.accumulator >= self.period {
            self.accumulator -= self.period;
            ticks += 1;
        }
        ticks
    }

    /// Move the sample position without accumulating — used while paused so
    /// paused wall time never converts into ticks.
    pub fn resync(&mut self, now_micros: u64) {
        self.last_micros = Some(now_micros);
    }

    /// Drop any partial accumulation (scrub landing, file switch).
    pub fn clear(&mut self) {
        self.accumulator = 0.0;
        self.last_micros = None;
    }
}
