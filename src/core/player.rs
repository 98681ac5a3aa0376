//! Playback side: a fixed-tick-rate background thread advances a target
//! tick, resolves every bound track's cursor to it, and notifies consumers
//! of changed frames, status transitions, and message hits.
//!
//! # State machine
//!
//! `Stopped -> Playing <-> Paused`, with scrubbing overlaid: a debounced
//! jump that lands by setting the counter to `target - 1` so the next
//! normal advance plays exactly `target` — the "advance by one, play the
//! tick" invariant holds for scrubs and normal playback alike.
//!
//! # Structural mutations
//!
//! The tick thread exclusively owns the loaded recordings, all track
//! cursors, and the binder table. File switches and rebinds arrive as
//! commands on a channel and are applied between ticks; a `busy` atomic is
//! raised for the duration so observers can tell a swap is in progress.
//! The UI only ever touches plain shared scalars.

use crossbeam::channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::PlayerConfig;
use crate::core::clock::{TickClock, WallClock};
use crate::core::events::{EventSender, PlaybackEvent};
use crate::core::scrub::ScrubDebounce;
use crate::entities::binder::Binder;
use crate::entities::frame::Tick;
use crate::entities::recording::RecordingSet;
use crate::entities::traits::Consumer;

enum Command {
    Play,
    Pause,
    SetRate(f64),
    SetLoop(bool),
    Scrub(Tick),
    SwitchFile(usize),
    Shutdown,
}

struct Shared {
    tick: AtomicI64,
    playing: AtomicBool,
    /// Structural change (file switch / rebind) in progress
    busy: AtomicBool,
    looping: AtomicBool,
    file: AtomicUsize,
    rate_bits: AtomicU64,
}

/// One consumer with its binding state.
struct Binding {
    binder: Binder,
    consumer: Box<dyn Consumer>,
    last_active: Option<bool>,
}

/// Thread-free playback state machine. The `Player` thread is a thin
/// timing loop around it; tests drive it tick by tick.
struct PlaybackEngine {
    set: RecordingSet,
    bindings: Vec<Binding>,
    file: usize,
    tick: Tick,
    loop_enabled: bool,
    shared: Arc<Shared>,
    events: EventSender<PlaybackEvent>,
}

impl PlaybackEngine {
    fn new(
        set: RecordingSet,
        consumers: Vec<Box<dyn Consumer>>,
        loop_enabled: bool,
        shared: Arc<Shared>,
        events: EventSender<PlaybackEvent>,
    ) -> Self {
        let bindings = consumers
            .into_iter()
            .map(|consumer| {
                let mut binder = Binder::new(consumer.descriptor(), consumer.type_tag());
                binder.survey(&set);
                Binding {
                    binder,
                    consumer,
                    last_active: None,
                }
            })
            .collect();

        let mut engine = Self {
            set,
            bindings,
            file: 0,
            tick: -1,
            loop_enabled,
            shared,
            events,
        };
        if !engine.set.is_empty() {
            engine.switch_file(0);
        }
        engine
    }

    fn active_tick_rate(&self) -> u32 {
        self.set.get(self.file).map(|r| r.tick_rate).unwrap_or(60)
    }

    fn active_tick_count(&self) -> Tick {
        self.set.get(self.file).map(|r| r.tick_count).unwrap_or(0)
    }

    /// Swap the active recording: reset every cursor, rebind every
    /// consumer (clearing bindings with no matching item), restart at 0.
    fn switch_file(&mut self, idx: usize) {
        if self.set.is_empty() {
            return;
        }
        self.shared.busy.store(true, Ordering::Relaxed);

        let idx = idx % self.set.len();
        self.file = idx;
        self.shared.file.store(idx, Ordering::Relaxed);

        if let Some(rec) = self.set.get_mut(idx) {
            rec.reset_cursors();
        }
        let rec = self.set.get(idx).expect("active file exists");
        for binding in &mut self.bindings {
            binding.binder.rebind(rec);
            binding.last_active = None;
            match binding.binder.item_idx {
                Some(i) => {
                    binding.consumer.bind(Some(&rec.items[i]));
                    binding.consumer.begin_playback();
                }
                None => binding.consumer.bind(None),
            }
        }

        self.tick = -1;
        self.shared.tick.store(-1, Ordering::Relaxed);
        info!("Switched to recording '{}' ({} ticks)", rec.name, rec.tick_count);
        self.events.emit(PlaybackEvent::FileSwitched { file: idx });

        self.shared.busy.store(false, Ordering::Relaxed);
    }

    /// Advance one tick, wrapping or stopping at the end of the recording.
    fn step(&mut self) {
        if self.set.is_empty() {
            return;
        }
        if self.tick >= self.active_tick_count() {
            if self.loop_enabled {
                let next = (self.file + 1) % self.set.len();
                self.events.emit(PlaybackEvent::Looped { file: self.file });
                self.switch_file(next);
            } else {
                self.shared.playing.store(false, Ordering::Relaxed);
                self.events.emit(PlaybackEvent::EndReached { tick: self.tick });
                return;
            }
        }
        self.tick += 1;
        self.shared.tick.store(self.tick, Ordering::Relaxed);
        self.play_tick(self.tick);
    }

    /// Debounced scrub landing: park the counter one short of the target so
    /// the next advance plays exactly the target tick.
    fn jump_to(&mut self, target: Tick) {
        if self.set.is_empty() {
            return;
        }
        let target = target.clamp(0, self.active_tick_count());
        self.tick = target - 1;
        self.step();
        self.events.emit(PlaybackEvent::ScrubApplied { tick: target });
    }

    /// Resolve every bound track to `tick` and dispatch the changes.
    fn play_tick(&mut self, tick: Tick) {
        let Some(rec) = self.set.get_mut(self.file) else {
            return;
        };

        for binding in &mut self.bindings {
            // Unbound entities are skipped, never an error.
            let Some(idx) = binding.binder.item_idx else {
                continue;
            };
            let Some(item) = rec.items.get_mut(idx) else {
                warn!("Stale binding for '{}', skipping", binding.binder.descriptor);
                continue;
            };

            let mut any_changed = false;
            for (track_idx, track) in item.tracks.iter_mut().enumerate() {
                let seek = track.seek(tick);
                if seek.changed
                    && let Some(frame) = track.current()
                {
                    binding.consumer.apply(track_idx, frame);
                    any_changed = true;
                }
            }
            if any_changed {
                binding.consumer.after_tick(tick);
            }

            let item = &rec.items[idx];
            if let Some(active) = item.status_at(tick)
                && binding.last_active != Some(active)
            {
                binding.last_active = Some(active);
                binding.consumer.set_active(tick, active);
            }
            for label in item.messages_at(tick) {
                binding.consumer.on_message(tick, label);
            }
        }

        self.events.emit(PlaybackEvent::TickAdvanced { tick });
    }
}

/// Handle to the playback tick thread.
///
/// All mutating operations are requests; the tick thread applies them
/// between ticks. Reads come from lock-free shared scalars.
pub struct Player {
    shared: Arc<Shared>,
    tx: Sender<Command>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Player {
    /// Spawn the playback thread over a set of loaded recordings. Consumers
    /// are bound to the first recording immediately; playback starts paused
    /// at tick 0.
    pub fn spawn(
        set: RecordingSet,
        consumers: Vec<Box<dyn Consumer>>,
        cfg: PlayerConfig,
        wall: Arc<WallClock>,
        events: EventSender<PlaybackEvent>,
    ) -> Self {
        let shared = Arc::new(Shared {
            tick: AtomicI64::new(-1),
            playing: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            looping: AtomicBool::new(cfg.loop_enabled),
            file: AtomicUsize::new(0),
            rate_bits: AtomicU64::new(1.0f64.to_bits()),
        });
        let (tx, rx) = unbounded();

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rewind-playback".into())
            .spawn(move || {
                run_playback(cfg, set, consumers, rx, thread_shared, wall, events);
            })
            .expect("Failed to spawn playback thread");

        Self {
            shared,
            tx,
            handle: Some(handle),
        }
    }

    pub fn play(&self) {
        let _ = self.tx.send(Command::Play);
    }

    pub fn pause(&self) {
        let _ = self.tx.send(Command::Pause);
    }

    /// Playback rate multiplier; `0.0` freezes advancement without pausing.
    /// Clamped to the configured maximum on the tick thread.
    pub fn set_rate(&self, rate: f64) {
        let _ = self.tx.send(Command::SetRate(rate));
    }

    pub fn set_loop(&self, enabled: bool) {
        let _ = self.tx.send(Command::SetLoop(enabled));
    }

    /// Request a scrub. Rapid requests within the debounce window coalesce
    /// into a single applied jump to the last target.
    pub fn scrub(&self, target: Tick) {
        let _ = self.tx.send(Command::Scrub(target));
    }

    /// Switch the active recording (index into the loaded set).
    pub fn switch_file(&self, idx: usize) {
        let _ = self.tx.send(Command::SwitchFile(idx));
    }

    /// Last played tick, `0` before the first.
    pub fn current_tick(&self) -> Tick {
        self.shared.tick.load(Ordering::Relaxed).max(0)
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Relaxed)
    }

    /// Whether a structural change (file switch) is being applied.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Relaxed)
    }

    pub fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Relaxed)
    }

    pub fn active_file(&self) -> usize {
        self.shared.file.load(Ordering::Relaxed)
    }

    pub fn rate(&self) -> f64 {
        f64::from_bits(self.shared.rate_bits.load(Ordering::Relaxed))
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_playback(
    cfg: PlayerConfig,
    set: RecordingSet,
    consumers: Vec<Box<dyn Consumer>>,
    rx: Receiver<Command>,
    shared: Arc<Shared>,
    wall: Arc<WallClock>,
    events: EventSender<PlaybackEvent>,
) {
    let mut engine = PlaybackEngine::new(
        set,
        consumers,
        cfg.loop_enabled,
        Arc::clone(&shared),
        events,
    );
    let mut clock = TickClock::new(engine.active_tick_rate());
    let mut scrub = ScrubDebounce::new(cfg.scrub_debounce_ms);
    let idle = Duration::from_millis(cfg.idle_ms.max(1));

    'run: loop {
        loop {
            match rx.try_recv() {
                Ok(Command::Play) => {
                    shared.playing.store(true, Ordering::Relaxed);
                    clock.clear();
                }
                Ok(Command::Pause) => shared.playing.store(false, Ordering::Relaxed),
                Ok(Command::SetRate(rate)) => {
                    let rate = rate.clamp(0.0, cfg.max_rate);
                    shared.rate_bits.store(rate.to_bits(), Ordering::Relaxed);
                }
                Ok(Command::SetLoop(enabled)) => {
                    engine.loop_enabled = enabled;
                    shared.looping.store(enabled, Ordering::Relaxed);
                }
                Ok(Command::Scrub(target)) => scrub.schedule(target),
                Ok(Command::SwitchFile(idx)) => {
                    scrub.cancel();
                    engine.switch_file(idx);
                    clock = TickClock::new(engine.active_tick_rate());
                }
                Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => break 'run,
                Err(TryRecvError::Empty) => break,
            }
        }

        if let Some(target) = scrub.fire() {
            engine.jump_to(target);
            // Drop partial accumulation so the landing tick gets a full period.
            clock.clear();
        }

        let now = wall.sample();
        if shared.playing.load(Ordering::Relaxed) && !engine.set.is_empty() {
            let rate = f64::from_bits(shared.rate_bits.load(Ordering::Relaxed));
            let steps = clock.advance(now, rate);
            for _ in 0..steps {
                engine.step();
                if !shared.playing.load(Ordering::Relaxed) {
                    break;
                }
            }
            // Loop advance may have landed on a recording with another rate.
            if clock.tick_rate() != engine.active_tick_rate() {
                clock = TickClock::new(engine.active_tick_rate());
                clock.resync(now);
            }
        } else {
            clock.resync(now);
        }

        thread::sleep(idle);
    }
}
