//! Capture side: a fixed-tick-rate background thread asks each registered
//! producer to emit values, then hands the finished recording to the worker
//! pool for serialization.
//!
//! # State machine
//!
//! `Idle -> Recording -> (Paused <-> Recording) -> Stopped`
//!
//! Pausing freezes tick accumulation but keeps the thread alive. Stopping
//! is cooperative — a command observed at the top of the next iteration —
//! and never blocks on serialization.
//!
//! # Failure isolation
//!
//! A producer that errors (or panics) during capture drops its own frame
//! for that tick; the session continues. The only hard refusal is at start:
//! configuration errors (empty/duplicate descriptors, no usable producers).

use crossbeam::channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{info, warn};
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::RecorderConfig;
use crate::core::clock::{TickClock, WallClock};
use crate::core::events::{EventSender, RecordEvent};
use crate::core::workers::Workers;
use crate::entities::frame::Tick;
use crate::entities::item::RecordItem;
use crate::entities::recording::{DataError, Recording};
use crate::entities::traits::Producer;

/// Configuration errors — detected before the session starts, start refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDescriptor,
    DuplicateDescriptor(String),
    /// Nothing left to record after `begin_capture` failures
    NoProducers,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyDescriptor => write!(f, "producer with empty descriptor"),
            ConfigError::DuplicateDescriptor(d) => {
                write!(f, "duplicate producer descriptor '{}'", d)
            }
            ConfigError::NoProducers => write!(f, "no usable producers"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Finished session with its serialized form.
#[derive(Debug)]
pub struct SavedRecording {
    pub recording: Recording,
    pub bytes: Vec<u8>,
}

enum Command {
    Pause,
    Resume,
    Stop,
}

struct Shared {
    tick: AtomicI64,
    recording: AtomicBool,
    paused: AtomicBool,
}

/// Thread-free capture state machine: validates producers, advances the
/// logical tick, isolates per-producer failures. The `Recorder` thread is a
/// thin loop around it.
struct CaptureEngine {
    producers: Vec<Box<dyn Producer>>,
    tick: Tick,
}

impl CaptureEngine {
    fn start(producers: Vec<Box<dyn Producer>>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for p in &producers {
            let descriptor = p.descriptor();
            if descriptor.is_empty() {
                return Err(ConfigError::EmptyDescriptor);
            }
            if !seen.insert(descriptor.to_string()) {
                return Err(ConfigError::DuplicateDescriptor(descriptor.to_string()));
            }
        }

        // A begin_capture failure excludes that producer, not the session.
        let mut usable = Vec::with_capacity(producers.len());
        for mut p in producers {
            match p.begin_capture() {
                Ok(()) => usable.push(p),
                Err(e) => warn!("Producer '{}' failed to start: {}", p.descriptor(), e),
            }
        }
        if usable.is_empty() {
            return Err(ConfigError::NoProducers);
        }

        info!("Capture session started with {} producers", usable.len());
        Ok(Self {
            producers: usable,
            tick: -1,
        })
    }

    /// Advance one tick and invoke every producer, isolated.
    fn capture_tick(&mut self) -> Tick {
        self.tick += 1;
        let tick = self.tick;
        for p in &mut self.producers {
            let outcome = catch_unwind(AssertUnwindSafe(|| p.capture_tick(tick)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Producer '{}' failed at tick {}: {}", p.descriptor(), tick, e)
                }
                Err(_) => warn!(
                    "Producer '{}' panicked at tick {}, frame dropped",
                    p.descriptor(),
                    tick
                ),
            }
        }
        tick
    }

    /// Collect finished items. `tick_count` is the last reached tick.
    fn finish(mut self) -> (Tick, Vec<RecordItem>) {
        let items = self.producers.iter_mut().map(|p| p.end_capture()).collect();
        (self.tick.max(0), items)
    }
}

/// Handle to the capture tick thread.
///
/// The thread samples the host-published `WallClock`, converts deltas into
/// ticks, and drives producers. Dropping the handle stops the session.
pub struct Recorder {
    shared: Arc<Shared>,
    tx: Sender<Command>,
    result_rx: Receiver<Result<SavedRecording, DataError>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Recorder {
    /// Validate producers and spawn the capture thread. Refuses to start on
    /// configuration errors.
    pub fn start(
        cfg: RecorderConfig,
        producers: Vec<Box<dyn Producer>>,
        wall: Arc<WallClock>,
        workers: Arc<Workers>,
        events: EventSender<RecordEvent>,
    ) -> Result<Self, ConfigError> {
        let engine = CaptureEngine::start(producers)?;

        let shared = Arc::new(Shared {
            tick: AtomicI64::new(-1),
            recording: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        });
        let (tx, rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rewind-record".into())
            .spawn(move || {
                run_capture(cfg, engine, rx, result_tx, thread_shared, wall, workers, events);
            })
            .expect("Failed to spawn capture thread");

        Ok(Self {
            shared,
            tx,
            result_rx,
            handle: Some(handle),
        })
    }

    /// Freeze tick advancement; the thread stays alive.
    pub fn pause(&self) {
        let _ = self.tx.send(Command::Pause);
    }

    pub fn resume(&self) {
        let _ = self.tx.send(Command::Resume);
    }

    /// Stop the session. Serialization continues on the worker pool; poll
    /// [`try_result`](Self::try_result) or call [`wait`](Self::wait).
    pub fn stop(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    /// Last captured tick, `0` before the first.
    pub fn current_tick(&self) -> Tick {
        self.shared.tick.load(Ordering::Relaxed).max(0)
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recording.load(Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Relaxed)
    }

    /// Non-blocking poll for the finished, serialized recording.
    pub fn try_result(&self) -> Option<Result<SavedRecording, DataError>> {
        self.result_rx.try_recv().ok()
    }

    /// Block until the finished recording is serialized. Call after
    /// [`stop`](Self::stop).
    pub fn wait(mut self) -> Result<SavedRecording, DataError> {
        let result = self
            .result_rx
            .recv()
            .map_err(|e| DataError::Encode(e.to_string()))?;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        result
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_capture(
    cfg: RecorderConfig,
    mut engine: CaptureEngine,
    rx: Receiver<Command>,
    result_tx: Sender<Result<SavedRecording, DataError>>,
    shared: Arc<Shared>,
    wall: Arc<WallClock>,
    workers: Arc<Workers>,
    events: EventSender<RecordEvent>,
) {
    let mut clock = TickClock::new(cfg.tick_rate);
    let idle = Duration::from_millis(cfg.idle_ms.max(1));
    let mut paused = false;

    events.emit(RecordEvent::Started {
        tick_rate: cfg.tick_rate,
    });

    'run: loop {
        loop {
            match rx.try_recv() {
                Ok(Command::Pause) => {
                    if !paused {
                        paused = true;
                        shared.paused.store(true, Ordering::Relaxed);
                        events.emit(RecordEvent::Paused { tick: engine.tick });
                    }
                }
                Ok(Command::Resume) => {
                    if paused {
                        paused = false;
                        // Resync before clearing the flag: an observer that
                        // sees "not paused" may immediately publish new time.
                        clock.resync(wall.sample());
                        shared.paused.store(false, Ordering::Relaxed);
                        events.emit(RecordEvent::Resumed { tick: engine.tick });
                    }
                }
                Ok(Command::Stop) | Err(TryRecvError::Disconnected) => break 'run,
                Err(TryRecvError::Empty) => break,
            }
        }

        let now = wall.sample();
        if paused {
            // Keep the sample fresh so paused time never becomes ticks.
            clock.resync(now);
        } else {
            let steps = clock.advance(now, 1.0);
            for _ in 0..steps {
                let tick = engine.capture_tick();
                shared.tick.store(tick, Ordering::Relaxed);
            }
        }

        thread::sleep(idle);
    }

    shared.recording.store(false, Ordering::Relaxed);

    let (tick_count, items) = engine.finish();
    let mut recording = Recording::new(cfg.name, cfg.tick_rate);
    recording.finalize(tick_count, items);
    info!(
        "Recording '{}' stopped: {} ticks, {} items",
        recording.name,
        recording.tick_count,
        recording.items.len()
    );
    events.emit(RecordEvent::Stopped { tick_count });

    // Serialize off-thread; the stop path never blocks on encoding.
    workers.execute(move || match recording.to_bytes() {
        Ok(bytes) => {
            let _ = result_tx.send(Ok(SavedRecording { recording, bytes }));
        }
        Err(e) => {
            let _ = result_tx.send(Err(e));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::frame::Value;
    use crate::entities::track::Track;
    use crate::entities::traits::CaptureError;
    use std::time::Instant;

    /// Producer driven by a step function: value changes at scripted ticks.
    struct Scripted {
        descriptor: String,
        item: RecordItem,
        track: usize,
        steps: Vec<(Tick, f32)>,
    }

    impl Scripted {
        fn new(descriptor: &str, steps: Vec<(Tick, f32)>) -> Self {
            let mut item = RecordItem::new(descriptor, "float");
            let track = item.add_track(Track::new());
            Self {
                descriptor: descriptor.into(),
                item,
                track,
                steps,
            }
        }

        fn value_at(&self, tick: Tick) -> f32 {
            self.steps
                .iter()
                .rev()
                .find(|(t, _)| *t <= tick)
                .map(|(_, v)| *v)
                .unwrap_or(0.0)
        }
    }

    impl Producer for Scripted {
        fn descriptor(&self) -> &str {
            &self.descriptor
        }

        fn type_tag(&self) -> &str {
            "float"
        }

        fn begin_capture(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn capture_tick(&mut self, tick: Tick) -> Result<(), CaptureError> {
            let value = Value::Float(self.value_at(tick));
            self.item
                .track_mut(self.track)
                .unwrap()
                .record(tick, value)
                .map_err(|e| CaptureError::new(e.to_string()))?;
            Ok(())
        }

        fn end_capture(&mut self) -> RecordItem {
            std::mem::replace(&mut self.item, RecordItem::new("", ""))
        }
    }

    struct Faulty {
        descriptor: String,
        panic_instead: bool,
    }

    impl Producer for Faulty {
        fn descriptor(&self) -> &str {
            &self.descriptor
        }

        fn type_tag(&self) -> &str {
            "faulty"
        }

        fn begin_capture(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn capture_tick(&mut self, tick: Tick) -> Result<(), CaptureError> {
            if self.panic_instead {
                panic!("boom at tick {}", tick);
            }
            Err(CaptureError::new("sensor unplugged"))
        }

        fn end_capture(&mut self) -> RecordItem {
            RecordItem::new(self.descriptor.as_str(), "faulty")
        }
    }

    fn boxed(p: impl Producer + 'static) -> Box<dyn Producer> {
        Box::new(p)
    }

    #[test]
    fn start_refuses_empty_descriptor() {
        let result = CaptureEngine::start(vec![boxed(Scripted::new("", vec![]))]);
        assert!(matches!(result, Err(ConfigError::EmptyDescriptor)));
    }

    #[test]
    fn start_refuses_duplicate_descriptors() {
        let result = CaptureEngine::start(vec![
            boxed(Scripted::new("hand.L", vec![])),
            boxed(Scripted::new("hand.L", vec![])),
        ]);
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("duplicate producer descriptor 'hand.L'".into())
        );
    }

    #[test]
    fn change_only_capture_yields_sparse_frames() {
        let producer = Scripted::new("value", vec![(0, 1.0), (45, 2.0), (200, 3.0)]);
        let mut engine = CaptureEngine::start(vec![boxed(producer)]).unwrap();
        for _ in 0..=300 {
            engine.capture_tick();
        }
        let (tick_count, items) = engine.finish();

        assert_eq!(tick_count, 300);
        let frames = items[0].tracks[0].frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].tick, 0);
        assert_eq!(frames[1].tick, 45);
        assert_eq!(frames[2].tick, 200);
    }

    #[test]
    fn failing_producer_does_not_abort_the_session() {
        let mut engine = CaptureEngine::start(vec![
            boxed(Faulty {
                descriptor: "bad-err".into(),
                panic_instead: false,
            }),
            boxed(Faulty {
                descriptor: "bad-panic".into(),
                panic_instead: true,
            }),
            boxed(Scripted::new("good", vec![(0, 1.0), (10, 2.0)])),
        ])
        .unwrap();

        for _ in 0..=20 {
            engine.capture_tick();
        }
        let (tick_count, items) = engine.finish();

        assert_eq!(tick_count, 20);
        let good = items.iter().find(|i| i.descriptor == "good").unwrap();
        assert_eq!(good.tracks[0].len(), 2);
    }

    #[test]
    fn recorder_thread_captures_simulated_time() {
        let wall = Arc::new(WallClock::new());
        let workers = Arc::new(Workers::new(1));
        let cfg = RecorderConfig {
            name: "session".into(),
            tick_rate: 60,
            idle_ms: 1,
        };
        let producer = Scripted::new("value", vec![(0, 1.0), (45, 2.0), (200, 3.0)]);
        let recorder = Recorder::start(
            cfg,
            vec![boxed(producer)],
            Arc::clone(&wall),
            workers,
            EventSender::dummy(),
        )
        .unwrap();

        // Seed the clock, then jump simulated time 5 seconds forward.
        wall.publish_micros(1);
        std::thread::sleep(Duration::from_millis(100));
        wall.publish_micros(5_000_001);

        let deadline = Instant::now() + Duration::from_secs(5);
        while recorder.current_tick() < 299 {
            assert!(Instant::now() < deadline, "capture thread never caught up");
            std::thread::sleep(Duration::from_millis(1));
        }

        recorder.stop();
        let saved = recorder.wait().unwrap();
        assert_eq!(saved.recording.tick_count, 299);
        assert_eq!(saved.recording.items[0].tracks[0].len(), 3);
        // Bytes decode back to the same session.
        let back = Recording::from_bytes(&saved.bytes).unwrap();
        assert_eq!(back.uuid, saved.recording.uuid);
    }

    #[test]
    fn pause_freezes_tick_advancement() {
        let wall = Arc::new(WallClock::new());
        let workers = Arc::new(Workers::new(1));
        let recorder = Recorder::start(
            RecorderConfig::default(),
            vec![boxed(Scripted::new("value", vec![(0, 1.0)]))],
            Arc::clone(&wall),
            workers,
            EventSender::dummy(),
        )
        .unwrap();

        wall.publish_micros(1);
        recorder.pause();
        std::thread::sleep(Duration::from_millis(30));
        assert!(recorder.is_paused());

        // A paused recorder must ignore this whole simulated second.
        wall.publish_micros(1_000_000);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(recorder.current_tick(), 0);

        recorder.resume();
        let deadline = Instant::now() + Duration::from_secs(5);
        while recorder.is_paused() {
            assert!(Instant::now() < deadline, "resume never observed");
            std::thread::sleep(Duration::from_millis(1));
        }
        wall.publish_micros(2_000_000);
        while recorder.current_tick() < 59 {
            assert!(Instant::now() < deadline, "resume never advanced ticks");
            std::thread::sleep(Duration::from_millis(1));
        }

        recorder.stop();
        let saved = recorder.wait().unwrap();
        // Only the post-resume second converted into ticks.
        assert_eq!(saved.recording.tick_count, 59);
    }
}
