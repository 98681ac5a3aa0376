//! Background worker pool for one-shot I/O tasks (recording serialization,
//! batch file loads).
//!
//! Uses crossbeam for an MPMC queue with closure-based task execution. The
//! tick threads never block on I/O themselves — they hand work here and the
//! requesting side polls a result channel.

use crossbeam::channel::{Sender, unbounded};
use log::{debug, error};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool for CPU/IO-bound tasks.
///
/// # Example
/// ```ignore
/// let workers = Workers::default();
/// workers.execute(move || {
///     let _ = tx.send(recording.to_bytes());
/// });
/// ```
pub struct Workers {
    sender: Sender<Job>,
    _handles: Vec<thread::JoinHandle<()>>, // Keep handles to prevent premature drop
}

impl Default for Workers {
    /// Half the logical cores, at least one — save/load traffic is bursty
    /// and the tick threads want the rest of the machine.
    fn default() -> Self {
        Self::new(num_cpus::get().div_ceil(2))
    }
}

impl Workers {
    pub fn new(num_threads: usize) -> Self {
        let (tx, rx): (Sender<Job>, _) = unbounded();
        let mut handles = Vec::new();

        for worker_id in 0..num_threads.max(1) {
            let rx = rx.clone();

            let handle = thread::Builder::new()
                .name(format!("rewind-worker-{}", worker_id))
                .spawn(move || {
                    debug!("Worker {} started", worker_id);

                    // Worker loop: execute closures until channel closes
                    while let Ok(job) = rx.recv() {
                        job();
                    }

                    debug!("Worker {} stopped", worker_id);
                })
                .expect("Failed to spawn worker thread");

            handles.push(handle);
        }

        debug!("Workers initialized: {} threads", num_threads.max(1));

        Self {
            sender: tx,
            _handles: handles,
        }
    }

    /// Execute closure on a worker thread. Runs asynchronously, no return
    /// value — pair with a channel for results.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.sender.send(Box::new(f)) {
            error!("Failed to enqueue job: {}", e);
        }
    }
}

// Drop: sender closes, workers drain the queue and exit recv() loop
impl Drop for Workers {
    fn drop(&mut self) {
        debug!("Workers shutting down ({} threads)...", self._handles.len());
    }
}
