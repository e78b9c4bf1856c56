use std::hint::black_box;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Arithmetic steps between two clock (and stop flag) checks.
pub const CHECK_INTERVAL: u64 = 100_000;

// Keeps the input well inside the range where `x + 1.0` still changes `x`.
const INPUT_WRAP: f64 = 1.0e9;

/// Cooperative cancellation flag shared by every worker of one run.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts workers that are currently burning and workers ever launched.
#[derive(Debug, Default)]
pub struct WorkerGauge {
    active: AtomicUsize,
    launched: AtomicUsize,
}

impl WorkerGauge {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub(crate) fn enter(self: &Arc<Self>) -> ActiveWorker {
        self.launched.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        ActiveWorker(Arc::clone(self))
    }
}

/// Decrements the active count when dropped, panics included.
pub(crate) struct ActiveWorker(Arc<WorkerGauge>);

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Occupy the calling thread with sqrt/sin/cos work until `deadline` passes
/// or `stop` fires. Returns the number of arithmetic steps performed.
pub fn burn_until(deadline: Instant, stop: &StopSignal) -> u64 {
    let mut x = 1.0f64;
    let mut acc = 0.0f64;
    let mut iterations = 0u64;

    while !stop.is_triggered() && Instant::now() < deadline {
        for _ in 0..CHECK_INTERVAL {
            acc += x.sqrt() * x.sin() * x.cos();
            x += 1.0;
        }
        iterations += CHECK_INTERVAL;
        acc = black_box(acc);
        if x > INPUT_WRAP {
            x = 1.0;
        }
    }

    black_box(acc);
    iterations
}
