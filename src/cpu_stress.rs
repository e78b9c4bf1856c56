use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::LoadError;
use crate::limits::LoadRequest;
use crate::worker::{burn_until, StopSignal, WorkerGauge};

/// Fans a [`LoadRequest`] out over OS threads. Runs started from the same
/// generator share one [`WorkerGauge`]; nothing else is shared between runs.
#[derive(Debug, Clone, Default)]
pub struct LoadGenerator {
    gauge: Arc<WorkerGauge>,
}

impl LoadGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gauge(&self) -> &WorkerGauge {
        &self.gauge
    }

    /// Burn `request.concurrency()` cores for `request.duration()` and block
    /// until every worker is done. The run cannot be stopped early.
    pub fn run(&self, request: &LoadRequest) -> Result<LoadResult, LoadError> {
        self.start(request)?.join()
    }

    /// Launch the workers and hand back control immediately.
    pub fn start(&self, request: &LoadRequest) -> Result<LoadHandle, LoadError> {
        let stop = StopSignal::new();
        let started = Instant::now();
        let deadline = started + request.duration();
        let mut workers = Vec::with_capacity(request.concurrency());

        for worker in 0..request.concurrency() {
            let stop_worker = stop.clone();
            let gauge = Arc::clone(&self.gauge);
            let spawned = thread::Builder::new()
                .name(format!("cpu-burn-{worker}"))
                .spawn(move || {
                    let _active = gauge.enter();
                    burn_until(deadline, &stop_worker)
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    stop.trigger();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(LoadError::Spawn { worker, source });
                }
            }
        }

        Ok(LoadHandle {
            request: *request,
            monitor: LoadMonitor {
                started,
                duration: request.duration(),
                stop,
            },
            workers,
        })
    }
}

/// Progress view and stop switch for a running load. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoadMonitor {
    started: Instant,
    duration: Duration,
    stop: StopSignal,
}

impl LoadMonitor {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed share of the requested duration, in percent within `[0, 100]`.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 100.0;
        }
        (self.elapsed().as_secs_f64() / self.duration.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }

    pub fn stop(&self) {
        self.stop.trigger();
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_triggered()
    }
}

/// A launched run. Dropping it without [`LoadHandle::join`] detaches the
/// workers; they still end at the deadline.
#[derive(Debug)]
pub struct LoadHandle {
    request: LoadRequest,
    monitor: LoadMonitor,
    workers: Vec<JoinHandle<u64>>,
}

impl LoadHandle {
    pub fn request(&self) -> &LoadRequest {
        &self.request
    }

    pub fn monitor(&self) -> LoadMonitor {
        self.monitor.clone()
    }

    pub fn progress(&self) -> f64 {
        self.monitor.progress()
    }

    pub fn stop(&self) {
        self.monitor.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(JoinHandle::is_finished)
    }

    /// Wait for the last worker, then assemble the result.
    pub fn join(self) -> Result<LoadResult, LoadError> {
        let worker_count = self.workers.len();
        let mut total_iterations = 0u64;
        let mut panicked = 0;

        for worker in self.workers {
            match worker.join() {
                Ok(iterations) => total_iterations = total_iterations.saturating_add(iterations),
                Err(_) => panicked += 1,
            }
        }

        let actual_elapsed = self.monitor.elapsed();
        if panicked > 0 {
            return Err(LoadError::WorkerPanicked { count: panicked });
        }

        Ok(LoadResult {
            worker_count,
            requested_duration_secs: self.request.duration_secs(),
            actual_elapsed,
            completed_at: Utc::now(),
            total_iterations,
            stopped_early: self.monitor.is_stopping() && actual_elapsed < self.monitor.duration,
        })
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub worker_count: usize,
    pub requested_duration_secs: u64,
    pub actual_elapsed: Duration,
    pub completed_at: DateTime<Utc>,
    pub total_iterations: u64,
    pub stopped_early: bool,
}

impl LoadResult {
    pub fn summary(&self) -> String {
        let verb = if self.stopped_early { "Stopped" } else { "Burned" };
        format!(
            "{verb} CPU on {} worker(s) for ~{}s ({:.2}s elapsed)",
            self.worker_count,
            self.requested_duration_secs,
            self.actual_elapsed.as_secs_f64()
        )
    }
}
