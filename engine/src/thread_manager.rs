use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use cpu_burn::LoadMonitor;
use parking_lot::Mutex;
use serde::Serialize;

/// Background runs that can still be stopped, keyed by task id.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    counter: AtomicUsize,
    tasks: Mutex<HashMap<String, Registered>>,
}

#[derive(Debug, Clone)]
pub struct RunningTask {
    pub monitor: LoadMonitor,
    pub worker_count: usize,
    pub requested_duration_secs: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Registered {
    seq: usize,
    task: RunningTask,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    pub worker_count: usize,
    pub requested_duration_seconds: u64,
    pub progress_percent: f64,
    pub stopping: bool,
    pub started_at: DateTime<Utc>,
}

impl TaskRegistry {
    /// Store `task` under a fresh `<prefix>-<n>` id and return the id.
    pub fn register_task(&self, prefix: &str, task: RunningTask) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("{}-{}", prefix, seq);

        let mut guard = self.tasks.lock();
        guard.insert(id.clone(), Registered { seq, task });
        tracing::debug!(%id, total = guard.len(), "task registered");
        id
    }

    pub fn remove_task(&self, id: &str) -> Option<RunningTask> {
        self.tasks.lock().remove(id).map(|registered| registered.task)
    }

    /// Returns false when no task has this id.
    pub fn stop_task(&self, id: &str) -> bool {
        match self.tasks.lock().get(id) {
            Some(registered) => {
                registered.task.monitor.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) -> usize {
        let guard = self.tasks.lock();
        for registered in guard.values() {
            registered.task.monitor.stop();
        }
        guard.len()
    }

    /// Running tasks in registration order.
    pub fn list_tasks(&self) -> Vec<TaskSummary> {
        let guard = self.tasks.lock();
        let mut tasks: Vec<(usize, TaskSummary)> = guard
            .iter()
            .map(|(id, Registered { seq, task })| {
                let summary = TaskSummary {
                    id: id.clone(),
                    worker_count: task.worker_count,
                    requested_duration_seconds: task.requested_duration_secs,
                    progress_percent: task.monitor.progress(),
                    stopping: task.monitor.is_stopping(),
                    started_at: task.started_at,
                };
                (*seq, summary)
            })
            .collect();
        tasks.sort_by_key(|(seq, _)| *seq);
        tasks.into_iter().map(|(_, summary)| summary).collect()
    }
}
