// Migration progress payload, counter and reporters

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use uuid::Uuid;

/// Observer of migration progress. `fraction` is in `[0, 1]`; `task` groups
/// the reports of one phase.
pub trait ProgressReport: Send + Sync {
    fn report(&self, fraction: f64, message: &str, task: Uuid);
}

/// Progress payload emitted during the migration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationProgress {
    pub task_id: String,
    pub percent: f64,
    pub message: String,
}

impl MigrationProgress {
    pub fn new(task: Uuid, fraction: f64, message: impl Into<String>) -> Self {
        Self {
            task_id: task.to_string(),
            percent: (fraction.clamp(0.0, 1.0) * 100.0).min(100.0),
            message: message.into(),
        }
    }
}

/// Unit counter shared by the workers of one fork-join phase.
/// Every `advance` is counted, so the last one always yields exactly 1.0.
#[derive(Debug)]
pub struct ProgressCounter {
    completed: AtomicUsize,
    total: usize,
}

impl ProgressCounter {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Count one finished unit and return the new fraction.
    pub fn advance(&self) -> f64 {
        self.advance_by(1)
    }

    /// Count `units` at once, e.g. the steps a failed unit will never reach.
    pub fn advance_by(&self, units: usize) -> f64 {
        let done = self.completed.fetch_add(units, Ordering::SeqCst) + units;
        fraction(done, self.total)
    }

    pub fn fraction(&self) -> f64 {
        fraction(self.completed.load(Ordering::SeqCst), self.total)
    }
}

fn fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).min(1.0)
}

/// Writes progress to the log.
pub struct LogReporter;

impl ProgressReport for LogReporter {
    fn report(&self, fraction: f64, message: &str, task: Uuid) {
        log::info!("[{}] {:5.1}% {}", task, fraction * 100.0, message);
    }
}

/// Writes one JSON object per report to stdout.
pub struct JsonLinesReporter;

impl ProgressReport for JsonLinesReporter {
    fn report(&self, fraction: f64, message: &str, task: Uuid) {
        let progress = MigrationProgress::new(task, fraction, message);
        if let Ok(line) = serde_json::to_string(&progress) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
        }
    }
}

/// Discards progress.
pub struct NullReporter;

impl ProgressReport for NullReporter {
    fn report(&self, _fraction: f64, _message: &str, _task: Uuid) {}
}
