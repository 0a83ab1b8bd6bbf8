use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one sub-task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(String),
    /// No verification session attached; counts as a success.
    Unchecked,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    pub fn from_result<T, E: std::fmt::Display>(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Passed,
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// End-of-session totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Whether a verification session evaluated the steps.
    pub checked: bool,
    pub output: Option<PathBuf>,
}

/// Receives live progress. Libraries never print; front-ends implement this.
pub trait Reporter: Send + Sync {
    fn step_started(&self, _title: &str) {}

    fn step_finished(&self, title: &str, verdict: &Verdict);

    fn module_started(&self, _name: &str) {}

    fn module_step(&self, name: &str, title: &str, verdict: &Verdict);

    fn module_finished(&self, _name: &str, _success: bool) {}

    fn summary(&self, summary: &Summary);
}

/// Reports through `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn step_finished(&self, title: &str, verdict: &Verdict) {
        match verdict {
            Verdict::Failed(reason) => warn!(title, reason = %reason, "Step failed"),
            _ => info!(title, "Step done"),
        }
    }

    fn module_step(&self, name: &str, title: &str, verdict: &Verdict) {
        match verdict {
            Verdict::Failed(reason) => warn!(module = name, title, reason = %reason, "Module step failed"),
            _ => info!(module = name, title, "Module step done"),
        }
    }

    fn summary(&self, summary: &Summary) {
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            checked = summary.checked,
            "Recording finished"
        );
    }
}
