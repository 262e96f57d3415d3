// src/exec/report.rs

/// A target that could not be built, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTarget {
    pub target: String,
    pub message: String,
}

/// Outcome of one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Targets whose action ran (or that were restored from cache).
    pub executed: Vec<String>,
    pub up_to_date: Vec<String>,
    pub failed: Vec<FailedTarget>,
    /// Set when a node requested an explicit exit.
    pub exit_status: Option<i32>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.exit_status.is_none()
    }

    /// Process exit code: an explicit exit status wins, any failure is 2.
    pub fn exit_code(&self) -> i32 {
        match self.exit_status {
            Some(status) => status,
            None if self.failed.is_empty() => 0,
            None => 2,
        }
    }
}
