// src/exec/mod.rs

//! Job runners: drive a [`Taskmaster`] until it has nothing left to hand out.
//!
//! - [`serial`] runs every phase of one task at a time on the caller's
//!   thread.
//! - [`parallel`] runs up to `jobs` `execute` phases on Tokio's blocking
//!   pool while the coordinator keeps the taskmaster single-threaded.
//! - [`report`] summarises what happened.

use tracing::{debug, error, info};

use crate::errors::TaskmasterError;
use crate::node::Node;
use crate::task::Task;
use crate::taskmaster::Taskmaster;

pub mod parallel;
pub mod report;
pub mod serial;

pub use parallel::run_parallel;
pub use report::{BuildReport, FailedTarget};
pub use serial::run_serial;

/// Knobs shared by both runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    pub jobs: usize,
    pub keep_going: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            keep_going: false,
        }
    }
}

/// Record a task's outcome on the coordinator: `executed` or `failed`, then
/// `postprocess`.
///
/// `outcome` is `Ok(true)` if the execute phase ran, `Ok(false)` if the task
/// did not need it.
pub(crate) fn finish_task<N: Node>(
    tm: &mut Taskmaster<N>,
    mut task: Task<N>,
    outcome: Result<bool, TaskmasterError>,
    options: &JobOptions,
    report: &mut BuildReport,
) {
    match outcome {
        Ok(ran) => {
            task.executed(tm);
            let names = task
                .targets()
                .into_iter()
                .map(|t| tm.graph().name(t).to_string());
            if ran {
                for name in names {
                    info!(target = %name, "built");
                    report.executed.push(name);
                }
            } else {
                report.up_to_date.extend(names);
            }
        }
        Err(err) => {
            let target = tm.graph().name(task.get_target()).to_string();
            let message = describe_failure(&err);
            error!(target = %target, error = %message, "task failed");
            if let Some(status) = err.exit_status() {
                report.exit_status = Some(status);
            }
            task.exception_set(err);
            task.failed(tm, options.keep_going);
            report.failed.push(FailedTarget { target, message });
        }
    }
    task.postprocess(tm);
}

/// Run the end-of-walk pending check, unless a failure stopped the walk.
///
/// After a stop, parents of children that were still in flight stay pending.
/// The failure already in the report is the outcome, not a cycle.
pub(crate) fn check_leftovers<N: Node>(tm: &Taskmaster<N>) -> Result<(), TaskmasterError> {
    if tm.is_stopped() {
        debug!("walk was stopped; skipping the pending-node check");
        return Ok(());
    }
    tm.cleanup()
}

fn describe_failure(err: &TaskmasterError) -> String {
    match err {
        TaskmasterError::Build(build) if !build.name.is_empty() => {
            format!("[{}] {}", build.name, build.errstr)
        }
        other => other.to_string(),
    }
}
