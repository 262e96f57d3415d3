// src/exec/serial.rs

use tracing::debug;

use crate::errors::Result;
use crate::exec::{BuildReport, JobOptions, check_leftovers, finish_task};
use crate::node::Node;
use crate::taskmaster::Taskmaster;

/// Run tasks one at a time until the taskmaster runs dry, then check for
/// nodes left pending.
pub fn run_serial<N: Node>(tm: &mut Taskmaster<N>, options: &JobOptions) -> Result<BuildReport> {
    let mut report = BuildReport::default();

    while let Some(mut task) = tm.next_task()? {
        let outcome = task.prepare(tm).and_then(|()| {
            if task.needs_execute() {
                task.execute().map(|()| true)
            } else {
                Ok(false)
            }
        });
        finish_task(tm, task, outcome, options, &mut report);
    }

    check_leftovers(tm)?;
    debug!(
        executed = report.executed.len(),
        failed = report.failed.len(),
        "serial run finished"
    );
    Ok(report)
}
