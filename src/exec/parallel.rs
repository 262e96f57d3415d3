// src/exec/parallel.rs

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::errors::{Result, TaskmasterError};
use crate::exec::{BuildReport, JobOptions, check_leftovers, finish_task};
use crate::node::Node;
use crate::task::Task;
use crate::taskmaster::Taskmaster;

/// A task coming back from a worker together with its execute result.
struct Finished<N: Node> {
    task: Task<N>,
    outcome: Result<()>,
}

/// Run up to `options.jobs` execute phases concurrently.
///
/// Only `execute` leaves the coordinator: it runs on Tokio's blocking pool.
/// Every other phase, and every call into the taskmaster, happens here, one
/// at a time, as workers report back.
pub async fn run_parallel<N: Node>(
    tm: &mut Taskmaster<N>,
    options: &JobOptions,
) -> Result<BuildReport> {
    let jobs = options.jobs.max(1);
    let mut report = BuildReport::default();
    let mut workers: JoinSet<Finished<N>> = JoinSet::new();
    let mut fatal: Option<TaskmasterError> = None;

    loop {
        // Fill free worker slots with ready tasks.
        while fatal.is_none() && workers.len() < jobs {
            let mut task = match tm.next_task() {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(err) => {
                    // Let running workers finish, then report.
                    tm.stop();
                    fatal = Some(err);
                    break;
                }
            };

            match task.prepare(tm) {
                Err(err) => finish_task(tm, task, Err(err), options, &mut report),
                Ok(()) if !task.needs_execute() => {
                    finish_task(tm, task, Ok(false), options, &mut report)
                }
                Ok(()) => {
                    debug!(target = %tm.graph().name(task.get_target()), "dispatching to worker");
                    workers.spawn_blocking(move || {
                        let outcome = task.execute();
                        Finished { task, outcome }
                    });
                }
            }
        }

        let Some(joined) = workers.join_next().await else {
            break;
        };
        match joined {
            Ok(Finished { task, outcome }) => {
                finish_task(tm, task, outcome.map(|()| true), options, &mut report);
            }
            Err(join_err) => {
                // The task went down with the worker; nothing to postprocess.
                error!(error = %join_err, "build worker panicked");
                tm.stop();
                if fatal.is_none() {
                    fatal = Some(TaskmasterError::Other(anyhow::anyhow!(
                        "build worker panicked: {join_err}"
                    )));
                }
            }
        }
    }

    if let Some(err) = fatal {
        return Err(err);
    }
    check_leftovers(tm)?;
    debug!(
        executed = report.executed.len(),
        failed = report.failed.len(),
        jobs,
        "parallel run finished"
    );
    Ok(report)
}
