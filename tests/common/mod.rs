#![allow(dead_code)]

pub use taskmaster_test_utils::{
    BuildFileBuilder, Failure, FakeNode, GraphBuilder, Journal, OtherError, TargetConfigBuilder,
    init_tracing, with_timeout,
};

use taskmaster::node::NodeId;
use taskmaster::task::Task;
use taskmaster::taskmaster::Taskmaster;

/// The next task, failing the test if there is none.
pub fn next(tm: &mut Taskmaster<FakeNode>) -> Task<FakeNode> {
    tm.next_task()
        .expect("next_task returned an error")
        .expect("expected a task")
}

/// Run a task through every phase as the serial runner would on success.
pub fn finish(tm: &mut Taskmaster<FakeNode>, mut task: Task<FakeNode>) {
    task.prepare(tm).expect("prepare failed");
    if task.needs_execute() {
        task.execute().expect("execute failed");
    }
    task.executed(tm);
    task.postprocess(tm);
}

/// Record success without running prepare or execute.
pub fn complete(tm: &mut Taskmaster<FakeNode>, mut task: Task<FakeNode>) {
    task.executed(tm);
    task.postprocess(tm);
}

pub fn name(tm: &Taskmaster<FakeNode>, id: NodeId) -> String {
    tm.graph().name(id).to_string()
}

/// Names of every target handed out, completing each task in turn.
pub fn drain(tm: &mut Taskmaster<FakeNode>) -> Vec<String> {
    let mut order = Vec::new();
    while let Some(task) = tm.next_task().expect("next_task returned an error") {
        order.push(name(tm, task.get_target()));
        finish(tm, task);
    }
    order
}
