// tests/trace_output.rs

mod common;
use crate::common::{GraphBuilder, next};

use taskmaster::node::NodeState;
use taskmaster::taskmaster::Taskmaster;
use taskmaster::trace::Trace;

const EXPECTED: &str = "
Taskmaster: Looking for a node to evaluate
Taskmaster:     Considering node <no_state   0   'n1'> and its children:
Taskmaster: Evaluating <pending    0   'n1'>

Task.make_ready_current(): node <pending    0   'n1'>
Task.prepare():      node <executing  0   'n1'>
Task.execute():      node <executing  0   'n1'>
Task.postprocess():  node <executing  0   'n1'>

Taskmaster: Looking for a node to evaluate
Taskmaster:     Considering node <executed   0   'n1'> and its children:
Taskmaster:        already handled (executed)
Taskmaster:     Considering node <no_state   0   'n3'> and its children:
Taskmaster:        <executed   0   'n1'>
Taskmaster:        <no_state   0   'n2'>
Taskmaster:      adjusted ref count: <pending    1   'n3'>, child 'n2'
Taskmaster:     Considering node <no_state   0   'n2'> and its children:
Taskmaster: Evaluating <pending    0   'n2'>

Task.make_ready_current(): node <pending    0   'n2'>
Task.prepare():      node <executing  0   'n2'>
Task.execute():      node <executing  0   'n2'>
Task.postprocess():  node <executing  0   'n2'>
Task.postprocess():  removing <executing  0   'n2'>
Task.postprocess():  adjusted parent ref count <pending    0   'n3'>

Taskmaster: Looking for a node to evaluate
Taskmaster:     Considering node <pending    0   'n3'> and its children:
Taskmaster:        <executed   0   'n1'>
Taskmaster:        <executed   0   'n2'>
Taskmaster: Evaluating <pending    0   'n3'>

Task.make_ready_current(): node <pending    0   'n3'>
Task.prepare():      node <executing  0   'n3'>
Task.execute():      node <executing  0   'n3'>
Task.postprocess():  node <executing  0   'n3'>

Taskmaster: Looking for a node to evaluate
Taskmaster: No candidate anymore.
";

#[test]
fn decision_trace_matches_known_good_run() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    let n2 = g.node("n2");
    let n3 = g.node_with_kids("n3", &[n1, n2]);
    let (graph, _journal) = g.build();

    let (trace, buffer) = Trace::buffer();
    let mut tm = Taskmaster::new(graph, vec![n1, n1, n3]).with_trace(trace);

    // The state is forced between tasks instead of calling `executed`,
    // so the trace shows each task's targets still executing.
    for target in [n1, n2, n3] {
        let mut t = next(&mut tm);
        assert_eq!(t.get_target(), target);
        t.prepare(&mut tm).unwrap();
        t.execute().unwrap();
        t.postprocess(&mut tm);
        if target != n3 {
            tm.graph_mut().set_state(target, NodeState::Executed);
        }
    }
    assert!(tm.next_task().unwrap().is_none());

    let actual = buffer.contents();
    if actual != EXPECTED {
        for (i, (a, e)) in actual.lines().zip(EXPECTED.lines()).enumerate() {
            if a != e {
                panic!("trace differs at line {}:\n  actual:   {a:?}\n  expected: {e:?}", i + 1);
            }
        }
    }
    assert_eq!(actual, EXPECTED);
}

#[test]
fn failure_paths_are_traced() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    let n2 = g.node_with_kids("n2", &[n1]);
    let (graph, _journal) = g.build();

    let (trace, buffer) = Trace::buffer();
    let mut tm = Taskmaster::new(graph, vec![n2]).with_trace(trace);
    let mut t = next(&mut tm);
    t.fail_stop(&mut tm);

    let contents = buffer.contents();
    assert!(contents.contains("Task.failed_stop():  node <executing  0   'n1'>\n"));
    assert!(contents.contains(
        "Taskmaster:        removing node <executing  0   'n1'> from the pending children set\n"
    ));
    assert!(contents.contains(
        "Taskmaster:        removing parent <pending    0   'n2'> from the pending children set\n"
    ));
}
