// tests/make_ready.rs

mod common;
use crate::common::{Failure, GraphBuilder, next};

use taskmaster::errors::TaskmasterError;
use taskmaster::node::NodeState;
use taskmaster::task::{ReadyMode, TaskPolicy};
use taskmaster::taskmaster::Taskmaster;

#[test]
fn out_of_date_lists_only_stale_targets() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    let c2 = g.node("c2");
    let n3 = g.node("n3");
    let c4 = g.node("c4");
    let a5 = g.node("a5");
    g.get(c2).set_current(true);
    g.get(c4).set_current(true);
    g.get(a5).set_current(true);
    g.get(a5).set_always_build(true);
    let (graph, _journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![n1, c2, n3, c4, a5]);

    let expected = [
        (n1, vec![n1]),
        (c2, vec![]),
        (n3, vec![n3]),
        (c4, vec![]),
        (a5, vec![a5]),
    ];
    for (target, ood) in expected {
        let t = next(&mut tm);
        assert_eq!(t.get_target(), target);
        assert_eq!(t.out_of_date(), ood.as_slice());
        assert_eq!(t.needs_execute(), !ood.is_empty());
    }
}

#[test]
fn current_targets_are_visited_and_up_to_date() {
    let mut g = GraphBuilder::new();
    let c1 = g.node("c1");
    g.get(c1).set_current(true);
    let (graph, journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![c1]);
    let _t = next(&mut tm);
    assert_eq!(tm.graph().state(c1), NodeState::UpToDate);
    assert_eq!(journal.events(), vec!["c1 scanned", "c1 visited", "c1 released"]);
}

#[test]
fn readiness_failure_is_deferred_to_the_task() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    g.get(n1).fail_ready(Failure::User("from make_ready()".into()));
    let (graph, _journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![n1]);
    let mut t = next(&mut tm);

    let captured = t.exception().and_then(|e| e.error());
    assert!(
        matches!(captured, Some(TaskmasterError::User(msg)) if msg == "from make_ready()"),
        "unexpected exception: {captured:?}"
    );

    let err = t.prepare(&mut tm).unwrap_err();
    assert_eq!(err.to_string(), "from make_ready()");
    assert!(t.exception().is_none());
}

#[test]
fn io_failure_during_readiness_names_the_target() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    g.get(n1).fail_ready(Failure::Io("permission denied".into()));
    let (graph, _journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![n1]);
    let t = next(&mut tm);

    match t.exception().and_then(|e| e.error()) {
        Some(TaskmasterError::Build(build)) => {
            assert_eq!(build.node, Some(n1));
            assert_eq!(build.name, "n1");
            assert_eq!(build.errstr, "permission denied");
        }
        other => panic!("expected a build error, got {other:?}"),
    }
}

#[test]
fn default_mode_consults_up_to_date_check() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    let c2 = g.node("c2");
    let n3 = g.node("n3");
    let c4 = g.node("c4");
    g.get(c2).set_current(true);
    g.get(c4).set_current(true);
    let (graph, _journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![n1, c2, n3, c4]);
    let expected = [
        (n1, NodeState::Executing),
        (c2, NodeState::UpToDate),
        (n3, NodeState::Executing),
        (c4, NodeState::UpToDate),
    ];
    for (target, state) in expected {
        let t = next(&mut tm);
        assert_eq!(t.get_target(), target);
        assert_eq!(tm.graph().state(target), state);
    }
    assert!(tm.next_task().unwrap().is_none());
}

#[test]
fn all_mode_treats_every_target_as_out_of_date() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    let c2 = g.node("c2");
    let n3 = g.node("n3");
    let c4 = g.node("c4");
    g.get(c2).set_current(true);
    g.get(c4).set_current(true);
    let (graph, _journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![n1, c2, n3, c4]).with_ready_mode(ReadyMode::All);
    for target in [n1, c2, n3, c4] {
        let t = next(&mut tm);
        assert_eq!(t.get_target(), target);
        assert_eq!(t.out_of_date(), &[target]);
        assert_eq!(tm.graph().state(target), NodeState::Executing);
    }
    assert!(tm.next_task().unwrap().is_none());
}

#[test]
fn make_ready_marks_side_effects_executing() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    let log = g.node("log");
    g.get(n1).set_side_effects(&[log]);
    let (graph, _journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![n1]);
    let _t = next(&mut tm);
    assert_eq!(tm.graph().state(log), NodeState::Executing);
}

#[test]
fn custom_policy_sees_targets_and_out_of_date() {
    let mut g = GraphBuilder::new();
    let n1 = g.node("n1");
    let n2 = g.node("n2");
    g.get(n1).set_targets(&[n1, n2]);
    g.get(n2).set_current(true);
    let (graph, _journal) = g.build();

    let policy = TaskPolicy::custom(|targets, out_of_date| {
        targets.len() == 2 && out_of_date.len() == 1
    });
    let mut tm = Taskmaster::new(graph, vec![n1]).with_policy(policy);
    let t = next(&mut tm);
    assert_eq!(t.out_of_date(), &[n1]);
    assert!(t.needs_execute());
}

#[test]
fn always_policy_executes_current_targets() {
    let mut g = GraphBuilder::new();
    let c1 = g.node("c1");
    g.get(c1).set_current(true);
    let (graph, _journal) = g.build();

    let mut tm = Taskmaster::new(graph, vec![c1]).with_policy(TaskPolicy::Always);
    let t = next(&mut tm);
    assert!(t.out_of_date().is_empty());
    assert!(t.needs_execute());
}
