// tests/property_order.rs

mod common;
use crate::common::{BuildFileBuilder, GraphBuilder, TargetConfigBuilder};

use std::collections::HashSet;

use proptest::prelude::*;
use taskmaster::config::{ConfigFile, planned_order};
use taskmaster::exec::{JobOptions, run_serial};
use taskmaster::node::NodeId;
use taskmaster::taskmaster::Taskmaster;
use taskmaster::types::OrderPolicy;

// Node i may only depend on nodes 0..i, so every generated graph is acyclic.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let deps: HashSet<usize> = if i == 0 {
                            HashSet::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        };
                        let mut deps: Vec<usize> = deps.into_iter().collect();
                        deps.sort();
                        deps
                    })
                    .collect()
            },
        )
    })
}

fn order_strategy() -> impl Strategy<Value = OrderPolicy> {
    prop_oneof![Just(OrderPolicy::Declared), Just(OrderPolicy::Reverse)]
}

fn config_for(deps: &[Vec<usize>]) -> ConfigFile {
    let mut builder = BuildFileBuilder::new();
    for (i, kids) in deps.iter().enumerate() {
        let mut target = TargetConfigBuilder::new(&format!("echo n{i}"));
        for kid in kids {
            target = target.dep(&format!("n{kid}"));
        }
        builder = builder.with_target(&format!("n{i}"), target.build());
    }
    builder.build()
}

proptest! {
    #[test]
    fn every_child_is_built_before_its_parents(
        deps in dag_strategy(12),
        tops in proptest::collection::vec(any::<usize>(), 1..4),
        order in order_strategy(),
    ) {
        let mut g = GraphBuilder::new();
        let mut ids: Vec<NodeId> = Vec::new();
        for (i, kids) in deps.iter().enumerate() {
            let kid_ids: Vec<NodeId> = kids.iter().map(|k| ids[*k]).collect();
            ids.push(g.node_with_kids(&format!("n{i}"), &kid_ids));
        }
        let (graph, journal) = g.build();
        let targets: Vec<NodeId> = tops.iter().map(|t| ids[t % ids.len()]).collect();

        let mut tm = Taskmaster::new(graph, targets)
            .with_order(move |nodes| order.apply(nodes));
        let report = run_serial(&mut tm, &JobOptions::default()).unwrap();
        prop_assert!(report.is_success());

        let built = journal.built();
        let unique: HashSet<&String> = built.iter().collect();
        prop_assert_eq!(unique.len(), built.len(), "a node was built twice: {:?}", built);

        // Everything reachable from a top target is built.
        let mut reachable = HashSet::new();
        let mut stack: Vec<usize> = tops.iter().map(|t| t % ids.len()).collect();
        while let Some(i) = stack.pop() {
            if reachable.insert(i) {
                stack.extend(deps[i].iter().copied());
            }
        }
        prop_assert_eq!(built.len(), reachable.len());

        let pos = |i: usize| built.iter().position(|b| *b == format!("n{i}"));
        for &i in &reachable {
            let parent = pos(i).unwrap();
            for &kid in &deps[i] {
                prop_assert!(pos(kid).unwrap() < parent, "n{} built after its parent n{}", kid, i);
            }
        }
        prop_assert!(tm.cleanup().is_ok());
    }

    #[test]
    fn planned_order_respects_dependencies(deps in dag_strategy(12)) {
        let cfg = config_for(&deps);
        let order = planned_order(&cfg).unwrap();
        prop_assert_eq!(order.len(), deps.len());

        let pos = |i: usize| order.iter().position(|n| *n == format!("n{i}")).unwrap();
        for (i, kids) in deps.iter().enumerate() {
            for &kid in kids {
                prop_assert!(pos(kid) < pos(i));
            }
        }
    }
}
