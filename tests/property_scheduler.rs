use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use tagflow::dag::{NodeId, OperatorStatus, Pipeline};
use tagflow::filter::Filter;
use tagflow::grouping::group_by;
use tagflow::item::TaggedItem;
use tagflow_test_utils::work_units::{echo, failing};

/// Random DAG shape: node `i` may only depend on nodes `0..i`.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..n), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            deps.into_iter().map(|d| d % i).collect()
                        }
                    })
                    .collect()
            },
        )
    })
}

fn build(deps: &[BTreeSet<usize>], failing_nodes: &HashSet<usize>) -> (Pipeline, Vec<NodeId>) {
    let mut p = Pipeline::new("random");
    let ids: Vec<NodeId> = (0..deps.len())
        .map(|i| {
            let name = format!("n{i}");
            if failing_nodes.contains(&i) {
                p.add_executor(name.clone(), failing(&name, "random failure"))
            } else {
                p.add_executor(name.clone(), echo(&name))
            }
        })
        .collect();
    for (i, upstream) in deps.iter().enumerate() {
        for &d in upstream {
            p.add_link(ids[d], ids[i]).unwrap();
        }
    }
    (p, ids)
}

proptest! {
    #[test]
    fn scheduler_always_terminates_with_consistent_statuses(
        deps in dag_strategy(10),
        failing_idx in proptest::collection::hash_set(0..10usize, 0..4),
    ) {
        let (mut p, ids) = build(&deps, &failing_idx);
        prop_assert!(p.validate().is_ok());

        let report = p.execute(vec![TaggedItem::new("seed").with_tag("k", "v")]);
        prop_assert!(report.done);

        let status = |i: usize| p.node(ids[i]).map(|n| n.status()).unwrap();
        for i in 0..deps.len() {
            let s = status(i);
            prop_assert!(s.is_terminal());
            match s {
                OperatorStatus::Completed => {
                    prop_assert!(!failing_idx.contains(&i));
                    for &d in &deps[i] {
                        prop_assert_eq!(status(d), OperatorStatus::Completed);
                    }
                }
                OperatorStatus::Failed => {
                    prop_assert!(failing_idx.contains(&i));
                    for &d in &deps[i] {
                        prop_assert_eq!(status(d), OperatorStatus::Completed);
                    }
                }
                OperatorStatus::Unexecutable => {
                    prop_assert!(deps[i].iter().any(|&d| status(d) != OperatorStatus::Completed));
                }
                _ => unreachable!(),
            }
        }

        let any_failed = (0..deps.len()).any(|i| status(i) == OperatorStatus::Failed);
        let expected = if any_failed { OperatorStatus::Failed } else { OperatorStatus::Completed };
        prop_assert_eq!(report.status, expected);
    }

    #[test]
    fn grouping_partitions_tagged_items(
        values in proptest::collection::vec(proptest::option::of("[a-c]"), 0..12),
    ) {
        let items: Vec<TaggedItem> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let item = TaggedItem::new(format!("item{i}"));
                match v {
                    Some(v) => item.with_tag("Series", v.clone()),
                    None => item,
                }
            })
            .collect();

        let groups = group_by(&items, &Filter::tag("Series")).unwrap();

        let distinct: BTreeSet<&String> = values.iter().flatten().collect();
        prop_assert_eq!(groups.len(), distinct.len());

        let total: usize = groups.values().map(Vec::len).sum();
        prop_assert_eq!(total, values.iter().filter(|v| v.is_some()).count());

        for (key, bucket) in &groups {
            prop_assert!(bucket.iter().all(|item| key.matches(item)));
        }
    }
}
