//! Property-based tests for RTree: the query results are compared against a
//! linear scan using the same overlap predicate the tree exposes.

use proptest::prelude::*;
use rindex::geometry::Box2;
use rindex::rtree::RTree;
use std::collections::BTreeSet;

prop_compose! {
    fn arb_box()(
        x1 in -1e6..1e6f64,
        y1 in -1e6..1e6f64,
        x2 in -1e6..1e6f64,
        y2 in -1e6..1e6f64,
    ) -> Box2 {
        Box2::from_corners(x1, y1, x2, y2).unwrap()
    }
}

prop_compose! {
    /// Pairs of (box, id); later occurrences of a duplicated id are dropped.
    fn arb_unique_pairs()(
        raw in prop::collection::vec((arb_box(), 0u64..1_000_000_000), 0..60)
    ) -> Vec<(Box2, u64)> {
        let mut seen = BTreeSet::new();
        raw.into_iter()
            .filter(|(_, id)| seen.insert(*id))
            .collect()
    }
}

prop_compose! {
    /// A pair (inner, outer) of query boxes with inner contained in outer.
    fn arb_nested_queries()(
        x1 in -1e6..1e6f64,
        y1 in -1e6..1e6f64,
        x2 in -1e6..1e6f64,
        y2 in -1e6..1e6f64,
        fx1 in 0.0..=1.0f64,
        fy1 in 0.0..=1.0f64,
        fx2 in 0.0..=1.0f64,
        fy2 in 0.0..=1.0f64,
    ) -> (Box2, Box2) {
        let outer = Box2::from_corners(x1, y1, x2, y2).unwrap();
        let (lo, hi) = (outer.lo(), outer.hi());
        let inner = Box2::from_corners(
            lo.x() + fx1 * (hi.x() - lo.x()),
            lo.y() + fy1 * (hi.y() - lo.y()),
            lo.x() + fx2 * (hi.x() - lo.x()),
            lo.y() + fy2 * (hi.y() - lo.y()),
        )
        .unwrap();
        (inner, outer)
    }
}

fn build_tree(pairs: &[(Box2, u64)]) -> RTree {
    let mut tree = RTree::new();
    for (bbox, id) in pairs {
        tree.insert(*bbox, *id).unwrap();
    }
    tree
}

fn query_set(tree: &RTree, query: &Box2) -> BTreeSet<u64> {
    tree.query_range(query).into_iter().collect()
}

proptest! {
    #[test]
    fn test_query_matches_bruteforce(pairs in arb_unique_pairs(), query in arb_box()) {
        let tree = build_tree(&pairs);
        tree.debug_validate().unwrap();

        let oracle: BTreeSet<u64> = pairs
            .iter()
            .filter(|(bbox, _)| query.overlap(bbox))
            .map(|(_, id)| *id)
            .collect();
        prop_assert_eq!(query_set(&tree, &query), oracle);
    }

    #[test]
    fn test_update_moves_the_id(first in arb_box(), second in arb_box()) {
        let mut tree = RTree::new();
        tree.insert(first, 42).unwrap();
        prop_assert!(query_set(&tree, &first).contains(&42));

        tree.update(42, second).unwrap();
        tree.debug_validate().unwrap();
        prop_assert!(query_set(&tree, &second).contains(&42));
        if !second.overlap(&first) {
            prop_assert!(!query_set(&tree, &first).contains(&42));
        }
    }

    #[test]
    fn test_erase_removes_everywhere(bbox in arb_box(), probe in arb_box()) {
        let mut tree = RTree::new();
        tree.insert(bbox, 99).unwrap();
        prop_assert!(query_set(&tree, &bbox).contains(&99));

        tree.erase(99).unwrap();
        tree.debug_validate().unwrap();
        prop_assert!(tree.is_empty());
        prop_assert!(query_set(&tree, &bbox).is_empty());
        prop_assert!(query_set(&tree, &probe).is_empty());
    }

    #[test]
    fn test_insertion_order_does_not_change_query_results(
        pairs in arb_unique_pairs(),
        query in arb_box(),
    ) {
        let forward = build_tree(&pairs);
        let reversed: Vec<_> = pairs.iter().rev().cloned().collect();
        let backward = build_tree(&reversed);

        prop_assert_eq!(query_set(&forward, &query), query_set(&backward, &query));
    }

    #[test]
    fn test_nested_queries_are_monotonic(
        pairs in arb_unique_pairs(),
        queries in arb_nested_queries(),
    ) {
        let (inner, outer) = queries;
        let tree = build_tree(&pairs);

        let small = query_set(&tree, &inner);
        let large = query_set(&tree, &outer);
        prop_assert!(small.is_subset(&large));
    }

    #[test]
    fn test_erasing_half_keeps_the_other_half(pairs in arb_unique_pairs()) {
        let mut tree = build_tree(&pairs);
        let mut survivors = BTreeSet::new();
        for (i, (_, id)) in pairs.iter().enumerate() {
            if i % 2 == 0 {
                tree.erase(*id).unwrap();
            } else {
                survivors.insert(*id);
            }
        }
        tree.debug_validate().unwrap();

        let everything = Box2::from_corners(-2e6, -2e6, 2e6, 2e6).unwrap();
        prop_assert_eq!(query_set(&tree, &everything), survivors);
    }
}
