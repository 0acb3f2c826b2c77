//! Structural checks after every mutation: fan-out bounds, tight bounding
//! boxes, uniform leaf depth, parent links, and back-index agreement.

use shared::*;

use rand::Rng;
use rindex::rtree::RTree;

#[test]
fn test_invariants_hold_during_insert_only_growth() {
    let mut rng = rng();
    let mut tree = RTree::new();
    for (id, bbox) in uniform_boxes(300, &mut rng).into_iter().enumerate() {
        tree.insert(bbox, id as u64).unwrap();
        tree.debug_validate().unwrap();
    }
    assert_eq!(tree.len(), 300);
}

#[test]
fn test_invariants_hold_while_draining_the_tree() {
    let mut rng = rng();
    let mut tree = RTree::new();
    let boxes = uniform_boxes(300, &mut rng);
    for (id, bbox) in boxes.iter().enumerate() {
        tree.insert(*bbox, id as u64).unwrap();
    }

    // Drain in an order unrelated to insertion.
    let mut ids: Vec<u64> = (0..300).collect();
    for i in (1..ids.len()).rev() {
        let j = rng.gen_range(0..=i);
        ids.swap(i, j);
    }
    for id in ids {
        tree.erase(id).unwrap();
        tree.debug_validate().unwrap();
    }
    assert!(tree.is_empty());
    assert!(tree.query_range(&bx(COORD_MIN, COORD_MIN, COORD_MAX, COORD_MAX)).is_empty());
}

#[test]
fn test_invariants_hold_with_tight_fanout() {
    // The smallest recognized fan-out forces frequent splits and condensations.
    let mut rng = rng();
    let mut tree = RTree::with_fanout(4, 2).unwrap();
    for (id, bbox) in uniform_boxes(120, &mut rng).into_iter().enumerate() {
        tree.insert(bbox, id as u64).unwrap();
        tree.debug_validate().unwrap();
    }
    for id in 0..120 {
        tree.erase(id).unwrap();
        tree.debug_validate().unwrap();
    }
}

#[test]
fn test_invariants_hold_under_updates() {
    let mut rng = rng();
    let mut tree = RTree::new();
    for (id, bbox) in uniform_boxes(150, &mut rng).into_iter().enumerate() {
        tree.insert(bbox, id as u64).unwrap();
    }
    for id in 0..150 {
        let bbox = uniform_boxes(1, &mut rng)[0];
        tree.update(id, bbox).unwrap();
        tree.debug_validate().unwrap();
    }
    assert_eq!(tree.len(), 150);
}

#[test]
fn test_tree_shrinks_back_to_a_single_entry() {
    let mut tree = RTree::new();
    for id in 0..100u64 {
        let x = id as f64;
        tree.insert(bx(x, x, x + 0.5, x + 0.5), id).unwrap();
    }

    for id in 1..100u64 {
        tree.erase(id).unwrap();
        tree.debug_validate().unwrap();
    }
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.query_range(&bx(0.0, 0.0, 0.5, 0.5)), vec![0]);
}
