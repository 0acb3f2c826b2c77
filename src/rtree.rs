//! ## R-tree Index
//!
//! This module implements a dynamic R-tree over 2D boxes tagged by `u64`
//! identifiers. The tree keeps a bounded fan-out per node, stays height
//! balanced, and maintains an id-to-leaf back-index so that `erase` and
//! `update` find their entry without a search. Insertion descends by least
//! MBR enlargement and resolves overflow with Guttman's quadratic split;
//! deletion condenses the path to the root and reinserts the entries of
//! underfull nodes.
//!
//! # Examples
//!
//! ```
//! use rindex::geometry::Box2;
//! use rindex::rtree::RTree;
//!
//! let mut tree = RTree::new();
//! tree.insert(Box2::from_corners(0.0, 0.0, 1.0, 1.0).unwrap(), 7).unwrap();
//! let hits = tree.query_range(&Box2::from_corners(0.0, 0.0, 2.0, 2.0).unwrap());
//! assert_eq!(hits, vec![7]);
//!
//! tree.update(7, Box2::from_corners(10.0, 10.0, 11.0, 11.0).unwrap()).unwrap();
//! assert!(tree
//!     .query_range(&Box2::from_corners(0.0, 0.0, 2.0, 2.0).unwrap())
//!     .is_empty());
//!
//! tree.erase(7).unwrap();
//! assert!(tree.is_empty());
//! ```

use crate::exceptions::RindexError;
use crate::geometry::Box2;
use crate::node::{ItemEntry, Node, NodeArena, NodeId, NodeKind};
use hashbrown::HashMap;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Default maximum fan-out per node.
pub const DEFAULT_MAX_ENTRIES: usize = 8;
/// Default minimum fan-out per node, half the maximum.
pub const DEFAULT_MIN_ENTRIES: usize = 4;

// Recognized range for the construction-time fan-out bounds.
const FANOUT_LIMIT_LO: usize = 4;
const FANOUT_LIMIT_HI: usize = 64;

/// A dynamic R-tree mapping `u64` identifiers to 2D boxes.
///
/// Between public calls the tree upholds: every non-root node holds between
/// `min_entries` and `max_entries` entries, every node's bounding box is the
/// exact union of its entries, all leaves sit at the same depth, and the
/// back-index knows exactly the live identifiers.
#[derive(Debug)]
pub struct RTree {
    arena: NodeArena,
    root: NodeId,
    max_entries: usize,
    min_entries: usize,
    leaf_of: HashMap<u64, NodeId>,
}

impl Default for RTree {
    fn default() -> Self {
        RTree::new()
    }
}

impl RTree {
    /// Creates a new, empty R-tree with the default fan-out bounds `(8, 4)`.
    pub fn new() -> Self {
        Self::build(DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES)
    }

    /// Creates a new, empty R-tree with explicit fan-out bounds.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - The maximum number of entries per node, in `[4, 64]`.
    /// * `min_entries` - The minimum number of entries per non-root node, in
    ///   `[2, max_entries / 2]`.
    ///
    /// # Errors
    ///
    /// Returns `RindexError::InvalidFanout` if the bounds fall outside the
    /// recognized ranges.
    pub fn with_fanout(max_entries: usize, min_entries: usize) -> Result<Self, RindexError> {
        if !(FANOUT_LIMIT_LO..=FANOUT_LIMIT_HI).contains(&max_entries)
            || min_entries < 2
            || min_entries * 2 > max_entries
        {
            return Err(RindexError::InvalidFanout {
                max_entries,
                min_entries,
            });
        }
        Ok(Self::build(max_entries, min_entries))
    }

    fn build(max_entries: usize, min_entries: usize) -> Self {
        info!(
            "Creating new RTree with max_entries: {}, min_entries: {}",
            max_entries, min_entries
        );
        let mut arena = NodeArena::default();
        let root = arena.alloc(Node::leaf(None, Box2::ZERO, Vec::new()));
        RTree {
            arena,
            root,
            max_entries,
            min_entries,
            leaf_of: HashMap::new(),
        }
    }

    /// Returns the maximum fan-out the tree was configured with.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Returns the minimum fan-out the tree was configured with.
    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    /// Returns the number of boxes currently stored.
    pub fn len(&self) -> usize {
        self.leaf_of.len()
    }

    /// Returns true if no boxes are stored.
    pub fn is_empty(&self) -> bool {
        self.leaf_of.is_empty()
    }

    /// Returns true if `id` is currently stored.
    pub fn contains(&self, id: u64) -> bool {
        self.leaf_of.contains_key(&id)
    }

    /// Inserts a box under an identifier that is not yet stored.
    ///
    /// # Arguments
    ///
    /// * `bbox` - The box to index.
    /// * `id` - The identifier to store it under.
    ///
    /// # Errors
    ///
    /// Returns `RindexError::DuplicateId` if `id` is already stored; the
    /// tree is left unchanged.
    pub fn insert(&mut self, bbox: Box2, id: u64) -> Result<(), RindexError> {
        if self.leaf_of.contains_key(&id) {
            return Err(RindexError::DuplicateId { id });
        }
        info!("Inserting box {:?} with id {}", bbox, id);
        self.insert_item(ItemEntry { bbox, id });
        Ok(())
    }

    /// Removes the box stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `RindexError::NotFound` if `id` is not stored; the tree is
    /// left unchanged.
    pub fn erase(&mut self, id: u64) -> Result<(), RindexError> {
        let leaf = self
            .leaf_of
            .remove(&id)
            .ok_or(RindexError::NotFound { id })?;
        info!("Erasing id {}", id);
        self.remove_item(leaf, id);
        self.condense_tree(leaf);
        self.shrink_root();
        Ok(())
    }

    /// Moves the box stored under `id` to a new box.
    ///
    /// When the new box still fits inside the holding leaf's bounding box the
    /// entry is rewritten in place and the ancestor boxes are retightened;
    /// otherwise the entry is erased and reinserted.
    ///
    /// # Errors
    ///
    /// Returns `RindexError::NotFound` if `id` is not stored; the tree is
    /// left unchanged.
    pub fn update(&mut self, id: u64, bbox: Box2) -> Result<(), RindexError> {
        let leaf = *self.leaf_of.get(&id).ok_or(RindexError::NotFound { id })?;
        info!("Updating id {} to box {:?}", id, bbox);
        if self.arena[leaf].bbox.contains(&bbox) {
            // The new box cannot widen any ancestor, but the old box may have
            // been carrying an MBR edge, so retighten upward.
            match &mut self.arena[leaf].kind {
                NodeKind::Leaf(items) => {
                    let item = items
                        .iter_mut()
                        .find(|item| item.id == id)
                        .expect("back-index row points at a leaf without the entry");
                    item.bbox = bbox;
                }
                NodeKind::Internal(_) => unreachable!("back-index row points at an internal node"),
            }
            self.tighten_upward(leaf);
        } else {
            self.erase(id)?;
            self.insert(bbox, id)?;
        }
        Ok(())
    }

    /// Returns the identifiers of all boxes overlapping `query`, in no
    /// particular order. Overlap is the closed-interval predicate of
    /// [`Box2::overlap`](crate::geometry::Box2::overlap).
    pub fn query_range(&self, query: &Box2) -> Vec<u64> {
        info!("Performing range query with box: {:?}", query);
        let mut result = Vec::new();
        self.search_node(self.root, query, &mut result);
        result
    }

    fn search_node(&self, node: NodeId, query: &Box2, result: &mut Vec<u64>) {
        match &self.arena[node].kind {
            NodeKind::Leaf(items) => {
                for item in items {
                    if item.bbox.overlap(query) {
                        result.push(item.id);
                    }
                }
            }
            NodeKind::Internal(children) => {
                for &child in children {
                    if self.arena[child].bbox.overlap(query) {
                        self.search_node(child, query, result);
                    }
                }
            }
        }
    }

    fn insert_item(&mut self, item: ItemEntry) {
        let leaf = self.choose_leaf(&item.bbox);
        self.leaf_of.insert(item.id, leaf);
        match &mut self.arena[leaf].kind {
            NodeKind::Leaf(items) => items.push(item),
            NodeKind::Internal(_) => unreachable!("choose_leaf returned an internal node"),
        }
        self.adjust_tree(leaf);
    }

    /// Descends from the root picking, at each level, the child whose box
    /// needs the least enlargement; ties fall to the smaller box, then to the
    /// earlier child slot.
    fn choose_leaf(&self, bbox: &Box2) -> NodeId {
        let mut current = self.root;
        loop {
            match &self.arena[current].kind {
                NodeKind::Leaf(_) => return current,
                NodeKind::Internal(children) => {
                    let mut best: Option<(OrderedFloat<f64>, OrderedFloat<f64>, NodeId)> = None;
                    for &child in children {
                        let child_bbox = &self.arena[child].bbox;
                        let key = (
                            OrderedFloat(child_bbox.enlargement(bbox)),
                            OrderedFloat(child_bbox.area()),
                        );
                        let better = match &best {
                            None => true,
                            Some((enl, area, _)) => key < (*enl, *area),
                        };
                        if better {
                            best = Some((key.0, key.1, child));
                        }
                    }
                    let (_, _, chosen) = best.expect("internal node with no children");
                    current = chosen;
                }
            }
        }
    }

    /// Walks from `start` to the root, recomputing bounding boxes and
    /// splitting any node that overflowed. A root split grows the tree by
    /// one level.
    fn adjust_tree(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(node) = current {
            self.recompute_bbox(node);
            if self.arena[node].entry_count() > self.max_entries {
                self.split_node(node);
            }
            current = self.arena[node].parent;
        }
    }

    /// Splits an overflowing node into itself and a new sibling via the
    /// quadratic partition, then attaches the sibling to the parent (or
    /// grows a new root).
    fn split_node(&mut self, node: NodeId) {
        let parent = self.arena[node].parent;
        debug!(
            "Splitting node with {} entries",
            self.arena[node].entry_count()
        );
        let kind = std::mem::replace(&mut self.arena[node].kind, NodeKind::Leaf(Vec::new()));
        let sibling = match kind {
            NodeKind::Leaf(items) => {
                let boxes: Vec<Box2> = items.iter().map(|item| item.bbox).collect();
                let (group1, group2) = quadratic_partition(&boxes, self.min_entries);
                let bbox1 = union_of(&boxes, &group1);
                let bbox2 = union_of(&boxes, &group2);
                let (kept, moved) = take_by_index(items, &group1, &group2);
                let moved_ids: Vec<u64> = moved.iter().map(|item| item.id).collect();
                self.arena[node].kind = NodeKind::Leaf(kept);
                self.arena[node].bbox = bbox1;
                let sibling = self.arena.alloc(Node::leaf(parent, bbox2, moved));
                for id in moved_ids {
                    self.leaf_of.insert(id, sibling);
                }
                sibling
            }
            NodeKind::Internal(children) => {
                let boxes: Vec<Box2> = children.iter().map(|&c| self.arena[c].bbox).collect();
                let (group1, group2) = quadratic_partition(&boxes, self.min_entries);
                let bbox1 = union_of(&boxes, &group1);
                let bbox2 = union_of(&boxes, &group2);
                let (kept, moved) = take_by_index(children, &group1, &group2);
                self.arena[node].kind = NodeKind::Internal(kept);
                self.arena[node].bbox = bbox1;
                let sibling = self.arena.alloc(Node::internal(parent, bbox2, moved.clone()));
                for child in moved {
                    self.arena[child].parent = Some(sibling);
                }
                sibling
            }
        };
        match parent {
            Some(parent) => match &mut self.arena[parent].kind {
                NodeKind::Internal(children) => children.push(sibling),
                NodeKind::Leaf(_) => unreachable!("leaf recorded as a parent"),
            },
            None => {
                debug!("Root split; growing a new root");
                let bbox = self.arena[node].bbox.union(&self.arena[sibling].bbox);
                let new_root = self.arena.alloc(Node::internal(None, bbox, vec![node, sibling]));
                self.arena[node].parent = Some(new_root);
                self.arena[sibling].parent = Some(new_root);
                self.root = new_root;
            }
        }
    }

    fn remove_item(&mut self, leaf: NodeId, id: u64) {
        match &mut self.arena[leaf].kind {
            NodeKind::Leaf(items) => {
                let pos = items
                    .iter()
                    .position(|item| item.id == id)
                    .expect("back-index row points at a leaf without the entry");
                items.remove(pos);
            }
            NodeKind::Internal(_) => unreachable!("back-index row points at an internal node"),
        }
    }

    /// Walks from `start` to the root. Non-root nodes that fell below the
    /// minimum fan-out are detached and queued; every other node on the path
    /// gets its bounding box retightened. The queued subtrees are then
    /// flattened to their leaf entries, freed, and the entries reinserted.
    fn condense_tree(&mut self, start: NodeId) {
        let mut orphans: Vec<NodeId> = Vec::new();
        let mut current = start;
        while let Some(parent) = self.arena[current].parent {
            if self.arena[current].entry_count() < self.min_entries {
                self.detach_child(parent, current);
                orphans.push(current);
            } else {
                self.recompute_bbox(current);
            }
            current = parent;
        }
        self.recompute_bbox(current);

        if orphans.is_empty() {
            return;
        }
        let mut items = Vec::new();
        for orphan in orphans {
            self.collect_items(orphan, &mut items);
        }
        debug!("Reinserting {} entries from underfull nodes", items.len());
        for item in items {
            self.insert_item(item);
        }
    }

    fn detach_child(&mut self, parent: NodeId, child: NodeId) {
        match &mut self.arena[parent].kind {
            NodeKind::Internal(children) => {
                let pos = children
                    .iter()
                    .position(|&c| c == child)
                    .expect("child not present under its recorded parent");
                children.remove(pos);
            }
            NodeKind::Leaf(_) => unreachable!("leaf recorded as a parent"),
        }
        self.arena[child].parent = None;
    }

    /// Gathers all leaf-level entries under `node` and frees every node of
    /// the subtree.
    fn collect_items(&mut self, node: NodeId, out: &mut Vec<ItemEntry>) {
        let kind = std::mem::replace(&mut self.arena[node].kind, NodeKind::Leaf(Vec::new()));
        match kind {
            NodeKind::Leaf(items) => out.extend(items),
            NodeKind::Internal(children) => {
                for child in children {
                    self.collect_items(child, out);
                }
            }
        }
        self.arena.free(node);
    }

    /// Replaces a single-child internal root by its child until the root is
    /// a leaf or holds at least two children.
    fn shrink_root(&mut self) {
        loop {
            let child = match &self.arena[self.root].kind {
                NodeKind::Internal(children) if children.len() == 1 => children[0],
                _ => return,
            };
            debug!("Demoting single-child root");
            self.arena.free(self.root);
            self.arena[child].parent = None;
            self.root = child;
        }
    }

    /// Recomputes bounding boxes from `start` toward the root, stopping at
    /// the first node whose box did not change.
    fn tighten_upward(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(node) = current {
            let old = self.arena[node].bbox;
            self.recompute_bbox(node);
            if self.arena[node].bbox == old {
                break;
            }
            current = self.arena[node].parent;
        }
    }

    fn recompute_bbox(&mut self, node: NodeId) {
        if let Some(bbox) = self.entries_bbox(node) {
            self.arena[node].bbox = bbox;
        }
    }

    /// Union of the node's entry boxes, or `None` for an empty (root) leaf.
    fn entries_bbox(&self, node: NodeId) -> Option<Box2> {
        match &self.arena[node].kind {
            NodeKind::Leaf(items) => {
                let mut iter = items.iter();
                let first = iter.next()?.bbox;
                Some(iter.fold(first, |acc, item| acc.union(&item.bbox)))
            }
            NodeKind::Internal(children) => {
                let mut iter = children.iter();
                let first = self.arena[*iter.next()?].bbox;
                Some(iter.fold(first, |acc, &child| acc.union(&self.arena[child].bbox)))
            }
        }
    }

    /// Checks every structural invariant and returns a description of the
    /// first violation found. Test support; not part of the public contract.
    #[doc(hidden)]
    pub fn debug_validate(&self) -> Result<(), String> {
        let mut leaf_depth: Option<usize> = None;
        let mut seen_items = 0usize;
        self.validate_node(self.root, None, 0, &mut leaf_depth, &mut seen_items)?;
        if seen_items != self.leaf_of.len() {
            return Err(format!(
                "back-index holds {} ids but the leaves hold {} entries",
                self.leaf_of.len(),
                seen_items
            ));
        }
        Ok(())
    }

    fn validate_node(
        &self,
        node: NodeId,
        expected_parent: Option<NodeId>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        seen_items: &mut usize,
    ) -> Result<(), String> {
        let n = &self.arena[node];
        if n.parent != expected_parent {
            return Err(format!("node at depth {depth} has a stale parent link"));
        }
        let is_root = node == self.root;
        let count = n.entry_count();
        if count > self.max_entries {
            return Err(format!("node at depth {depth} overflows: {count} entries"));
        }
        if !is_root && count < self.min_entries {
            return Err(format!("node at depth {depth} underflows: {count} entries"));
        }
        match &n.kind {
            NodeKind::Leaf(items) => {
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(format!("leaf at depth {depth}, expected depth {expected}"));
                    }
                    _ => {}
                }
                for item in items {
                    if self.leaf_of.get(&item.id) != Some(&node) {
                        return Err(format!("back-index does not map id {} to its leaf", item.id));
                    }
                    *seen_items += 1;
                }
                if !items.is_empty() {
                    let bbox = items
                        .iter()
                        .skip(1)
                        .fold(items[0].bbox, |acc, item| acc.union(&item.bbox));
                    if bbox != n.bbox {
                        return Err(format!("leaf at depth {depth} has a loose bounding box"));
                    }
                } else if !is_root {
                    return Err(format!("empty non-root leaf at depth {depth}"));
                }
            }
            NodeKind::Internal(children) => {
                if children.is_empty() {
                    return Err(format!("internal node at depth {depth} has no children"));
                }
                let bbox = children
                    .iter()
                    .skip(1)
                    .fold(self.arena[children[0]].bbox, |acc, &child| {
                        acc.union(&self.arena[child].bbox)
                    });
                if bbox != n.bbox {
                    return Err(format!(
                        "internal node at depth {depth} has a loose bounding box"
                    ));
                }
                for &child in children {
                    self.validate_node(child, Some(node), depth + 1, leaf_depth, seen_items)?;
                }
            }
        }
        Ok(())
    }
}

/// Guttman's quadratic split over the boxes of an overflowing node. Returns
/// two index groups, each of size at least `min_entries`. Deterministic for
/// a fixed input order.
fn quadratic_partition(boxes: &[Box2], min_entries: usize) -> (Vec<usize>, Vec<usize>) {
    debug_assert!(boxes.len() >= 2 * min_entries);
    let (seed1, seed2) = pick_seeds(boxes);
    let mut group1 = vec![seed1];
    let mut group2 = vec![seed2];
    let mut bbox1 = boxes[seed1];
    let mut bbox2 = boxes[seed2];
    let mut remaining: Vec<usize> = (0..boxes.len())
        .filter(|&i| i != seed1 && i != seed2)
        .collect();

    while !remaining.is_empty() {
        // Once a group needs every remaining entry to reach the minimum
        // fill, it takes them all.
        if group1.len() + remaining.len() == min_entries {
            group1.append(&mut remaining);
            break;
        }
        if group2.len() + remaining.len() == min_entries {
            group2.append(&mut remaining);
            break;
        }

        // PickNext: the entry with the strongest preference for one group.
        let mut best_pos = 0;
        let mut best_diff = OrderedFloat(f64::NEG_INFINITY);
        for (pos, &i) in remaining.iter().enumerate() {
            let d1 = bbox1.enlargement(&boxes[i]);
            let d2 = bbox2.enlargement(&boxes[i]);
            let diff = OrderedFloat((d1 - d2).abs());
            if diff > best_diff {
                best_diff = diff;
                best_pos = pos;
            }
        }
        let chosen = remaining.remove(best_pos);

        // Less enlargement wins; ties fall to the smaller group box, then to
        // the first group.
        let d1 = OrderedFloat(bbox1.enlargement(&boxes[chosen]));
        let d2 = OrderedFloat(bbox2.enlargement(&boxes[chosen]));
        let to_first = match d1.cmp(&d2) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => OrderedFloat(bbox1.area()) <= OrderedFloat(bbox2.area()),
        };
        if to_first {
            bbox1 = bbox1.union(&boxes[chosen]);
            group1.push(chosen);
        } else {
            bbox2 = bbox2.union(&boxes[chosen]);
            group2.push(chosen);
        }
    }
    (group1, group2)
}

/// PickSeeds: the pair of boxes wasting the most area when joined.
fn pick_seeds(boxes: &[Box2]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut best_waste = OrderedFloat(f64::NEG_INFINITY);
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let waste =
                boxes[i].union(&boxes[j]).area() - boxes[i].area() - boxes[j].area();
            if OrderedFloat(waste) > best_waste {
                best_waste = OrderedFloat(waste);
                best = (i, j);
            }
        }
    }
    best
}

fn union_of(boxes: &[Box2], group: &[usize]) -> Box2 {
    let mut iter = group.iter();
    let first = boxes[*iter.next().expect("split group is never empty")];
    iter.fold(first, |acc, &i| acc.union(&boxes[i]))
}

/// Moves the elements of `items` into two vectors following the index
/// groups of the split. Every index appears in exactly one group.
fn take_by_index<T>(items: Vec<T>, group1: &[usize], group2: &[usize]) -> (Vec<T>, Vec<T>) {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let first = group1
        .iter()
        .map(|&i| slots[i].take().expect("split index used twice"))
        .collect();
    let second = group2
        .iter()
        .map(|&i| slots[i].take().expect("split index used twice"))
        .collect();
    (first, second)
}
