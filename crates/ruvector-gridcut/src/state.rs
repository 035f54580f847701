//! Per-node search-tree state.
//!
//! Each node carries its tree membership, a parent descriptor, the distance
//! to its terminal and the pass at which that distance was last validated.
//! The store also owns the two worklists the engine drives: the FIFO of
//! active nodes and the queue of orphans awaiting adoption.

use std::collections::VecDeque;

use crate::grid::Direction;
use crate::types::Segment;

/// Search tree a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeFlag {
    /// In neither tree.
    #[default]
    Free,
    /// Grown from the source.
    Source,
    /// Grown from the sink.
    Sink,
}

impl TreeFlag {
    /// Segment implied by tree membership, `None` for free nodes.
    #[inline]
    pub fn segment(self) -> Option<Segment> {
        match self {
            TreeFlag::Free => None,
            TreeFlag::Source => Some(Segment::Source),
            TreeFlag::Sink => Some(Segment::Sink),
        }
    }
}

/// Link from a tree node towards its terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parent {
    /// Free node, or an orphan whose parent arc was saturated.
    #[default]
    None,
    /// Directly linked to the tree's terminal.
    Terminal,
    /// The neighbour in this direction is the parent.
    Neighbor(Direction),
}

/// Search state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeState {
    /// Tree membership.
    pub tree: TreeFlag,
    /// Parent descriptor; meaningful only when `tree != Free`.
    pub parent: Parent,
    /// Number of neighbour arcs to the terminal-linked root.
    pub dist: u32,
    /// Pass at which `dist` was last validated.
    pub timestamp: u32,
    /// Queued in the active list.
    pub active: bool,
    /// Queued in the orphan list.
    pub orphan: bool,
}

impl NodeState {
    /// `true` for a tree node that lost its parent.
    #[inline]
    pub fn is_orphan(&self) -> bool {
        self.tree != TreeFlag::Free && self.parent == Parent::None
    }
}

/// Node states plus the active and orphan worklists.
#[derive(Debug, Clone, Default)]
pub struct NodeStateStore {
    nodes: Vec<NodeState>,
    active: VecDeque<usize>,
    orphans: VecDeque<usize>,
}

impl NodeStateStore {
    /// Store for `len` free nodes.
    pub fn new(len: usize) -> Self {
        Self {
            nodes: vec![NodeState::default(); len],
            active: VecDeque::new(),
            orphans: VecDeque::new(),
        }
    }

    /// Reset every node to `Free` and empty both worklists.
    pub fn reset(&mut self, len: usize, parallel: bool) {
        self.active.clear();
        self.orphans.clear();
        if self.nodes.len() != len {
            self.nodes = vec![NodeState::default(); len];
            return;
        }
        if parallel {
            reset_parallel(&mut self.nodes);
        } else {
            self.nodes.fill(NodeState::default());
        }
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the store holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// State of `node`.
    #[inline]
    pub fn get(&self, node: usize) -> &NodeState {
        &self.nodes[node]
    }

    /// Mutable state of `node`.
    #[inline]
    pub fn get_mut(&mut self, node: usize) -> &mut NodeState {
        &mut self.nodes[node]
    }

    /// All node states in index order.
    #[inline]
    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    /// Place `node` in `tree` with the given parent, distance and timestamp.
    #[inline]
    pub fn attach(&mut self, node: usize, tree: TreeFlag, parent: Parent, dist: u32, timestamp: u32) {
        let state = &mut self.nodes[node];
        state.tree = tree;
        state.parent = parent;
        state.dist = dist;
        state.timestamp = timestamp;
    }

    /// Zero every timestamp, leaving trees and queues alone.
    pub fn clear_timestamps(&mut self) {
        for state in &mut self.nodes {
            state.timestamp = 0;
        }
    }

    // -----------------------------------------------------------------------
    // Active list
    // -----------------------------------------------------------------------

    /// Append `node` to the active list unless it is already queued.
    #[inline]
    pub fn push_active(&mut self, node: usize) {
        let state = &mut self.nodes[node];
        if !state.active {
            state.active = true;
            self.active.push_back(node);
        }
    }

    /// Put a node popped by [`pop_active`](Self::pop_active) back at the front.
    #[inline]
    pub fn requeue_active_front(&mut self, node: usize) {
        debug_assert!(!self.nodes[node].active);
        self.nodes[node].active = true;
        self.active.push_front(node);
    }

    /// Pop the next active node that still belongs to a tree.
    ///
    /// Nodes freed by adoption while queued are dropped here.
    pub fn pop_active(&mut self) -> Option<usize> {
        while let Some(node) = self.active.pop_front() {
            let state = &mut self.nodes[node];
            state.active = false;
            if state.tree != TreeFlag::Free {
                return Some(node);
            }
        }
        None
    }

    /// Number of queued active entries, including stale free ones.
    #[inline]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    // -----------------------------------------------------------------------
    // Orphan list
    // -----------------------------------------------------------------------

    /// Detach `node` from its parent and queue it at the front.
    #[inline]
    pub fn orphan_front(&mut self, node: usize) {
        self.mark_orphan(node);
        self.orphans.push_front(node);
    }

    /// Detach `node` from its parent and queue it at the rear.
    #[inline]
    pub fn orphan_rear(&mut self, node: usize) {
        self.mark_orphan(node);
        self.orphans.push_back(node);
    }

    #[inline]
    fn mark_orphan(&mut self, node: usize) {
        let state = &mut self.nodes[node];
        debug_assert!(!state.orphan, "node {node} orphaned twice");
        debug_assert!(state.tree != TreeFlag::Free);
        state.parent = Parent::None;
        state.orphan = true;
    }

    /// Pop the next orphan.
    #[inline]
    pub fn pop_orphan(&mut self) -> Option<usize> {
        let node = self.orphans.pop_front()?;
        self.nodes[node].orphan = false;
        Some(node)
    }

    /// Number of queued orphans.
    #[inline]
    pub fn orphan_len(&self) -> usize {
        self.orphans.len()
    }
}

#[cfg(feature = "parallel")]
fn reset_parallel(nodes: &mut [NodeState]) {
    use rayon::prelude::*;
    nodes
        .par_iter_mut()
        .with_min_len(4096)
        .for_each(|state| *state = NodeState::default());
}

#[cfg(not(feature = "parallel"))]
fn reset_parallel(nodes: &mut [NodeState]) {
    nodes.fill(NodeState::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_free() {
        let store = NodeStateStore::new(3);
        assert_eq!(store.len(), 3);
        assert!(store.nodes().iter().all(|s| s.tree == TreeFlag::Free));
        assert_eq!(store.get(0).parent, Parent::None);
        assert!(!store.get(0).is_orphan());
    }

    #[test]
    fn test_active_is_idempotent_fifo() {
        let mut store = NodeStateStore::new(4);
        for node in [2, 0, 3] {
            store.attach(node, TreeFlag::Source, Parent::Terminal, 0, 0);
        }
        store.push_active(2);
        store.push_active(0);
        store.push_active(2);
        store.push_active(3);
        assert_eq!(store.active_len(), 3);
        assert_eq!(store.pop_active(), Some(2));
        store.requeue_active_front(2);
        assert_eq!(store.pop_active(), Some(2));
        assert_eq!(store.pop_active(), Some(0));
        assert_eq!(store.pop_active(), Some(3));
        assert_eq!(store.pop_active(), None);
    }

    #[test]
    fn test_pop_active_skips_free() {
        let mut store = NodeStateStore::new(2);
        store.attach(1, TreeFlag::Sink, Parent::Terminal, 0, 0);
        store.push_active(0);
        store.push_active(1);
        assert_eq!(store.pop_active(), Some(1));
        assert!(!store.get(0).active);
    }

    #[test]
    fn test_orphan_queue_order() {
        let mut store = NodeStateStore::new(3);
        for node in 0..3 {
            store.attach(node, TreeFlag::Source, Parent::Terminal, 0, 0);
        }
        store.orphan_rear(0);
        store.orphan_front(1);
        store.orphan_rear(2);
        assert!(store.get(1).is_orphan());
        assert_eq!(store.orphan_len(), 3);
        assert_eq!(store.pop_orphan(), Some(1));
        assert_eq!(store.pop_orphan(), Some(0));
        assert_eq!(store.pop_orphan(), Some(2));
        assert_eq!(store.pop_orphan(), None);
        assert!(!store.get(2).orphan);
    }

    #[test]
    fn test_clear_timestamps() {
        let mut store = NodeStateStore::new(2);
        store.attach(0, TreeFlag::Sink, Parent::Terminal, 0, 9);
        store.attach(1, TreeFlag::Sink, Parent::Neighbor(Direction::new(0, false)), 1, 4);
        store.clear_timestamps();
        assert!(store.nodes().iter().all(|s| s.timestamp == 0));
        assert_eq!(store.get(1).dist, 1);
        assert_eq!(store.get(0).tree, TreeFlag::Sink);
    }

    #[test]
    fn test_reset() {
        let mut store = NodeStateStore::new(2);
        store.attach(0, TreeFlag::Sink, Parent::Terminal, 3, 9);
        store.push_active(0);
        store.reset(2, true);
        assert_eq!(*store.get(0), NodeState::default());
        assert_eq!(store.active_len(), 0);
        store.reset(5, false);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_tree_segment() {
        assert_eq!(TreeFlag::Source.segment(), Some(Segment::Source));
        assert_eq!(TreeFlag::Free.segment(), None);
    }
}
