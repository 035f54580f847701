//! Boykov-Kolmogorov augmenting-path engine.
//!
//! Two search trees grow from the terminals over arcs with residual
//! capacity. When they touch, the path through the touching arc is
//! saturated by its bottleneck and the nodes whose parent arcs saturated
//! become orphans. Adoption then looks for a new parent for every orphan
//! whose route to the terminal is still valid, or frees it.
//!
//! # Residual orientation
//!
//! Flow in the source tree runs from parent to child, so a source-tree
//! parent arc is usable while `parent -> child` has residual capacity. In
//! the sink tree flow runs from child to parent and the relevant arc is
//! `child -> parent`.
//!
//! # Timestamps
//!
//! `time` advances once per augmentation. A node's `dist` is trusted by
//! adoption only when its `timestamp` equals the current `time`; terminal
//! children are re-stamped with distance 0 when reached, and a walk that
//! meets a parent-less node yields no distance at all. This keeps adoption
//! from attaching an orphan below its own subtree.

use tracing::{debug, trace};

use crate::base::{GraphCutBase, Seed};
use crate::grid::{Direction, GridTopology};
use crate::state::{Parent, TreeFlag};
use crate::types::Capacity;

/// Arc joining the two trees: tail in the source tree, `dir` towards the
/// sink-tree head.
pub(crate) type BridgeArc = (usize, Direction);

impl<T: Capacity, const D: usize> GraphCutBase<T, D> {
    #[inline]
    fn arc(node: usize, dir: Direction) -> usize {
        GridTopology::<D>::arc_index(node, dir)
    }

    /// Residual capacity usable by a tree parent linked to `child` along
    /// `dir` (direction from child to parent).
    #[inline]
    fn tree_arc_residual(&self, tree: TreeFlag, child: usize, parent: usize, dir: Direction) -> T {
        match tree {
            TreeFlag::Source => self.residual.arc(Self::arc(parent, dir.reverse())),
            _ => self.residual.arc(Self::arc(child, dir)),
        }
    }

    /// Copy capacities into the residual store, reset every node and seed
    /// both trees from the terminal links.
    ///
    /// Flow that can go straight from the source to the sink through a
    /// single node is pushed here.
    pub(crate) fn reset_and_seed(&mut self, parallel: bool) {
        let len = self.topology.len();
        self.residual.copy_from(&self.capacities, parallel);
        self.state.reset(len, parallel);
        self.time = 0;
        self.flow = T::ZERO;
        self.stats = Default::default();
        self.stats.nodes = len;

        for node in 0..len {
            let source = self.residual.source(node);
            let sink = self.residual.sink(node);
            let direct = match self.seeds[node] {
                Seed::Source => sink,
                Seed::Sink => source,
                Seed::None => source.min_of(sink),
            };
            if direct.is_positive() {
                self.flow += direct;
                self.stats.augmentations += 1;
                if self.seeds[node] != Seed::Source {
                    self.residual.drain_source(node, direct);
                }
                if self.seeds[node] != Seed::Sink {
                    self.residual.drain_sink(node, direct);
                }
            }

            let tree = if self.is_hard_source(node) || self.residual.source(node).is_positive() {
                TreeFlag::Source
            } else if self.is_hard_sink(node) || self.residual.sink(node).is_positive() {
                TreeFlag::Sink
            } else {
                continue;
            };
            self.state.attach(node, tree, Parent::Terminal, 0, 0);
            self.state.push_active(node);
        }

        debug!(
            active = self.state.active_len(),
            direct_flow = self.flow.to_f64(),
            "seeded search trees"
        );
    }

    /// Expand the active frontier until the trees touch.
    ///
    /// Returns the bridging arc, or `None` once no active node is left and
    /// the flow is maximal. The node that found the bridge is put back at
    /// the front of the active list.
    pub(crate) fn grow(&mut self) -> Option<BridgeArc> {
        while let Some(node) = self.state.pop_active() {
            self.stats.grow_steps += 1;
            let current = *self.state.get(node);

            for dir in GridTopology::<D>::directions() {
                let Some(next) = self.topology.neighbor(node, dir) else {
                    continue;
                };
                let open = match current.tree {
                    TreeFlag::Source => self.residual.arc(Self::arc(node, dir)),
                    _ => self.residual.arc(Self::arc(next, dir.reverse())),
                };
                if !open.is_positive() {
                    continue;
                }

                let neighbor = *self.state.get(next);
                if neighbor.tree == TreeFlag::Free {
                    self.state.attach(
                        next,
                        current.tree,
                        Parent::Neighbor(dir.reverse()),
                        current.dist + 1,
                        current.timestamp,
                    );
                    self.state.push_active(next);
                } else if neighbor.tree == current.tree {
                    // shorter route through `node`
                    if neighbor.timestamp <= current.timestamp && neighbor.dist > current.dist {
                        self.state.attach(
                            next,
                            current.tree,
                            Parent::Neighbor(dir.reverse()),
                            current.dist + 1,
                            current.timestamp,
                        );
                    }
                } else {
                    self.state.requeue_active_front(node);
                    return Some(match current.tree {
                        TreeFlag::Source => (node, dir),
                        _ => (next, dir.reverse()),
                    });
                }
            }
        }
        None
    }

    /// Push the bottleneck flow along the path through `bridge` and orphan
    /// every node whose parent link saturated.
    pub(crate) fn augment(&mut self, bridge: BridgeArc) {
        let (tail, dir) = bridge;
        let head = self.topology.neighbor_unchecked(tail, dir);
        let bridge_slot = Self::arc(tail, dir);

        let mut bottleneck = self.residual.arc(bridge_slot);
        bottleneck = self.path_bottleneck(TreeFlag::Source, tail, bottleneck);
        bottleneck = self.path_bottleneck(TreeFlag::Sink, head, bottleneck);
        debug_assert!(bottleneck.is_positive(), "augmenting path without capacity");

        self.residual
            .push_arc(bridge_slot, Self::arc(head, dir.reverse()), bottleneck);
        self.push_along_tree(TreeFlag::Source, tail, bottleneck);
        self.push_along_tree(TreeFlag::Sink, head, bottleneck);

        self.flow += bottleneck;
        self.stats.augmentations += 1;
        trace!(
            flow = bottleneck.to_f64(),
            orphans = self.state.orphan_len(),
            "augmented"
        );
    }

    /// Minimum of `bound` and every residual between `start` and its terminal.
    fn path_bottleneck(&self, tree: TreeFlag, start: usize, mut bound: T) -> T {
        let mut node = start;
        loop {
            match self.state.get(node).parent {
                Parent::Neighbor(dir) => {
                    let parent = self.topology.neighbor_unchecked(node, dir);
                    bound = bound.min_of(self.tree_arc_residual(tree, node, parent, dir));
                    node = parent;
                }
                Parent::Terminal => {
                    match tree {
                        TreeFlag::Source if !self.is_hard_source(node) => {
                            bound = bound.min_of(self.residual.source(node));
                        }
                        TreeFlag::Sink if !self.is_hard_sink(node) => {
                            bound = bound.min_of(self.residual.sink(node));
                        }
                        _ => {}
                    }
                    return bound;
                }
                Parent::None => {
                    debug_assert!(false, "augmenting path through an orphan");
                    return bound;
                }
            }
        }
    }

    /// Move `amount` along the tree path from `start` to its terminal.
    fn push_along_tree(&mut self, tree: TreeFlag, start: usize, amount: T) {
        let mut node = start;
        loop {
            let link = self.state.get(node).parent;
            match link {
                Parent::Neighbor(dir) => {
                    let parent = self.topology.neighbor_unchecked(node, dir);
                    let (forward, reverse) = match tree {
                        TreeFlag::Source => (Self::arc(parent, dir.reverse()), Self::arc(node, dir)),
                        _ => (Self::arc(node, dir), Self::arc(parent, dir.reverse())),
                    };
                    self.residual.push_arc(forward, reverse, amount);
                    if !self.residual.arc(forward).is_positive() {
                        self.state.orphan_front(node);
                    }
                    node = parent;
                }
                Parent::Terminal => {
                    match tree {
                        TreeFlag::Source if !self.is_hard_source(node) => {
                            self.residual.drain_source(node, amount);
                            if !self.residual.source(node).is_positive() {
                                self.state.orphan_front(node);
                            }
                        }
                        TreeFlag::Sink if !self.is_hard_sink(node) => {
                            self.residual.drain_sink(node, amount);
                            if !self.residual.sink(node).is_positive() {
                                self.state.orphan_front(node);
                            }
                        }
                        _ => {}
                    }
                    return;
                }
                Parent::None => return,
            }
        }
    }

    /// Re-attach or free every queued orphan.
    pub(crate) fn adopt(&mut self) {
        while let Some(orphan) = self.state.pop_orphan() {
            self.stats.orphans_processed += 1;
            let tree = self.state.get(orphan).tree;
            let mut best: Option<(Direction, u32)> = None;

            for dir in GridTopology::<D>::directions() {
                let Some(candidate) = self.topology.neighbor(orphan, dir) else {
                    continue;
                };
                if !self
                    .tree_arc_residual(tree, orphan, candidate, dir)
                    .is_positive()
                {
                    continue;
                }
                let state = self.state.get(candidate);
                if state.tree != tree || state.parent == Parent::None {
                    continue;
                }
                if let Some(dist) = self.origin_distance(candidate) {
                    if best.map_or(true, |(_, d)| dist < d) {
                        best = Some((dir, dist));
                    }
                    self.stamp_path(candidate, dist);
                }
            }

            match best {
                Some((dir, dist)) => {
                    self.state
                        .attach(orphan, tree, Parent::Neighbor(dir), dist + 1, self.time);
                }
                None => self.free_orphan(orphan, tree),
            }
        }
    }

    /// Distance from `start` to its terminal, or `None` if the walk meets
    /// a parent-less node.
    fn origin_distance(&mut self, start: usize) -> Option<u32> {
        let mut dist = 0u32;
        let mut node = start;
        loop {
            let state = *self.state.get(node);
            if state.timestamp == self.time {
                return Some(dist + state.dist);
            }
            match state.parent {
                Parent::Terminal => {
                    let state = self.state.get_mut(node);
                    state.timestamp = self.time;
                    state.dist = 0;
                    return Some(dist);
                }
                Parent::None => return None,
                Parent::Neighbor(dir) => {
                    dist += 1;
                    debug_assert!((dist as usize) <= self.topology.len(), "cyclic parent chain");
                    node = self.topology.neighbor_unchecked(node, dir);
                }
            }
        }
    }

    /// Record the distances found by [`origin_distance`](Self::origin_distance)
    /// along the walked path.
    fn stamp_path(&mut self, start: usize, mut dist: u32) {
        let time = self.time;
        let mut node = start;
        loop {
            let state = self.state.get_mut(node);
            if state.timestamp == time {
                return;
            }
            state.timestamp = time;
            state.dist = dist;
            match state.parent {
                Parent::Neighbor(dir) => {
                    dist = dist.saturating_sub(1);
                    node = self.topology.neighbor_unchecked(node, dir);
                }
                _ => return,
            }
        }
    }

    /// Return `orphan` to the free set, orphan its children and re-activate
    /// neighbours that can grow back into it.
    fn free_orphan(&mut self, orphan: usize, tree: TreeFlag) {
        self.stats.nodes_freed += 1;
        for dir in GridTopology::<D>::directions() {
            let Some(next) = self.topology.neighbor(orphan, dir) else {
                continue;
            };
            let neighbor = *self.state.get(next);
            if neighbor.tree != tree {
                continue;
            }
            if self
                .tree_arc_residual(tree, orphan, next, dir)
                .is_positive()
            {
                self.state.push_active(next);
            }
            if neighbor.parent == Parent::Neighbor(dir.reverse()) {
                self.state.orphan_rear(next);
            }
        }
        let state = self.state.get_mut(orphan);
        state.tree = TreeFlag::Free;
        state.parent = Parent::None;
    }

    /// Start a new pass. On wrap-around every stamp is cleared so stale
    /// distances never match the new time.
    fn advance_time(&mut self) {
        self.time = self.time.wrapping_add(1);
        if self.time == 0 {
            self.state.clear_timestamps();
            self.time = 1;
        }
    }

    /// Run `grow -> augment -> adopt` until no augmenting path is left.
    pub(crate) fn max_flow(&mut self) {
        while let Some(bridge) = self.grow() {
            self.advance_time();
            self.augment(bridge);
            self.adopt();
        }
        debug!(
            augmentations = self.stats.augmentations,
            orphans = self.stats.orphans_processed,
            freed = self.stats.nodes_freed,
            "max flow reached"
        );
    }
}
