//! Topology and state container shared by the engine and the façade.
//!
//! [`GraphCutBase`] owns everything a solve touches: the grid topology, the
//! capacities supplied by the caller, the residual copy mutated during a
//! solve, the per-node search state and the hard seed lists.

use crate::capacity::CapacityStore;
use crate::error::{GridCutError, Result};
use crate::grid::{Direction, GridTopology, NodeId};
use crate::state::{NodeStateStore, Parent, TreeFlag};
use crate::types::{Capacity, Segment, SolveStats};

/// Hard terminal connection of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Seed {
    #[default]
    None,
    Source,
    Sink,
}

/// Grid, capacities, seeds and search state of one graph cut.
#[derive(Debug, Clone)]
pub struct GraphCutBase<T, const D: usize> {
    pub(crate) topology: GridTopology<D>,
    pub(crate) capacities: CapacityStore<T>,
    pub(crate) residual: CapacityStore<T>,
    pub(crate) state: NodeStateStore,
    pub(crate) seeds: Vec<Seed>,
    pub(crate) connected_to_source: Vec<usize>,
    pub(crate) connected_to_sink: Vec<usize>,
    /// Current pass; distances stamped with it are trusted by adoption.
    /// Skips 0 on wrap-around, which clears every stamp.
    pub(crate) time: u32,
    pub(crate) flow: T,
    pub(crate) stats: SolveStats,
}

impl<T: Capacity, const D: usize> GraphCutBase<T, D> {
    /// Zero-capacity grid without seeds.
    pub fn new(size: [usize; D]) -> Result<Self> {
        let topology = GridTopology::new(size)?;
        let len = topology.len();
        let arcs = GridTopology::<D>::NUM_DIRECTIONS;
        Ok(Self {
            capacities: CapacityStore::new(len, arcs),
            residual: CapacityStore::new(len, arcs),
            state: NodeStateStore::new(len),
            seeds: vec![Seed::None; len],
            connected_to_source: Vec::new(),
            connected_to_sink: Vec::new(),
            time: 0,
            flow: T::ZERO,
            stats: SolveStats::default(),
            topology,
        })
    }

    /// Grid topology.
    #[inline]
    pub fn topology(&self) -> &GridTopology<D> {
        &self.topology
    }

    /// Capacities as supplied by the caller.
    #[inline]
    pub fn capacities(&self) -> &CapacityStore<T> {
        &self.capacities
    }

    /// Residual capacities left by the last solve.
    #[inline]
    pub fn residual(&self) -> &CapacityStore<T> {
        &self.residual
    }

    /// Search state left by the last solve.
    #[inline]
    pub fn state(&self) -> &NodeStateStore {
        &self.state
    }

    /// Flat indices of the source seeds, in insertion order.
    #[inline]
    pub fn connected_to_source(&self) -> &[usize] {
        &self.connected_to_source
    }

    /// Flat indices of the sink seeds, in insertion order.
    #[inline]
    pub fn connected_to_sink(&self) -> &[usize] {
        &self.connected_to_sink
    }

    /// `true` if `node` is a hard source seed.
    #[inline]
    pub(crate) fn is_hard_source(&self, node: usize) -> bool {
        self.seeds[node] == Seed::Source
    }

    /// `true` if `node` is a hard sink seed.
    #[inline]
    pub(crate) fn is_hard_sink(&self, node: usize) -> bool {
        self.seeds[node] == Seed::Sink
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Set the soft terminal capacities of `node`.
    pub fn set_terminal(&mut self, node: &NodeId<D>, source: T, sink: T) -> Result<()> {
        let index = self.topology.try_index(node)?;
        check_capacity(source)?;
        check_capacity(sink)?;
        self.capacities.set_terminal(index, source, sink);
        Ok(())
    }

    /// Set the capacity of the directed arc leaving `node` along `dir`.
    pub fn set_arc(&mut self, node: &NodeId<D>, dir: Direction, capacity: T) -> Result<()> {
        let index = self.arc_tail(node, dir)?;
        check_capacity(capacity)?;
        self.capacities
            .set_arc(GridTopology::<D>::arc_index(index, dir), capacity);
        Ok(())
    }

    /// Flat index of `node`, checking that the arc along `dir` stays inside.
    pub(crate) fn arc_tail(&self, node: &NodeId<D>, dir: Direction) -> Result<usize> {
        let index = self.topology.try_index(node)?;
        let axis = dir.axis();
        let inside = axis < D
            && if dir.is_positive() {
                self.topology.is_valid_upper_bound(axis, node)
            } else {
                self.topology.is_valid_lower_bound(axis, node)
            };
        if !inside {
            return Err(GridCutError::InvalidEdge {
                node: node.to_vec(),
                axis,
                sign: dir.sign(),
            });
        }
        Ok(index)
    }

    /// Connect `node` to a terminal with infinite capacity.
    ///
    /// Returns `false` if the node already was a seed of the same side.
    pub fn add_seed(&mut self, node: &NodeId<D>, side: Segment) -> Result<bool> {
        let index = self.topology.try_index(node)?;
        let wanted = match side {
            Segment::Source => Seed::Source,
            Segment::Sink => Seed::Sink,
        };
        match self.seeds[index] {
            Seed::None => {}
            current if current == wanted => return Ok(false),
            _ => return Err(GridCutError::ConflictingSeed(node.to_vec())),
        }
        self.seeds[index] = wanted;
        match side {
            Segment::Source => self.connected_to_source.push(index),
            Segment::Sink => self.connected_to_sink.push(index),
        }
        Ok(true)
    }

    /// Drop every seed.
    pub fn clear_seeds(&mut self) {
        self.seeds.fill(Seed::None);
        self.connected_to_source.clear();
        self.connected_to_sink.clear();
    }

    // -----------------------------------------------------------------------
    // Validity
    // -----------------------------------------------------------------------

    /// Reject grids that cannot be solved.
    ///
    /// Besides the seed checks, the sum of all capacities must fit in `T`:
    /// it bounds every reverse residual and the flow value.
    pub fn check_runnable(&self) -> Result<()> {
        if self.topology.is_empty() {
            return Err(GridCutError::EmptyGrid);
        }
        if self.connected_to_source.is_empty() {
            return Err(GridCutError::NoSourceSeeds);
        }
        if self.connected_to_sink.is_empty() {
            return Err(GridCutError::NoSinkSeeds);
        }
        if self.capacities.checked_total().is_none() {
            return Err(GridCutError::CapacityOverflow(
                self.capacities.approximate_total().to_string(),
            ));
        }
        Ok(())
    }

    /// Check that every tree node reaches its terminal through valid arcs.
    ///
    /// Each parent must be in the same tree and the arc carrying flow towards
    /// the child must have residual capacity; chains must end at a terminal
    /// link that is hard or still unsaturated.
    pub fn verify_trees(&self) -> Result<()> {
        const UNKNOWN: u8 = 0;
        const ON_PATH: u8 = 1;
        const VALID: u8 = 2;

        let len = self.topology.len();
        let mut mark = vec![UNKNOWN; len];
        let mut path = Vec::new();

        for start in 0..len {
            if mark[start] != UNKNOWN || self.state.get(start).tree == TreeFlag::Free {
                continue;
            }
            path.clear();
            let mut node = start;
            loop {
                match mark[node] {
                    VALID => break,
                    ON_PATH => {
                        return Err(GridCutError::InternalError(format!(
                            "cycle in search tree through {:?}",
                            self.topology.coords(node)
                        )))
                    }
                    _ => {}
                }
                mark[node] = ON_PATH;
                path.push(node);

                let state = self.state.get(node);
                match state.parent {
                    Parent::None => {
                        return Err(GridCutError::InternalError(format!(
                            "tree node {:?} has no parent",
                            self.topology.coords(node)
                        )))
                    }
                    Parent::Terminal => {
                        let linked = match state.tree {
                            TreeFlag::Source => {
                                self.is_hard_source(node) || self.residual.source(node).is_positive()
                            }
                            TreeFlag::Sink => {
                                self.is_hard_sink(node) || self.residual.sink(node).is_positive()
                            }
                            TreeFlag::Free => false,
                        };
                        if !linked {
                            return Err(GridCutError::InternalError(format!(
                                "terminal link of {:?} is saturated",
                                self.topology.coords(node)
                            )));
                        }
                        break;
                    }
                    Parent::Neighbor(dir) => {
                        let parent = self.topology.neighbor(node, dir).ok_or_else(|| {
                            GridCutError::InternalError(format!(
                                "parent of {:?} lies outside the grid",
                                self.topology.coords(node)
                            ))
                        })?;
                        let carrying = match state.tree {
                            TreeFlag::Source => GridTopology::<D>::arc_index(parent, dir.reverse()),
                            _ => GridTopology::<D>::arc_index(node, dir),
                        };
                        if self.state.get(parent).tree != state.tree
                            || !self.residual.arc(carrying).is_positive()
                        {
                            return Err(GridCutError::InternalError(format!(
                                "invalid parent arc at {:?}",
                                self.topology.coords(node)
                            )));
                        }
                        node = parent;
                    }
                }
            }
            for &n in &path {
                mark[n] = VALID;
            }
        }
        Ok(())
    }
}

fn check_capacity<T: Capacity>(value: T) -> Result<()> {
    if value.is_valid() {
        Ok(())
    } else {
        Err(GridCutError::InvalidCapacity(format!("{value:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_base() {
        let base = GraphCutBase::<f64, 3>::new([2, 3, 4]).unwrap();
        assert_eq!(base.topology().len(), 24);
        assert_eq!(base.capacities().arcs_per_node(), 6);
        assert!(base.connected_to_source().is_empty());
    }

    #[test]
    fn test_check_runnable() {
        let mut base = GraphCutBase::<f64, 2>::new([2, 2]).unwrap();
        assert_eq!(base.check_runnable(), Err(GridCutError::NoSourceSeeds));
        base.add_seed(&[0, 0], Segment::Source).unwrap();
        assert_eq!(base.check_runnable(), Err(GridCutError::NoSinkSeeds));
        base.add_seed(&[1, 1], Segment::Sink).unwrap();
        assert!(base.check_runnable().is_ok());

        let empty = GraphCutBase::<f64, 2>::new([0, 4]).unwrap();
        assert_eq!(empty.check_runnable(), Err(GridCutError::EmptyGrid));
    }

    #[test]
    fn test_check_runnable_rejects_capacity_overflow() {
        let mut base = GraphCutBase::<u16, 1>::new([2]).unwrap();
        let right = Direction::new(0, true);
        base.set_arc(&[0], right, 40_000).unwrap();
        base.add_seed(&[0], Segment::Source).unwrap();
        base.add_seed(&[1], Segment::Sink).unwrap();
        assert!(base.check_runnable().is_ok());

        base.set_arc(&[1], right.reverse(), 40_000).unwrap();
        assert_eq!(
            base.check_runnable(),
            Err(GridCutError::CapacityOverflow("80000".to_string()))
        );
    }

    #[test]
    fn test_seeds() {
        let mut base = GraphCutBase::<u32, 1>::new([4]).unwrap();
        assert!(base.add_seed(&[1], Segment::Source).unwrap());
        assert!(!base.add_seed(&[1], Segment::Source).unwrap());
        assert_eq!(
            base.add_seed(&[1], Segment::Sink),
            Err(GridCutError::ConflictingSeed(vec![1]))
        );
        assert!(base.add_seed(&[9], Segment::Sink).is_err());
        assert_eq!(base.connected_to_source(), &[1]);
        assert!(base.is_hard_source(1));
        base.clear_seeds();
        assert!(!base.is_hard_source(1));
        assert!(base.connected_to_source().is_empty());
    }

    #[test]
    fn test_set_arc_bounds_and_values() {
        let mut base = GraphCutBase::<f64, 2>::new([2, 2]).unwrap();
        assert!(base.set_arc(&[0, 0], Direction::new(0, true), 1.0).is_ok());
        assert!(matches!(
            base.set_arc(&[0, 0], Direction::new(0, false), 1.0),
            Err(GridCutError::InvalidEdge { axis: 0, sign: '-', .. })
        ));
        assert!(matches!(
            base.set_arc(&[0, 0], Direction::new(1, true), -1.0),
            Err(GridCutError::InvalidCapacity(_))
        ));
        assert!(base.set_terminal(&[1, 1], f64::NAN, 0.0).is_err());
        assert!(base.set_terminal(&[1, 1], 2.0, 0.5).is_ok());
        assert_eq!(base.capacities().source(3), 2.0);
    }

    #[test]
    fn test_verify_trees_detects_cycle() {
        let mut base = GraphCutBase::<f64, 1>::new([2]).unwrap();
        let right = Direction::new(0, true);
        base.residual.set_arc(GridTopology::<1>::arc_index(0, right), 1.0);
        base.residual.set_arc(GridTopology::<1>::arc_index(1, right.reverse()), 1.0);
        base.state
            .attach(0, TreeFlag::Source, Parent::Neighbor(right), 1, 0);
        base.state
            .attach(1, TreeFlag::Source, Parent::Neighbor(right.reverse()), 1, 0);
        assert!(matches!(
            base.verify_trees(),
            Err(GridCutError::InternalError(msg)) if msg.contains("cycle")
        ));
    }

    #[test]
    fn test_verify_trees_accepts_chain() {
        let mut base = GraphCutBase::<f64, 1>::new([2]).unwrap();
        let right = Direction::new(0, true);
        base.add_seed(&[0], Segment::Source).unwrap();
        base.residual.set_arc(GridTopology::<1>::arc_index(0, right), 1.0);
        base.state.attach(0, TreeFlag::Source, Parent::Terminal, 0, 0);
        base.state
            .attach(1, TreeFlag::Source, Parent::Neighbor(right.reverse()), 1, 0);
        assert!(base.verify_trees().is_ok());
    }
}
