//! Grid graph cut façade.
//!
//! [`GraphCut`] wraps a [`GraphCutBase`] with capacity editing, the
//! up-to-date gate, the solve driver and post-solve queries.

use std::marker::PhantomData;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::base::GraphCutBase;
use crate::error::{GridCutError, Result};
use crate::grid::{Direction, GridTopology, NodeId};
use crate::state::NodeState;
use crate::types::{Capacity, GridCutConfig, RunStatus, Segment, SolveStats};

/// Minimum cut of a `D`-dimensional grid graph.
///
/// # Example
///
/// ```rust
/// use ruvector_gridcut::{Direction, GraphCut, Segment};
///
/// // A 1x3 line: A -3- B -3- C, A tied to the source, C to the sink.
/// let mut cut = GraphCut::<f64, 2>::new([1, 3]).unwrap();
/// cut.set_neighbor_capacity(&[0, 0], 1, 3.0).unwrap();
/// cut.set_neighbor_capacity(&[0, 1], 1, 3.0).unwrap();
/// cut.add_source_seed(&[0, 0]).unwrap();
/// cut.add_sink_seed(&[0, 2]).unwrap();
///
/// cut.run().unwrap();
/// assert_eq!(cut.flow().unwrap(), 3.0);
/// assert_eq!(cut.segment(&[0, 0]).unwrap(), Segment::Source);
/// assert_eq!(cut.segment(&[0, 2]).unwrap(), Segment::Sink);
/// ```
#[derive(Debug, Clone)]
pub struct GraphCut<T, const D: usize> {
    base: GraphCutBase<T, D>,
    config: GridCutConfig,
    labels: Vec<Segment>,
    up_to_date: bool,
    last_stats: Option<SolveStats>,
}

/// Two-dimensional grid cut (images).
pub type GraphCut2d<T = f64> = GraphCut<T, 2>;

/// Three-dimensional grid cut (volumes).
pub type GraphCut3d<T = f64> = GraphCut<T, 3>;

impl<T: Capacity, const D: usize> GraphCut<T, D> {
    /// Zero-capacity grid with the default configuration.
    pub fn new(size: [usize; D]) -> Result<Self> {
        Self::with_config(size, GridCutConfig::default())
    }

    /// Zero-capacity grid with a custom configuration.
    pub fn with_config(size: [usize; D], config: GridCutConfig) -> Result<Self> {
        Ok(Self {
            base: GraphCutBase::new(size)?,
            config,
            labels: Vec::new(),
            up_to_date: false,
            last_stats: None,
        })
    }

    /// Start a [`GraphCutBuilder`].
    pub fn builder(size: [usize; D]) -> GraphCutBuilder<T, D> {
        GraphCutBuilder::new(size)
    }

    /// Active configuration.
    pub fn config(&self) -> &GridCutConfig {
        &self.config
    }

    /// Grid extent along every axis.
    pub fn size(&self) -> &[usize; D] {
        self.base.topology.size()
    }

    /// Number of grid nodes.
    pub fn num_nodes(&self) -> usize {
        self.base.topology.len()
    }

    /// Underlying topology and state container.
    pub fn base(&self) -> &GraphCutBase<T, D> {
        &self.base
    }

    // -----------------------------------------------------------------------
    // Topology predicates
    // -----------------------------------------------------------------------

    /// `true` iff `node` lies inside the grid.
    pub fn is_valid(&self, node: &NodeId<D>) -> bool {
        self.base.topology.is_valid(node)
    }

    /// `true` iff `node` has a neighbour below it along `axis`.
    pub fn is_valid_lower_bound(&self, axis: usize, node: &NodeId<D>) -> bool {
        self.base.topology.is_valid_lower_bound(axis, node)
    }

    /// `true` iff `node` has a neighbour above it along `axis`.
    pub fn is_valid_upper_bound(&self, axis: usize, node: &NodeId<D>) -> bool {
        self.base.topology.is_valid_upper_bound(axis, node)
    }

    // -----------------------------------------------------------------------
    // Capacities
    // -----------------------------------------------------------------------

    /// Set the soft `source -> node` and `node -> sink` capacities.
    pub fn set_terminal_capacity(&mut self, node: &NodeId<D>, source: T, sink: T) -> Result<()> {
        self.base.set_terminal(node, source, sink)?;
        self.up_to_date = false;
        Ok(())
    }

    /// Soft terminal capacities of `node` as `(source, sink)`.
    pub fn terminal_capacity(&self, node: &NodeId<D>) -> Result<(T, T)> {
        let index = self.base.topology.try_index(node)?;
        let caps = &self.base.capacities;
        Ok((caps.source(index), caps.sink(index)))
    }

    /// Set the capacity of the directed arc leaving `node` along `dir`.
    pub fn set_edge_capacity(&mut self, node: &NodeId<D>, dir: Direction, capacity: T) -> Result<()> {
        self.base.set_arc(node, dir, capacity)?;
        self.up_to_date = false;
        Ok(())
    }

    /// Capacity of the directed arc leaving `node` along `dir`.
    pub fn edge_capacity(&self, node: &NodeId<D>, dir: Direction) -> Result<T> {
        let index = self.base.arc_tail(node, dir)?;
        Ok(self
            .base
            .capacities
            .arc(GridTopology::<D>::arc_index(index, dir)))
    }

    /// Set both arcs between `node` and its upper neighbour along `axis`.
    pub fn set_neighbor_capacity(&mut self, node: &NodeId<D>, axis: usize, capacity: T) -> Result<()> {
        if axis >= D {
            return Err(GridCutError::InvalidEdge {
                node: node.to_vec(),
                axis,
                sign: '+',
            });
        }
        let up = Direction::new(axis, true);
        let index = self.base.arc_tail(node, up)?;
        let other = self
            .base
            .topology
            .coords(self.base.topology.neighbor_unchecked(index, up));
        self.base.set_arc(node, up, capacity)?;
        self.base.set_arc(&other, up.reverse(), capacity)?;
        self.up_to_date = false;
        Ok(())
    }

    /// Set every in-bounds directed arc from `capacity(node, dir)`.
    ///
    /// Stops at the first invalid capacity; arcs set before it keep their
    /// new value.
    pub fn fill_edges_with<F>(&mut self, mut capacity: F) -> Result<()>
    where
        F: FnMut(&NodeId<D>, Direction) -> T,
    {
        self.up_to_date = false;
        for index in 0..self.base.topology.len() {
            let node = self.base.topology.coords(index);
            for dir in GridTopology::<D>::directions() {
                if self.base.topology.neighbor(index, dir).is_some() {
                    self.base.set_arc(&node, dir, capacity(&node, dir))?;
                }
            }
        }
        Ok(())
    }

    /// Set the soft terminal capacities of every node from a closure.
    pub fn fill_terminals_with<F>(&mut self, mut capacity: F) -> Result<()>
    where
        F: FnMut(&NodeId<D>) -> (T, T),
    {
        self.up_to_date = false;
        for index in 0..self.base.topology.len() {
            let node = self.base.topology.coords(index);
            let (source, sink) = capacity(&node);
            self.base.set_terminal(&node, source, sink)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Seeds
    // -----------------------------------------------------------------------

    /// Hard-connect `node` to the source.
    pub fn add_source_seed(&mut self, node: &NodeId<D>) -> Result<()> {
        if self.base.add_seed(node, Segment::Source)? {
            self.up_to_date = false;
        }
        Ok(())
    }

    /// Hard-connect `node` to the sink.
    pub fn add_sink_seed(&mut self, node: &NodeId<D>) -> Result<()> {
        if self.base.add_seed(node, Segment::Sink)? {
            self.up_to_date = false;
        }
        Ok(())
    }

    /// Remove every seed.
    pub fn clear_seeds(&mut self) {
        self.base.clear_seeds();
        self.up_to_date = false;
    }

    /// Coordinates of the source seeds.
    pub fn connected_to_source(&self) -> Vec<NodeId<D>> {
        let topology = &self.base.topology;
        self.base
            .connected_to_source()
            .iter()
            .map(|&i| topology.coords(i))
            .collect()
    }

    /// Coordinates of the sink seeds.
    pub fn connected_to_sink(&self) -> Vec<NodeId<D>> {
        let topology = &self.base.topology;
        self.base
            .connected_to_sink()
            .iter()
            .map(|&i| topology.coords(i))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Solve
    // -----------------------------------------------------------------------

    /// Force the next [`run`](Self::run) to recompute the cut.
    pub fn invalidate(&mut self) {
        self.up_to_date = false;
    }

    /// `true` if the labels reflect the current capacities and seeds.
    pub fn is_up_to_date(&self) -> bool {
        self.up_to_date
    }

    /// Compute the minimum cut.
    ///
    /// Returns [`RunStatus::UpToDate`] without doing any work when nothing
    /// changed since the last solve.
    ///
    /// # Errors
    ///
    /// - [`GridCutError::EmptyGrid`], [`GridCutError::NoSourceSeeds`] or
    ///   [`GridCutError::NoSinkSeeds`] when the problem cannot be solved;
    ///   the previous state is left untouched.
    /// - [`GridCutError::CapacityOverflow`] when the sum of all capacities
    ///   does not fit in `T`; solve with a wider capacity type instead.
    /// - [`GridCutError::InternalError`] if tree verification fails.
    #[instrument(skip(self), fields(size = ?self.base.topology.size(), nodes = self.base.topology.len()))]
    pub fn run(&mut self) -> Result<RunStatus> {
        if self.up_to_date {
            debug!("cut is up to date");
            return Ok(RunStatus::UpToDate);
        }
        if let Err(err) = self.base.check_runnable() {
            warn!(%err, "graph cut skipped");
            return Err(err);
        }

        let start = Instant::now();
        let nodes = self.base.topology.len();
        let parallel = self.config.use_parallel(nodes);

        self.base.reset_and_seed(parallel);
        self.base.max_flow();
        if cfg!(debug_assertions) || self.config.verify_trees {
            self.base.verify_trees()?;
        }
        self.labels = label_nodes(self.base.state.nodes(), self.config.free_label, parallel);

        let mut stats = self.base.stats.clone();
        stats.flow = self.base.flow.to_f64();
        stats.wall_time = start.elapsed();
        info!(
            flow = stats.flow,
            augmentations = stats.augmentations,
            orphans = stats.orphans_processed,
            wall_time = ?stats.wall_time,
            "graph cut solved"
        );

        self.last_stats = Some(stats.clone());
        self.up_to_date = true;
        Ok(RunStatus::Solved(stats))
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    fn solved_labels(&self) -> Result<&[Segment]> {
        if self.last_stats.is_none() {
            return Err(GridCutError::NotSolved);
        }
        Ok(&self.labels)
    }

    /// Side of the cut `node` lies on.
    pub fn segment(&self, node: &NodeId<D>) -> Result<Segment> {
        let labels = self.solved_labels()?;
        Ok(labels[self.base.topology.try_index(node)?])
    }

    /// `true` if `node` lies on the source side.
    pub fn is_source_side(&self, node: &NodeId<D>) -> Result<bool> {
        Ok(self.segment(node)? == Segment::Source)
    }

    /// Labels of every node in flat index order.
    pub fn labels(&self) -> Result<&[Segment]> {
        self.solved_labels()
    }

    /// Maximum flow value of the last solve.
    pub fn flow(&self) -> Result<T> {
        self.solved_labels()?;
        Ok(self.base.flow)
    }

    /// Counters of the last solve.
    pub fn stats(&self) -> Option<&SolveStats> {
        self.last_stats.as_ref()
    }

    /// Residual capacity left on the arc leaving `node` along `dir`.
    pub fn residual_edge_capacity(&self, node: &NodeId<D>, dir: Direction) -> Result<T> {
        self.solved_labels()?;
        let index = self.base.arc_tail(node, dir)?;
        Ok(self
            .base
            .residual
            .arc(GridTopology::<D>::arc_index(index, dir)))
    }

    /// Capacity of the labelled cut, measured on the original capacities.
    ///
    /// Sums the terminal links severed by the labelling and every arc from
    /// a source-side node to a sink-side node. Equals [`flow`](Self::flow)
    /// after a solve.
    pub fn cut_value(&self) -> Result<T> {
        let labels = self.solved_labels()?;
        let topology = &self.base.topology;
        let caps = &self.base.capacities;
        let mut value = T::ZERO;
        for (index, &label) in labels.iter().enumerate() {
            match label {
                Segment::Source => {
                    value += caps.sink(index);
                    for dir in GridTopology::<D>::directions() {
                        if let Some(next) = topology.neighbor(index, dir) {
                            if labels[next] == Segment::Sink {
                                value += caps.arc(GridTopology::<D>::arc_index(index, dir));
                            }
                        }
                    }
                }
                Segment::Sink => value += caps.source(index),
            }
        }
        Ok(value)
    }

    /// Arcs with positive capacity leading from the source side to the
    /// sink side, as `(tail, direction)`.
    pub fn cut_edges(&self) -> Result<Vec<(NodeId<D>, Direction)>> {
        let labels = self.solved_labels()?;
        let topology = &self.base.topology;
        let mut edges = Vec::new();
        for index in (0..labels.len()).filter(|&i| labels[i] == Segment::Source) {
            for dir in GridTopology::<D>::directions() {
                let Some(next) = topology.neighbor(index, dir) else {
                    continue;
                };
                let capacity = self
                    .base
                    .capacities
                    .arc(GridTopology::<D>::arc_index(index, dir));
                if labels[next] == Segment::Sink && capacity.is_positive() {
                    edges.push((topology.coords(index), dir));
                }
            }
        }
        Ok(edges)
    }

    /// Check the search trees left by the last solve for cycles and
    /// saturated parent links.
    pub fn verify_trees(&self) -> Result<()> {
        self.base.verify_trees()
    }
}

/// Map tree membership to cut sides.
fn label_nodes(states: &[NodeState], free_label: Segment, parallel: bool) -> Vec<Segment> {
    if parallel {
        label_parallel(states, free_label)
    } else {
        states
            .iter()
            .map(|state| state.tree.segment().unwrap_or(free_label))
            .collect()
    }
}

#[cfg(feature = "parallel")]
fn label_parallel(states: &[NodeState], free_label: Segment) -> Vec<Segment> {
    use rayon::prelude::*;
    states
        .par_iter()
        .with_min_len(4096)
        .map(|state| state.tree.segment().unwrap_or(free_label))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn label_parallel(states: &[NodeState], free_label: Segment) -> Vec<Segment> {
    label_nodes(states, free_label, false)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`GraphCut`].
///
/// ```rust
/// use ruvector_gridcut::{GraphCut3d, Segment};
///
/// let cut = GraphCut3d::<f32>::builder([4, 4, 4])
///     .parallel(false)
///     .free_label(Segment::Source)
///     .source_seeds([[0, 0, 0]])
///     .sink_seeds([[3, 3, 3]])
///     .build()
///     .unwrap();
/// assert_eq!(cut.connected_to_sink(), vec![[3, 3, 3]]);
/// ```
#[derive(Debug, Clone)]
pub struct GraphCutBuilder<T, const D: usize> {
    size: [usize; D],
    config: GridCutConfig,
    source_seeds: Vec<NodeId<D>>,
    sink_seeds: Vec<NodeId<D>>,
    _capacity: PhantomData<T>,
}

impl<T: Capacity, const D: usize> GraphCutBuilder<T, D> {
    /// Builder for a grid of the given size.
    pub fn new(size: [usize; D]) -> Self {
        Self {
            size,
            config: GridCutConfig::default(),
            source_seeds: Vec::new(),
            sink_seeds: Vec::new(),
            _capacity: PhantomData,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: GridCutConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable the rayon passes.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.config.parallel = enabled;
        self
    }

    /// Node count from which the rayon passes are used.
    pub fn parallel_threshold(mut self, nodes: usize) -> Self {
        self.config.parallel_threshold = nodes;
        self
    }

    /// Label for nodes reachable from neither terminal.
    pub fn free_label(mut self, label: Segment) -> Self {
        self.config.free_label = label;
        self
    }

    /// Verify the search trees after every solve.
    pub fn verify_trees(mut self, enabled: bool) -> Self {
        self.config.verify_trees = enabled;
        self
    }

    /// Nodes hard-connected to the source.
    pub fn source_seeds(mut self, seeds: impl IntoIterator<Item = NodeId<D>>) -> Self {
        self.source_seeds.extend(seeds);
        self
    }

    /// Nodes hard-connected to the sink.
    pub fn sink_seeds(mut self, seeds: impl IntoIterator<Item = NodeId<D>>) -> Self {
        self.sink_seeds.extend(seeds);
        self
    }

    /// Build the graph cut.
    pub fn build(self) -> Result<GraphCut<T, D>> {
        let mut cut = GraphCut::with_config(self.size, self.config)?;
        for node in &self.source_seeds {
            cut.add_source_seed(node)?;
        }
        for node in &self.sink_seeds {
            cut.add_sink_seed(node)?;
        }
        Ok(cut)
    }
}
