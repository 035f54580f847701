//! Shared test helpers for the ruvector-gridcut integration test suite.
//!
//! Provides a deterministic generator for random grid problems, a dense
//! Edmonds-Karp reference solver and an exhaustive minimum cut for tiny
//! grids.

#![allow(dead_code)]

use std::collections::VecDeque;

use ruvector_gridcut::{Capacity, Direction, GraphCut, GridCutConfig, GridTopology, NodeId, Segment};

// ---------------------------------------------------------------------------
// Random number generator (simple LCG for deterministic reproducibility)
// ---------------------------------------------------------------------------

/// A minimal linear congruential generator for deterministic test data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    /// Create a new LCG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next u64 value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform integer in `[0, bound)`.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        (self.next_u64() >> 33) % bound
    }
}

// ---------------------------------------------------------------------------
// Problem description
// ---------------------------------------------------------------------------

/// A grid cut problem independent of the solver under test.
#[derive(Debug, Clone)]
pub struct GridProblem<const D: usize> {
    pub size: [usize; D],
    /// `(source, sink)` per node.
    pub terminals: Vec<(u32, u32)>,
    /// Directed arc capacity per `node * 2D + dir`.
    pub arcs: Vec<u32>,
    pub source_seeds: Vec<usize>,
    pub sink_seeds: Vec<usize>,
}

impl<const D: usize> GridProblem<D> {
    /// Random problem with integer capacities below `max_cap`.
    ///
    /// Nodes get soft terminal links with probability 1/4 each; one seed of
    /// each kind is placed at opposite corners.
    pub fn random(size: [usize; D], max_cap: u32, seed: u64) -> Self {
        let topology = GridTopology::new(size).unwrap();
        let n = topology.len();
        let mut rng = Lcg::new(seed);
        let mut arcs = vec![0u32; n * 2 * D];
        for node in 0..n {
            for dir in GridTopology::<D>::directions() {
                if topology.neighbor(node, dir).is_some() {
                    arcs[GridTopology::<D>::arc_index(node, dir)] =
                        rng.next_below(max_cap as u64) as u32;
                }
            }
        }
        let terminals = (0..n)
            .map(|_| {
                let s = if rng.next_below(4) == 0 { rng.next_below(max_cap as u64) as u32 } else { 0 };
                let t = if rng.next_below(4) == 0 { rng.next_below(max_cap as u64) as u32 } else { 0 };
                (s, t)
            })
            .collect();
        Self {
            size,
            terminals,
            arcs,
            source_seeds: vec![0],
            sink_seeds: vec![n - 1],
        }
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    /// Build a solver for this problem with capacity type `f64`.
    pub fn to_graph_cut(&self) -> GraphCut<f64, D> {
        self.to_graph_cut_with(|c| c as f64)
    }

    /// Build a sequential, self-verifying solver converting capacities
    /// with `conv`.
    pub fn to_graph_cut_with<T, F>(&self, conv: F) -> GraphCut<T, D>
    where
        T: Capacity,
        F: Fn(u32) -> T,
    {
        let config = GridCutConfig {
            parallel: false,
            verify_trees: true,
            ..GridCutConfig::default()
        };
        self.to_graph_cut_configured(config, conv)
    }

    /// Build a solver with an explicit configuration.
    pub fn to_graph_cut_configured<T, F>(&self, config: GridCutConfig, conv: F) -> GraphCut<T, D>
    where
        T: Capacity,
        F: Fn(u32) -> T,
    {
        let mut cut = GraphCut::<T, D>::builder(self.size)
            .config(config)
            .build()
            .unwrap();
        let topology = GridTopology::new(self.size).unwrap();
        cut.fill_edges_with(|node, dir| {
            conv(self.arcs[GridTopology::<D>::arc_index(topology.try_index(node).unwrap(), dir)])
        })
        .unwrap();
        cut.fill_terminals_with(|node| {
            let (s, t) = self.terminals[topology.try_index(node).unwrap()];
            (conv(s), conv(t))
        })
        .unwrap();
        for &i in &self.source_seeds {
            cut.add_source_seed(&topology.try_coords(i).unwrap()).unwrap();
        }
        for &i in &self.sink_seeds {
            cut.add_sink_seed(&topology.try_coords(i).unwrap()).unwrap();
        }
        cut
    }

    fn infinity(&self) -> u64 {
        let total: u64 = self.arcs.iter().map(|&c| c as u64).sum::<u64>()
            + self
                .terminals
                .iter()
                .map(|&(s, t)| s as u64 + t as u64)
                .sum::<u64>();
        total + 1
    }

    /// Terminal capacities with seeds turned into "infinite" links.
    fn terminal_caps(&self, node: usize) -> (u64, u64) {
        let inf = self.infinity();
        let (s, t) = self.terminals[node];
        let s = if self.source_seeds.contains(&node) { inf } else { s as u64 };
        let t = if self.sink_seeds.contains(&node) { inf } else { t as u64 };
        (s, t)
    }

    /// Capacity of the cut induced by `labels`.
    pub fn cut_capacity(&self, labels: &[Segment]) -> u64 {
        let topology = GridTopology::new(self.size).unwrap();
        let mut value = 0u64;
        for node in 0..self.len() {
            let (s, t) = self.terminal_caps(node);
            match labels[node] {
                Segment::Source => {
                    value += t;
                    for dir in GridTopology::<D>::directions() {
                        if let Some(next) = topology.neighbor(node, dir) {
                            if labels[next] == Segment::Sink {
                                value += self.arcs[GridTopology::<D>::arc_index(node, dir)] as u64;
                            }
                        }
                    }
                }
                Segment::Sink => value += s,
            }
        }
        value
    }

    /// Max flow via Edmonds-Karp on a dense residual matrix.
    pub fn reference_max_flow(&self) -> u64 {
        let topology = GridTopology::new(self.size).unwrap();
        let n = self.len();
        let source = n;
        let sink = n + 1;
        let total = n + 2;
        let mut cap = vec![vec![0u64; total]; total];
        for node in 0..n {
            let (s, t) = self.terminal_caps(node);
            cap[source][node] += s;
            cap[node][sink] += t;
            for dir in GridTopology::<D>::directions() {
                if let Some(next) = topology.neighbor(node, dir) {
                    cap[node][next] += self.arcs[GridTopology::<D>::arc_index(node, dir)] as u64;
                }
            }
        }

        let mut flow = 0u64;
        loop {
            let mut parent = vec![usize::MAX; total];
            parent[source] = source;
            let mut queue = VecDeque::from([source]);
            while let Some(u) = queue.pop_front() {
                for v in 0..total {
                    if parent[v] == usize::MAX && cap[u][v] > 0 {
                        parent[v] = u;
                        queue.push_back(v);
                    }
                }
            }
            if parent[sink] == usize::MAX {
                return flow;
            }
            let mut bottleneck = u64::MAX;
            let mut v = sink;
            while v != source {
                let u = parent[v];
                bottleneck = bottleneck.min(cap[u][v]);
                v = u;
            }
            let mut v = sink;
            while v != source {
                let u = parent[v];
                cap[u][v] -= bottleneck;
                cap[v][u] += bottleneck;
                v = u;
            }
            flow += bottleneck;
        }
    }

    /// Minimum cut by enumerating every labelling of the non-seed nodes.
    pub fn brute_force_min_cut(&self) -> u64 {
        let free: Vec<usize> = (0..self.len())
            .filter(|i| !self.source_seeds.contains(i) && !self.sink_seeds.contains(i))
            .collect();
        assert!(free.len() <= 16, "brute force limited to tiny grids");
        let mut labels = vec![Segment::Sink; self.len()];
        for &s in &self.source_seeds {
            labels[s] = Segment::Source;
        }
        let mut best = u64::MAX;
        for mask in 0u32..(1 << free.len()) {
            for (bit, &node) in free.iter().enumerate() {
                labels[node] = if mask >> bit & 1 == 1 { Segment::Source } else { Segment::Sink };
            }
            best = best.min(self.cut_capacity(&labels));
        }
        best
    }
}

/// All coordinates of a grid in flat index order.
pub fn all_nodes<const D: usize>(size: [usize; D]) -> Vec<NodeId<D>> {
    let topology = GridTopology::new(size).unwrap();
    (0..topology.len()).map(|i| topology.try_coords(i).unwrap()).collect()
}

/// Set both arcs of every neighbour pair to `capacity`.
pub fn uniform_edges<const D: usize>(cut: &mut GraphCut<f64, D>, capacity: f64) {
    cut.fill_edges_with(|_, _| capacity).unwrap();
}

/// Direction helper for readability in tests.
pub fn dir(axis: usize, positive: bool) -> Direction {
    Direction::new(axis, positive)
}
