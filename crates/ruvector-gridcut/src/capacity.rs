//! Terminal and neighbour arc capacities.
//!
//! A [`CapacityStore`] holds two terminal capacities per node and one
//! directed capacity per arc slot. The same type stores both the capacities
//! supplied by the caller and the residual copy the engine mutates.

use crate::types::Capacity;

/// Flat per-node and per-arc capacity arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityStore<T> {
    source: Vec<T>,
    sink: Vec<T>,
    arcs: Vec<T>,
    arcs_per_node: usize,
}

impl<T: Capacity> CapacityStore<T> {
    /// Zero-capacity store for `nodes` nodes with `arcs_per_node` slots each.
    pub fn new(nodes: usize, arcs_per_node: usize) -> Self {
        Self {
            source: vec![T::ZERO; nodes],
            sink: vec![T::ZERO; nodes],
            arcs: vec![T::ZERO; nodes * arcs_per_node],
            arcs_per_node,
        }
    }

    /// Number of nodes.
    #[inline]
    pub fn nodes(&self) -> usize {
        self.source.len()
    }

    /// Arc slots per node.
    #[inline]
    pub fn arcs_per_node(&self) -> usize {
        self.arcs_per_node
    }

    /// Capacity of the `source -> node` link.
    #[inline]
    pub fn source(&self, node: usize) -> T {
        self.source[node]
    }

    /// Capacity of the `node -> sink` link.
    #[inline]
    pub fn sink(&self, node: usize) -> T {
        self.sink[node]
    }

    /// Set both terminal capacities of a node.
    #[inline]
    pub fn set_terminal(&mut self, node: usize, source: T, sink: T) {
        self.source[node] = source;
        self.sink[node] = sink;
    }

    /// Capacity of the arc stored in `slot`.
    #[inline]
    pub fn arc(&self, slot: usize) -> T {
        self.arcs[slot]
    }

    /// Overwrite the capacity of the arc stored in `slot`.
    #[inline]
    pub fn set_arc(&mut self, slot: usize, value: T) {
        self.arcs[slot] = value;
    }

    /// Move `amount` units from arc `forward` to its reverse arc.
    ///
    /// `amount` must not exceed the forward residual. The reverse arc
    /// saturates at the largest value of `T`.
    #[inline]
    pub fn push_arc(&mut self, forward: usize, reverse: usize, amount: T) {
        debug_assert!(amount <= self.arcs[forward], "push exceeds residual");
        self.arcs[forward] -= amount;
        self.arcs[reverse] = self.arcs[reverse].saturating_add(amount);
    }

    /// Reduce the source link of `node` by `amount`.
    #[inline]
    pub fn drain_source(&mut self, node: usize, amount: T) {
        debug_assert!(amount <= self.source[node]);
        self.source[node] -= amount;
    }

    /// Reduce the sink link of `node` by `amount`.
    #[inline]
    pub fn drain_sink(&mut self, node: usize, amount: T) {
        debug_assert!(amount <= self.sink[node]);
        self.sink[node] -= amount;
    }

    /// Overwrite this store with the contents of `other`, reusing buffers.
    pub fn copy_from(&mut self, other: &Self, parallel: bool) {
        self.arcs_per_node = other.arcs_per_node;
        self.source.clone_from(&other.source);
        self.sink.clone_from(&other.sink);
        if parallel && self.arcs.len() == other.arcs.len() {
            copy_parallel(&mut self.arcs, &other.arcs);
        } else {
            self.arcs.clone_from(&other.arcs);
        }
    }

    /// Sum of every terminal and arc capacity, or `None` if it does not
    /// fit in `T`.
    ///
    /// Bounds every residual, the flow value and any cut capacity.
    pub fn checked_total(&self) -> Option<T> {
        self.source
            .iter()
            .chain(self.sink.iter())
            .chain(self.arcs.iter())
            .try_fold(T::ZERO, |total, &c| total.checked_add(c))
    }

    /// Lossy sum of every capacity, for diagnostics.
    pub fn approximate_total(&self) -> f64 {
        self.source
            .iter()
            .chain(self.sink.iter())
            .chain(self.arcs.iter())
            .map(|&c| c.to_f64())
            .sum()
    }

    /// `true` if no stored capacity is negative.
    pub fn all_non_negative(&self) -> bool {
        self.source
            .iter()
            .chain(self.sink.iter())
            .chain(self.arcs.iter())
            .all(|&c| c >= T::ZERO)
    }
}

/// Elements copied per rayon task.
#[cfg(feature = "parallel")]
const COPY_CHUNK: usize = 1 << 14;

#[cfg(feature = "parallel")]
fn copy_parallel<T: Capacity>(dst: &mut [T], src: &[T]) {
    use rayon::prelude::*;
    dst.par_chunks_mut(COPY_CHUNK)
        .zip(src.par_chunks(COPY_CHUNK))
        .for_each(|(d, s)| d.copy_from_slice(s));
}

#[cfg(not(feature = "parallel"))]
fn copy_parallel<T: Capacity>(dst: &mut [T], src: &[T]) {
    dst.copy_from_slice(src);
}
