//! N-dimensional grid topology.
//!
//! Nodes are addressed either by their coordinate ([`NodeId`]) or by a flat
//! row-major index (the last axis varies fastest). Every node has `2 * D`
//! axis-aligned arc slots, one per [`Direction`]; slots that would leave the
//! grid are never materialised.

use std::fmt;

use crate::error::{GridCutError, Result};

/// Coordinate of a grid node.
pub type NodeId<const D: usize> = [usize; D];

/// Axis-aligned neighbour direction.
///
/// Encoded as `2 * axis + sign`, where sign `0` steps towards lower
/// coordinates and `1` towards higher ones, so the reverse direction is
/// `index ^ 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Direction(u8);

impl Direction {
    /// Largest axis a direction can address.
    pub const MAX_AXIS: usize = (u8::MAX >> 1) as usize;

    /// Direction along `axis`, towards higher coordinates if `positive`.
    ///
    /// # Panics
    ///
    /// If `axis` exceeds [`MAX_AXIS`](Self::MAX_AXIS); use
    /// [`try_new`](Self::try_new) for untrusted input.
    #[inline]
    pub const fn new(axis: usize, positive: bool) -> Self {
        assert!(axis <= Self::MAX_AXIS, "direction axis out of range");
        Direction((axis as u8) << 1 | positive as u8)
    }

    /// Direction along `axis`, or `None` if the axis cannot be encoded.
    #[inline]
    pub const fn try_new(axis: usize, positive: bool) -> Option<Self> {
        if axis <= Self::MAX_AXIS {
            Some(Direction((axis as u8) << 1 | positive as u8))
        } else {
            None
        }
    }

    /// Direction from its slot index.
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Direction(index as u8)
    }

    /// Slot index in `0..2 * D`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Axis the direction moves along.
    #[inline]
    pub const fn axis(self) -> usize {
        (self.0 >> 1) as usize
    }

    /// `true` when moving towards higher coordinates.
    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 & 1 == 1
    }

    /// The opposite direction.
    #[inline]
    pub const fn reverse(self) -> Self {
        Direction(self.0 ^ 1)
    }

    pub(crate) fn sign(self) -> char {
        if self.is_positive() {
            '+'
        } else {
            '-'
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign(), self.axis())
    }
}

/// Shape and addressing of a `D`-dimensional grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTopology<const D: usize> {
    size: [usize; D],
    strides: [usize; D],
    len: usize,
}

impl<const D: usize> GridTopology<D> {
    /// Number of arc slots per node.
    pub const NUM_DIRECTIONS: usize = 2 * D;

    /// Create the topology for a grid of the given size.
    ///
    /// A zero extent along any axis yields an empty grid; an empty grid is
    /// representable but cannot be solved.
    pub fn new(size: [usize; D]) -> Result<Self> {
        let mut strides = [0usize; D];
        let mut len = 1usize;
        for axis in (0..D).rev() {
            strides[axis] = len;
            len = len
                .checked_mul(size[axis])
                .ok_or_else(|| GridCutError::GridTooLarge(size.to_vec()))?;
        }
        if D == 0 {
            len = 0;
        }
        // arc storage must be addressable too
        len.checked_mul(Self::NUM_DIRECTIONS.max(1))
            .ok_or_else(|| GridCutError::GridTooLarge(size.to_vec()))?;
        Ok(Self { size, strides, len })
    }

    /// Extent along every axis.
    #[inline]
    pub fn size(&self) -> &[usize; D] {
        &self.size
    }

    /// Total number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the grid has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All `2 * D` directions in slot order.
    pub fn directions() -> impl Iterator<Item = Direction> {
        (0..Self::NUM_DIRECTIONS).map(Direction::from_index)
    }

    /// `true` iff every coordinate lies in `[0, size[d])`.
    #[inline]
    pub fn is_valid(&self, node: &NodeId<D>) -> bool {
        node.iter().zip(self.size.iter()).all(|(&c, &s)| c < s)
    }

    /// `true` iff stepping down along `axis` stays inside the grid.
    ///
    /// `false` for any `axis >= D`.
    #[inline]
    pub fn is_valid_lower_bound(&self, axis: usize, node: &NodeId<D>) -> bool {
        axis < D && node[axis] > 0
    }

    /// `true` iff stepping up along `axis` stays inside the grid.
    ///
    /// `false` for any `axis >= D`.
    #[inline]
    pub fn is_valid_upper_bound(&self, axis: usize, node: &NodeId<D>) -> bool {
        axis < D && node[axis] + 1 < self.size[axis]
    }

    /// Flat index of an in-bounds node.
    #[inline]
    pub(crate) fn index(&self, node: &NodeId<D>) -> usize {
        debug_assert!(self.is_valid(node), "node {node:?} outside {:?}", self.size);
        node.iter()
            .zip(self.strides.iter())
            .map(|(&c, &s)| c * s)
            .sum()
    }

    /// Flat index of `node`, or [`GridCutError::InvalidNode`].
    pub fn try_index(&self, node: &NodeId<D>) -> Result<usize> {
        if self.is_valid(node) {
            Ok(self.index(node))
        } else {
            Err(GridCutError::InvalidNode(node.to_vec()))
        }
    }

    /// Coordinate of a flat index, or `None` past the end of the grid.
    pub fn try_coords(&self, index: usize) -> Option<NodeId<D>> {
        (index < self.len).then(|| self.coords(index))
    }

    /// Coordinate of an in-bounds flat index.
    pub(crate) fn coords(&self, index: usize) -> NodeId<D> {
        debug_assert!(index < self.len);
        let mut node = [0usize; D];
        for axis in 0..D {
            node[axis] = (index / self.strides[axis]) % self.size[axis];
        }
        node
    }

    /// Flat index of the neighbour of `index` along `dir`, if it exists.
    #[inline]
    pub fn neighbor(&self, index: usize, dir: Direction) -> Option<usize> {
        let axis = dir.axis();
        if axis >= D {
            return None;
        }
        let stride = self.strides[axis];
        let coord = (index / stride) % self.size[axis];
        if dir.is_positive() {
            (coord + 1 < self.size[axis]).then(|| index + stride)
        } else {
            (coord > 0).then(|| index - stride)
        }
    }

    /// Neighbour of a flat index that is known to exist.
    #[inline]
    pub(crate) fn neighbor_unchecked(&self, index: usize, dir: Direction) -> usize {
        let stride = self.strides[dir.axis()];
        if dir.is_positive() {
            index + stride
        } else {
            index - stride
        }
    }

    /// Slot of the arc `index -> neighbor(index, dir)` in per-arc storage.
    #[inline]
    pub fn arc_index(index: usize, dir: Direction) -> usize {
        index * Self::NUM_DIRECTIONS + dir.index()
    }
}
