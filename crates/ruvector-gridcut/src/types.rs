//! Core types shared by the grid cut modules.
//!
//! Provides the [`Capacity`] numeric trait, the [`Segment`] label assigned
//! to every node after a solve, solver configuration and run statistics.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// Numeric type usable as an arc capacity.
///
/// Residual arithmetic only ever subtracts a value that is at most the
/// current residual. Additions are bounded by the sum of all capacities,
/// which [`GraphCut::run`](crate::GraphCut::run) checks with
/// [`checked_add`](Capacity::checked_add) before solving.
pub trait Capacity:
    Copy
    + Debug
    + Default
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + AddAssign
    + SubAssign
    + Send
    + Sync
    + 'static
{
    /// Additive identity.
    const ZERO: Self;

    /// `true` for non-negative, finite values.
    fn is_valid(self) -> bool;

    /// Lossy conversion used for statistics and logging.
    fn to_f64(self) -> f64;

    /// `self + other`, or `None` if the sum is not representable.
    fn checked_add(self, other: Self) -> Option<Self>;

    /// `self + other`, clamped to the largest representable value.
    fn saturating_add(self, other: Self) -> Self;

    /// `true` when the value is strictly positive.
    #[inline]
    fn is_positive(self) -> bool {
        self > Self::ZERO
    }

    /// Smaller of two values.
    #[inline]
    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }
}

macro_rules! impl_capacity_float {
    ($($t:ty),*) => {$(
        impl Capacity for $t {
            const ZERO: Self = 0.0;

            #[inline]
            fn is_valid(self) -> bool {
                self.is_finite() && self >= 0.0
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn checked_add(self, other: Self) -> Option<Self> {
                let sum = self + other;
                sum.is_finite().then_some(sum)
            }

            #[inline]
            fn saturating_add(self, other: Self) -> Self {
                (self + other).min(<$t>::MAX)
            }
        }
    )*};
}

macro_rules! impl_capacity_signed {
    ($($t:ty),*) => {$(
        impl Capacity for $t {
            const ZERO: Self = 0;

            #[inline]
            fn is_valid(self) -> bool {
                self >= 0
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn checked_add(self, other: Self) -> Option<Self> {
                <$t>::checked_add(self, other)
            }

            #[inline]
            fn saturating_add(self, other: Self) -> Self {
                <$t>::saturating_add(self, other)
            }
        }
    )*};
}

macro_rules! impl_capacity_unsigned {
    ($($t:ty),*) => {$(
        impl Capacity for $t {
            const ZERO: Self = 0;

            #[inline]
            fn is_valid(self) -> bool {
                true
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn checked_add(self, other: Self) -> Option<Self> {
                <$t>::checked_add(self, other)
            }

            #[inline]
            fn saturating_add(self, other: Self) -> Self {
                <$t>::saturating_add(self, other)
            }
        }
    )*};
}

impl_capacity_float!(f32, f64);
impl_capacity_signed!(i32, i64);
impl_capacity_unsigned!(u16, u32, u64);

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Side of the minimum cut a node ends up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// Connected to the source (foreground).
    Source,
    /// Connected to the sink (background).
    Sink,
}

impl Segment {
    /// The other side of the cut.
    pub fn opposite(self) -> Self {
        match self {
            Segment::Source => Segment::Sink,
            Segment::Sink => Segment::Source,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`GraphCut`](crate::GraphCut).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCutConfig {
    /// Use rayon for the per-node reset and labelling passes.
    pub parallel: bool,
    /// Minimum node count before the parallel passes kick in.
    pub parallel_threshold: usize,
    /// Label given to nodes that belong to neither tree after the solve.
    pub free_label: Segment,
    /// Check every tree for cycles after each solve, also in release builds.
    pub verify_trees: bool,
}

impl Default for GridCutConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 1 << 16,
            free_label: Segment::Sink,
            verify_trees: false,
        }
    }
}

impl GridCutConfig {
    /// Whether the bulk passes over `nodes` nodes should run on rayon.
    #[inline]
    pub(crate) fn use_parallel(&self, nodes: usize) -> bool {
        cfg!(feature = "parallel") && self.parallel && nodes >= self.parallel_threshold
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Counters collected during one solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Number of grid nodes.
    pub nodes: usize,
    /// Augmenting paths pushed (including direct terminal-to-terminal flow
    /// through a single node).
    pub augmentations: usize,
    /// Orphans popped from the orphan queue.
    pub orphans_processed: usize,
    /// Orphans that found no new parent and became free.
    pub nodes_freed: usize,
    /// Active nodes expanded by `grow`.
    pub grow_steps: usize,
    /// Maximum flow value.
    pub flow: f64,
    /// Wall time of the solve.
    pub wall_time: Duration,
}

/// Outcome of [`GraphCut::run`](crate::GraphCut::run).
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// The cut was recomputed.
    Solved(SolveStats),
    /// Nothing changed since the last solve; the previous labels stand.
    UpToDate,
}

impl RunStatus {
    /// `true` if this call performed a solve.
    pub fn did_work(&self) -> bool {
        matches!(self, RunStatus::Solved(_))
    }
}
