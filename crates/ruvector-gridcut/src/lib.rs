//! # RuVector GridCut
//!
//! Max-flow/min-cut segmentation of N-dimensional grids with the
//! Boykov-Kolmogorov augmenting-path algorithm.
//!
//! Every grid node is linked to its `2 * D` axis-aligned neighbours and to
//! the two terminals. Callers supply arc capacities (typically from image
//! gradients), soft terminal capacities (typically from intensity
//! likelihoods) and hard seeds; a solve labels every node as source side
//! (foreground) or sink side (background).
//!
//! ## Quick Start
//!
//! ```rust
//! use ruvector_gridcut::prelude::*;
//!
//! // 4x4 image split by a weak vertical boundary between columns 1 and 2.
//! let mut cut = GraphCut2d::<f64>::new([4, 4]).unwrap();
//! cut.fill_edges_with(|node, dir| {
//!     let crosses = dir.axis() == 1
//!         && ((node[1] == 1 && dir.is_positive()) || (node[1] == 2 && !dir.is_positive()));
//!     if crosses { 0.1 } else { 5.0 }
//! })
//! .unwrap();
//! cut.add_source_seed(&[0, 0]).unwrap();
//! cut.add_sink_seed(&[3, 3]).unwrap();
//!
//! cut.run().unwrap();
//! assert_eq!(cut.segment(&[2, 1]).unwrap(), Segment::Source);
//! assert_eq!(cut.segment(&[1, 2]).unwrap(), Segment::Sink);
//! assert!((cut.flow().unwrap() - 0.4).abs() < 1e-12);
//! ```
//!
//! ## Architecture
//!
//! - [`grid`]: coordinates, flat indices and neighbour directions
//! - [`capacity`]: terminal and arc capacities (original and residual)
//! - [`state`]: per-node tree membership, parents, distances, worklists
//! - [`base`]: the container the engine operates on
//! - `engine`: `grow`, `augment` and `adopt`
//! - [`graph_cut`]: the [`GraphCut`] façade and its builder
//!
//! ## Feature Flags
//!
//! - `parallel` - rayon for the per-node reset and labelling passes
//!   (enabled by default)

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod base;
pub mod capacity;
pub mod error;
pub mod graph_cut;
pub mod grid;
pub mod state;
pub mod types;

mod engine;

pub use base::GraphCutBase;
pub use capacity::CapacityStore;
pub use error::{GridCutError, Result};
pub use graph_cut::{GraphCut, GraphCut2d, GraphCut3d, GraphCutBuilder};
pub use grid::{Direction, GridTopology, NodeId};
pub use state::{NodeState, NodeStateStore, Parent, TreeFlag};
pub use types::{Capacity, GridCutConfig, RunStatus, Segment, SolveStats};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Capacity, Direction, GraphCut, GraphCut2d, GraphCut3d, GraphCutBuilder, GridCutConfig,
        GridCutError, NodeId, Result, RunStatus, Segment, SolveStats,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_roundtrip() {
        let mut cut = GraphCut3d::<u32>::builder([2, 2, 2])
            .source_seeds([[0, 0, 0]])
            .sink_seeds([[1, 1, 1]])
            .build()
            .unwrap();
        cut.fill_edges_with(|_, _| 1).unwrap();
        let status = cut.run().unwrap();
        assert!(status.did_work());
        // three disjoint unit paths leave the source corner
        assert_eq!(cut.flow().unwrap(), 3);
        assert_eq!(cut.cut_value().unwrap(), 3);
    }
}
