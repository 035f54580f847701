//! Error types for grid graph cuts

use thiserror::Error;

/// Result type for grid cut operations
pub type Result<T> = std::result::Result<T, GridCutError>;

/// Errors that can occur while configuring or solving a grid cut
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridCutError {
    /// Grid has no nodes
    #[error("Grid is empty")]
    EmptyGrid,

    /// No node is connected to the source
    #[error("No node is connected to the source")]
    NoSourceSeeds,

    /// No node is connected to the sink
    #[error("No node is connected to the sink")]
    NoSinkSeeds,

    /// Node coordinate outside the grid
    #[error("Invalid node: {0:?}")]
    InvalidNode(Vec<usize>),

    /// Arc leaves the grid
    #[error("Invalid edge from {node:?} along axis {axis} ({sign})")]
    InvalidEdge {
        /// Tail of the arc
        node: Vec<usize>,
        /// Axis of the arc
        axis: usize,
        /// `+` or `-`
        sign: char,
    },

    /// Capacity is negative, NaN or infinite
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Node declared as both a source and a sink seed
    #[error("Node {0:?} is already connected to the opposite terminal")]
    ConflictingSeed(Vec<usize>),

    /// Node or arc count overflows `usize`
    #[error("Grid of size {0:?} is too large")]
    GridTooLarge(Vec<usize>),

    /// Sum of all capacities exceeds the capacity type
    #[error("Total capacity {0} overflows the capacity type")]
    CapacityOverflow(String),

    /// Labels were queried before a successful solve
    #[error("Graph cut has not been solved")]
    NotSolved,

    /// Internal algorithm error
    #[error("Internal algorithm error: {0}")]
    InternalError(String),
}

impl From<String> for GridCutError {
    fn from(msg: String) -> Self {
        GridCutError::InternalError(msg)
    }
}

impl From<&str> for GridCutError {
    fn from(msg: &str) -> Self {
        GridCutError::InternalError(msg.to_string())
    }
}

impl GridCutError {
    /// Check if the error was caused by the problem setup rather than the solver
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            GridCutError::EmptyGrid
                | GridCutError::NoSourceSeeds
                | GridCutError::NoSinkSeeds
                | GridCutError::ConflictingSeed(_)
                | GridCutError::GridTooLarge(_)
                | GridCutError::CapacityOverflow(_)
        )
    }

    /// Check if the caller can fix the input and try again
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GridCutError::InternalError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(GridCutError::EmptyGrid.to_string(), "Grid is empty");
        assert_eq!(
            GridCutError::InvalidNode(vec![3, 4]).to_string(),
            "Invalid node: [3, 4]"
        );
        let err = GridCutError::InvalidEdge {
            node: vec![0],
            axis: 0,
            sign: '-',
        };
        assert_eq!(err.to_string(), "Invalid edge from [0] along axis 0 (-)");
    }

    #[test]
    fn test_error_from_str() {
        let err: GridCutError = "cycle".into();
        assert_eq!(err, GridCutError::InternalError("cycle".to_string()));
        assert_eq!(err.to_string(), "Internal algorithm error: cycle");
    }

    #[test]
    fn test_classification() {
        assert!(GridCutError::NoSourceSeeds.is_configuration_error());
        assert!(GridCutError::EmptyGrid.is_recoverable());
        assert!(GridCutError::CapacityOverflow("70000".into()).is_configuration_error());
        assert!(!GridCutError::NotSolved.is_configuration_error());
        assert!(!GridCutError::InternalError("x".into()).is_recoverable());
    }
}
