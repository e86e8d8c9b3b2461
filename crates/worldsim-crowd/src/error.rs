//! Error types for the crowd model.

/// Errors that can occur while building a crowd model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrowdError {
    /// The grid has no cells.
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
