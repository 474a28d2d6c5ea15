//! Error types for loss evaluation.

use dyad_data::{EdgeError, ShapeError};
use thiserror::Error;

/// Errors that abort a loss evaluation before any numeric work runs.
///
/// None of these are transient: the same inputs fail the same way, so callers
/// usually skip the term for the current step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LossError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(#[from] ShapeError),

    #[error("Edge {edge} references point {index}, but only {bound} points are aligned")]
    IndexOutOfRange { edge: usize, index: u32, bound: usize },

    #[error("Length mismatch: {0}")]
    LengthMismatch(#[from] EdgeError),

    #[error("Invalid loss configuration: {0}")]
    InvalidConfig(String),
}
