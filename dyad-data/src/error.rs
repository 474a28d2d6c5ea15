//! Error types for snapshot and edge loading.

use crate::types::ShapeError;
use thiserror::Error;

/// Errors that can occur while reading frames or edge lists from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PLY parsing error: {0}")]
    Ply(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing property '{property}' at vertex {vertex}")]
    MissingProperty { property: String, vertex: usize },

    #[error("Invalid snapshot: {0}")]
    Shape(#[from] ShapeError),
}
