//! Error types for the command-line front end.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Load error: {0}")]
    Load(#[from] dyad_data::LoadError),

    #[error("Configuration error: {0}")]
    Config(#[from] dyad_train::LossError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
