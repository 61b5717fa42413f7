use std::path::PathBuf;

use shipment_features::SchemaError;
use thiserror::Error;

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while loading or invoking a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact file could not be read.
    #[error("reading model artifact {path:?}: {source}")]
    Io {
        /// Artifact location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Artifact is not valid JSON for the expected document shape.
    #[error("parsing model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// Artifact parsed but describes an unusable model.
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    /// Objective string not supported by the evaluator.
    #[error("unsupported objective {0:?}")]
    UnsupportedObjective(String),

    /// Model input contract does not match the caller's features.
    #[error("feature schema mismatch: {0}")]
    Schema(#[from] SchemaError),
}

impl ModelError {
    /// Creates an invalid artifact error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArtifact(msg.into())
    }
}
