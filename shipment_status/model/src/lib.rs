#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Shipment status classifier: artifact loading, tree-ensemble inference, and
//! the code-to-status mapping shown to users.

/// Error types for loading and invoking models.
pub mod error;

/// On-disk model artifact document.
pub mod artifact;

/// Compiled gradient-boosted tree ensemble.
pub mod ensemble;

/// Predicted status and its display labels.
pub mod status;

/// Prediction entry point wrapping an injected model handle.
pub mod predictor;

pub use artifact::{ModelArtifact, ModelMetadata};
pub use ensemble::{Objective, TreeEnsembleModel};
pub use error::{ModelError, ModelResult};
pub use predictor::{Prediction, Predictor, StatusModel};
pub use status::ShipmentStatus;
