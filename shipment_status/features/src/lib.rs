#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Shipment input records, the model feature schema, and feature derivation.

/// Raw shipment attributes as submitted through the form.
pub mod record;

/// Versioned column schema shared with the trained model.
pub mod schema;

/// Calendar feature derivation.
pub mod derive;

pub use derive::{derive_features, FeatureVector};
pub use record::ShipmentRecord;
pub use schema::{
    Column, ColumnKind, FeatureRow, FeatureSchema, FeatureValue, SchemaError,
    SHIPMENT_SCHEMA_NAME, SHIPMENT_SCHEMA_VERSION,
};
