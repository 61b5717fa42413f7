#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Single-page shipment status form: configuration, form parsing, HTML
//! rendering, prediction telemetry, and the HTTP server tying them together.

/// TOML configuration with command-line overrides.
pub mod config;

/// Form submission parsing.
pub mod form;

/// HTML page rendering.
pub mod render;

/// HTTP routes and server lifecycle.
pub mod server;

/// Structured prediction log.
pub mod telemetry;

pub use config::{AppConfig, ConfigOverrides};
pub use form::{FormError, ShipmentForm};
pub use server::{router, run, AppState};
pub use telemetry::PredictionTelemetry;
