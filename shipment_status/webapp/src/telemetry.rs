use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::{json, Value};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use shipment_model::{ModelError, Prediction};

use crate::form::FormError;

/// Builder for [`PredictionTelemetry`].
pub struct PredictionTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
}

impl PredictionTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::default(),
        }
    }

    /// Sets the JSON-lines log path. Without one, only tracing output is produced.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the minimum level written to the log file.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Opens the log file, if any, and builds the handle.
    pub fn build(self) -> Result<PredictionTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::new(path)?.with_min_level(self.min_level)),
            None => None,
        };
        Ok(PredictionTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
            }),
        })
    }
}

/// Records the outcome of each form submission.
#[derive(Clone)]
pub struct PredictionTelemetry {
    inner: Arc<TelemetryInner>,
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
}

impl fmt::Debug for PredictionTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionTelemetry")
            .field("module", &self.inner.module)
            .field(
                "log_path",
                &self.inner.logger.as_ref().map(JsonLogger::path),
            )
            .finish()
    }
}

impl PredictionTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> PredictionTelemetryBuilder {
        PredictionTelemetryBuilder::new(module)
    }

    /// Handle that only emits tracing output.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                module: "webapp".into(),
                logger: None,
            }),
        }
    }

    /// Logs a served prediction with its derived features.
    pub fn prediction(&self, prediction: &Prediction) {
        tracing::info!(
            code = prediction.code,
            status = %prediction.status,
            planned_days = prediction.features.planned_days,
            "prediction served"
        );
        let metadata = serde_json::to_value(prediction)
            .unwrap_or_else(|err| json!({ "code": prediction.code, "error": err.to_string() }));
        self.write(LogLevel::Info, "prediction.completed", metadata);
    }

    /// Logs a submission refused by form validation.
    pub fn rejection(&self, error: &FormError) {
        tracing::info!(field = error.field(), %error, "submission rejected");
        self.write(
            LogLevel::Warn,
            "prediction.rejected",
            json!({ "field": error.field(), "error": error.to_string() }),
        );
    }

    /// Logs a prediction that failed inside the model.
    pub fn failure(&self, error: &ModelError) {
        tracing::error!(%error, "prediction failed");
        self.write(
            LogLevel::Error,
            "prediction.failed",
            json!({ "error": error.to_string() }),
        );
    }

    fn write(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
            if let Err(err) = logger.log(&record) {
                tracing::warn!(error = %err, path = %logger.path().display(), "prediction log write failed");
            }
        }
    }
}
