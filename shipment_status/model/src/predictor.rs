use std::{fmt, sync::Arc};

use serde::Serialize;
use shipment_features::{derive_features, FeatureRow, FeatureSchema, FeatureVector, ShipmentRecord};
use tracing::debug;

use crate::{artifact::ModelMetadata, error::ModelResult, status::ShipmentStatus};

/// A trained classifier that maps one feature row to a class code.
///
/// Implementations must be immutable across calls so one instance can serve
/// every session.
pub trait StatusModel: Send + Sync {
    /// Input contract the model was trained on.
    fn schema(&self) -> &FeatureSchema;

    /// Descriptive metadata, when the model carries any.
    fn metadata(&self) -> Option<&ModelMetadata> {
        None
    }

    /// Class code for a single row.
    fn predict(&self, row: &FeatureRow) -> ModelResult<i64>;
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Features handed to the model.
    pub features: FeatureVector,
    /// Raw class code.
    pub code: i64,
    /// Mapped status.
    pub status: ShipmentStatus,
}

/// Handle that turns shipment records into statuses.
///
/// Built once at startup around a loaded model and cloned into each request.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn StatusModel>,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("schema", &self.model.schema().to_string())
            .finish()
    }
}

impl Predictor {
    /// Wraps `model`, failing if it was trained on a different schema than `expected`.
    pub fn new(model: Arc<dyn StatusModel>, expected: &FeatureSchema) -> ModelResult<Self> {
        expected.ensure_compatible(model.schema())?;
        Ok(Self { model })
    }

    /// Shorthand for [`Predictor::new`] against [`FeatureSchema::shipment`].
    pub fn for_shipments(model: Arc<dyn StatusModel>) -> ModelResult<Self> {
        Self::new(model, &FeatureSchema::shipment())
    }

    /// Underlying model.
    #[must_use]
    pub fn model(&self) -> &dyn StatusModel {
        self.model.as_ref()
    }

    /// Runs the model on an already derived feature vector.
    ///
    /// The row is validated against the model's schema before invocation, so
    /// injected models that skip their own checks never see a malformed row.
    pub fn predict(&self, features: FeatureVector) -> ModelResult<Prediction> {
        let row = features.to_row();
        self.model.schema().validate_row(&row)?;
        let code = self.model.predict(&row)?;
        let status = ShipmentStatus::from_code(code);
        debug!(code, status = %status, planned_days = features.planned_days, "prediction");
        Ok(Prediction {
            features,
            code,
            status,
        })
    }

    /// Derives features from `record` and predicts its status.
    pub fn predict_record(&self, record: &ShipmentRecord) -> ModelResult<Prediction> {
        self.predict(derive_features(record))
    }
}
