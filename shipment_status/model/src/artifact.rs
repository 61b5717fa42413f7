use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use shipment_features::FeatureSchema;

use crate::error::{ModelError, ModelResult};

/// Descriptive fields carried by an artifact. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelMetadata {
    /// Model name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// When the training run finished, if recorded.
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
}

/// Ordered category table for one categorical column.
///
/// A value encodes as its index; values missing from the table encode as missing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryEncoder {
    /// Categories in encoding order.
    pub categories: Vec<String>,
}

/// One tree node: either a leaf score or a threshold split on a named column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    /// Terminal node contributing `leaf` to the margin.
    Leaf {
        /// Leaf score.
        leaf: f64,
    },
    /// Internal node: `value < threshold` goes left.
    Split {
        /// Column name the split reads.
        feature: String,
        /// Split threshold.
        threshold: f64,
        /// Node index taken when the value is below the threshold.
        left: usize,
        /// Node index taken otherwise.
        right: usize,
        /// Direction for missing values.
        #[serde(default)]
        default_left: bool,
    },
}

/// Flattened tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreeSpec {
    /// Nodes in index order.
    pub nodes: Vec<NodeSpec>,
}

/// Booster parameters and trees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoosterSpec {
    /// `binary:logistic` or `multi:softmax`.
    pub objective: String,
    /// Global bias: a probability for `binary:logistic`, a raw margin otherwise.
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    /// Class count for multiclass objectives.
    #[serde(default)]
    pub num_class: Option<usize>,
    /// Boosted trees in training order.
    pub trees: Vec<TreeSpec>,
}

const fn default_base_score() -> f64 {
    0.5
}

/// Trained model document as written by the training pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelArtifact {
    /// Descriptive metadata.
    #[serde(default)]
    pub metadata: ModelMetadata,
    /// Input contract the model was trained on.
    pub schema: FeatureSchema,
    /// Category tables keyed by column name.
    #[serde(default)]
    pub encoders: IndexMap<String, CategoryEncoder>,
    /// Tree ensemble.
    pub booster: BoosterSpec,
}

impl ModelArtifact {
    /// Reads and parses an artifact file.
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parses an artifact from JSON text.
    pub fn parse(contents: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}
