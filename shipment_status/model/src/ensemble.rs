use std::path::Path;

use indexmap::IndexSet;
use shipment_features::{ColumnKind, FeatureRow, FeatureSchema, FeatureValue};
use tracing::{debug, info};

use crate::{
    artifact::{ModelArtifact, ModelMetadata, NodeSpec, TreeSpec},
    error::{ModelError, ModelResult},
    predictor::StatusModel,
};

/// How tree margins become a class code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Two classes; code 1 when the sigmoid of the margin exceeds 0.5.
    BinaryLogistic,
    /// `num_class` classes; trees are assigned round-robin and the largest
    /// class margin wins.
    MultiSoftmax {
        /// Number of classes.
        num_class: usize,
    },
}

impl Objective {
    fn parse(name: &str, num_class: Option<usize>) -> ModelResult<Self> {
        match name {
            "binary:logistic" => Ok(Self::BinaryLogistic),
            "multi:softmax" => match num_class {
                Some(num_class) if num_class >= 2 => Ok(Self::MultiSoftmax { num_class }),
                Some(num_class) => Err(ModelError::invalid(format!(
                    "multi:softmax needs at least 2 classes, got {num_class}"
                ))),
                None => Err(ModelError::invalid("multi:softmax requires num_class")),
            },
            other => Err(ModelError::UnsupportedObjective(other.to_owned())),
        }
    }

    const fn groups(self) -> usize {
        match self {
            Self::BinaryLogistic => 1,
            Self::MultiSoftmax { num_class } => num_class,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        column: usize,
        threshold: f64,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn compile(index: usize, spec: &TreeSpec, schema: &FeatureSchema) -> ModelResult<Self> {
        if spec.nodes.is_empty() {
            return Err(ModelError::invalid(format!("tree {index} has no nodes")));
        }
        let len = spec.nodes.len();
        let nodes = spec
            .nodes
            .iter()
            .enumerate()
            .map(|(node_idx, node)| match node {
                NodeSpec::Leaf { leaf } => {
                    if leaf.is_finite() {
                        Ok(Node::Leaf(*leaf))
                    } else {
                        Err(ModelError::invalid(format!(
                            "tree {index} node {node_idx}: leaf is not finite"
                        )))
                    }
                }
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let column = schema.position(feature).ok_or_else(|| {
                        ModelError::invalid(format!(
                            "tree {index} node {node_idx}: unknown feature {feature:?}"
                        ))
                    })?;
                    if !threshold.is_finite() {
                        return Err(ModelError::invalid(format!(
                            "tree {index} node {node_idx}: threshold is not finite"
                        )));
                    }
                    // children must point forward so traversal always terminates
                    for child in [*left, *right] {
                        if child <= node_idx || child >= len {
                            return Err(ModelError::invalid(format!(
                                "tree {index} node {node_idx}: child {child} out of range"
                            )));
                        }
                    }
                    Ok(Node::Split {
                        column,
                        threshold: *threshold,
                        left: *left,
                        right: *right,
                        default_left: *default_left,
                    })
                }
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self { nodes })
    }

    fn score(&self, encoded: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    column,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = encoded[*column];
                    let go_left = if value.is_nan() {
                        *default_left
                    } else {
                        value < *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// Gradient-boosted tree classifier compiled from a [`ModelArtifact`].
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    metadata: ModelMetadata,
    schema: FeatureSchema,
    /// Category tables indexed by column position; `None` for numeric columns.
    encoders: Vec<Option<IndexSet<String>>>,
    objective: Objective,
    base_score: f64,
    trees: Vec<Tree>,
}

impl TreeEnsembleModel {
    /// Loads and compiles an artifact file.
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading model artifact");
        let model = Self::from_artifact(ModelArtifact::load(path)?)?;
        debug!(schema = %model.schema, "model artifact compiled");
        Ok(model)
    }

    /// Validates and compiles a parsed artifact.
    pub fn from_artifact(artifact: ModelArtifact) -> ModelResult<Self> {
        let ModelArtifact {
            metadata,
            schema,
            encoders: encoder_specs,
            booster,
        } = artifact;

        if schema.columns.is_empty() {
            return Err(ModelError::invalid("schema has no columns"));
        }

        let mut encoders: Vec<Option<IndexSet<String>>> = vec![None; schema.columns.len()];
        for (name, spec) in &encoder_specs {
            let position = schema
                .position(name)
                .ok_or_else(|| ModelError::invalid(format!("encoder for unknown column {name:?}")))?;
            if schema.columns[position].kind != ColumnKind::Categorical {
                return Err(ModelError::invalid(format!(
                    "encoder given for non-categorical column {name:?}"
                )));
            }
            let categories: IndexSet<String> = spec.categories.iter().cloned().collect();
            if categories.len() != spec.categories.len() {
                return Err(ModelError::invalid(format!(
                    "encoder for {name:?} lists a category twice"
                )));
            }
            encoders[position] = Some(categories);
        }
        for (column, encoder) in schema.columns.iter().zip(&encoders) {
            if column.kind == ColumnKind::Categorical && encoder.is_none() {
                return Err(ModelError::invalid(format!(
                    "categorical column {:?} has no encoder",
                    column.name
                )));
            }
        }

        let objective = Objective::parse(&booster.objective, booster.num_class)?;
        if !booster.base_score.is_finite() {
            return Err(ModelError::invalid("base_score is not finite"));
        }
        if objective == Objective::BinaryLogistic
            && !(booster.base_score > 0.0 && booster.base_score < 1.0)
        {
            return Err(ModelError::invalid(format!(
                "binary:logistic base_score must lie in (0, 1), got {}",
                booster.base_score
            )));
        }
        if booster.trees.is_empty() {
            return Err(ModelError::invalid("booster has no trees"));
        }
        if booster.trees.len() % objective.groups() != 0 {
            return Err(ModelError::invalid(format!(
                "{} trees cannot be split evenly across {} classes",
                booster.trees.len(),
                objective.groups()
            )));
        }
        let trees = booster
            .trees
            .iter()
            .enumerate()
            .map(|(index, spec)| Tree::compile(index, spec, &schema))
            .collect::<ModelResult<Vec<_>>>()?;

        Ok(Self {
            metadata,
            schema,
            encoders,
            objective,
            base_score: booster.base_score,
            trees,
        })
    }

    /// Artifact metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Objective the trees were trained for.
    #[must_use]
    pub const fn objective(&self) -> Objective {
        self.objective
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Converts a row into the numeric vector the trees read.
    ///
    /// The row is checked against the model schema first even when a
    /// [`crate::Predictor`] already did so: splits index the encoded vector by
    /// column position, and `StatusModel::predict` is callable without a
    /// predictor in front of it.
    pub fn encode(&self, row: &FeatureRow) -> ModelResult<Vec<f64>> {
        self.schema.validate_row(row)?;
        Ok(row
            .cells
            .iter()
            .zip(&self.encoders)
            .map(|(cell, encoder)| match (&cell.value, encoder) {
                (FeatureValue::Text(text), Some(categories)) => categories
                    .get_index_of(text)
                    .map_or(f64::NAN, |idx| idx as f64),
                (FeatureValue::Text(_), None) => f64::NAN,
                (FeatureValue::Integer(value), _) => *value as f64,
                (FeatureValue::Float(value), _) => *value,
            })
            .collect())
    }

    /// Raw margin per class group (one entry for binary objectives).
    #[must_use]
    pub fn margins(&self, encoded: &[f64]) -> Vec<f64> {
        let groups = self.objective.groups();
        let start = match self.objective {
            Objective::BinaryLogistic => (self.base_score / (1.0 - self.base_score)).ln(),
            Objective::MultiSoftmax { .. } => self.base_score,
        };
        let mut margins = vec![start; groups];
        for (idx, tree) in self.trees.iter().enumerate() {
            margins[idx % groups] += tree.score(encoded);
        }
        margins
    }

    fn classify(&self, margins: &[f64]) -> i64 {
        match self.objective {
            Objective::BinaryLogistic => {
                let probability = 1.0 / (1.0 + (-margins[0]).exp());
                i64::from(probability > 0.5)
            }
            Objective::MultiSoftmax { .. } => {
                let mut best = 0;
                for (idx, margin) in margins.iter().enumerate() {
                    if *margin > margins[best] {
                        best = idx;
                    }
                }
                best as i64
            }
        }
    }
}

impl StatusModel for TreeEnsembleModel {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn metadata(&self) -> Option<&ModelMetadata> {
        Some(&self.metadata)
    }

    fn predict(&self, row: &FeatureRow) -> ModelResult<i64> {
        let encoded = self.encode(row)?;
        let margins = self.margins(&encoded);
        let code = self.classify(&margins);
        debug!(?margins, code, "ensemble evaluated");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{BoosterSpec, CategoryEncoder};
    use indexmap::IndexMap;
    use shipment_features::Column;
    use std::path::PathBuf;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            name: "toy".into(),
            version: 1,
            columns: vec![
                Column {
                    name: "Carrier".into(),
                    kind: ColumnKind::Categorical,
                },
                Column {
                    name: "Planned_Days".into(),
                    kind: ColumnKind::Integer,
                },
            ],
        }
    }

    fn split(feature: &str, threshold: f64, default_left: bool) -> NodeSpec {
        NodeSpec::Split {
            feature: feature.into(),
            threshold,
            left: 1,
            right: 2,
            default_left,
        }
    }

    fn stump(feature: &str, threshold: f64, left: f64, right: f64) -> TreeSpec {
        TreeSpec {
            nodes: vec![
                split(feature, threshold, true),
                NodeSpec::Leaf { leaf: left },
                NodeSpec::Leaf { leaf: right },
            ],
        }
    }

    fn artifact(trees: Vec<TreeSpec>) -> ModelArtifact {
        let mut encoders = IndexMap::new();
        encoders.insert(
            "Carrier".to_string(),
            CategoryEncoder {
                categories: vec!["DHL".into(), "FedEx".into(), "UPS".into()],
            },
        );
        ModelArtifact {
            metadata: ModelMetadata::default(),
            schema: schema(),
            encoders,
            booster: BoosterSpec {
                objective: "binary:logistic".into(),
                base_score: 0.5,
                num_class: None,
                trees,
            },
        }
    }

    fn row(carrier: &str, planned: i64) -> FeatureRow {
        let mut row = FeatureRow::default();
        row.push("Carrier", FeatureValue::Text(carrier.into()));
        row.push("Planned_Days", FeatureValue::Integer(planned));
        row
    }

    #[test]
    fn binary_model_thresholds_margin() {
        let model = TreeEnsembleModel::from_artifact(artifact(vec![stump(
            "Planned_Days",
            0.5,
            2.0,
            -2.0,
        )]))
        .unwrap();
        assert_eq!(model.predict(&row("FedEx", -3)).unwrap(), 1);
        assert_eq!(model.predict(&row("FedEx", 4)).unwrap(), 0);
    }

    #[test]
    fn categories_encode_by_position_and_unseen_is_missing() {
        let model = TreeEnsembleModel::from_artifact(artifact(vec![stump(
            "Carrier", 1.5, -1.0, 1.0,
        )]))
        .unwrap();
        let encoded = model.encode(&row("UPS", 0)).unwrap();
        assert_eq!(encoded, vec![2.0, 0.0]);
        assert!(model.encode(&row("Pony Express", 0)).unwrap()[0].is_nan());
        // FedEx (1) < 1.5 goes left; UPS (2) goes right
        assert_eq!(model.predict(&row("FedEx", 0)).unwrap(), 0);
        assert_eq!(model.predict(&row("UPS", 0)).unwrap(), 1);
        // unseen follows default_left
        assert_eq!(model.predict(&row("", 0)).unwrap(), 0);
    }

    #[test]
    fn missing_values_follow_default_direction() {
        let mut spec = artifact(vec![]);
        spec.booster.trees = vec![TreeSpec {
            nodes: vec![
                split("Carrier", 0.5, false),
                NodeSpec::Leaf { leaf: -1.0 },
                NodeSpec::Leaf { leaf: 1.0 },
            ],
        }];
        let model = TreeEnsembleModel::from_artifact(spec).unwrap();
        assert_eq!(model.predict(&row("Unknown Co", 0)).unwrap(), 1);
    }

    #[test]
    fn margins_sum_trees_over_base_score() {
        let mut spec = artifact(vec![
            stump("Planned_Days", 0.5, 0.25, 0.0),
            stump("Planned_Days", 0.5, 0.5, 0.0),
        ]);
        spec.booster.base_score = 0.5;
        let model = TreeEnsembleModel::from_artifact(spec).unwrap();
        let margins = model.margins(&model.encode(&row("DHL", 0)).unwrap());
        assert_eq!(margins.len(), 1);
        assert!((margins[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn multiclass_picks_largest_group() {
        let mut spec = artifact(vec![
            stump("Planned_Days", 0.5, 0.1, 0.0),
            stump("Planned_Days", 0.5, 0.0, 0.2),
            stump("Planned_Days", 0.5, 0.9, 0.0),
        ]);
        spec.booster.objective = "multi:softmax".into();
        spec.booster.num_class = Some(3);
        spec.booster.base_score = 0.0;
        let model = TreeEnsembleModel::from_artifact(spec).unwrap();
        assert_eq!(model.objective(), Objective::MultiSoftmax { num_class: 3 });
        assert_eq!(model.predict(&row("DHL", 0)).unwrap(), 2);
        assert_eq!(model.predict(&row("DHL", 9)).unwrap(), 1);
    }

    #[test]
    fn rejects_invalid_artifacts() {
        let cases: Vec<(ModelArtifact, &str)> = vec![
            (artifact(vec![]), "no trees"),
            (
                artifact(vec![stump("Ship_Day", 1.0, 0.0, 0.0)]),
                "unknown feature",
            ),
            (
                artifact(vec![TreeSpec { nodes: vec![] }]),
                "has no nodes",
            ),
            (
                artifact(vec![TreeSpec {
                    nodes: vec![
                        NodeSpec::Split {
                            feature: "Planned_Days".into(),
                            threshold: 0.0,
                            left: 0,
                            right: 1,
                            default_left: true,
                        },
                        NodeSpec::Leaf { leaf: 0.0 },
                    ],
                }]),
                "out of range",
            ),
            (
                artifact(vec![TreeSpec {
                    nodes: vec![NodeSpec::Leaf { leaf: f64::NAN }],
                }]),
                "not finite",
            ),
        ];
        for (spec, needle) in cases {
            let err = TreeEnsembleModel::from_artifact(spec).unwrap_err();
            assert!(err.to_string().contains(needle), "{err} should mention {needle}");
        }
    }

    #[test]
    fn rejects_encoder_problems() {
        let mut spec = artifact(vec![stump("Planned_Days", 0.5, 0.0, 0.0)]);
        spec.encoders.clear();
        let err = TreeEnsembleModel::from_artifact(spec).unwrap_err();
        assert!(err.to_string().contains("has no encoder"));

        let mut spec = artifact(vec![stump("Planned_Days", 0.5, 0.0, 0.0)]);
        spec.encoders.insert(
            "Planned_Days".into(),
            CategoryEncoder {
                categories: vec!["1".into()],
            },
        );
        let err = TreeEnsembleModel::from_artifact(spec).unwrap_err();
        assert!(err.to_string().contains("non-categorical"));

        let mut spec = artifact(vec![stump("Planned_Days", 0.5, 0.0, 0.0)]);
        spec.encoders["Carrier"].categories.push("DHL".into());
        let err = TreeEnsembleModel::from_artifact(spec).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn rejects_bad_objectives() {
        let mut spec = artifact(vec![stump("Planned_Days", 0.5, 0.0, 0.0)]);
        spec.booster.objective = "reg:squarederror".into();
        assert!(matches!(
            TreeEnsembleModel::from_artifact(spec),
            Err(ModelError::UnsupportedObjective(_))
        ));

        let mut spec = artifact(vec![stump("Planned_Days", 0.5, 0.0, 0.0)]);
        spec.booster.base_score = 1.0;
        assert!(TreeEnsembleModel::from_artifact(spec).is_err());

        let mut spec = artifact(vec![stump("Planned_Days", 0.5, 0.0, 0.0)]);
        spec.booster.objective = "multi:softmax".into();
        spec.booster.num_class = Some(2);
        let err = TreeEnsembleModel::from_artifact(spec).unwrap_err();
        assert!(err.to_string().contains("split evenly"));
    }

    #[test]
    fn rejects_rows_off_schema() {
        let model = TreeEnsembleModel::from_artifact(artifact(vec![stump(
            "Planned_Days",
            0.5,
            0.0,
            0.0,
        )]))
        .unwrap();
        let mut bad = row("DHL", 1);
        bad.cells[1].value = FeatureValue::Float(1.0);
        assert!(matches!(model.predict(&bad), Err(ModelError::Schema(_))));
    }

    #[test]
    fn short_rows_fail_instead_of_reading_past_the_end() {
        let model = TreeEnsembleModel::from_artifact(artifact(vec![stump(
            "Planned_Days",
            0.5,
            0.0,
            0.0,
        )]))
        .unwrap();
        let mut short = FeatureRow::default();
        short.push("Carrier", FeatureValue::Text("DHL".into()));
        assert!(matches!(model.predict(&short), Err(ModelError::Schema(_))));
    }

    #[test]
    fn bundled_artifact_compiles() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../models/shipment_status.json");
        let model = TreeEnsembleModel::load(path).unwrap();
        assert_eq!(model.schema(), &FeatureSchema::shipment());
        assert_eq!(model.objective(), Objective::BinaryLogistic);
        assert!(model.tree_count() > 0);
        assert_eq!(model.metadata().name, "shipment_status_gbt");
    }
}
