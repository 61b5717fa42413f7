use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Schema name the shipment classifier was trained against.
pub const SHIPMENT_SCHEMA_NAME: &str = "shipment_status";
/// Current schema version. Bump when columns change.
pub const SHIPMENT_SCHEMA_VERSION: u32 = 1;

/// Column value type as seen by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Free text encoded by the model's category table.
    Categorical,
    /// Real-valued measure.
    Float,
    /// Whole-number measure.
    Integer,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Categorical => "categorical",
            Self::Float => "float",
            Self::Integer => "integer",
        })
    }
}

/// Named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Column {
    /// Column name as used during training.
    pub name: String,
    /// Value type.
    pub kind: ColumnKind,
}

impl Column {
    fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
        }
    }
}

/// Ordered column list identifying the input contract of a trained model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureSchema {
    /// Schema family name.
    pub name: String,
    /// Schema version within the family.
    pub version: u32,
    /// Columns in model input order.
    pub columns: Vec<Column>,
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.name, self.version)
    }
}

impl FeatureSchema {
    /// Column names of the shipment schema, in order.
    pub const SHIPMENT_COLUMNS: [(&'static str, ColumnKind); 11] = [
        ("Origin_Warehouse", ColumnKind::Categorical),
        ("Destination", ColumnKind::Categorical),
        ("Carrier", ColumnKind::Categorical),
        ("Weight_kg", ColumnKind::Float),
        ("Cost", ColumnKind::Float),
        ("Distance_miles", ColumnKind::Integer),
        ("Transit_Days", ColumnKind::Integer),
        ("Planned_Days", ColumnKind::Integer),
        ("Ship_Day", ColumnKind::Integer),
        ("Ship_Month", ColumnKind::Integer),
        ("Ship_Year", ColumnKind::Integer),
    ];

    /// The schema the shipment classifier was trained on.
    #[must_use]
    pub fn shipment() -> Self {
        Self {
            name: SHIPMENT_SCHEMA_NAME.to_owned(),
            version: SHIPMENT_SCHEMA_VERSION,
            columns: Self::SHIPMENT_COLUMNS
                .iter()
                .map(|(name, kind)| Column::new(name, *kind))
                .collect(),
        }
    }

    /// Position of a column by name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Fails unless `other` describes exactly the same contract.
    pub fn ensure_compatible(&self, other: &Self) -> Result<(), SchemaError> {
        if self == other {
            Ok(())
        } else {
            Err(SchemaError::Incompatible {
                expected: self.to_string(),
                found: other.to_string(),
                detail: first_difference(self, other),
            })
        }
    }

    /// Checks a row's column names and value kinds against this schema.
    pub fn validate_row(&self, row: &FeatureRow) -> Result<(), SchemaError> {
        if row.cells.len() != self.columns.len() {
            return Err(SchemaError::ColumnCount {
                expected: self.columns.len(),
                found: row.cells.len(),
            });
        }
        for (position, (column, cell)) in self.columns.iter().zip(&row.cells).enumerate() {
            if column.name != cell.name {
                return Err(SchemaError::ColumnName {
                    position,
                    expected: column.name.clone(),
                    found: cell.name.clone(),
                });
            }
            if column.kind != cell.value.kind() {
                return Err(SchemaError::KindMismatch {
                    column: column.name.clone(),
                    expected: column.kind,
                    found: cell.value.kind(),
                });
            }
        }
        Ok(())
    }
}

fn first_difference(expected: &FeatureSchema, found: &FeatureSchema) -> String {
    if expected.name != found.name {
        return format!("schema name {:?} != {:?}", expected.name, found.name);
    }
    if expected.version != found.version {
        return format!("version {} != {}", expected.version, found.version);
    }
    for (position, (left, right)) in expected.columns.iter().zip(&found.columns).enumerate() {
        if left != right {
            return format!(
                "column {position}: {} ({}) != {} ({})",
                left.name, left.kind, right.name, right.kind
            );
        }
    }
    format!(
        "column count {} != {}",
        expected.columns.len(),
        found.columns.len()
    )
}

/// Single cell value handed to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Categorical text.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Real number.
    Float(f64),
}

impl FeatureValue {
    /// Column kind this value satisfies.
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Self::Text(_) => ColumnKind::Categorical,
            Self::Integer(_) => ColumnKind::Integer,
            Self::Float(_) => ColumnKind::Float,
        }
    }
}

/// Named cell within a [`FeatureRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCell {
    /// Column name.
    pub name: String,
    /// Cell value.
    pub value: FeatureValue,
}

/// Single-row model input with named, ordered cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    /// Cells in model input order.
    pub cells: Vec<FeatureCell>,
}

impl FeatureRow {
    /// Appends a cell.
    pub fn push(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.cells.push(FeatureCell {
            name: name.into(),
            value,
        });
    }
}

/// Schema contract violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Two schemas describe different contracts.
    #[error("schema {found} is incompatible with {expected}: {detail}")]
    Incompatible {
        /// Schema the caller requires.
        expected: String,
        /// Schema that was offered.
        found: String,
        /// First observed difference.
        detail: String,
    },
    /// Row width differs from the schema.
    #[error("expected {expected} columns, row has {found}")]
    ColumnCount {
        /// Column count in the schema.
        expected: usize,
        /// Cell count in the row.
        found: usize,
    },
    /// Row column at `position` has the wrong name.
    #[error("column {position} should be {expected:?}, row has {found:?}")]
    ColumnName {
        /// Zero-based position.
        position: usize,
        /// Name in the schema.
        expected: String,
        /// Name in the row.
        found: String,
    },
    /// Row value has the wrong type for its column.
    #[error("column {column:?} expects {expected} values, got {found}")]
    KindMismatch {
        /// Column name.
        column: String,
        /// Kind in the schema.
        expected: ColumnKind,
        /// Kind of the supplied value.
        found: ColumnKind,
    },
}
