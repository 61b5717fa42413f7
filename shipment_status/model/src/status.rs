use std::fmt;

use serde::{Serialize, Serializer};

/// Shipment status predicted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipmentStatus {
    /// Class code 0.
    Delivered,
    /// Class code 1.
    Problematic,
    /// Any code the status table does not know.
    Unknown(i64),
}

impl ShipmentStatus {
    /// Maps a model class code. Total: unrecognised codes become [`Self::Unknown`].
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Delivered,
            1 => Self::Problematic,
            other => Self::Unknown(other),
        }
    }

    /// Plain label, e.g. `Delivered` or `Unknown(7)`.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Delivered => "Delivered".to_owned(),
            Self::Problematic => "Problematic".to_owned(),
            Self::Unknown(code) => format!("Unknown({code})"),
        }
    }

    /// Label with its fixed icon, as shown in the result card.
    #[must_use]
    pub fn decorated(self) -> String {
        let icon = match self {
            Self::Delivered => "\u{2705}",
            Self::Problematic => "\u{26a0}\u{fe0f}",
            Self::Unknown(_) => "\u{2754}",
        };
        format!("{icon} {}", self.label())
    }
}

impl From<i64> for ShipmentStatus {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for ShipmentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_fixed_labels() {
        assert_eq!(ShipmentStatus::from_code(0).label(), "Delivered");
        assert_eq!(ShipmentStatus::from_code(1).label(), "Problematic");
        assert_eq!(ShipmentStatus::from_code(0).decorated(), "\u{2705} Delivered");
        assert_eq!(
            ShipmentStatus::from_code(1).decorated(),
            "\u{26a0}\u{fe0f} Problematic"
        );
    }

    #[test]
    fn other_codes_fall_back_to_unknown() {
        for code in [2, -1, 42, i64::MAX, i64::MIN] {
            let status = ShipmentStatus::from(code);
            assert_eq!(status, ShipmentStatus::Unknown(code));
            assert_eq!(status.label(), format!("Unknown({code})"));
            assert!(status.decorated().ends_with(&format!("Unknown({code})")));
        }
    }

    #[test]
    fn only_codes_zero_and_one_are_known() {
        assert_eq!(ShipmentStatus::from_code(0), ShipmentStatus::Delivered);
        assert_eq!(ShipmentStatus::from_code(1), ShipmentStatus::Problematic);
        assert_ne!(ShipmentStatus::from_code(2), ShipmentStatus::Problematic);
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&ShipmentStatus::Unknown(3)).unwrap();
        assert_eq!(json, "\"Unknown(3)\"");
        assert_eq!(ShipmentStatus::Delivered.to_string(), "Delivered");
    }
}
