use chrono::NaiveDate;
use serde::Deserialize;
use shipment_features::ShipmentRecord;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw form submission. Every field arrives as text and may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShipmentForm {
    /// Origin warehouse.
    pub origin: String,
    /// Destination.
    pub destination: String,
    /// Carrier.
    pub carrier: String,
    /// Shipment date, `YYYY-MM-DD`.
    pub shipment_date: String,
    /// Delivery date, `YYYY-MM-DD`.
    pub delivery_date: String,
    /// Weight in kilograms.
    pub weight_kg: String,
    /// Cost.
    pub cost: String,
    /// Distance in miles.
    pub distance_miles: String,
    /// Transit days.
    pub transit_days: String,
}

/// Input rejected by the form widgets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// Field is not a number of the expected shape.
    #[error("{field}: {value:?} is not a valid number")]
    InvalidNumber {
        /// Field label.
        field: &'static str,
        /// Submitted text.
        value: String,
    },
    /// Field is numeric but below zero.
    #[error("{field}: must be zero or more, got {value}")]
    Negative {
        /// Field label.
        field: &'static str,
        /// Submitted text.
        value: String,
    },
    /// Field is not a calendar date.
    #[error("{field}: {value:?} is not a date (expected YYYY-MM-DD)")]
    InvalidDate {
        /// Field label.
        field: &'static str,
        /// Submitted text.
        value: String,
    },
}

impl FormError {
    /// Label of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidNumber { field, .. }
            | Self::Negative { field, .. }
            | Self::InvalidDate { field, .. } => *field,
        }
    }
}

impl ShipmentForm {
    /// Initial form state: empty text, zeros, both dates on `today`.
    #[must_use]
    pub fn defaults(today: NaiveDate) -> Self {
        Self::from_record(&ShipmentRecord::blank(today))
    }

    /// Form populated from an existing record.
    #[must_use]
    pub fn from_record(record: &ShipmentRecord) -> Self {
        Self {
            origin: record.origin.clone(),
            destination: record.destination.clone(),
            carrier: record.carrier.clone(),
            shipment_date: record.shipment_date.format(DATE_FORMAT).to_string(),
            delivery_date: record.delivery_date.format(DATE_FORMAT).to_string(),
            weight_kg: format!("{:.2}", record.weight_kg),
            cost: format!("{:.2}", record.cost),
            distance_miles: record.distance_miles.to_string(),
            transit_days: record.transit_days.to_string(),
        }
    }

    /// Builds the record for one submission.
    ///
    /// Blank numbers read as zero and blank dates as `today`; text is passed
    /// through untouched.
    pub fn to_record(&self, today: NaiveDate) -> Result<ShipmentRecord, FormError> {
        Ok(ShipmentRecord {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            carrier: self.carrier.clone(),
            shipment_date: parse_date("Shipment Date", &self.shipment_date, today)?,
            delivery_date: parse_date("Delivery Date", &self.delivery_date, today)?,
            weight_kg: parse_decimal("Weight (kg)", &self.weight_kg)?,
            cost: parse_decimal("Cost", &self.cost)?,
            distance_miles: parse_whole("Distance (miles)", &self.distance_miles)?,
            transit_days: parse_whole("Transit Days", &self.transit_days)?,
        })
    }
}

fn parse_date(field: &'static str, raw: &str, today: NaiveDate) -> Result<NaiveDate, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(today);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| FormError::InvalidDate {
        field,
        value: raw.to_owned(),
    })
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| FormError::InvalidNumber {
            field,
            value: raw.to_owned(),
        })?;
    if value < 0.0 {
        return Err(FormError::Negative {
            field,
            value: raw.to_owned(),
        });
    }
    Ok(value)
}

fn parse_whole(field: &'static str, raw: &str) -> Result<u32, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    let value = raw.parse::<i64>().map_err(|_| FormError::InvalidNumber {
        field,
        value: raw.to_owned(),
    })?;
    if value < 0 {
        return Err(FormError::Negative {
            field,
            value: raw.to_owned(),
        });
    }
    u32::try_from(value).map_err(|_| FormError::InvalidNumber {
        field,
        value: raw.to_owned(),
    })
}
