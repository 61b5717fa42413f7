use chrono::Datelike;
use serde::Serialize;

use crate::{
    record::ShipmentRecord,
    schema::{FeatureRow, FeatureSchema, FeatureValue},
};

/// Model-ready attributes: the record minus its raw dates, plus calendar features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Origin warehouse, unchanged.
    pub origin_warehouse: String,
    /// Destination, unchanged.
    pub destination: String,
    /// Carrier, unchanged.
    pub carrier: String,
    /// Weight in kilograms.
    pub weight_kg: f64,
    /// Shipping cost.
    pub cost: f64,
    /// Distance in miles.
    pub distance_miles: u32,
    /// Quoted transit days.
    pub transit_days: u32,
    /// Delivery date minus shipment date in whole days. Negative when inverted.
    pub planned_days: i64,
    /// Day of month of the shipment date.
    pub ship_day: u32,
    /// Month of the shipment date (1-12).
    pub ship_month: u32,
    /// Year of the shipment date.
    pub ship_year: i32,
}

/// Derives the feature vector for one record.
///
/// Total over every date pair: an inverted pair yields negative `planned_days`
/// and is passed through unchanged.
#[must_use]
pub fn derive_features(record: &ShipmentRecord) -> FeatureVector {
    let planned_days = record
        .delivery_date
        .signed_duration_since(record.shipment_date)
        .num_days();
    FeatureVector {
        origin_warehouse: record.origin.clone(),
        destination: record.destination.clone(),
        carrier: record.carrier.clone(),
        weight_kg: record.weight_kg,
        cost: record.cost,
        distance_miles: record.distance_miles,
        transit_days: record.transit_days,
        planned_days,
        ship_day: record.shipment_date.day(),
        ship_month: record.shipment_date.month(),
        ship_year: record.shipment_date.year(),
    }
}

impl FeatureVector {
    /// Lays the vector out as a row in the order of [`FeatureSchema::shipment`].
    #[must_use]
    pub fn to_row(&self) -> FeatureRow {
        let values = [
            FeatureValue::Text(self.origin_warehouse.clone()),
            FeatureValue::Text(self.destination.clone()),
            FeatureValue::Text(self.carrier.clone()),
            FeatureValue::Float(self.weight_kg),
            FeatureValue::Float(self.cost),
            FeatureValue::Integer(i64::from(self.distance_miles)),
            FeatureValue::Integer(i64::from(self.transit_days)),
            FeatureValue::Integer(self.planned_days),
            FeatureValue::Integer(i64::from(self.ship_day)),
            FeatureValue::Integer(i64::from(self.ship_month)),
            FeatureValue::Integer(i64::from(self.ship_year)),
        ];
        let mut row = FeatureRow::default();
        for ((name, _), value) in FeatureSchema::SHIPMENT_COLUMNS.iter().zip(values) {
            row.push(*name, value);
        }
        row
    }
}
