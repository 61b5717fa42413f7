use chrono::NaiveDate;

/// One shipment as entered by the user. Lives for a single prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRecord {
    /// Origin warehouse, kept exactly as typed.
    pub origin: String,
    /// Destination, kept exactly as typed.
    pub destination: String,
    /// Carrier name, kept exactly as typed.
    pub carrier: String,
    /// Date the shipment left the origin.
    pub shipment_date: NaiveDate,
    /// Planned delivery date. May precede `shipment_date`.
    pub delivery_date: NaiveDate,
    /// Weight in kilograms.
    pub weight_kg: f64,
    /// Shipping cost.
    pub cost: f64,
    /// Distance in miles.
    pub distance_miles: u32,
    /// Transit days quoted by the carrier.
    pub transit_days: u32,
}

impl ShipmentRecord {
    /// Record with empty text, zero measures, and both dates set to `today`.
    #[must_use]
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            origin: String::new(),
            destination: String::new(),
            carrier: String::new(),
            shipment_date: today,
            delivery_date: today,
            weight_kg: 0.0,
            cost: 0.0,
            distance_miles: 0,
            transit_days: 0,
        }
    }
}
