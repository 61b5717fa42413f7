use std::fmt::Write;

use shipment_model::ShipmentStatus;

use crate::form::ShipmentForm;

const PAGE_TITLE: &str = "Shipment Status Prediction";

const STYLE: &str = r"
:root {
    --primary-color: #2e7d32;
    --secondary-color: #66bb6a;
    --bg-color: #f0fdf4;
}
body {
    margin: 0;
    font-family: system-ui, sans-serif;
    background: var(--bg-color);
    display: flex;
    min-height: 100vh;
}
aside {
    width: 320px;
    padding: 24px;
    background: #ffffff;
    border-right: 1px solid #c8e6c9;
}
main {
    flex: 1;
    padding: 32px 48px;
    max-width: 720px;
}
h1, h2, h3 {
    color: var(--primary-color);
}
label {
    display: block;
    margin-top: 12px;
    font-size: 14px;
}
input {
    width: 100%;
    box-sizing: border-box;
    padding: 6px 8px;
    margin-top: 4px;
}
button {
    margin-top: 20px;
    background-color: var(--primary-color);
    color: white;
    border: none;
    border-radius: 12px;
    padding: 10px 24px;
    font-weight: bold;
    cursor: pointer;
    transition: 0.3s;
}
button:hover {
    background-color: var(--secondary-color);
    color: black;
}
.result-box {
    background: linear-gradient(135deg, #a5d6a7, #c8e6c9);
    padding: 20px;
    border-radius: 15px;
    text-align: center;
    font-size: 20px;
    font-weight: bold;
    color: #1b5e20;
    margin-top: 20px;
}
.result-box span {
    font-size: 28px;
}
.form-error {
    background: #ffebee;
    color: #b71c1c;
    padding: 16px;
    border-radius: 12px;
    margin-top: 20px;
}
";

/// What to show under the page header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Model produced a status.
    Predicted(ShipmentStatus),
    /// Form input was refused before prediction.
    Rejected(String),
}

#[derive(Clone, Copy)]
enum InputKind {
    Text,
    Date,
    Decimal,
    Whole,
}

impl InputKind {
    const fn attributes(self) -> &'static str {
        match self {
            Self::Text => r#"type="text""#,
            Self::Date => r#"type="date""#,
            Self::Decimal => r#"type="number" min="0" step="0.01""#,
            Self::Whole => r#"type="number" min="0" step="1""#,
        }
    }
}

fn fields(form: &ShipmentForm) -> [(&'static str, &'static str, InputKind, &str); 9] {
    [
        ("origin", "\u{1f3ed} Origin Warehouse", InputKind::Text, &form.origin),
        ("destination", "\u{1f3ec} Destination", InputKind::Text, &form.destination),
        ("carrier", "\u{1f69b} Carrier", InputKind::Text, &form.carrier),
        ("shipment_date", "\u{1f4c5} Shipment Date", InputKind::Date, &form.shipment_date),
        (
            "delivery_date",
            "\u{1f4e6} Delivery Date (optional)",
            InputKind::Date,
            &form.delivery_date,
        ),
        ("weight_kg", "\u{2696}\u{fe0f} Weight (kg)", InputKind::Decimal, &form.weight_kg),
        ("cost", "\u{1f4b2} Cost", InputKind::Decimal, &form.cost),
        (
            "distance_miles",
            "\u{1f6e3}\u{fe0f} Distance (miles)",
            InputKind::Whole,
            &form.distance_miles,
        ),
        ("transit_days", "\u{23f3} Transit Days", InputKind::Whole, &form.transit_days),
    ]
}

/// Renders the single page: input form, header, and optional outcome block.
#[must_use]
pub fn render_page(form: &ShipmentForm, outcome: Option<&Outcome>) -> String {
    let mut inputs = String::new();
    for (name, label, kind, value) in fields(form) {
        let _ = write!(
            inputs,
            r#"<label for="{name}">{label}<input id="{name}" name="{name}" {attrs} value="{value}"></label>"#,
            attrs = kind.attributes(),
            value = escape_html(value),
        );
        inputs.push('\n');
    }

    let outcome = match outcome {
        Some(Outcome::Predicted(status)) => format!(
            r#"<div class="result-box">📊 Predicted Shipment Status: <br> <span>{}</span></div>"#,
            escape_html(&status.decorated())
        ),
        Some(Outcome::Rejected(message)) => format!(
            r#"<div class="form-error">Could not read the form: {}</div>"#,
            escape_html(message)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{PAGE_TITLE}</title>
<link rel="icon" href="data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>%F0%9F%93%A6</text></svg>">
<style>{STYLE}</style>
</head>
<body>
<aside>
<h2>🔧 Input Shipment Details</h2>
<form method="post" action="/predict">
{inputs}<button type="submit">✨ Predict Status</button>
</form>
</aside>
<main>
<h1>📦 {PAGE_TITLE}</h1>
<p>🚚 <em>Fill in the shipment details to predict its status.</em></p>
{outcome}
</main>
</body>
</html>
"#
    )
}

/// Minimal page used when a prediction fails.
#[must_use]
pub fn render_error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{PAGE_TITLE}: error</title><style>{STYLE}</style></head>
<body><main>
<h1>Prediction failed</h1>
<div class="form-error">{}</div>
<p><a href="/">Back to the form</a></p>
</main></body>
</html>
"#,
        escape_html(message)
    )
}

/// Escapes text for use in element content and quoted attribute values.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
