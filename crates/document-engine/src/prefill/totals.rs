//! Subtotal, GST and total derived from a document's amount column

use jobpack_types::{round_cents, FieldValue, RenderModel};

/// Australian GST
pub const GST_RATE: f64 = 0.10;

/// Totals computed from table amounts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub gst: f64,
    pub total: f64,
}

impl Totals {
    pub fn from_subtotal(subtotal: f64) -> Self {
        let subtotal = round_cents(subtotal);
        let gst = round_cents(subtotal * GST_RATE);
        Self {
            subtotal,
            gst,
            total: round_cents(subtotal + gst),
        }
    }
}

/// Sum of the first table column named `amount`, or `None` when the
/// document has no such column
pub fn amount_sum(model: &RenderModel) -> Option<f64> {
    let table = model
        .sections
        .iter()
        .filter_map(|s| s.table.as_ref())
        .find(|t| t.column("amount").is_some())?;

    Some(
        table
            .rows
            .iter()
            .filter_map(|row| row.get("amount").and_then(FieldValue::as_number))
            .sum(),
    )
}

/// Write `subtotal`, `gst` and `total` wherever those fields exist.
/// Returns the computed totals, or `None` when nothing could be summed.
pub fn apply_totals(model: &mut RenderModel) -> Option<Totals> {
    let totals = Totals::from_subtotal(amount_sum(model)?);

    for section in &mut model.sections {
        for (id, value) in [
            ("subtotal", totals.subtotal),
            ("gst", totals.gst),
            ("total", totals.total),
        ] {
            if let Some(field) = section.field_mut(id) {
                field.value = FieldValue::Number(value);
            }
        }
    }
    Some(totals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gst_is_ten_percent() {
        let totals = Totals::from_subtotal(1234.5);
        assert_eq!(totals.subtotal, 1234.5);
        assert_eq!(totals.gst, 123.45);
        assert_eq!(totals.total, 1357.95);
    }

    #[test]
    fn test_zero_subtotal() {
        let totals = Totals::from_subtotal(0.0);
        assert_eq!(totals.total, 0.0);
    }
}
