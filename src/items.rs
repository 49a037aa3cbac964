use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One raw line-item entry as submitted or stored.
///
/// The quantity is optional; an absent quantity means 1. This is the single
/// canonical shape: the legacy `[name, price]` / `[name, quantity, price]`
/// forms are resolved into it once, at the input boundary, by
/// [`ItemEntry::from_fields`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    pub price: String,
}

impl ItemEntry {
    /// Resolves a positional entry: with three or more fields the second is
    /// the quantity and the third the price, otherwise the second field is
    /// the price and the quantity is implicitly 1.
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        let name = fields.first()?.clone();
        match fields.len() {
            1 => Some(Self {
                name,
                quantity: None,
                price: String::new(),
            }),
            2 => Some(Self {
                name,
                quantity: None,
                price: fields[1].clone(),
            }),
            _ => Some(Self {
                name,
                quantity: Some(fields[1].clone()),
                price: fields[2].clone(),
            }),
        }
    }
}

/// A normalized line item, computed in exact decimal arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Presentation form of a line item: price and total are fixed to two
/// decimal places, quantity is shown as an integer when it has no
/// fractional part.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    pub name: String,
    pub quantity: String,
    pub price: String,
    pub total: String,
}

impl LineItem {
    pub fn display(&self) -> DisplayItem {
        DisplayItem {
            name: self.name.clone(),
            quantity: format_quantity(self.quantity),
            price: format_amount(self.unit_price),
            total: format_amount(self.line_total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReceipt {
    pub items: Vec<LineItem>,
    pub total: Decimal,
}

impl NormalizedReceipt {
    pub fn display_items(&self) -> Vec<DisplayItem> {
        self.items.iter().map(LineItem::display).collect()
    }

    pub fn display_total(&self) -> String {
        format_amount(self.total)
    }
}

/// Normalizes raw entries into priced line items plus a grand total.
///
/// Total over arbitrary malformed input: non-numeric quantities and prices
/// coerce to zero, an omitted quantity defaults to 1, and the grand total is
/// recomputed as the sum of the per-line totals rather than trusted from
/// whatever the client submitted.
pub fn normalize(entries: &[ItemEntry]) -> NormalizedReceipt {
    let mut items = Vec::with_capacity(entries.len());
    let mut total = Decimal::ZERO;

    for entry in entries {
        let quantity = entry
            .quantity
            .as_deref()
            .map_or(Decimal::ONE, parse_amount);
        let unit_price = parse_amount(&entry.price);
        let line_total = quantity * unit_price;
        total += line_total;
        items.push(LineItem {
            name: entry.name.clone(),
            quantity,
            unit_price,
            line_total,
        });
    }

    NormalizedReceipt { items, total }
}

/// Lenient numeric coercion: anything unparseable becomes zero.
fn parse_amount(raw: &str) -> Decimal {
    Decimal::from_str(raw.trim()).unwrap_or(Decimal::ZERO)
}

pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

pub fn format_quantity(value: Decimal) -> String {
    // normalize() strips trailing zeros, so 3.00 prints as "3" and 2.50 as "2.5"
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fields: &[&str]) -> ItemEntry {
        let owned: Vec<String> = fields.iter().map(|f| (*f).to_owned()).collect();
        ItemEntry::from_fields(&owned).unwrap()
    }

    #[test]
    fn three_field_entry_uses_quantity_and_price() {
        let normalized = normalize(&[entry(&["Widget", "3", "10"])]);
        let display = normalized.display_items();
        assert_eq!(display[0].name, "Widget");
        assert_eq!(display[0].quantity, "3");
        assert_eq!(display[0].price, "10.00");
        assert_eq!(display[0].total, "30.00");
        assert_eq!(normalized.display_total(), "30.00");
    }

    #[test]
    fn two_field_entry_defaults_quantity_to_one() {
        let normalized = normalize(&[entry(&["Gadget", "7.5"])]);
        let display = normalized.display_items();
        assert_eq!(display[0].quantity, "1");
        assert_eq!(display[0].price, "7.50");
        assert_eq!(display[0].total, "7.50");
    }

    #[test]
    fn non_numeric_price_coerces_to_zero() {
        let normalized = normalize(&[entry(&["Bad", "abc"])]);
        let display = normalized.display_items();
        assert_eq!(display[0].price, "0.00");
        assert_eq!(display[0].total, "0.00");
        assert_eq!(normalized.total, Decimal::ZERO);
    }

    #[test]
    fn non_numeric_quantity_coerces_to_zero() {
        let normalized = normalize(&[entry(&["Odd", "many", "4"])]);
        assert_eq!(normalized.items[0].quantity, Decimal::ZERO);
        assert_eq!(normalized.display_total(), "0.00");
    }

    #[test]
    fn grand_total_is_sum_of_line_totals() {
        let entries = vec![
            entry(&["A", "2", "1.25"]),
            entry(&["B", "9.99"]),
            entry(&["C", "oops"]),
            entry(&["D", "0.5", "3"]),
        ];
        let normalized = normalize(&entries);
        let summed: Decimal = normalized.items.iter().map(|i| i.line_total).sum();
        assert_eq!(normalized.total, summed);
        assert_eq!(normalized.display_total(), "13.99");
    }

    #[test]
    fn fractional_quantity_displays_as_given() {
        let normalized = normalize(&[entry(&["Half", "2.5", "4"])]);
        let display = normalized.display_items();
        assert_eq!(display[0].quantity, "2.5");
        assert_eq!(display[0].total, "10.00");
    }

    #[test]
    fn single_field_entry_prices_at_zero() {
        let normalized = normalize(&[entry(&["Lonely"])]);
        assert_eq!(normalized.display_items()[0].total, "0.00");
    }

    #[test]
    fn empty_input_yields_zero_total() {
        let normalized = normalize(&[]);
        assert!(normalized.items.is_empty());
        assert_eq!(normalized.display_total(), "0.00");
    }

    #[test]
    fn entry_round_trips_through_json() {
        let entries = vec![entry(&["Widget", "3", "10"]), entry(&["Gadget", "7.5"])];
        let json = serde_json::to_string(&entries).unwrap();
        let back: Vec<ItemEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entries);
    }
}
