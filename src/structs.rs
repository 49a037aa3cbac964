use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::items::ItemEntry;

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub pwd_hash: String,
    pub created_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Receipt {
    pub id: i64,
    pub user_id: i64,
    pub client_name: String,
    /// JSON array of [`ItemEntry`] records.
    pub items: String,
    pub created_at: String,
    pub total: String,
}

impl Receipt {
    /// Deserializes the stored item list. Rows written before the tagged
    /// record format hold positional `[name, price]` / `[name, quantity,
    /// price]` arrays; those resolve through [`ItemEntry::from_fields`].
    /// Malformed rows decode to an empty list rather than failing the
    /// request.
    pub fn entries(&self) -> Vec<ItemEntry> {
        if let Ok(entries) = serde_json::from_str::<Vec<ItemEntry>>(&self.items) {
            return entries;
        }
        serde_json::from_str::<Vec<Vec<String>>>(&self.items)
            .map(|rows| {
                rows.iter()
                    .filter_map(|fields| ItemEntry::from_fields(fields))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Row shape for the history and recent-receipts listings.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct ReceiptSummary {
    pub id: i64,
    pub client_name: String,
    pub created_at: String,
    pub total: String,
}

/// Business display settings, kept in the session rather than the database.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BusinessSettings {
    pub business_name: String,
    pub business_email: String,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            business_name: "Your Business".to_owned(),
            business_email: String::new(),
        }
    }
}

/// Which optional navigation entries the templates may show. Replaces
/// runtime route introspection with explicit configuration.
#[derive(Serialize, Debug, Clone)]
pub struct Features {
    pub email_delivery: bool,
    pub pdf_download: bool,
    pub settings_page: bool,
}

impl Features {
    pub fn new(email_delivery: bool) -> Self {
        Self {
            email_delivery,
            pdf_download: true,
            settings_page: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FlashMessage {
    pub level: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt_with_items(items: &str) -> Receipt {
        Receipt {
            id: 1,
            user_id: 1,
            client_name: "ACME".to_owned(),
            items: items.to_owned(),
            created_at: "2026-08-23 12:00".to_owned(),
            total: "0.00".to_owned(),
        }
    }

    #[test]
    fn decodes_tagged_entries() {
        let receipt =
            receipt_with_items(r#"[{"name":"Widget","quantity":"3","price":"10"}]"#);
        let entries = receipt.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity.as_deref(), Some("3"));
    }

    #[test]
    fn decodes_legacy_positional_entries() {
        let receipt = receipt_with_items(r#"[["Widget","3","10"],["Gadget","7.5"]]"#);
        let entries = receipt.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].quantity.as_deref(), Some("3"));
        assert_eq!(entries[0].price, "10");
        assert_eq!(entries[1].quantity, None);
        assert_eq!(entries[1].price, "7.5");
    }

    #[test]
    fn malformed_items_decode_to_empty() {
        assert!(receipt_with_items("not json").entries().is_empty());
        assert!(receipt_with_items("{\"a\":1}").entries().is_empty());
    }
}
