use crate::items::ItemEntry;

/// The /generate and /download-pdf form, decoded from the ordered pair list
/// so the repeated `item_*` fields keep their row alignment.
#[derive(Debug, Clone, Default)]
pub struct ReceiptForm {
    pub business_name: String,
    pub client_name: String,
    pub client_email: String,
    pub entries: Vec<ItemEntry>,
}

impl ReceiptForm {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        let mut names = Vec::new();
        let mut quantities = Vec::new();
        let mut prices = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "business_name" => form.business_name = value,
                "client_name" => form.client_name = value,
                "client_email" => form.client_email = value,
                "item_name" => names.push(value),
                "item_quantity" => quantities.push(value),
                "item_price" => prices.push(value),
                _ => {}
            }
        }

        for (i, name) in names.into_iter().enumerate() {
            let price = prices.get(i).cloned().unwrap_or_default();
            if name.is_empty() && price.is_empty() {
                continue;
            }
            let quantity = quantities.get(i).cloned().filter(|q| !q.is_empty());
            form.entries.push(ItemEntry {
                name,
                quantity,
                price,
            });
        }

        form
    }
}
