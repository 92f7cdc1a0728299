// src/record.rs
//! Canonical record shape. Column order here is the export order.

use serde::{Deserialize, Serialize};

pub const ID_COLUMN: &str = "transaction_id";

pub const BASE_COLUMNS: [&str; 5] = ["date", ID_COLUMN, "phone_number", "amount", "status"];

pub const ENRICHMENT_COLUMNS: [&str; 11] = [
    "payment_method", "currency", "error_message", "business_id", "business_name",
    "operator_id", "phone_prefix", "designation", "payment_config", "notify_url", "custom_field",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Grid-native text, e.g. `15-01-2025 10:32`.
    pub date: String,
    pub transaction_id: String,
    pub phone_number: String,
    pub amount: String,
    pub status: String,
    /// Partition key the record was scraped under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

/// Extra fields carried by the row's action payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub payment_method: String,
    pub currency: String,
    pub error_message: String,
    pub business_id: String,
    pub business_name: String,
    pub operator_id: String,
    pub phone_prefix: String,
    pub designation: String,
    pub payment_config: String,
    pub notify_url: String,
    pub custom_field: String,
}

impl Enrichment {
    /// Values in `ENRICHMENT_COLUMNS` order.
    pub fn cells(&self) -> [&str; 11] {
        [
            &self.payment_method, &self.currency, &self.error_message, &self.business_id,
            &self.business_name, &self.operator_id, &self.phone_prefix, &self.designation,
            &self.payment_config, &self.notify_url, &self.custom_field,
        ]
    }
}

impl TransactionRecord {
    pub fn new(
        date: impl Into<String>,
        transaction_id: impl Into<String>,
        phone_number: impl Into<String>,
        amount: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            transaction_id: transaction_id.into(),
            phone_number: phone_number.into(),
            amount: amount.into(),
            status: status.into(),
            partition: None,
            enrichment: None,
        }
    }

    pub fn has_id(&self) -> bool { !self.transaction_id.trim().is_empty() }

    /// One output row. With `extended`, enrichment columns follow (blank when absent).
    pub fn to_row(&self, extended: bool) -> Vec<String> {
        let mut row = vec![
            self.date.clone(),
            self.transaction_id.clone(),
            self.phone_number.clone(),
            self.amount.clone(),
            self.status.clone(),
        ];
        if extended {
            match &self.enrichment {
                Some(e) => row.extend(e.cells().iter().map(|c| c.to_string())),
                None => row.extend(std::iter::repeat_n(s!(), ENRICHMENT_COLUMNS.len())),
            }
        }
        row
    }
}

/// Header row matching `TransactionRecord::to_row`.
pub fn headers(extended: bool) -> Vec<String> {
    let mut h: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    if extended {
        h.extend(ENRICHMENT_COLUMNS.iter().map(|c| c.to_string()));
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_shapes_follow_headers() {
        let mut r = TransactionRecord::new("15-01-2025", "TX1", "0700", "1000", "ACCEPTED");
        assert_eq!(r.to_row(false).len(), headers(false).len());
        assert_eq!(r.to_row(true).len(), headers(true).len());

        r.enrichment = Some(Enrichment { currency: s!("XOF"), ..Default::default() });
        let row = r.to_row(true);
        assert_eq!(row[6], "XOF");
    }

    #[test]
    fn whitespace_id_is_not_an_id() {
        assert!(!TransactionRecord::new("", "  \t", "", "", "").has_id());
        assert!(TransactionRecord::new("", "X", "", "", "").has_id());
    }
}
