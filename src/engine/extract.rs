// src/engine/extract.rs
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::ScraperConfig;
use crate::core::dates::parse_grid_date;
use crate::core::sanitize::{is_placeholder, normalize_ws};
use crate::driver::{DriverResult, ElementRef, PageDriver};
use crate::engine::filter::DateRange;
use crate::error::{Result, ScrapeError};
use crate::record::{Enrichment, TransactionRecord};

/// Payload carried by a row's action element. Every field is optional on the wire;
/// numbers and booleans are kept as their JSON text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Payload {
    #[serde(deserialize_with = "lenient")]
    payment_method: String,
    #[serde(deserialize_with = "lenient")]
    cpm_currency: String,
    #[serde(deserialize_with = "lenient")]
    cpm_error_message: String,
    #[serde(deserialize_with = "lenient")]
    cpm_site_id: String,
    #[serde(deserialize_with = "lenient")]
    cpm_payid: String,
    #[serde(deserialize_with = "lenient")]
    cpm_phone_prefixe: String,
    #[serde(deserialize_with = "lenient")]
    cpm_designation: String,
    #[serde(deserialize_with = "lenient")]
    cpm_payment_config: String,
    #[serde(deserialize_with = "lenient")]
    notify_url: String,
    #[serde(deserialize_with = "lenient")]
    custom_s3: String,
}

fn lenient<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => s!(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Decode a row payload into enrichment fields.
pub fn parse_enrichment(transaction_id: &str, raw: &str, business_name: Option<String>) -> Result<Enrichment> {
    let p: Payload = serde_json::from_str(raw).map_err(|source| ScrapeError::EnrichmentParse {
        transaction_id: transaction_id.to_string(),
        source,
    })?;
    Ok(Enrichment {
        payment_method: p.payment_method,
        currency: p.cpm_currency,
        error_message: p.cpm_error_message,
        business_id: p.cpm_site_id,
        business_name: business_name.unwrap_or_default(),
        operator_id: p.cpm_payid,
        phone_prefix: p.cpm_phone_prefixe,
        designation: p.cpm_designation,
        payment_config: p.cpm_payment_config,
        notify_url: p.notify_url,
        custom_field: p.custom_s3,
    })
}

/// Turns the rows of the page currently shown into records.
pub struct RowExtractor<'c> {
    config: &'c ScraperConfig,
}

impl<'c> RowExtractor<'c> {
    pub fn new(config: &'c ScraperConfig) -> Self { Self { config } }

    /// Rows in page order. Unhydrated rows and rows outside `date_filter`
    /// (inclusive) are dropped; a row whose date will not parse is dropped
    /// only when a filter is given.
    pub fn extract(&self, driver: &mut dyn PageDriver, date_filter: Option<&DateRange>) -> Result<Vec<TransactionRecord>> {
        let rows = self.config.selectors.grid_rows.find_all(driver)?;
        let mut out = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;

        for row in rows {
            match self.read_row(driver, row) {
                Ok(Some(rec)) => {
                    if let Some(range) = date_filter {
                        if !self.in_range(&rec, range) {
                            skipped += 1;
                            continue;
                        }
                    }
                    out.push(rec);
                }
                Ok(None) => skipped += 1,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "row unreadable, skipped");
                    skipped += 1;
                }
            }
        }

        tracing::debug!(records = out.len(), skipped, "page extracted");
        Ok(out)
    }

    fn in_range(&self, rec: &TransactionRecord, range: &DateRange) -> bool {
        match parse_grid_date(&rec.date, self.config.grid_date_formats.as_slice()) {
            Some(d) => range.contains(d),
            None => {
                tracing::debug!(id = %rec.transaction_id, date = %rec.date, "unparseable date under date filter");
                false
            }
        }
    }

    fn read_row(&self, driver: &mut dyn PageDriver, row: ElementRef) -> DriverResult<Option<TransactionRecord>> {
        let table = &self.config.selectors;
        let cols = &self.config.columns;

        let cells = driver.find_within(row, &table.row_cells)?;
        if cells.len() < cols.min_cells() {
            return Ok(None);
        }
        let mut cell = |i: usize| -> DriverResult<String> { Ok(normalize_ws(&driver.read_text(cells[i])?)) };

        let transaction_id = cell(cols.transaction_id)?;
        if is_placeholder(&transaction_id, &self.config.loading_placeholder) {
            return Ok(None);
        }
        let mut rec = TransactionRecord::new(
            cell(cols.date)?,
            transaction_id,
            cell(cols.phone_number)?,
            cell(cols.amount)?,
            cell(cols.status)?,
        );

        if let Some(action) = driver.find_within(row, &table.row_action)?.first().copied() {
            if let Some(raw) = driver.read_attribute(action, &table.payload_attr)? {
                let business = driver.read_attribute(action, &table.business_name_attr)?;
                match parse_enrichment(&rec.transaction_id, &raw, business) {
                    Ok(e) => rec.enrichment = Some(e),
                    Err(e) => tracing::warn!(error = %e, "keeping base record"),
                }
            }
        }

        Ok(Some(rec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_maps_site_keys_and_stringifies_scalars() {
        let raw = r#"{"payment_method":"OMCIV2","cpm_currency":"XOF","cpm_site_id":445160,
                      "cpm_payid":null,"custom_s3":true,"notify_url":"https://x/notify"}"#;
        let e = parse_enrichment("T1", raw, Some(s!("Shop"))).unwrap();
        assert_eq!(e.payment_method, "OMCIV2");
        assert_eq!(e.currency, "XOF");
        assert_eq!(e.business_id, "445160");
        assert_eq!(e.operator_id, "");
        assert_eq!(e.custom_field, "true");
        assert_eq!(e.business_name, "Shop");
    }

    #[test]
    fn broken_payload_names_the_row() {
        match parse_enrichment("T9", "{not json", None) {
            Err(ScrapeError::EnrichmentParse { transaction_id, .. }) => assert_eq!(transaction_id, "T9"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
