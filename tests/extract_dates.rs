// tests/extract_dates.rs
use chrono::NaiveDate;

use paygrid_scrape::config::{ClientDateFilter, ScraperConfig};
use paygrid_scrape::driver::PageDriver;
use paygrid_scrape::driver::memory::{MemoryDriver, MemoryPage, MemoryRow, MemorySite, Role};
use paygrid_scrape::engine::extract::RowExtractor;
use paygrid_scrape::engine::{DateRange, FilterApplier, FilterSpec, PartitionOrchestrator};

fn d(s: &str) -> NaiveDate { NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap() }

fn january() -> DateRange { DateRange::new(d("2025-01-01"), d("2025-01-31")).unwrap() }

fn dated_rows() -> MemoryPage {
    let dates = [
        ("31-12-2024 23:59", "T-dec"),
        ("01-01-2025 00:00", "T-first"),
        ("15-01-2025 12:30", "T-mid"),
        ("31-01-2025 23:59", "T-last"),
        ("01-02-2025 00:00", "T-feb"),
        ("not a date", "T-garbled"),
    ];
    MemoryPage::new(dates.iter().map(|(date, id)| MemoryRow::new(date, id, "0700", "100", "ACCEPTED")).collect())
}

fn run_with(policy: ClientDateFilter, date_control: bool) -> Vec<String> {
    let mut config = ScraperConfig::default().without_delays();
    config.client_date_filter = policy;
    let o = PartitionOrchestrator::new(config);
    let mut driver = MemoryDriver::with_table(MemorySite::new().with_grid("A", vec![dated_rows()]), &o.config().selectors);
    if !date_control {
        driver.remove(Role::DateRange);
    }
    let base = FilterSpec::default().with_date_range(january());
    let result = o.run(&mut driver, &["A".to_string()], &base, None, None);
    result.records.into_iter().map(|r| r.transaction_id).collect()
}

#[test]
fn client_check_keeps_inclusive_bounds() {
    assert_eq!(run_with(ClientDateFilter::Always, true), ["T-first", "T-mid", "T-last"]);
}

#[test]
fn auto_checks_only_when_the_date_control_was_not_set() {
    assert_eq!(run_with(ClientDateFilter::Auto, false), ["T-first", "T-mid", "T-last"]);
    // the page applied the range itself; rows are taken as served
    assert_eq!(run_with(ClientDateFilter::Auto, true).len(), 6);
}

#[test]
fn never_trusts_the_page_even_without_a_date_control() {
    assert_eq!(run_with(ClientDateFilter::Never, false).len(), 6);
}

fn loaded_grid(config: &ScraperConfig, page: MemoryPage) -> MemoryDriver {
    let mut driver = MemoryDriver::with_table(MemorySite::new().with_grid("A", vec![page]), &config.selectors);
    driver.navigate(&config.grid_url).unwrap();
    FilterApplier::new(config).apply(&mut driver, &FilterSpec::default().with_partition("A")).unwrap();
    driver
}

#[test]
fn payload_rows_are_enriched() {
    let config = ScraperConfig::default();
    let page = MemoryPage::new(vec![
        MemoryRow::new("15-01-2025 10:00", "T1", "0700", "100", "ACCEPTED")
            .with_payload(r#"{"payment_method":"OM","cpm_currency":"XOF","cpm_site_id":445160,"cpm_designation":"Order 7"}"#)
            .with_business_name("Corner Shop"),
        MemoryRow::new("15-01-2025 10:05", "T2", "0701", "200", "REFUSED"),
    ]);
    let mut driver = loaded_grid(&config, page);

    let records = RowExtractor::new(&config).extract(&mut driver, None).unwrap();

    assert_eq!(records.len(), 2);
    let e = records[0].enrichment.as_ref().expect("enriched");
    assert_eq!(e.payment_method, "OM");
    assert_eq!(e.currency, "XOF");
    assert_eq!(e.business_id, "445160");
    assert_eq!(e.designation, "Order 7");
    assert_eq!(e.business_name, "Corner Shop");
    assert!(records[1].enrichment.is_none());
    assert_eq!(records[1].status, "REFUSED");
}

#[test]
fn broken_payload_keeps_base_record() {
    let config = ScraperConfig::default();
    let page = MemoryPage::new(vec![
        MemoryRow::new("15-01-2025 10:00", "T1", "0700", "100", "ACCEPTED").with_payload("{not json"),
    ]);
    let mut driver = loaded_grid(&config, page);

    let records = RowExtractor::new(&config).extract(&mut driver, None).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_id, "T1");
    assert_eq!(records[0].amount, "100");
    assert!(records[0].enrichment.is_none());
}

#[test]
fn cell_text_is_whitespace_normalized() {
    let config = ScraperConfig::default();
    let page = MemoryPage::new(vec![MemoryRow::new(" 15-01-2025\n 10:00 ", "  T1 ", "07 00", "1 000", "ACCEPTED ")]);
    let mut driver = loaded_grid(&config, page);

    let records = RowExtractor::new(&config).extract(&mut driver, Some(&january())).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, "15-01-2025 10:00");
    assert_eq!(records[0].transaction_id, "T1");
    assert_eq!(records[0].status, "ACCEPTED");
}
