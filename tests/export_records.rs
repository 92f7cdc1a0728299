// tests/export_records.rs
use std::fs;
use std::path::PathBuf;

use paygrid_scrape::TransactionRecord;
use paygrid_scrape::config::ExportOptions;
use paygrid_scrape::config::options::{ColumnSet, ExportFormat};
use paygrid_scrape::csv::parse_rows;
use paygrid_scrape::file::{export_records, write_json};
use paygrid_scrape::record::{BASE_COLUMNS, ENRICHMENT_COLUMNS, Enrichment, ID_COLUMN};

fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("paygrid_export_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

fn export_to(dir: &PathBuf) -> ExportOptions {
    let mut opts = ExportOptions::default();
    opts.set_path(&format!("{}/", dir.display()));
    opts
}

fn records() -> Vec<TransactionRecord> {
    vec![
        TransactionRecord::new("15-01-2025 10:00", "T1", "0700", "1,000", "ACCEPTED"),
        TransactionRecord::new("15-01-2025 10:05", "", "0701", "200", "ACCEPTED"),
        TransactionRecord::new("16-01-2025 08:00", "T2", "0702", "300", "REFUSED"),
    ]
}

#[test]
fn base_export_drops_records_without_id() {
    let dir = tmp_dir("base");
    let opts = export_to(&dir);

    let (path, rows) = export_records(&opts, &records(), "20250131_120000").unwrap();

    assert_eq!(rows, 2);
    assert!(path.ends_with("transactions_20250131_120000.csv"));
    let text = fs::read_to_string(&path).unwrap();
    let parsed = parse_rows(&text, ',');
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[0], BASE_COLUMNS);
    assert_eq!(parsed[1], ["15-01-2025 10:00", "T1", "0700", "1,000", "ACCEPTED"]);
    assert_eq!(parsed[2][1], "T2");
}

#[test]
fn enrichment_widens_the_columns() {
    let dir = tmp_dir("extended");
    let opts = export_to(&dir);
    let mut recs = records();
    recs[0].enrichment = Some(Enrichment {
        payment_method: "OM".into(),
        currency: "XOF".into(),
        business_name: "Corner Shop".into(),
        ..Default::default()
    });

    let (path, _) = export_records(&opts, &recs, "stamp").unwrap();
    let parsed = parse_rows(&fs::read_to_string(&path).unwrap(), ',');

    let width = BASE_COLUMNS.len() + ENRICHMENT_COLUMNS.len();
    assert!(parsed.iter().all(|r| r.len() == width));
    assert_eq!(parsed[0][5], "payment_method");
    assert_eq!(parsed[1][5], "OM");
    assert_eq!(parsed[1][9], "Corner Shop");
    // unenriched rows get blank enrichment cells
    assert!(parsed[2][5..].iter().all(String::is_empty));
}

#[test]
fn base_column_set_ignores_enrichment() {
    let dir = tmp_dir("forced_base");
    let mut opts = export_to(&dir);
    opts.columns = ColumnSet::Base;
    let mut recs = records();
    recs[0].enrichment = Some(Enrichment::default());

    let (path, _) = export_records(&opts, &recs, "stamp").unwrap();
    let parsed = parse_rows(&fs::read_to_string(&path).unwrap(), ',');
    assert!(parsed.iter().all(|r| r.len() == BASE_COLUMNS.len()));
}

#[test]
fn ids_only_writes_one_column() {
    let dir = tmp_dir("ids");
    let mut opts = export_to(&dir);
    opts.columns = ColumnSet::IdsOnly;
    let mut recs = records();
    recs[0].enrichment = Some(Enrichment::default());

    let (path, rows) = export_records(&opts, &recs, "20250131_120000").unwrap();

    assert_eq!(rows, 2);
    assert!(path.ends_with("transaction_ids_20250131_120000.csv"));
    let parsed = parse_rows(&fs::read_to_string(&path).unwrap(), ',');
    assert_eq!(parsed, [vec![ID_COLUMN], vec!["T1"], vec!["T2"]]);
}

#[test]
fn ids_only_with_nothing_found_still_writes_the_header() {
    let dir = tmp_dir("ids_empty");
    let mut opts = export_to(&dir);
    opts.columns = ColumnSet::IdsOnly;

    let (path, rows) = export_records(&opts, &[], "stamp").unwrap();

    assert_eq!(rows, 0);
    assert_eq!(parse_rows(&fs::read_to_string(&path).unwrap(), ','), [vec![ID_COLUMN]]);
}

#[test]
fn tsv_without_headers_to_named_file() {
    let dir = tmp_dir("tsv");
    let mut opts = ExportOptions::default();
    opts.set_path(dir.join("january.csv").to_str().unwrap());
    opts.format = ExportFormat::Tsv;
    opts.include_headers = false;

    let (path, rows) = export_records(&opts, &records(), "ignored").unwrap();

    assert_eq!(rows, 2);
    assert!(path.ends_with("january.tsv"));
    let parsed = parse_rows(&fs::read_to_string(&path).unwrap(), '\t');
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0][3], "1,000");
}

#[test]
fn json_dump_reads_back() {
    let dir = tmp_dir("json");
    let path = dir.join("nested").join("run.json");
    let mut recs = records();
    recs[2].partition = Some("225".into());

    write_json(&path, &recs).unwrap();

    let back: Vec<TransactionRecord> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, recs);
}
