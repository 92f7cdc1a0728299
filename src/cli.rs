// src/cli.rs
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::{Result, eyre};

use crate::config::consts::{DEBUG_LOG, DEFAULT_RANGE_DAYS, WEBDRIVER_URL};
use crate::config::options::{ColumnSet, ExportFormat};
use crate::config::{ClientDateFilter, ExportOptions, ScraperConfig, partitions};
use crate::driver::memory::{MemoryDriver, MemoryPage, MemoryRow, MemorySite};
use crate::driver::webdriver::{LaunchOptions, WebDriverSession};
use crate::engine::{DateRange, FilterSpec, PartitionOrchestrator, RunResult, StatusFilter, SummaryAggregator};
use crate::progress::Progress;

#[derive(Parser, Debug)]
#[command(name = "paygrid", version, about = "Scrape a filtered, paged transaction grid to CSV/TSV")]
pub struct Args {
    /// Countries to scrape, by dial code or name (repeat or comma-separate). Default: all known.
    #[arg(short, long = "country", value_delimiter = ',')]
    countries: Vec<String>,

    /// One pass without touching the country filter.
    #[arg(long, conflicts_with = "countries")]
    no_partition: bool,

    /// accepted | refused | all
    #[arg(long)]
    status: Option<StatusFilter>,

    /// Range start (YYYY-MM-DD).
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Range end (YYYY-MM-DD), inclusive.
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Last N days up to today, instead of --from/--to (default: 30).
    #[arg(long, conflicts_with_all = ["from", "to"])]
    days: Option<u32>,

    /// No date filter at all.
    #[arg(long, conflicts_with_all = ["from", "to", "days"])]
    all_dates: bool,

    /// Business name from --list-businesses, or a raw business id.
    #[arg(long)]
    business: Option<String>,

    /// Page limit per country.
    #[arg(long)]
    max_pages: Option<usize>,

    /// Re-check row dates client-side.
    #[arg(long, value_enum, default_value_t = DateCheck::Auto)]
    date_check: DateCheck,

    /// Output file or directory (trailing '/').
    #[arg(short, long)]
    out: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Base columns only, even when rows carry payload data.
    #[arg(long)]
    base_columns: bool,

    /// One transaction_id column; written (header only) even when nothing was found.
    #[arg(long, conflicts_with = "base_columns")]
    ids_only: bool,

    #[arg(long)]
    no_headers: bool,

    /// Also dump the records as JSON next to the export.
    #[arg(long)]
    json: bool,

    /// Grid page URL.
    #[arg(long, env = "PAYGRID_URL")]
    url: Option<String>,

    #[arg(long, env = "WEBDRIVER_URL", default_value = WEBDRIVER_URL)]
    webdriver: String,

    /// Chrome profile directory with a logged-in session.
    #[arg(long, env = "PAYGRID_PROFILE")]
    profile: Option<PathBuf>,

    #[arg(long)]
    headless: bool,

    /// Disable image loading.
    #[arg(long)]
    fast: bool,

    /// No pauses between pages and countries.
    #[arg(long)]
    no_delay: bool,

    /// Run against a built-in synthetic grid instead of a browser.
    #[arg(long)]
    demo: bool,

    #[arg(long)]
    list_countries: bool,

    /// Print the known businesses and exit.
    #[arg(long)]
    list_businesses: bool,

    /// -v debug, -vv trace.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Append logs to .store/debug.log as well.
    #[arg(long)]
    debug_log: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Tsv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DateCheck {
    Auto,
    Always,
    Never,
}

/// Prints one line per partition event to stderr.
struct CliProgress;

impl Progress for CliProgress {
    fn begin(&mut self, partitions: usize) {
        eprintln!("Scraping {partitions} partition(s)…");
    }
    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }
    fn partition_started(&mut self, key: &str) {
        eprintln!("→ {}", partitions::display_name(key));
    }
    fn page_done(&mut self, _key: &str, page: usize, records: usize) {
        eprintln!("   page {page}: {records} record(s)");
    }
    fn partition_done(&mut self, key: &str, records: usize, error: Option<&str>) {
        match error {
            Some(e) => eprintln!("✗ {}: {records} record(s) before failure: {e}", partitions::display_name(key)),
            None => eprintln!("✓ {}: {records} record(s)", partitions::display_name(key)),
        }
    }
}

pub fn run() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    crate::log::init(args.verbose, args.debug_log.then(|| Path::new(DEBUG_LOG)))?;

    if args.list_countries {
        for (name, code) in partitions::COUNTRIES {
            println!("{code},{name}");
        }
        return Ok(());
    }
    if args.list_businesses {
        for (name, id) in partitions::BUSINESSES {
            println!("{name},{id}");
        }
        return Ok(());
    }

    let keys = partition_keys(&args)?;
    let base = base_filters(&args)?;
    let orchestrator = PartitionOrchestrator::new(scraper_config(&args));
    let mut progress = CliProgress;

    let result = if args.demo {
        let driver = MemoryDriver::with_table(demo_site(&keys), &orchestrator.config().selectors);
        orchestrator.run_owned(driver, &keys, &base, args.max_pages, Some(&mut progress))
    } else {
        let launch = LaunchOptions {
            webdriver_url: args.webdriver.clone(),
            headless: args.headless,
            disable_images: args.fast,
            profile_dir: args.profile.clone(),
            ..Default::default()
        };
        let session = WebDriverSession::connect(&launch)?;
        orchestrator.run_owned(session, &keys, &base, args.max_pages, Some(&mut progress))
    };

    report(&args, &orchestrator, &result)
}

fn report(args: &Args, orchestrator: &PartitionOrchestrator, result: &RunResult) -> Result<()> {
    if result.records.is_empty() {
        eprintln!("No transactions collected.");
    }
    if !result.records.is_empty() || args.ids_only {
        let mut export = ExportOptions::default();
        if let Some(o) = &args.out { export.set_path(o); }
        export.format = match args.format { Format::Csv => ExportFormat::Csv, Format::Tsv => ExportFormat::Tsv };
        export.include_headers = !args.no_headers;
        if args.base_columns { export.columns = ColumnSet::Base; }
        if args.ids_only { export.columns = ColumnSet::IdsOnly; }

        let stamp = crate::file::timestamp();
        let (path, rows) = crate::file::export_records(&export, &result.records, &stamp)?;
        println!("Wrote {rows} row(s) to {}", path.display());
        if args.json {
            let json_path = path.with_extension("json");
            crate::file::write_json(&json_path, &result.records)?;
            println!("Wrote {}", json_path.display());
        }
    }

    let summary = SummaryAggregator::new(&orchestrator.config().grid_date_formats).summarize(&result.records);
    print!("{summary}");
    println!("Pages read: {}, rejected rows: {}", result.pages, result.rejected);

    for e in &result.errors {
        eprintln!("Partition {} failed: {}", partitions::display_name(&e.partition), e.reason);
    }
    match &result.aborted {
        Some(reason) => Err(eyre!("run aborted: {reason}")),
        None => Ok(()),
    }
}

fn partition_keys(args: &Args) -> Result<Vec<String>> {
    if args.no_partition {
        return Ok(Vec::new());
    }
    if args.countries.is_empty() {
        return Ok(partitions::all_country_codes());
    }
    args.countries.iter()
        .map(|c| partitions::resolve(c).map(str::to_string).ok_or_else(|| eyre!("unknown country: {c}")))
        .collect()
}

fn base_filters(args: &Args) -> Result<FilterSpec> {
    let mut spec = FilterSpec::default();
    if let Some(st) = args.status { spec = spec.with_status(st); }
    if let Some(b) = &args.business {
        let id = partitions::resolve_business(b).ok_or_else(|| eyre!("unknown business: {b}"))?;
        if !id.is_empty() { spec = spec.with_extra(id); }
    }

    let today = chrono::Local::now().date_naive();
    let range = match (args.from, args.to, args.days) {
        _ if args.all_dates => None,
        (Some(a), Some(b), _) => Some(DateRange::new(a, b)?),
        (_, _, Some(n)) => Some(DateRange::last_days(today, n)),
        _ => Some(DateRange::last_days(today, DEFAULT_RANGE_DAYS)),
    };
    if let Some(r) = range { spec = spec.with_date_range(r); }
    Ok(spec)
}

fn scraper_config(args: &Args) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    if let Some(u) = &args.url { config = config.with_grid_url(u.clone()); }
    if args.no_delay || args.demo { config = config.without_delays(); }
    config.client_date_filter = match args.date_check {
        DateCheck::Auto => ClientDateFilter::Auto,
        DateCheck::Always => ClientDateFilter::Always,
        DateCheck::Never => ClientDateFilter::Never,
    };
    config
}

/// A few pages per partition with the usual rough edges: a hydrating row,
/// a row repeated across pages, one malformed payload.
fn demo_site(keys: &[String]) -> MemorySite {
    let today = chrono::Local::now().date_naive();
    let row = |key: &str, n: usize| {
        let date = today - chrono::Days::new((n % 20) as u64);
        let status = if n % 4 == 0 { "REFUSED" } else { "ACCEPTED" };
        let payload = if n % 7 == 6 {
            s!("{broken")
        } else {
            format!(
                r#"{{"payment_method":"{}","cpm_currency":"XOF","cpm_site_id":{},"cpm_phone_prefixe":"{key}","cpm_designation":"order {n}"}}"#,
                if n % 2 == 0 { "OM" } else { "MOMO" },
                400000 + n
            )
        };
        MemoryRow::new(
            &format!("{} 10:{:02}", date.format("%d-%m-%Y"), n % 60),
            &format!("{key}-{n:05}"),
            &format!("07{:08}", n * 7919 % 100_000_000),
            &format!("{}", 100 * (n % 50 + 1)),
            status,
        )
        .with_payload(payload)
        .with_business_name("Demo Shop")
    };

    let mut site = MemorySite::new();
    let keys: Vec<&str> = if keys.is_empty() { vec![""] } else { keys.iter().map(String::as_str).collect() };
    for (k, &key) in keys.iter().enumerate() {
        let page_count = 1 + k % 3;
        let mut pages = Vec::with_capacity(page_count);
        for p in 0..page_count {
            let mut rows: Vec<MemoryRow> = (0..5).map(|i| row(key, p * 5 + i)).collect();
            if p == 0 { rows.push(MemoryRow::loading()); }
            if p > 0 { rows.push(row(key, p * 5 - 1)); }
            pages.push(MemoryPage::new(rows));
        }
        site = if key.is_empty() { site.with_unfiltered(pages) } else { site.with_grid(key, pages) };
    }
    site
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(argv: &[&str]) -> Result<FilterSpec> {
        let args = Args::try_parse_from(std::iter::once("paygrid").chain(argv.iter().copied()))?;
        base_filters(&args)
    }

    #[test]
    fn no_dates_means_the_last_thirty_days() {
        let spec = filters(&[]).unwrap();
        let range = spec.date_range.unwrap();
        assert_eq!(range.end(), chrono::Local::now().date_naive());
        assert_eq!((range.end() - range.start()).num_days(), i64::from(DEFAULT_RANGE_DAYS) - 1);
    }

    #[test]
    fn all_dates_drops_the_range() {
        assert_eq!(filters(&["--all-dates"]).unwrap().date_range, None);
        assert!(filters(&["--all-dates", "--days", "7"]).is_err());
    }

    #[test]
    fn business_names_map_to_ids() {
        let spec = filters(&["--business", "sniper_business_center"]).unwrap();
        assert_eq!(spec.extra_key.as_deref(), Some("5876842"));
        assert_eq!(filters(&["--business", "all"]).unwrap().extra_key, None);
        assert!(filters(&["--business", "nowhere"]).is_err());
    }

    #[test]
    fn ids_only_excludes_base_columns() {
        assert!(Args::try_parse_from(["paygrid", "--ids-only", "--base-columns"]).is_err());
        assert!(Args::try_parse_from(["paygrid", "--ids-only"]).unwrap().ids_only);
    }
}
