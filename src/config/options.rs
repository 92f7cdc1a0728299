// src/config/options.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::consts::*;
use super::selectors::SelectorTable;
use crate::core::sanitize::sanitize_file_stem;
use crate::file::looks_like_dir_hint;
use crate::engine::filter::StatusFilter;

/// Everything a run needs to know about the target site. Built once, read-only afterwards.
#[derive(Clone, Debug)]
pub struct ScraperConfig {
    pub grid_url: String,
    pub selectors: SelectorTable,
    pub columns: ColumnLayout,
    pub status_labels: StatusLabels,
    pub loading_placeholder: String,
    pub grid_date_formats: Vec<String>,
    pub timeouts: Timeouts,
    pub page_delay: Duration,
    pub partition_delay: Duration,
    pub max_total_pages: usize,
    pub client_date_filter: ClientDateFilter,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            grid_url: s!(GRID_URL),
            selectors: SelectorTable::default(),
            columns: ColumnLayout::default(),
            status_labels: StatusLabels::default(),
            loading_placeholder: s!(LOADING_PLACEHOLDER),
            grid_date_formats: GRID_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            timeouts: Timeouts::default(),
            page_delay: Duration::from_millis(PAGE_DELAY_MS),
            partition_delay: Duration::from_millis(PARTITION_DELAY_MS),
            max_total_pages: MAX_TOTAL_PAGES,
            client_date_filter: ClientDateFilter::Auto,
        }
    }
}

impl ScraperConfig {
    pub fn with_grid_url(mut self, url: impl Into<String>) -> Self {
        self.grid_url = url.into();
        self
    }

    /// No pauses between pages or partitions (offline drivers, tests).
    pub fn without_delays(mut self) -> Self {
        self.page_delay = Duration::ZERO;
        self.partition_delay = Duration::ZERO;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Filter controls showing up.
    pub element: Duration,
    /// Busy overlay clearing after a submit or page change.
    pub busy: Duration,
    /// Rows (or the empty marker) appearing.
    pub grid: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_millis(ELEMENT_TIMEOUT_MS),
            busy: Duration::from_millis(BUSY_TIMEOUT_MS),
            grid: Duration::from_millis(GRID_TIMEOUT_MS),
        }
    }
}

/// Fixed cell positions inside a grid row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    pub date: usize,
    pub transaction_id: usize,
    pub phone_number: usize,
    pub amount: usize,
    pub status: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self { date: 0, transaction_id: 1, phone_number: 2, amount: 3, status: 4 }
    }
}

impl ColumnLayout {
    /// Rows with fewer cells than this are not transaction rows.
    pub fn min_cells(&self) -> usize {
        [self.date, self.transaction_id, self.phone_number, self.amount, self.status]
            .into_iter()
            .max()
            .unwrap_or(0) + 1
    }
}

/// Site labels for the status filter's option values.
/// These follow the target UI's wording, so callers own them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLabels {
    pub accepted: String,
    pub refused: String,
    pub all: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self { accepted: s!("ACCEPTED"), refused: s!("REFUSED"), all: s!() }
    }
}

impl StatusLabels {
    pub fn label(&self, status: StatusFilter) -> &str {
        match status {
            StatusFilter::Accepted => &self.accepted,
            StatusFilter::Refused => &self.refused,
            StatusFilter::All => &self.all,
        }
    }
}

/// When to re-check row dates client-side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientDateFilter {
    /// Only when the date field could not be set on the page.
    #[default]
    Auto,
    Always,
    Never,
}

/* ---------------- Export ---------------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
}

impl ExportFormat {
    pub fn ext(&self) -> &'static str {
        match self { ExportFormat::Csv => "csv", ExportFormat::Tsv => "tsv" }
    }
    pub fn delim(&self) -> char {
        match self { ExportFormat::Csv => ',', ExportFormat::Tsv => '\t' }
    }
}

/// Which columns land in the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnSet {
    /// Base columns, plus enrichment columns if any record carries enrichment.
    #[default]
    Auto,
    Base,
    Extended,
    /// A single `transaction_id` column. The header is written even with no records.
    IdsOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub columns: ColumnSet,
    pub include_headers: bool,
    out_dir: PathBuf,
    /// Explicit file stem; `None` means `<prefix>_<timestamp>`.
    file_stem: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            columns: ColumnSet::Auto,
            include_headers: true,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            file_stem: None,
        }
    }
}

impl ExportOptions {
    /// Final file path. `stamp` fills in the stem when none was set explicitly.
    pub fn out_path(&self, stamp: &str) -> PathBuf {
        let stem = match &self.file_stem {
            Some(s) => s.clone(),
            None if self.columns == ColumnSet::IdsOnly => format!("{IDS_FILE_PREFIX}_{stamp}"),
            None => format!("{DEFAULT_FILE_PREFIX}_{stamp}"),
        };
        self.out_dir.join(format!("{stem}.{}", self.format.ext()))
    }

    /// Accepts a directory (trailing separator or existing dir) or a file path.
    /// A pasted extension is dropped; `format` decides it.
    pub fn set_path(&mut self, text: &str) {
        let t = text.trim();
        if t.is_empty() { return; }
        let p = Path::new(t);
        if looks_like_dir_hint(p) || p.is_dir() {
            self.out_dir = p.to_path_buf();
            self.file_stem = None;
            return;
        }
        if let Some(parent) = p.parent() {
            self.out_dir = parent.to_path_buf();
        }
        if let Some(stem) = p.file_stem() {
            self.file_stem = Some(sanitize_file_stem(&stem.to_string_lossy(), DEFAULT_FILE_PREFIX));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_cells_covers_highest_column() {
        assert_eq!(ColumnLayout::default().min_cells(), 5);
        let wide = ColumnLayout { status: 7, ..Default::default() };
        assert_eq!(wide.min_cells(), 8);
    }

    #[test]
    fn status_labels_are_caller_owned() {
        let labels = StatusLabels { accepted: s!("Approuvé"), ..Default::default() };
        assert_eq!(labels.label(StatusFilter::Accepted), "Approuvé");
        assert_eq!(labels.label(StatusFilter::Refused), "REFUSED");
        assert_eq!(labels.label(StatusFilter::All), "");
    }

    #[test]
    fn export_path_defaults_to_stamped_name() {
        let mut e = ExportOptions::default();
        assert_eq!(e.out_path("20250115_103000"), Path::new("scraped_data/transactions_20250115_103000.csv"));

        e.set_path("out/my report.txt");
        e.format = ExportFormat::Tsv;
        assert_eq!(e.out_path("x"), Path::new("out/my_report.tsv"));

        e.set_path("exports/");
        assert_eq!(e.out_path("s"), Path::new("exports/transactions_s.tsv"));
    }

    #[test]
    fn without_delays_zeroes_pacing_only() {
        let c = ScraperConfig::default().without_delays();
        assert_eq!(c.page_delay, Duration::ZERO);
        assert_eq!(c.partition_delay, Duration::ZERO);
        assert_eq!(c.timeouts, Timeouts::default());
    }
}
