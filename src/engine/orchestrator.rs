// src/engine/orchestrator.rs
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use crate::config::{ClientDateFilter, ScraperConfig};
use crate::driver::{PageDriver, SessionGuard};
use crate::engine::extract::RowExtractor;
use crate::engine::filter::{DateRange, FilterApplier, FilterField, FilterOutcome, FilterSpec, GridState};
use crate::engine::pagination::{PagerState, PaginationEngine};
use crate::engine::validate::RecordValidator;
use crate::error::{Result, ScrapeError};
use crate::progress::Progress;
use crate::record::TransactionRecord;

/// Key used in counts and errors when the run has no partition list.
pub const ALL_PARTITIONS: &str = "all";

/// Accumulator for one partition; folded into the `RunResult` when the partition ends.
#[derive(Clone, Debug)]
pub struct ScrapeSession {
    pub filters: FilterSpec,
    pub records: Vec<TransactionRecord>,
    pub page_count: usize,
}

impl ScrapeSession {
    fn new(filters: FilterSpec) -> Self {
        Self { filters, records: Vec::new(), page_count: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionError {
    pub partition: String,
    pub reason: String,
}

/// Everything a run produced, complete or not.
#[derive(Clone, Debug, Default)]
pub struct RunResult {
    /// Deduplicated by transaction id, first seen kept.
    pub records: Vec<TransactionRecord>,
    pub per_partition_counts: BTreeMap<String, usize>,
    pub errors: Vec<PartitionError>,
    /// Records the validator turned away (blank or repeated ids).
    pub rejected: usize,
    pub pages: usize,
    /// Set when the run stopped before its last partition.
    pub aborted: Option<String>,
}

impl RunResult {
    pub fn is_complete(&self) -> bool { self.errors.is_empty() && self.aborted.is_none() }
}

/// Why a partition's page loop stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PartitionEnd {
    LastPage,
    PageLimit,
    GlobalCeiling,
    NoGrid,
}

/// Runs filter → pages → extract → validate once per partition, in order, on one driver.
pub struct PartitionOrchestrator {
    config: ScraperConfig,
}

impl PartitionOrchestrator {
    pub fn new(config: ScraperConfig) -> Self { Self { config } }

    pub fn config(&self) -> &ScraperConfig { &self.config }

    /// Scrape every partition in `partitions` (or one pass with `base` as is when empty).
    ///
    /// A failing partition is recorded and skipped. A broken session, or the global
    /// page ceiling, stops the run; whatever was collected is returned either way.
    pub fn run(
        &self,
        driver: &mut dyn PageDriver,
        partitions: &[String],
        base: &FilterSpec,
        max_pages: Option<usize>,
        mut progress: Option<&mut dyn Progress>,
    ) -> RunResult {
        let keys: Vec<Option<&str>> = if partitions.is_empty() {
            vec![None]
        } else {
            partitions.iter().map(|p| Some(p.as_str())).collect()
        };

        let mut result = RunResult::default();
        let mut validator = RecordValidator::new();
        let mut budget = self.config.max_total_pages;

        if let Some(p) = progress.as_deref_mut() {
            p.begin(keys.len());
        }
        tracing::info!(partitions = keys.len(), ?max_pages, "run started");

        for (i, key) in keys.iter().copied().enumerate() {
            if budget == 0 {
                let reason = format!("global page ceiling ({}) reached", self.config.max_total_pages);
                tracing::error!(%reason, remaining = keys.len() - i, "run aborted");
                if let Some(p) = progress.as_deref_mut() {
                    p.log(&format!("Run aborted: {reason}"));
                }
                result.aborted = Some(reason);
                break;
            }
            if i > 0 { pause(self.config.partition_delay); }

            let label = key.unwrap_or(ALL_PARTITIONS).to_string();
            let filters = match key {
                Some(k) => base.with_partition(k),
                None => base.clone(),
            };
            let _span = tracing::info_span!("partition", key = %label).entered();
            if let Some(p) = progress.as_deref_mut() {
                p.partition_started(&label);
            }

            let mut session = ScrapeSession::new(filters);
            let outcome = self.run_partition(
                driver, &label, &mut session, &mut validator, &mut budget, max_pages, &mut progress,
            );

            let count = session.records.len();
            result.pages += session.page_count;
            result.per_partition_counts.insert(label.clone(), count);
            result.records.extend(session.records);

            let mut stop = None;
            let error = match outcome {
                Ok(end) => {
                    tracing::info!(records = count, pages = session.page_count, ?end, "partition done");
                    if end == PartitionEnd::GlobalCeiling {
                        stop = Some(format!("global page ceiling ({}) reached", self.config.max_total_pages));
                    }
                    None
                }
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(records = count, %reason, "partition failed");
                    if e.is_session_fatal() {
                        stop = Some(ScrapeError::Session(reason.clone()).to_string());
                    }
                    result.errors.push(PartitionError { partition: label.clone(), reason: reason.clone() });
                    Some(reason)
                }
            };
            if let Some(p) = progress.as_deref_mut() {
                p.partition_done(&label, count, error.as_deref());
            }

            if let Some(reason) = stop {
                tracing::error!(%reason, "run aborted");
                if let Some(p) = progress.as_deref_mut() {
                    p.log(&format!("Run aborted: {reason}"));
                }
                result.aborted = Some(reason);
                break;
            }
        }

        result.rejected = validator.rejected_count();
        tracing::info!(
            records = result.records.len(),
            rejected = result.rejected,
            pages = result.pages,
            errors = result.errors.len(),
            "run finished"
        );
        if let Some(p) = progress.as_deref_mut() {
            p.finish();
        }
        result
    }

    /// `run` on a driver it owns; the session is closed on every exit path.
    pub fn run_owned<D: PageDriver>(
        &self,
        driver: D,
        partitions: &[String],
        base: &FilterSpec,
        max_pages: Option<usize>,
        progress: Option<&mut dyn Progress>,
    ) -> RunResult {
        let mut guard = SessionGuard::new(driver);
        let result = match guard.driver() {
            Some(d) => self.run(d, partitions, base, max_pages, progress),
            None => RunResult::default(),
        };
        if let Err(e) = guard.release() {
            tracing::warn!(error = %e, "closing driver session failed");
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run_partition(
        &self,
        driver: &mut dyn PageDriver,
        label: &str,
        session: &mut ScrapeSession,
        validator: &mut RecordValidator,
        budget: &mut usize,
        max_pages: Option<usize>,
        progress: &mut Option<&mut dyn Progress>,
    ) -> Result<PartitionEnd> {
        driver.navigate(&self.config.grid_url)?;

        let outcome = FilterApplier::new(&self.config).apply(driver, &session.filters)?;
        if outcome.grid == GridState::TimedOut {
            tracing::warn!(timeout = ?self.config.timeouts.grid, "grid never settled; treating partition as empty");
            return Ok(PartitionEnd::NoGrid);
        }
        let date_filter = self.client_date_filter(&session.filters, &outcome);
        if date_filter.is_some() {
            tracing::debug!("re-checking row dates client-side");
        }

        let extractor = RowExtractor::new(&self.config);
        let mut pager = PaginationEngine::new(&self.config.selectors, self.config.timeouts.busy);
        let mut last_page: Option<usize> = None;

        loop {
            if *budget == 0 {
                return Ok(PartitionEnd::GlobalCeiling);
            }

            let state = pager.read_state(driver)?;
            let rows = extractor.extract(driver, date_filter.as_ref())?;
            let (mut accepted, rejected) = validator.accept(rows);
            let fresh = accepted.len();
            for rec in &mut accepted {
                rec.partition = session.filters.partition_key.clone();
            }
            session.records.append(&mut accepted);
            session.page_count += 1;
            *budget = budget.saturating_sub(1);

            tracing::debug!(page = state.current_page, total = state.total_pages, fresh, rejected, "page read");
            if let Some(p) = progress.as_deref_mut() {
                p.page_done(label, state.current_page, fresh);
            }

            if last_page == Some(state.current_page) && fresh == 0 {
                if state.current_page >= state.total_pages {
                    tracing::debug!(page = state.current_page, "pager did not move past the last page link");
                    return Ok(PartitionEnd::LastPage);
                }
                return Err(ScrapeError::Partition {
                    partition: label.to_string(),
                    reason: format!("pagination stalled on page {} of {}", state.current_page, state.total_pages),
                });
            }
            last_page = Some(state.current_page);

            if !state.has_next {
                return Ok(PartitionEnd::LastPage);
            }
            if max_pages.is_some_and(|m| session.page_count >= m) {
                return Ok(PartitionEnd::PageLimit);
            }
            if *budget == 0 {
                return Ok(PartitionEnd::GlobalCeiling);
            }

            pause(self.config.page_delay);
            if !pager.advance(driver)? {
                return match pager.state() {
                    PagerState::LastPage => Ok(PartitionEnd::LastPage),
                    _ => Err(ScrapeError::Partition {
                        partition: label.to_string(),
                        reason: pager.failure().unwrap_or("pagination failed").to_string(),
                    }),
                };
            }
        }
    }

    fn client_date_filter(&self, filters: &FilterSpec, outcome: &FilterOutcome) -> Option<DateRange> {
        let range = filters.date_range?;
        match self.config.client_date_filter {
            ClientDateFilter::Always => Some(range),
            ClientDateFilter::Never => None,
            ClientDateFilter::Auto if !outcome.is_applied(FilterField::DateRange) => Some(range),
            ClientDateFilter::Auto => None,
        }
    }
}

fn pause(d: Duration) {
    if !d.is_zero() { thread::sleep(d); }
}
