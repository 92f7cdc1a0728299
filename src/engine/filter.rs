// src/engine/filter.rs
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::config::consts::FILTER_DATE_FORMAT;
use crate::config::{FilterControl, ScraperConfig};
use crate::driver::{PageDriver, ScriptArg, WaitCondition};
use crate::engine::escalate::{ClickStrategy, click_escalating};
use crate::engine::scripts;
use crate::error::{Result, ScrapeError};

/* ---------------- Filter values ---------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    Accepted,
    Refused,
    All,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" | "success" | "successful" => Ok(StatusFilter::Accepted),
            "refused" | "failed" | "failure" => Ok(StatusFilter::Refused),
            "all" | "" => Ok(StatusFilter::All),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Inclusive calendar range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ScrapeError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending at `end` (both counted).
    pub fn last_days(end: NaiveDate, days: u32) -> Self {
        let span = chrono::Days::new(u64::from(days.max(1) - 1));
        let start = end.checked_sub_days(span).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate { self.start }
    pub fn end(&self) -> NaiveDate { self.end }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// What the single range input expects: `YYYY-MM-DD - YYYY-MM-DD`.
    pub fn filter_text(&self) -> String {
        format!("{} - {}", self.start.format(FILTER_DATE_FORMAT), self.end.format(FILTER_DATE_FORMAT))
    }

    fn parts(&self) -> [String; 2] {
        [self.start.format(FILTER_DATE_FORMAT).to_string(), self.end.format(FILTER_DATE_FORMAT).to_string()]
    }
}

/// Caller-built filter set. Never mutated by the engine; partition runs derive a copy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub partition_key: Option<String>,
    pub status: Option<StatusFilter>,
    pub date_range: Option<DateRange>,
    pub extra_key: Option<String>,
}

impl FilterSpec {
    pub fn with_partition(&self, key: impl Into<String>) -> Self {
        Self { partition_key: Some(key.into()), ..self.clone() }
    }
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = Some(status);
        self
    }
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
    pub fn with_extra(mut self, key: impl Into<String>) -> Self {
        self.extra_key = Some(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.partition_key.is_none() && self.status.is_none() && self.date_range.is_none() && self.extra_key.is_none()
    }
}

/// Filter fields, in the order they are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Extra,
    Partition,
    Status,
    DateRange,
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterField::Extra => "extra",
            FilterField::Partition => "partition",
            FilterField::Status => "status",
            FilterField::DateRange => "date_range",
        };
        f.write_str(s)
    }
}

/// How the grid looked once the submit settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridState {
    Rows,
    Empty,
    /// Neither rows nor the empty marker showed up in time.
    TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOutcome {
    pub applied: BTreeSet<FilterField>,
    pub grid: GridState,
}

impl FilterOutcome {
    pub fn is_applied(&self, field: FilterField) -> bool { self.applied.contains(&field) }
}

/* ---------------- Applier ---------------- */

/// One field's value as the page wants it.
struct FieldValue {
    field: FilterField,
    value: String,
    /// Split form for two-input layouts (date start/end).
    parts: Vec<String>,
}

pub struct FilterApplier<'c> {
    config: &'c ScraperConfig,
}

impl<'c> FilterApplier<'c> {
    pub fn new(config: &'c ScraperConfig) -> Self { Self { config } }

    /// Set every present field, submit, and wait for the grid to settle.
    ///
    /// A field that cannot be set is logged and left out of `applied`.
    /// A missing or unclickable submit control is an error.
    pub fn apply(&self, driver: &mut dyn PageDriver, spec: &FilterSpec) -> Result<FilterOutcome> {
        let table = &self.config.selectors;
        let timeouts = &self.config.timeouts;

        let mut anchors: Vec<_> = table.submit.locators().to_vec();
        for control in table.filter_controls() {
            anchors.extend(control.selectors.locators().iter().cloned());
        }
        if !driver.wait_until(&WaitCondition::AnyPresent(anchors), timeouts.element)? {
            tracing::warn!(timeout = ?timeouts.element, "filter bar did not show up");
        }

        let mut applied = BTreeSet::new();
        for fv in self.field_values(spec) {
            let control = self.control(fv.field);
            if self.set_field(driver, control, &fv)? {
                applied.insert(fv.field);
            } else {
                tracing::warn!(field = %fv.field, value = %fv.value, "filter not applied; continuing with a wider result set");
            }
        }

        let submit = table.submit.resolve(driver)?;
        click_escalating(driver, submit.element, table.submit.name(), &[ClickStrategy::Native, ClickStrategy::Scripted])?;
        driver.page_changed();

        let grid = self.settle(driver)?;
        tracing::info!(applied = ?applied, ?grid, "filters submitted");
        Ok(FilterOutcome { applied, grid })
    }

    fn control(&self, field: FilterField) -> &FilterControl {
        let t = &self.config.selectors;
        match field {
            FilterField::Extra => &t.extra,
            FilterField::Partition => &t.partition,
            FilterField::Status => &t.status,
            FilterField::DateRange => &t.date_range,
        }
    }

    fn field_values(&self, spec: &FilterSpec) -> Vec<FieldValue> {
        let mut out = Vec::with_capacity(4);
        if let Some(v) = &spec.extra_key {
            out.push(FieldValue { field: FilterField::Extra, value: v.clone(), parts: vec![] });
        }
        if let Some(v) = &spec.partition_key {
            out.push(FieldValue { field: FilterField::Partition, value: v.clone(), parts: vec![] });
        }
        if let Some(st) = spec.status {
            let label = self.config.status_labels.label(st).to_string();
            out.push(FieldValue { field: FilterField::Status, value: label, parts: vec![] });
        }
        if let Some(r) = &spec.date_range {
            out.push(FieldValue { field: FilterField::DateRange, value: r.filter_text(), parts: r.parts().to_vec() });
        }
        out
    }

    /// Native set through the fallback list, then the attribute-matching script.
    /// `Ok(false)` is a soft failure; `Err` only for session-fatal driver errors.
    fn set_field(&self, driver: &mut dyn PageDriver, control: &FilterControl, fv: &FieldValue) -> Result<bool> {
        match control.selectors.try_resolve(driver) {
            Ok(Some(hit)) => match driver.set_value(hit.element, &fv.value) {
                Ok(()) => return Ok(true),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => tracing::debug!(field = %fv.field, error = %e, "native set failed"),
            },
            Ok(None) => tracing::debug!(field = %fv.field, tried = control.selectors.len(), "no locator resolved"),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => tracing::debug!(field = %fv.field, error = %e, "lookup failed"),
        }

        let args = [
            ScriptArg::from(control.attr_hint.as_str()),
            ScriptArg::from(fv.value.as_str()),
            ScriptArg::Value(json!(fv.parts)),
        ];
        match driver.run_script(scripts::SET_BY_ATTRIBUTE, &args) {
            Ok(changed) => {
                let n = changed_count(&changed);
                if n > 0 {
                    tracing::info!(field = %fv.field, controls = n, "filter set by script fallback");
                }
                Ok(n > 0)
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                tracing::debug!(field = %fv.field, error = %e, "script fallback failed");
                Ok(false)
            }
        }
    }

    /// Busy overlay gone (or timed out), then rows or the empty marker.
    fn settle(&self, driver: &mut dyn PageDriver) -> Result<GridState> {
        let table = &self.config.selectors;
        let timeouts = &self.config.timeouts;

        if !driver.wait_until(&WaitCondition::Absent(table.busy.clone()), timeouts.busy)? {
            tracing::warn!(timeout = ?timeouts.busy, "busy indicator still up");
        }

        let mut either: Vec<_> = table.grid_rows.locators().to_vec();
        either.extend(table.grid_empty.locators().iter().cloned());
        if !driver.wait_until(&WaitCondition::AnyPresent(either), timeouts.grid)? {
            return Ok(GridState::TimedOut);
        }
        if table.grid_empty.try_resolve(driver)?.is_some() {
            return Ok(GridState::Empty);
        }
        Ok(GridState::Rows)
    }
}

fn changed_count(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate { NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap() }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let r = DateRange::new(d("2025-01-01"), d("2025-01-31")).unwrap();
        assert!(r.contains(d("2025-01-01")));
        assert!(r.contains(d("2025-01-31")));
        assert!(!r.contains(d("2025-02-01")));
        assert!(DateRange::new(d("2025-02-01"), d("2025-01-01")).is_err());
        assert_eq!(r.filter_text(), "2025-01-01 - 2025-01-31");
    }

    #[test]
    fn last_days_counts_both_ends() {
        let r = DateRange::last_days(d("2025-01-30"), 30);
        assert_eq!(r.start(), d("2025-01-01"));
        assert_eq!(DateRange::last_days(d("2025-01-30"), 1).start(), d("2025-01-30"));
    }

    #[test]
    fn with_partition_leaves_base_untouched() {
        let base = FilterSpec::default().with_status(StatusFilter::Accepted);
        let a = base.with_partition("225");
        assert_eq!(a.partition_key.as_deref(), Some("225"));
        assert_eq!(a.status, Some(StatusFilter::Accepted));
        assert!(base.partition_key.is_none());
    }

    #[test]
    fn status_parses_loosely() {
        assert_eq!("Success".parse::<StatusFilter>(), Ok(StatusFilter::Accepted));
        assert_eq!("failed".parse::<StatusFilter>(), Ok(StatusFilter::Refused));
        assert!("maybe".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn fields_order_extra_partition_status_date() {
        let mut v = vec![FilterField::DateRange, FilterField::Status, FilterField::Extra, FilterField::Partition];
        v.sort();
        assert_eq!(v, vec![FilterField::Extra, FilterField::Partition, FilterField::Status, FilterField::DateRange]);
    }
}
