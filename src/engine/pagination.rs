// src/engine/pagination.rs
use std::time::Duration;

use crate::config::SelectorTable;
use crate::driver::{DriverResult, ElementRef, PageDriver, WaitCondition};
use crate::engine::escalate::{ClickStrategy, click_escalating};
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagerState {
    Ready,
    Advancing,
    LastPage,
    Failed,
}

/// Pagination as the grid shows it right now. Read fresh after every page change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationState {
    pub current_page: usize,
    pub total_pages: usize,
    pub has_next: bool,
}

impl PaginationState {
    /// No pagination control: the whole grid is one implicit page.
    pub const SINGLE: PaginationState = PaginationState { current_page: 1, total_pages: 1, has_next: false };
}

/// Reads and walks the grid's pager for one partition.
///
/// `advance` escalates native → scripted → pointer clicks on the next control and
/// only gives up after all three. A disabled next control is the normal end.
pub struct PaginationEngine<'c> {
    table: &'c SelectorTable,
    busy_timeout: Duration,
    state: PagerState,
    failure: Option<String>,
}

impl<'c> PaginationEngine<'c> {
    pub fn new(table: &'c SelectorTable, busy_timeout: Duration) -> Self {
        Self { table, busy_timeout, state: PagerState::Ready, failure: None }
    }

    pub fn state(&self) -> PagerState { self.state }

    /// Why the engine went to `Failed`, if it did.
    pub fn failure(&self) -> Option<&str> { self.failure.as_deref() }

    pub fn read_state(&self, driver: &mut dyn PageDriver) -> Result<PaginationState> {
        if self.table.pagination.try_resolve(driver)?.is_none() {
            return Ok(PaginationState::SINGLE);
        }

        let current = match self.table.active_page.try_resolve(driver)? {
            Some(hit) => page_number(&driver.read_text(hit.element)?).unwrap_or(1),
            None => 1,
        };

        let mut highest = current;
        for link in self.table.page_links.find_all(driver)? {
            match driver.read_text(link) {
                Ok(text) => {
                    if let Some(n) = page_number(&text) { highest = highest.max(n); }
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(_) => {}
            }
        }

        // A missing next control with page links still ahead is left for `advance` to fail on.
        let has_next = match self.table.next.try_resolve(driver)? {
            Some(hit) => !self.is_disabled(driver, hit.element)?,
            None => current < highest,
        };

        Ok(PaginationState { current_page: current, total_pages: highest, has_next })
    }

    /// Move to the next page. `Ok(false)` on the last page or after a failure
    /// (see `state`/`failure`); `Err` only when the session itself broke.
    pub fn advance(&mut self, driver: &mut dyn PageDriver) -> Result<bool> {
        if matches!(self.state, PagerState::LastPage | PagerState::Failed) {
            return Ok(false);
        }

        let next = match self.table.next.try_resolve(driver) {
            Ok(Some(hit)) => hit.element,
            Ok(None) => {
                return Ok(self.fail(format!("'{}' not found ({} locators tried)", self.table.next.name(), self.table.next.len())));
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => return Ok(self.fail(e.to_string())),
        };

        match self.is_disabled(driver, next) {
            Ok(true) => {
                self.state = PagerState::LastPage;
                tracing::debug!("next control disabled; last page reached");
                return Ok(false);
            }
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => return Ok(self.fail(e.to_string())),
        }

        match click_escalating(driver, next, self.table.next.name(), &ClickStrategy::ALL) {
            Ok(_) => {}
            Err(e) if e.is_session_fatal() => return Err(e),
            Err(e) => return Ok(self.fail(e.to_string())),
        }

        self.state = PagerState::Advancing;
        driver.page_changed();
        if !driver.wait_until(&WaitCondition::Absent(self.table.busy.clone()), self.busy_timeout)? {
            tracing::warn!(timeout = ?self.busy_timeout, "busy indicator still up after page change");
        }
        Ok(true)
    }

    fn fail(&mut self, reason: String) -> bool {
        tracing::warn!(%reason, "pagination failed");
        self.state = PagerState::Failed;
        self.failure = Some(reason);
        false
    }

    /// Disabled marker on the control or on its container.
    fn is_disabled(&self, driver: &mut dyn PageDriver, el: ElementRef) -> DriverResult<bool> {
        let marker = self.table.disabled_marker.as_str();
        if driver.read_attribute(el, marker)?.is_some() { return Ok(true); }
        if has_class(driver.read_attribute(el, "class")?, marker) { return Ok(true); }
        for container in driver.find_within(el, &self.table.next_container)? {
            if has_class(driver.read_attribute(container, "class")?, marker) { return Ok(true); }
            if driver.read_attribute(container, "aria-disabled")?.as_deref() == Some("true") { return Ok(true); }
        }
        Ok(false)
    }
}

fn has_class(class: Option<String>, marker: &str) -> bool {
    class.is_some_and(|c| c.split_whitespace().any(|t| t == marker))
}

/// `"3"`, `" 3 "`, `"Page 3"`, `"Page 3 of 12"` → 3. Arrows and ellipses → None.
fn page_number(text: &str) -> Option<usize> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|n| *n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::driver::memory::{MemoryDriver, MemoryPage, MemoryRow, MemorySite, Role};
    use crate::engine::{FilterApplier, FilterSpec};

    fn loaded_grid(pages: usize) -> (ScraperConfig, MemoryDriver) {
        let config = ScraperConfig::default().without_delays();
        let site = MemorySite::new().with_grid("A", (1..=pages)
            .map(|n| MemoryPage::new(vec![MemoryRow::new("01-01-2025", &format!("T{n}"), "07", "100", "ACCEPTED")]))
            .collect());
        let mut driver = MemoryDriver::with_table(site, &config.selectors);
        driver.navigate(&config.grid_url).unwrap();
        FilterApplier::new(&config).apply(&mut driver, &FilterSpec::default().with_partition("A")).unwrap();
        (config, driver)
    }

    #[test]
    fn missing_next_control_mid_grid_fails_the_pager() {
        let (config, mut driver) = loaded_grid(3);
        driver.unbind_role(Role::Next);
        let mut pager = PaginationEngine::new(&config.selectors, config.timeouts.busy);

        let state = pager.read_state(&mut driver).unwrap();
        assert_eq!(state, PaginationState { current_page: 1, total_pages: 3, has_next: true });

        assert!(!pager.advance(&mut driver).unwrap());
        assert_eq!(pager.state(), PagerState::Failed);
        assert!(pager.failure().is_some_and(|f| f.contains("not found")), "{:?}", pager.failure());
    }

    #[test]
    fn last_page_reads_without_next() {
        let (config, mut driver) = loaded_grid(2);
        let mut pager = PaginationEngine::new(&config.selectors, config.timeouts.busy);

        assert!(pager.advance(&mut driver).unwrap());
        let state = pager.read_state(&mut driver).unwrap();
        assert_eq!(state, PaginationState { current_page: 2, total_pages: 2, has_next: false });
    }

    #[test]
    fn page_number_ignores_decorations() {
        assert_eq!(page_number(" 3 "), Some(3));
        assert_eq!(page_number("Page 12"), Some(12));
        assert_eq!(page_number("›"), None);
        assert_eq!(page_number("…"), None);
        assert_eq!(page_number("0"), None);
        assert_eq!(page_number("Page 1 of 12"), Some(1));
        assert_eq!(page_number("12 / 40"), Some(12));
    }

    #[test]
    fn class_marker_matches_whole_tokens() {
        assert!(has_class(Some(s!("page-item disabled")), "disabled"));
        assert!(!has_class(Some(s!("page-item not-disabled")), "disabled"));
        assert!(!has_class(None, "disabled"));
    }
}
