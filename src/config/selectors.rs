// src/config/selectors.rs
//! Locator tables for the payments grid.
//!
//! Every logical control gets an ordered fallback list: the first entry is the
//! selector the current UI answers to, the rest are older or looser shapes that
//! have worked before. Reorder rather than delete when the site changes.

use crate::config::consts::{BUSINESS_NAME_ATTR, DISABLED_MARKER, PAYLOAD_ATTR};
use crate::driver::Locator;
use crate::engine::selector::SelectorSet;

/// A filter control plus the attribute fragment the scripted fallback matches on
/// (`id`, `name` or `wire:model` containing `attr_hint`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterControl {
    pub selectors: SelectorSet,
    pub attr_hint: String,
}

impl FilterControl {
    pub fn new(selectors: SelectorSet, attr_hint: impl Into<String>) -> Self {
        Self { selectors, attr_hint: attr_hint.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorTable {
    // Filter bar
    pub partition: FilterControl,
    pub status: FilterControl,
    pub date_range: FilterControl,
    pub extra: FilterControl,
    pub submit: SelectorSet,

    // Grid
    pub busy: Locator,
    pub grid_rows: SelectorSet,
    pub grid_empty: SelectorSet,
    pub row_cells: Locator,
    pub row_action: Locator,
    pub payload_attr: String,
    pub business_name_attr: String,

    // Pagination
    pub pagination: SelectorSet,
    pub active_page: SelectorSet,
    pub page_links: SelectorSet,
    /// Trailing item's button, its anchor, `rel=next`, framework click-bound button.
    pub next: SelectorSet,
    pub next_container: Locator,
    pub disabled_marker: String,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            partition: FilterControl::new(
                selectors!("country filter",
                    css r"select[wire\:model\.defer='country']",
                    css "select[id='country']",
                    css r"select[wire\:model*='country']",
                    css "select[name*='country']",
                ),
                "country",
            ),
            status: FilterControl::new(
                selectors!("status filter",
                    css r"select[wire\:model\.lazy='status']",
                    css r"select[wire\:model*='status']",
                    css "select[name*='status']",
                ),
                "status",
            ),
            date_range: FilterControl::new(
                selectors!("date range filter",
                    css r"input[wire\:model\.lazy='date']",
                    css r"input[wire\:model*='date']",
                    css "input[type='date']",
                ),
                "date",
            ),
            extra: FilterControl::new(
                selectors!("business filter",
                    css r"select[wire\:model\.defer='business']",
                    css "select[name*='business']",
                ),
                "business",
            ),
            submit: selectors!("submit",
                css "button[type='submit']",
                css r"button[wire\:click*='search']",
                css "button.btn-primary",
            ),

            busy: Locator::css("#loader"),
            grid_rows: selectors!("grid rows",
                css ".payments-collected-table tbody tr",
                css "table tbody tr",
            ),
            grid_empty: selectors!("empty grid marker",
                css ".payments-collected-table tbody .empty-state",
                css "table tbody td.dataTables_empty",
            ),
            row_cells: Locator::css("td"),
            row_action: Locator::css(".payment-action"),
            payload_attr: s!(PAYLOAD_ATTR),
            business_name_attr: s!(BUSINESS_NAME_ATTR),

            pagination: selectors!("pagination",
                css ".pagination",
                css "nav[aria-label*='Pagination']",
            ),
            active_page: selectors!("active page",
                css ".pagination .page-item.active .page-link",
                css ".pagination .active",
            ),
            page_links: selectors!("page links",
                css ".pagination .page-item .page-link",
                css ".pagination a",
            ),
            next: selectors!("next page",
                css ".pagination .page-item:last-child button",
                css ".pagination .page-item:last-child a",
                css "a[rel='next']",
                css r"button[wire\:click*='nextPage']",
            ),
            next_container: Locator::parent(),
            disabled_marker: s!(DISABLED_MARKER),
        }
    }
}

impl SelectorTable {
    pub fn filter_controls(&self) -> [&FilterControl; 4] {
        [&self.extra, &self.partition, &self.status, &self.date_range]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_control_has_four_shapes() {
        let t = SelectorTable::default();
        assert_eq!(t.next.len(), 4);
        assert_eq!(t.next.locators()[2], Locator::css("a[rel='next']"));
    }

    #[test]
    fn raw_selectors_keep_their_escapes() {
        let t = SelectorTable::default();
        assert_eq!(
            t.status.selectors.locators()[0].as_str(),
            "select[wire\\:model\\.lazy='status']"
        );
    }
}
