// src/config/mod.rs
pub mod consts;
pub mod options;
pub mod partitions;
pub mod selectors;

pub use options::{ClientDateFilter, ColumnLayout, ExportOptions, ScraperConfig, StatusLabels, Timeouts};
pub use selectors::{FilterControl, SelectorTable};
