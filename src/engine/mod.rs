// src/engine/mod.rs
//! Extraction engine: filter bar, pager, row reader, validator and the
//! per-partition loop that ties them together.

pub mod escalate;
pub mod extract;
pub mod filter;
pub mod orchestrator;
pub mod pagination;
pub mod scripts;
pub mod selector;
pub mod summary;
pub mod validate;

pub use filter::{DateRange, FilterApplier, FilterField, FilterOutcome, FilterSpec, GridState, StatusFilter};
pub use orchestrator::{PartitionError, PartitionOrchestrator, RunResult, ScrapeSession};
pub use pagination::{PagerState, PaginationEngine, PaginationState};
pub use selector::SelectorSet;
pub use summary::{RunSummary, SummaryAggregator};
