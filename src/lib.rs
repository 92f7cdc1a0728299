// src/lib.rs

#[macro_use]
pub mod macros;

pub mod config;
pub mod core;
pub mod driver;
pub mod engine;
pub mod error;
pub mod record;

pub mod csv;
pub mod file;
pub mod progress;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod log;

pub use error::{Result, ScrapeError};
pub use record::TransactionRecord;
