// src/error.rs
//! Error taxonomy for the extraction engine.

use thiserror::Error;

use crate::driver::DriverError;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// No locator of a `SelectorSet` resolved.
    /// Soft for optional filter fields, hard for submit / next-page.
    #[error("no locator resolved for '{control}' ({tried} tried)")]
    LocatorExhausted { control: String, tried: usize },

    /// Every click strategy failed.
    #[error("click on '{control}' failed after {attempts} strategies: {last}")]
    ClickIntercepted { control: String, attempts: usize, last: String },

    /// Busy indicator never cleared, or rows never showed up.
    #[error("grid did not settle within {0:?}")]
    GridTimeout(std::time::Duration),

    /// Malformed enrichment payload on a row. Never fatal: callers downgrade the record.
    #[error("enrichment payload for '{transaction_id}' unreadable: {source}")]
    EnrichmentParse {
        transaction_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// One partition gave up; the run carries on.
    #[error("partition '{partition}' failed: {reason}")]
    Partition { partition: String, reason: String },

    /// The driver session is unusable; the run stops.
    #[error("session failure: {0}")]
    Session(String),

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: chrono::NaiveDate, end: chrono::NaiveDate },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Whether this error means the whole run has to stop.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            ScrapeError::Session(_) => true,
            ScrapeError::Driver(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_fatality() {
        assert!(ScrapeError::Session(s!("nav")).is_session_fatal());
        assert!(ScrapeError::from(DriverError::Session(s!("closed"))).is_session_fatal());
        assert!(!ScrapeError::from(DriverError::Script(s!("boom"))).is_session_fatal());
        assert!(!ScrapeError::GridTimeout(std::time::Duration::from_secs(1)).is_session_fatal());
    }

    #[test]
    fn messages_name_the_control() {
        let e = ScrapeError::LocatorExhausted { control: s!("submit"), tried: 3 };
        assert_eq!(e.to_string(), "no locator resolved for 'submit' (3 tried)");
    }
}
