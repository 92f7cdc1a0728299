// src/config/consts.rs

// Site
pub const GRID_URL: &str = "https://app-new.cinetpay.com/transactions/payments";
pub const LOADING_PLACEHOLDER: &str = "Loading";
pub const DISABLED_MARKER: &str = "disabled";
pub const PAYLOAD_ATTR: &str = "data-json";
pub const BUSINESS_NAME_ATTR: &str = "data-business-name";

// Date shapes seen in the grid's first column (first token only)
pub const GRID_DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y"];
// What the date-range input expects
pub const FILTER_DATE_FORMAT: &str = "%Y-%m-%d";

// Timeouts (ms)
pub const ELEMENT_TIMEOUT_MS: u64 = 15_000;
pub const BUSY_TIMEOUT_MS: u64 = 10_000;
pub const GRID_TIMEOUT_MS: u64 = 15_000;

// Pacing (ms)
pub const PAGE_DELAY_MS: u64 = 1_000;
pub const PARTITION_DELAY_MS: u64 = 2_000;

// Hard stop across a whole run, whatever pagination claims
pub const MAX_TOTAL_PAGES: usize = 5_000;

// Export
pub const DEFAULT_OUT_DIR: &str = "scraped_data";
pub const DEFAULT_FILE_PREFIX: &str = "transactions";
pub const IDS_FILE_PREFIX: &str = "transaction_ids";

// Date range used when the caller gives none
pub const DEFAULT_RANGE_DAYS: u32 = 30;
pub const DEBUG_LOG: &str = ".store/debug.log";

// WebDriver
pub const WEBDRIVER_URL: &str = "http://localhost:9515";
pub const WINDOW_SIZE: (u32, u32) = (1200, 800);
