// src/core/dates.rs
use chrono::NaiveDate;

/// Parse a grid date cell. Only the first token counts (`15-01-2025 10:32` → 2025-01-15);
/// formats are tried in order.
pub fn parse_grid_date<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDate> {
    let token = text.split_whitespace().next()?;
    formats.iter()
        .find_map(|f| NaiveDate::parse_from_str(token, f.as_ref()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::GRID_DATE_FORMATS;

    #[test]
    fn grid_shapes() {
        let want = NaiveDate::from_ymd_opt(2025, 1, 15);
        assert_eq!(parse_grid_date("15-01-2025 10:32", GRID_DATE_FORMATS.as_slice()), want);
        assert_eq!(parse_grid_date("2025-01-15", GRID_DATE_FORMATS.as_slice()), want);
        assert_eq!(parse_grid_date("15/01/2025 23:59:59", GRID_DATE_FORMATS.as_slice()), want);
    }

    #[test]
    fn junk_is_none() {
        assert_eq!(parse_grid_date("", GRID_DATE_FORMATS.as_slice()), None);
        assert_eq!(parse_grid_date("Loading...", GRID_DATE_FORMATS.as_slice()), None);
        assert_eq!(parse_grid_date("31-02-2025", GRID_DATE_FORMATS.as_slice()), None);
    }
}
