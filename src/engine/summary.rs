// src/engine/summary.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::config::partitions;
use crate::core::dates::parse_grid_date;
use crate::record::TransactionRecord;

/// Grouped counts over a finished record set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub by_partition: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub by_payment_method: BTreeMap<String, usize>,
    pub by_currency: BTreeMap<String, usize>,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// Pure aggregation; nothing here touches a driver.
pub struct SummaryAggregator<'f> {
    date_formats: &'f [String],
}

impl<'f> SummaryAggregator<'f> {
    pub fn new(date_formats: &'f [String]) -> Self { Self { date_formats } }

    pub fn summarize(&self, records: &[TransactionRecord]) -> RunSummary {
        let mut s = RunSummary { total: records.len(), ..Default::default() };
        for r in records {
            if let Some(p) = &r.partition {
                *s.by_partition.entry(p.clone()).or_default() += 1;
            }
            bump(&mut s.by_status, &r.status);
            if let Some(e) = &r.enrichment {
                bump(&mut s.by_payment_method, &e.payment_method);
                bump(&mut s.by_currency, &e.currency);
            }
            if let Some(d) = parse_grid_date(&r.date, self.date_formats) {
                s.earliest = Some(s.earliest.map_or(d, |x| x.min(d)));
                s.latest = Some(s.latest.map_or(d, |x| x.max(d)));
            }
        }
        s
    }
}

fn bump(map: &mut BTreeMap<String, usize>, key: &str) {
    let k = key.trim();
    if k.is_empty() { return; }
    *map.entry(k.to_string()).or_default() += 1;
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total transactions: {}", self.total)?;
        if let (Some(a), Some(b)) = (self.earliest, self.latest) {
            writeln!(f, "Date range: {a} .. {b}")?;
        }
        let groups = [
            ("By country", &self.by_partition, true),
            ("By status", &self.by_status, false),
            ("By payment method", &self.by_payment_method, false),
            ("By currency", &self.by_currency, false),
        ];
        for (title, map, countries) in groups {
            if map.is_empty() { continue; }
            writeln!(f, "{title}:")?;
            for (k, n) in map {
                let name = if countries { partitions::display_name(k) } else { k.as_str() };
                writeln!(f, "  {name}: {n}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Enrichment;

    fn formats() -> Vec<String> {
        crate::config::consts::GRID_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn groups_and_date_span() {
        let mut a = TransactionRecord::new("15-01-2025 10:00", "1", "", "", "ACCEPTED");
        a.partition = Some(s!("225"));
        a.enrichment = Some(Enrichment { currency: s!("XOF"), payment_method: s!("OM"), ..Default::default() });
        let mut b = TransactionRecord::new("02-01-2025", "2", "", "", "REFUSED");
        b.partition = Some(s!("225"));
        let c = TransactionRecord::new("garbage", "3", "", "", "ACCEPTED");

        let f = formats();
        let s = SummaryAggregator::new(&f).summarize(&[a, b, c]);
        assert_eq!(s.total, 3);
        assert_eq!(s.by_partition.get("225"), Some(&2));
        assert_eq!(s.by_status.get("ACCEPTED"), Some(&2));
        assert_eq!(s.by_currency.get("XOF"), Some(&1));
        assert_eq!(s.earliest, NaiveDate::from_ymd_opt(2025, 1, 2));
        assert_eq!(s.latest, NaiveDate::from_ymd_opt(2025, 1, 15));

        let text = s.to_string();
        assert!(text.contains("Cote d'ivoire: 2"));
    }

    #[test]
    fn empty_input() {
        let s = SummaryAggregator::new(&[]).summarize(&[]);
        assert_eq!(s, RunSummary::default());
    }
}
