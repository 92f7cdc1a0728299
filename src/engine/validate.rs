// src/engine/validate.rs
use std::collections::HashSet;

use crate::record::TransactionRecord;

/// Run-scoped validator: rejects id-less records and ids it has already accepted.
#[derive(Debug, Default)]
pub struct RecordValidator {
    seen: HashSet<String>,
    rejected: usize,
}

impl RecordValidator {
    pub fn new() -> Self { Self::default() }

    /// Accepted records in first-seen order, plus how many of `records` were rejected.
    pub fn accept(&mut self, records: Vec<TransactionRecord>) -> (Vec<TransactionRecord>, usize) {
        let before = self.rejected;
        let mut accepted = Vec::with_capacity(records.len());
        for rec in records {
            if self.admit(&rec) {
                accepted.push(rec);
            } else {
                self.rejected += 1;
            }
        }
        (accepted, self.rejected - before)
    }

    fn admit(&mut self, rec: &TransactionRecord) -> bool {
        if !rec.has_id() { return false; }
        self.seen.insert(rec.transaction_id.trim().to_string())
    }

    pub fn accepted_count(&self) -> usize { self.seen.len() }
    pub fn rejected_count(&self) -> usize { self.rejected }
    pub fn has_seen(&self, id: &str) -> bool { self.seen.contains(id.trim()) }
}

/// One-shot validation over a full record list.
pub fn validate(records: Vec<TransactionRecord>) -> (Vec<TransactionRecord>, usize) {
    RecordValidator::new().accept(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, amount: &str) -> TransactionRecord {
        TransactionRecord::new("01-01-2025", id, "07", amount, "ACCEPTED")
    }

    #[test]
    fn first_seen_wins_across_calls() {
        let mut v = RecordValidator::new();
        let (page1, r1) = v.accept(vec![rec("A", "1"), rec("B", "2")]);
        let (page2, r2) = v.accept(vec![rec("B", "99"), rec("C", "3")]);
        assert_eq!((page1.len(), r1), (2, 0));
        assert_eq!((page2.len(), r2), (1, 1));
        assert_eq!(page2[0].transaction_id, "C");
        assert_eq!(v.accepted_count(), 3);
        assert!(v.has_seen(" B "));
    }

    #[test]
    fn blank_ids_never_pass() {
        let (ok, rejected) = validate(vec![rec("", "1"), rec("   ", "2"), rec("X", "3")]);
        assert_eq!(ok.len(), 1);
        assert_eq!(rejected, 2);
    }

    #[test]
    fn padded_duplicate_is_still_a_duplicate() {
        let (ok, rejected) = validate(vec![rec("X", "1"), rec(" X", "2")]);
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].amount, "1");
        assert_eq!(rejected, 1);
    }
}
