//! Per-account index over existing ledger splits.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use super::annotation;
use crate::types::LedgerSplit;
use crate::utils::tolerance::amounts_close;

/// How far an entry date may sit from a record's date and still be a
/// fuzzy-match candidate. Inclusive on both sides.
pub const MATCH_WINDOW_DAYS: i64 = 5;

/// Index over an account's splits, built once before any record is processed.
///
/// Tagged splits (memo carries `TXID:`) serve exact dedup; untagged splits
/// form the fuzzy-match candidate pool and are consumed as they match;
/// `by_name` groups tagged splits by their `TXNAME:` to recover the history
/// of recurring payments.
#[derive(Debug, Default)]
pub struct SplitIndex {
    tagged: HashMap<String, LedgerSplit>,
    untagged: Vec<LedgerSplit>,
    by_name: HashMap<String, Vec<LedgerSplit>>,
}

impl SplitIndex {
    pub fn build(splits: Vec<LedgerSplit>) -> Self {
        let mut tagged: HashMap<String, LedgerSplit> = HashMap::new();
        let mut tagged_order: Vec<String> = Vec::new();
        let mut untagged = Vec::new();

        for split in splits {
            match annotation::parse_txid(&split.memo) {
                Some(txid) => {
                    if !tagged.contains_key(txid) {
                        tagged_order.push(txid.to_string());
                    }
                    tagged.insert(txid.to_string(), split);
                }
                None => untagged.push(split),
            }
        }

        let mut by_name: HashMap<String, Vec<LedgerSplit>> = HashMap::new();
        for txid in &tagged_order {
            if let Some(split) = tagged.get(txid) {
                if let Some(name) = annotation::parse_txname(&split.memo) {
                    by_name.entry(name.to_string()).or_default().push(split.clone());
                }
            }
        }
        // Most recent instance of each recurring name last.
        for group in by_name.values_mut() {
            group.sort_by_key(|split| split.entry_date);
        }

        Self {
            tagged,
            untagged,
            by_name,
        }
    }

    /// Split previously imported under this transaction id, if any.
    pub fn tagged(&self, txid: &str) -> Option<&LedgerSplit> {
        self.tagged.get(txid)
    }

    /// History of a recurring description, oldest first.
    pub fn recurring_group(&self, name: &str) -> Option<&[LedgerSplit]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    /// Claim the best fuzzy candidate for an (amount, date) pair: value
    /// within tolerance and entry date inside the match window. The nearest
    /// entry date wins; ties keep the earliest-listed split. The winner
    /// leaves the pool so later records cannot claim it again.
    pub fn take_fuzzy_match(
        &mut self,
        amount: &BigDecimal,
        date: NaiveDate,
    ) -> Option<LedgerSplit> {
        let position = self
            .untagged
            .iter()
            .enumerate()
            .filter(|(_, split)| {
                amounts_close(&split.value, amount)
                    && (split.entry_date - date).num_days().abs() <= MATCH_WINDOW_DAYS
            })
            .min_by_key(|(_, split)| (split.entry_date - date).num_days().abs())
            .map(|(position, _)| position)?;
        Some(self.untagged.remove(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountRef, ReconcileState};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn split(id: &str, value: &str, memo: &str, entry_date: NaiveDate) -> LedgerSplit {
        LedgerSplit {
            id: id.to_string(),
            entry: format!("entry-{id}"),
            account: AccountRef::new("Assets:Checking"),
            value: dec(value),
            quantity: dec(value),
            memo: memo.to_string(),
            state: ReconcileState::Unreconciled,
            entry_date,
            entry_description: String::new(),
        }
    }

    #[test]
    fn partitions_tagged_and_untagged() {
        let mut index = SplitIndex::build(vec![
            split("a", "10", "TXID: tx-1; TXNAME: COFFEE;", date(2024, 1, 1)),
            split("b", "20", "plain memo", date(2024, 1, 2)),
        ]);

        assert!(index.tagged("tx-1").is_some());
        assert!(index.tagged("tx-2").is_none());
        assert!(index.take_fuzzy_match(&dec("20"), date(2024, 1, 2)).is_some());
        // The tagged split never enters the fuzzy pool.
        assert!(index.take_fuzzy_match(&dec("10"), date(2024, 1, 1)).is_none());
    }

    #[test]
    fn recurring_groups_sort_oldest_first() {
        let index = SplitIndex::build(vec![
            split("new", "110", "TXID: tx-2; TXNAME: PAYROLL;", date(2024, 2, 25)),
            split("old", "100", "TXID: tx-1; TXNAME: PAYROLL;", date(2024, 1, 25)),
        ]);

        let group = index.recurring_group("PAYROLL").unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].id, "old");
        assert_eq!(group[1].id, "new");
    }

    #[test]
    fn tagged_without_txname_stays_out_of_groups() {
        let index = SplitIndex::build(vec![split(
            "a",
            "10",
            "TXID: tx-1;",
            date(2024, 1, 1),
        )]);
        assert!(index.tagged("tx-1").is_some());
        assert!(index.recurring_group("tx-1").is_none());
    }

    #[test]
    fn window_is_inclusive_at_five_days() {
        let mut index = SplitIndex::build(vec![split("a", "50", "", date(2024, 3, 10))]);
        assert!(index.take_fuzzy_match(&dec("50"), date(2024, 3, 15)).is_some());

        let mut index = SplitIndex::build(vec![split("a", "50", "", date(2024, 3, 10))]);
        assert!(index.take_fuzzy_match(&dec("50"), date(2024, 3, 16)).is_none());
    }

    #[test]
    fn nearest_date_wins() {
        let mut index = SplitIndex::build(vec![
            split("far", "50", "", date(2024, 3, 6)),
            split("near", "50", "", date(2024, 3, 9)),
        ]);
        let matched = index.take_fuzzy_match(&dec("50"), date(2024, 3, 10)).unwrap();
        assert_eq!(matched.id, "near");
    }

    #[test]
    fn date_ties_keep_listing_order() {
        let mut index = SplitIndex::build(vec![
            split("before", "50", "", date(2024, 3, 8)),
            split("after", "50", "", date(2024, 3, 12)),
        ]);
        let matched = index.take_fuzzy_match(&dec("50"), date(2024, 3, 10)).unwrap();
        assert_eq!(matched.id, "before");
    }

    #[test]
    fn matched_splits_leave_the_pool() {
        let mut index = SplitIndex::build(vec![split("a", "50", "", date(2024, 3, 10))]);
        assert!(index.take_fuzzy_match(&dec("50"), date(2024, 3, 10)).is_some());
        assert!(index.take_fuzzy_match(&dec("50"), date(2024, 3, 10)).is_none());
    }

    #[test]
    fn amount_mismatch_is_no_candidate() {
        let mut index = SplitIndex::build(vec![split("a", "50", "", date(2024, 3, 10))]);
        assert!(index.take_fuzzy_match(&dec("50.01"), date(2024, 3, 10)).is_none());
    }
}
