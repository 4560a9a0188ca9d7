//! In-memory ledger store implementation for testing and development

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::traits::LedgerStore;
use crate::types::*;

#[derive(Debug, Clone)]
struct StoredEntry {
    date: NaiveDate,
    description: String,
    currency: String,
}

#[derive(Debug, Clone)]
struct StoredSplit {
    entry: EntryId,
    account: String,
    value: BigDecimal,
    quantity: BigDecimal,
    memo: String,
    state: ReconcileState,
}

#[derive(Debug)]
struct DraftEntry {
    currency: String,
    date: Option<NaiveDate>,
    description: String,
    splits: Vec<StoredSplit>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashSet<String>,
    currencies: HashSet<String>,
    entries: HashMap<EntryId, StoredEntry>,
    splits: HashMap<SplitId, StoredSplit>,
    /// Insertion order of committed splits, so listings are stable.
    split_order: Vec<SplitId>,
    drafts: HashMap<String, DraftEntry>,
}

impl Inner {
    fn snapshot(&self, id: &SplitId) -> SyncResult<LedgerSplit> {
        let split = self
            .splits
            .get(id)
            .ok_or_else(|| SyncError::Storage(format!("unknown split: {id}")))?;
        let entry = self
            .entries
            .get(&split.entry)
            .ok_or_else(|| SyncError::Storage(format!("split {id} has no entry")))?;
        Ok(LedgerSplit {
            id: id.clone(),
            entry: split.entry.clone(),
            account: AccountRef::new(&split.account),
            value: split.value.clone(),
            quantity: split.quantity.clone(),
            memo: split.memo.clone(),
            state: split.state,
            entry_date: entry.date,
            entry_description: entry.description.clone(),
        })
    }
}

/// In-memory [`LedgerStore`] for testing and development.
///
/// Draft entries opened with `begin_entry` live in a side table and are
/// invisible to every read accessor until `commit_entry` publishes the entry
/// and its splits in one step; `abort_entry` discards them without a trace.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryLedgerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a commodity so `lookup_currency` can resolve it.
    pub fn add_currency(&self, code: &str) {
        self.inner
            .write()
            .unwrap()
            .currencies
            .insert(code.to_string());
    }

    /// Register an account under its full path.
    pub fn add_account(&self, path: &str) {
        self.inner.write().unwrap().accounts.insert(path.to_string());
    }

    /// Insert an already-committed entry, returning its id.
    ///
    /// Fixture helper: each leg is (account path, value, memo, state).
    pub fn seed_entry(
        &self,
        date: NaiveDate,
        description: &str,
        currency: &str,
        legs: &[(&str, BigDecimal, &str, ReconcileState)],
    ) -> EntryId {
        let mut inner = self.inner.write().unwrap();
        let entry_id = Uuid::new_v4().to_string();
        inner.entries.insert(
            entry_id.clone(),
            StoredEntry {
                date,
                description: description.to_string(),
                currency: currency.to_string(),
            },
        );
        for (account, value, memo, state) in legs {
            let split_id = Uuid::new_v4().to_string();
            inner.splits.insert(
                split_id.clone(),
                StoredSplit {
                    entry: entry_id.clone(),
                    account: (*account).to_string(),
                    value: value.clone(),
                    quantity: value.clone(),
                    memo: (*memo).to_string(),
                    state: *state,
                },
            );
            inner.split_order.push(split_id);
        }
        entry_id
    }

    /// Number of committed entries.
    pub fn entry_count(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    /// Number of drafts that were neither committed nor aborted.
    pub fn open_draft_count(&self) -> usize {
        self.inner.read().unwrap().drafts.len()
    }

    /// Snapshot of one committed split, if it exists.
    pub fn split(&self, id: &SplitId) -> Option<LedgerSplit> {
        self.inner.read().unwrap().snapshot(id).ok()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn lookup_account(&self, path: &str) -> SyncResult<AccountRef> {
        let inner = self.inner.read().unwrap();
        if inner.accounts.contains(path) {
            Ok(AccountRef::new(path))
        } else {
            Err(SyncError::AccountNotFound(path.to_string()))
        }
    }

    async fn list_splits(&self, account: &AccountRef) -> SyncResult<Vec<LedgerSplit>> {
        let inner = self.inner.read().unwrap();
        let mut splits = Vec::new();
        for id in &inner.split_order {
            if inner.splits.get(id).map(|s| s.account.as_str()) == Some(account.path.as_str()) {
                splits.push(inner.snapshot(id)?);
            }
        }
        Ok(splits)
    }

    async fn entry_splits(&self, entry: &EntryId) -> SyncResult<Vec<LedgerSplit>> {
        let inner = self.inner.read().unwrap();
        let mut splits = Vec::new();
        for id in &inner.split_order {
            if inner.splits.get(id).map(|s| s.entry.as_str()) == Some(entry.as_str()) {
                splits.push(inner.snapshot(id)?);
            }
        }
        Ok(splits)
    }

    async fn lookup_currency(&self, code: &str) -> SyncResult<CurrencyRef> {
        let inner = self.inner.read().unwrap();
        if inner.currencies.contains(code) {
            Ok(CurrencyRef::new(code))
        } else {
            Err(SyncError::UnknownCurrency(code.to_string()))
        }
    }

    async fn get_balance(&self, account: &AccountRef) -> SyncResult<BigDecimal> {
        let inner = self.inner.read().unwrap();
        let mut balance = BigDecimal::from(0);
        for split in inner.splits.values() {
            if split.account == account.path {
                balance += &split.quantity;
            }
        }
        Ok(balance)
    }

    async fn set_reconciled(
        &mut self,
        split: &SplitId,
        state: ReconcileState,
    ) -> SyncResult<()> {
        let mut inner = self.inner.write().unwrap();
        let stored = inner
            .splits
            .get_mut(split)
            .ok_or_else(|| SyncError::Storage(format!("unknown split: {split}")))?;
        stored.state = state;
        Ok(())
    }

    async fn set_split_memo(&mut self, split: &SplitId, memo: &str) -> SyncResult<()> {
        let mut inner = self.inner.write().unwrap();
        let stored = inner
            .splits
            .get_mut(split)
            .ok_or_else(|| SyncError::Storage(format!("unknown split: {split}")))?;
        stored.memo = memo.to_string();
        Ok(())
    }

    async fn set_entry_date(&mut self, entry: &EntryId, date: NaiveDate) -> SyncResult<()> {
        let mut inner = self.inner.write().unwrap();
        let stored = inner
            .entries
            .get_mut(entry)
            .ok_or_else(|| SyncError::Storage(format!("unknown entry: {entry}")))?;
        stored.date = date;
        Ok(())
    }

    async fn begin_entry(&mut self, currency: &CurrencyRef) -> SyncResult<EntryHandle> {
        let mut inner = self.inner.write().unwrap();
        let id = Uuid::new_v4().to_string();
        inner.drafts.insert(
            id.clone(),
            DraftEntry {
                currency: currency.code.clone(),
                date: None,
                description: String::new(),
                splits: Vec::new(),
            },
        );
        Ok(EntryHandle::new(id))
    }

    async fn add_split(
        &mut self,
        entry: &EntryHandle,
        account: &AccountRef,
        value: BigDecimal,
        memo: &str,
    ) -> SyncResult<()> {
        let mut inner = self.inner.write().unwrap();
        let draft = inner
            .drafts
            .get_mut(entry.id())
            .ok_or_else(|| SyncError::Storage(format!("unknown draft: {}", entry.id())))?;
        draft.splits.push(StoredSplit {
            entry: entry.id().to_string(),
            account: account.path.clone(),
            quantity: value.clone(),
            value,
            memo: memo.to_string(),
            state: ReconcileState::Unreconciled,
        });
        Ok(())
    }

    async fn set_draft_date(&mut self, entry: &EntryHandle, date: NaiveDate) -> SyncResult<()> {
        let mut inner = self.inner.write().unwrap();
        let draft = inner
            .drafts
            .get_mut(entry.id())
            .ok_or_else(|| SyncError::Storage(format!("unknown draft: {}", entry.id())))?;
        draft.date = Some(date);
        Ok(())
    }

    async fn set_draft_description(
        &mut self,
        entry: &EntryHandle,
        text: &str,
    ) -> SyncResult<()> {
        let mut inner = self.inner.write().unwrap();
        let draft = inner
            .drafts
            .get_mut(entry.id())
            .ok_or_else(|| SyncError::Storage(format!("unknown draft: {}", entry.id())))?;
        draft.description = text.to_string();
        Ok(())
    }

    async fn commit_entry(&mut self, entry: EntryHandle) -> SyncResult<EntryId> {
        let mut inner = self.inner.write().unwrap();
        let draft = inner
            .drafts
            .remove(entry.id())
            .ok_or_else(|| SyncError::Storage(format!("unknown draft: {}", entry.id())))?;
        let date = draft
            .date
            .ok_or_else(|| SyncError::Storage("draft entry committed without a date".into()))?;
        let entry_id = entry.id().to_string();
        inner.entries.insert(
            entry_id.clone(),
            StoredEntry {
                date,
                description: draft.description,
                currency: draft.currency,
            },
        );
        for split in draft.splits {
            let split_id = Uuid::new_v4().to_string();
            inner.splits.insert(split_id.clone(), split);
            inner.split_order.push(split_id);
        }
        Ok(entry_id)
    }

    async fn abort_entry(&mut self, entry: EntryHandle) -> SyncResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .drafts
            .remove(entry.id())
            .ok_or_else(|| SyncError::Storage(format!("unknown draft: {}", entry.id())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn seeded_splits_carry_entry_date_and_description() {
        let store = MemoryLedgerStore::new();
        store.add_account("Assets:Checking");
        store.seed_entry(
            date(2024, 3, 1),
            "Groceries",
            "EUR",
            &[(
                "Assets:Checking",
                dec("-42.10"),
                "weekly shop",
                ReconcileState::Unreconciled,
            )],
        );

        let account = store.lookup_account("Assets:Checking").await.unwrap();
        let splits = store.list_splits(&account).await.unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].entry_date, date(2024, 3, 1));
        assert_eq!(splits[0].entry_description, "Groceries");
        assert_eq!(splits[0].memo, "weekly shop");
        assert_eq!(splits[0].value, dec("-42.10"));
    }

    #[tokio::test]
    async fn drafts_are_invisible_until_commit() {
        let mut store = MemoryLedgerStore::new();
        store.add_account("Assets:Checking");
        store.add_currency("EUR");

        let account = store.lookup_account("Assets:Checking").await.unwrap();
        let currency = store.lookup_currency("EUR").await.unwrap();

        let draft = store.begin_entry(&currency).await.unwrap();
        store
            .add_split(&draft, &account, dec("100"), "")
            .await
            .unwrap();
        store.set_draft_date(&draft, date(2024, 1, 2)).await.unwrap();

        assert_eq!(store.entry_count(), 0);
        assert!(store.list_splits(&account).await.unwrap().is_empty());
        assert_eq!(store.get_balance(&account).await.unwrap(), dec("0"));

        store.commit_entry(draft).await.unwrap();

        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.list_splits(&account).await.unwrap().len(), 1);
        assert_eq!(store.get_balance(&account).await.unwrap(), dec("100"));
    }

    #[tokio::test]
    async fn aborted_drafts_leave_no_trace() {
        let mut store = MemoryLedgerStore::new();
        store.add_account("Assets:Checking");
        store.add_currency("EUR");

        let account = store.lookup_account("Assets:Checking").await.unwrap();
        let currency = store.lookup_currency("EUR").await.unwrap();

        let draft = store.begin_entry(&currency).await.unwrap();
        store
            .add_split(&draft, &account, dec("55"), "")
            .await
            .unwrap();
        store.abort_entry(draft).await.unwrap();

        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.open_draft_count(), 0);
        assert!(store.list_splits(&account).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_without_date_is_rejected() {
        let mut store = MemoryLedgerStore::new();
        store.add_currency("EUR");
        let currency = store.lookup_currency("EUR").await.unwrap();

        let draft = store.begin_entry(&currency).await.unwrap();
        let result = store.commit_entry(draft).await;
        assert!(matches!(result, Err(SyncError::Storage(_))));
    }

    #[tokio::test]
    async fn unknown_lookups_fail() {
        let store = MemoryLedgerStore::new();
        assert!(matches!(
            store.lookup_account("Assets:Nope").await,
            Err(SyncError::AccountNotFound(_))
        ));
        assert!(matches!(
            store.lookup_currency("XXX").await,
            Err(SyncError::UnknownCurrency(_))
        ));
    }

    #[tokio::test]
    async fn balance_sums_split_quantities_per_account() {
        let store = MemoryLedgerStore::new();
        store.add_account("Assets:Checking");
        store.add_account("Expenses:Rent");
        store.seed_entry(
            date(2024, 2, 1),
            "Rent",
            "EUR",
            &[
                (
                    "Assets:Checking",
                    dec("-800"),
                    "",
                    ReconcileState::Unreconciled,
                ),
                ("Expenses:Rent", dec("800"), "", ReconcileState::Unreconciled),
            ],
        );
        store.seed_entry(
            date(2024, 2, 3),
            "Salary",
            "EUR",
            &[(
                "Assets:Checking",
                dec("2500"),
                "",
                ReconcileState::Unreconciled,
            )],
        );

        let checking = store.lookup_account("Assets:Checking").await.unwrap();
        assert_eq!(store.get_balance(&checking).await.unwrap(), dec("1700"));
    }
}
