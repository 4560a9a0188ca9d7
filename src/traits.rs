//! Traits for the external collaborators: the ledger store and the
//! aggregator transport.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::Value;

use crate::types::*;

/// Storage abstraction over the ledger engine.
///
/// The engine owns every entry and split; the reconciler only reads snapshots
/// and mutates through these accessors. New entries are built inside an edit
/// scope: [`begin_entry`](Self::begin_entry) opens a draft, `add_split` and
/// the `set_draft_*` calls populate it, and [`commit_entry`](Self::commit_entry)
/// makes it visible atomically. [`abort_entry`](Self::abort_entry) discards a
/// draft; a failed construction must never leave a partial entry behind.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Resolve an account by its full path.
    async fn lookup_account(&self, path: &str) -> SyncResult<AccountRef>;

    /// Snapshot every split booked against the account, in ledger order.
    async fn list_splits(&self, account: &AccountRef) -> SyncResult<Vec<LedgerSplit>>;

    /// Snapshot every split of one committed entry.
    async fn entry_splits(&self, entry: &EntryId) -> SyncResult<Vec<LedgerSplit>>;

    /// Resolve a currency from the ledger's commodity table.
    async fn lookup_currency(&self, code: &str) -> SyncResult<CurrencyRef>;

    /// Current total balance of the account.
    async fn get_balance(&self, account: &AccountRef) -> SyncResult<BigDecimal>;

    /// Update a split's reconciliation state.
    async fn set_reconciled(&mut self, split: &SplitId, state: ReconcileState)
        -> SyncResult<()>;

    /// Replace a split's memo text.
    async fn set_split_memo(&mut self, split: &SplitId, memo: &str) -> SyncResult<()>;

    /// Overwrite a committed entry's date.
    async fn set_entry_date(&mut self, entry: &EntryId, date: NaiveDate) -> SyncResult<()>;

    /// Open a draft entry denominated in the given currency.
    async fn begin_entry(&mut self, currency: &CurrencyRef) -> SyncResult<EntryHandle>;

    /// Add a split to a draft entry.
    async fn add_split(
        &mut self,
        entry: &EntryHandle,
        account: &AccountRef,
        value: BigDecimal,
        memo: &str,
    ) -> SyncResult<()>;

    /// Set the date of a draft entry.
    async fn set_draft_date(&mut self, entry: &EntryHandle, date: NaiveDate) -> SyncResult<()>;

    /// Set the description of a draft entry.
    async fn set_draft_description(&mut self, entry: &EntryHandle, text: &str)
        -> SyncResult<()>;

    /// Atomically publish the draft and all of its splits.
    async fn commit_entry(&mut self, entry: EntryHandle) -> SyncResult<EntryId>;

    /// Discard the draft without publishing anything.
    async fn abort_entry(&mut self, entry: EntryHandle) -> SyncResult<()>;
}

/// Minimal JSON transport against the aggregator API.
///
/// Implementations carry the base URL, the bearer credential and its refresh
/// cycle, and any retry policy; none of that is visible to the core.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// GET a relative path, e.g. `accounts/{id}/balances/`.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> SyncResult<Value>;

    /// POST a JSON body to a relative path.
    async fn post(&self, path: &str, body: Value) -> SyncResult<Value>;
}
