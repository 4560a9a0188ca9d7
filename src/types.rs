//! Core types and data structures for bank-feed synchronization

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::DateKey;

/// Monetary amount with its ISO currency code, as delivered by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAmount {
    pub amount: BigDecimal,
    pub currency: String,
}

/// One remote bank transaction, immutable once downloaded.
///
/// Field names follow the aggregator's wire format so records decode straight
/// out of the API payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Stable aggregator-side identifier, the primary dedup key.
    pub internal_transaction_id: String,
    pub booking_date: NaiveDate,
    pub value_date: NaiveDate,
    /// Free-text narrative; doubles as the grouping key for recurring payments.
    #[serde(default)]
    pub remittance_information_unstructured: String,
    pub transaction_amount: TransactionAmount,
}

impl TransactionRecord {
    /// Signed amount of the transaction.
    pub fn amount(&self) -> &BigDecimal {
        &self.transaction_amount.amount
    }

    /// ISO currency code of the transaction.
    pub fn currency(&self) -> &str {
        &self.transaction_amount.currency
    }

    /// Remittance narrative, displayed to the user and used for recurring
    /// grouping.
    pub fn description(&self) -> &str {
        &self.remittance_information_unstructured
    }

    /// The authoritative calendar date under the account's configured key.
    pub fn date(&self, key: DateKey) -> NaiveDate {
        match key {
            DateKey::Booking => self.booking_date,
            DateKey::Value => self.value_date,
        }
    }
}

/// Booked and pending transactions for one account, as downloaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionsGroup {
    #[serde(default)]
    pub booked: Vec<TransactionRecord>,
    #[serde(default)]
    pub pending: Vec<TransactionRecord>,
}

/// Everything the downloader produced for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDownload {
    /// Current balance reported by the bank.
    pub balance: BigDecimal,
    pub transactions: TransactionsGroup,
}

/// Reference to a ledger account, resolved by the store from its full path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub path: String,
}

impl AccountRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Reference to a commodity in the ledger's currency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRef {
    pub code: String,
}

impl CurrencyRef {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Identifier of a committed split within the ledger store.
pub type SplitId = String;

/// Identifier of a committed entry within the ledger store.
pub type EntryId = String;

/// Handle to an entry under construction inside a store edit scope.
///
/// Deliberately not clonable: the handle is consumed by either
/// [`commit_entry`](crate::traits::LedgerStore::commit_entry) or
/// [`abort_entry`](crate::traits::LedgerStore::abort_entry), so a draft can
/// only end one way.
#[derive(Debug)]
pub struct EntryHandle {
    id: String,
}

impl EntryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Per-split reconciliation status against an external statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileState {
    Unreconciled,
    Cleared,
    Reconciled,
}

/// Snapshot of one split as handed out by the ledger store.
///
/// The owning entry's date and description are denormalized onto the split so
/// the matching engine can build its index without per-split round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSplit {
    pub id: SplitId,
    /// Owning entry, non-owning back-reference.
    pub entry: EntryId,
    /// Account this leg is booked against.
    pub account: AccountRef,
    /// Signed amount in the entry's currency.
    pub value: BigDecimal,
    /// Signed amount in the split's own account's commodity. Equal to `value`
    /// for the single-currency ledgers handled here.
    pub quantity: BigDecimal,
    pub memo: String,
    pub state: ReconcileState,
    pub entry_date: NaiveDate,
    pub entry_description: String,
}

/// Errors that can occur while downloading or reconciling.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Network or HTTP failure reported by the transport client.
    #[error("transport error: {0}")]
    Transport(String),
    /// A JSON payload did not have the expected shape.
    #[error("malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),
    /// None of the known balance types were present for the account.
    #[error("no usable balance type for account '{0}'")]
    NoBalanceAvailable(String),
    #[error("account not found in ledger: {0}")]
    AccountNotFound(String),
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
    /// A recurring-pattern leg could not be scaled because the previously
    /// matched split has zero value.
    #[error("cannot scale splits for transaction '{0}': prior split has zero value")]
    DivisionUndefined(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
