//! Reconciling downloaded bank transactions against ledger entries.
//!
//! For every booked record the engine decides one of three outcomes, in
//! order: the record was imported before and its split is marked reconciled
//! (exact dedup on the memo-carried transaction id); an existing unreconciled
//! split with a near-equal amount inside the date window is claimed and
//! annotated; or a fresh entry is created, copying the proportional split
//! structure of the most recent prior entry with the same description.
//! Recoverable conditions (amount mismatches, balance divergence, undefined
//! fan-out ratios) are collected as warnings and never abort the run.

pub mod annotation;
pub mod index;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::AccountMapping;
use crate::traits::LedgerStore;
use crate::types::*;
use crate::utils::tolerance::amounts_close;

use self::index::SplitIndex;

/// Non-fatal conditions surfaced by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncWarning {
    /// A previously imported split disagrees with the downloaded amount.
    AmountMismatch {
        account: String,
        transaction_id: String,
        recorded: BigDecimal,
        downloaded: BigDecimal,
    },
    /// The ledger balance does not line up with the bank's.
    BalanceDivergence {
        account: String,
        expected: BigDecimal,
        actual: BigDecimal,
    },
    /// Recurring fan-out was skipped because the prior split has zero value.
    FanOutUndefined {
        account: String,
        transaction_id: String,
    },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::AmountMismatch {
                account,
                transaction_id,
                recorded,
                downloaded,
            } => write!(
                f,
                "cannot reconcile transaction '{transaction_id}' on {account}: \
                 ledger has {recorded}, bank reports {downloaded}"
            ),
            SyncWarning::BalanceDivergence {
                account,
                expected,
                actual,
            } => write!(
                f,
                "{account} balance out of sync: expected {expected}, ledger has {actual}"
            ),
            SyncWarning::FanOutUndefined {
                account,
                transaction_id,
            } => write!(
                f,
                "skipping transaction '{transaction_id}' on {account}: \
                 prior split has zero value"
            ),
        }
    }
}

/// Outcome of reconciling one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSyncReport {
    /// Aggregator-side account identifier.
    pub account_id: String,
    /// Ledger account path the records were applied to.
    pub ledger_account: String,
    /// Records confirmed against an already-imported split.
    pub reconciled: usize,
    /// Existing unreconciled splits claimed by fuzzy match.
    pub annotated: usize,
    /// Fresh entries created.
    pub created: usize,
    pub warnings: Vec<SyncWarning>,
}

/// Outcome of reconciling one ledger file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSyncReport {
    pub accounts: Vec<AccountSyncReport>,
}

impl LedgerSyncReport {
    pub fn warning_count(&self) -> usize {
        self.accounts.iter().map(|a| a.warnings.len()).sum()
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }
}

/// Plan for a fresh entry, resolved before the edit scope opens.
struct EntryPlan {
    description: String,
    /// Proportionally rescaled legs copied from the prior recurring entry.
    extra_legs: Vec<(AccountRef, BigDecimal)>,
}

/// Matching engine for one ledger file.
///
/// Accounts are processed sequentially: the fuzzy candidate pool is consumed
/// as records match, so processing order matters within a file. Separate
/// ledger files have no shared state and may run in parallel.
pub struct Reconciler<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Give the store back once reconciliation is done.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Reconcile every configured account of this ledger file against its
    /// download.
    pub async fn reconcile_ledger(
        &mut self,
        accounts: &BTreeMap<String, AccountMapping>,
        downloads: &HashMap<String, AccountDownload>,
    ) -> SyncResult<LedgerSyncReport> {
        let mut report = LedgerSyncReport::default();
        for (account_id, mapping) in accounts {
            let download = downloads.get(account_id).ok_or_else(|| {
                SyncError::Storage(format!("no download data for account '{account_id}'"))
            })?;
            report
                .accounts
                .push(self.reconcile_account(account_id, mapping, download).await?);
        }
        Ok(report)
    }

    async fn reconcile_account(
        &mut self,
        account_id: &str,
        mapping: &AccountMapping,
        download: &AccountDownload,
    ) -> SyncResult<AccountSyncReport> {
        let account = self.store.lookup_account(&mapping.ledger_account).await?;
        let splits = self.store.list_splits(&account).await?;
        let mut index = SplitIndex::build(splits);

        let mut report = AccountSyncReport {
            account_id: account_id.to_string(),
            ledger_account: mapping.ledger_account.clone(),
            reconciled: 0,
            annotated: 0,
            created: 0,
            warnings: Vec::new(),
        };

        // Matching pending records is deferred until banks stop reshuffling
        // them; only booked records take part.
        if !download.transactions.pending.is_empty() {
            debug!(
                "ignoring {} pending records for {account_id}",
                download.transactions.pending.len()
            );
        }

        for record in &download.transactions.booked {
            let txid = record.internal_transaction_id.as_str();
            let record_date = record.date(mapping.date_key);

            if let Some(existing) = index.tagged(txid) {
                if amounts_close(&existing.value, record.amount()) {
                    self.store
                        .set_reconciled(&existing.id, ReconcileState::Reconciled)
                        .await?;
                    report.reconciled += 1;
                } else {
                    let warning = SyncWarning::AmountMismatch {
                        account: mapping.ledger_account.clone(),
                        transaction_id: txid.to_string(),
                        recorded: existing.value.clone(),
                        downloaded: record.amount().clone(),
                    };
                    warn!("{warning}");
                    report.warnings.push(warning);
                }
                continue;
            }

            if let Some(matched) = index.take_fuzzy_match(record.amount(), record_date) {
                let memo = annotation::append(&matched.memo, txid, record.description());
                self.store.set_split_memo(&matched.id, &memo).await?;
                self.store.set_entry_date(&matched.entry, record_date).await?;
                debug!("annotated split {} with transaction '{txid}'", matched.id);
                report.annotated += 1;
                continue;
            }

            match self.plan_entry(record, &index).await {
                Ok(plan) => {
                    self.create_entry(&account, record, record_date, plan).await?;
                    report.created += 1;
                }
                Err(SyncError::DivisionUndefined(_)) => {
                    let warning = SyncWarning::FanOutUndefined {
                        account: mapping.ledger_account.clone(),
                        transaction_id: txid.to_string(),
                    };
                    warn!("{warning}");
                    report.warnings.push(warning);
                }
                Err(err) => return Err(err),
            }
        }

        let actual = self.store.get_balance(&account).await?;
        if !amounts_close(&actual, &download.balance) {
            let warning = SyncWarning::BalanceDivergence {
                account: mapping.ledger_account.clone(),
                expected: download.balance.clone(),
                actual,
            };
            warn!("{warning}");
            report.warnings.push(warning);
        }

        info!(
            "{}: {} reconciled, {} annotated, {} created, {} warnings",
            mapping.ledger_account,
            report.reconciled,
            report.annotated,
            report.created,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Resolve description and extra legs for a fresh entry.
    ///
    /// When the record's description has a recurring history, the most recent
    /// prior instance acts as the template: every other leg of its entry is
    /// rescaled by `amount * other.value / prev.value` and the prior entry's
    /// description replaces the raw remittance text.
    async fn plan_entry(
        &self,
        record: &TransactionRecord,
        index: &SplitIndex,
    ) -> SyncResult<EntryPlan> {
        let mut plan = EntryPlan {
            description: record.description().to_string(),
            extra_legs: Vec::new(),
        };

        let prev = match index
            .recurring_group(record.description())
            .and_then(|group| group.last())
        {
            Some(prev) => prev,
            None => return Ok(plan),
        };

        if prev.value == BigDecimal::from(0) {
            return Err(SyncError::DivisionUndefined(
                record.internal_transaction_id.clone(),
            ));
        }

        plan.description = prev.entry_description.clone();
        for other in self.store.entry_splits(&prev.entry).await? {
            if other.id == prev.id {
                continue;
            }
            let value = record.amount() * &other.value / &prev.value;
            plan.extra_legs.push((other.account.clone(), value));
        }
        Ok(plan)
    }

    /// Build and commit a fresh entry inside an edit scope. Any failure
    /// while populating abandons the draft before the error propagates, so
    /// a partial entry is never left visible.
    async fn create_entry(
        &mut self,
        account: &AccountRef,
        record: &TransactionRecord,
        date: NaiveDate,
        plan: EntryPlan,
    ) -> SyncResult<EntryId> {
        let currency = self.store.lookup_currency(record.currency()).await?;
        let entry = self.store.begin_entry(&currency).await?;
        match self
            .populate_entry(&entry, account, record, date, &plan)
            .await
        {
            Ok(()) => self.store.commit_entry(entry).await,
            Err(err) => {
                if let Err(abort_err) = self.store.abort_entry(entry).await {
                    warn!("failed to abandon draft entry: {abort_err}");
                }
                Err(err)
            }
        }
    }

    async fn populate_entry(
        &mut self,
        entry: &EntryHandle,
        account: &AccountRef,
        record: &TransactionRecord,
        date: NaiveDate,
        plan: &EntryPlan,
    ) -> SyncResult<()> {
        let memo = annotation::format(&record.internal_transaction_id, record.description());
        self.store
            .add_split(entry, account, record.amount().clone(), &memo)
            .await?;
        for (target, value) in &plan.extra_legs {
            self.store.add_split(entry, target, value.clone(), "").await?;
        }
        self.store.set_draft_date(entry, date).await?;
        self.store.set_draft_description(entry, &plan.description).await?;
        Ok(())
    }
}
