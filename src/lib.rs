//! # Banksync Core
//!
//! A library for reconciling bank transactions downloaded from an
//! open-banking aggregator against an existing double-entry ledger.
//!
//! ## Features
//!
//! - **Concurrent download**: per-account balance and transaction fetches,
//!   fanned out across all configured accounts
//! - **Exact dedup**: previously imported transactions are recognized by the
//!   aggregator id carried in the split memo and marked reconciled
//! - **Fuzzy matching**: hand-entered splits with a near-equal amount within
//!   ±5 days are claimed and annotated instead of duplicated
//! - **Recurring fan-out**: new entries copy the proportional split structure
//!   of the most recent prior entry with the same description
//! - **Balance verification**: the resulting ledger balance is checked
//!   against the bank-reported balance after every run
//! - **Storage abstraction**: trait-based ledger store and transport, so the
//!   core works with any ledger engine and any HTTP client
//!
//! ## Quick Start
//!
//! ```rust
//! use banksync_core::{Downloader, Reconciler, SyncConfig};
//!
//! // Implement the LedgerStore and ApiTransport traits for your backends:
//! // let downloader = Downloader::new(transport);
//! // let downloads = downloader.fetch_all(config.account_ids()).await?;
//! // let mut reconciler = Reconciler::new(store);
//! // let report = reconciler.reconcile_ledger(&accounts, &downloads).await?;
//! ```

pub mod config;
pub mod downloader;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use downloader::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
