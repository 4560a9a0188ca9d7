//! Account configuration mapping aggregator accounts onto ledger accounts

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::SyncResult;

/// Which calendar date of a record is authoritative for matching.
///
/// Serialized with the aggregator's field spelling so persisted configs stay
/// compatible with data written by earlier versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateKey {
    #[serde(rename = "bookingDate")]
    Booking,
    #[serde(rename = "valueDate")]
    Value,
}

/// Where one aggregator account lands in a ledger file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMapping {
    /// Full ledger account path, e.g. `Assets.Current Account`.
    pub ledger_account: String,
    pub date_key: DateKey,
}

/// Mapping from ledger file path to the aggregator accounts it receives.
///
/// Created during registration, persisted as JSON, read once at the start of a
/// run and never mutated while a run is in progress. `BTreeMap`s keep the
/// serialized form deterministically ordered and diff-friendly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub ledgers: BTreeMap<String, BTreeMap<String, AccountMapping>>,
}

impl SyncConfig {
    /// Parse a configuration from its persisted JSON form.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the configuration for persistence.
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every configured aggregator account id, across all ledger files.
    pub fn account_ids(&self) -> impl Iterator<Item = &str> {
        self.ledgers
            .values()
            .flat_map(|accounts| accounts.keys().map(String::as_str))
    }
}
