//! Downloading balances and transaction lists from the aggregator.
//!
//! One balance request and one transaction-list request per account, all
//! accounts fanned out concurrently. The reconciler needs the complete
//! picture before it can decide matches, so the fetch joins every account
//! before anything downstream starts.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use futures::future::try_join_all;
use log::debug;
use serde::Deserialize;

use crate::traits::ApiTransport;
use crate::types::*;

/// Balance types in order of preference, most authoritative first.
const BALANCE_PRIORITY: [&str; 8] = [
    "expectedClosed",
    "interimBooked",
    "closingBooked",
    "openingBooked",
    "information",
    "interimAvailable",
    "closingAvailable",
    "openingAvailable",
];

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceEntry {
    balance_type: String,
    balance_amount: TransactionAmount,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: TransactionsGroup,
}

/// Fetches account state from the aggregator through an [`ApiTransport`].
pub struct Downloader<T: ApiTransport> {
    transport: T,
}

impl<T: ApiTransport> Downloader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Fetch balance and transactions for every account, concurrently.
    ///
    /// Fail-fast: the first failing sub-request aborts the whole fetch and
    /// the outstanding futures are dropped. Results carry no ordering
    /// guarantee between accounts.
    pub async fn fetch_all<I, A>(
        &self,
        account_ids: I,
    ) -> SyncResult<HashMap<String, AccountDownload>>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let ids: Vec<A> = account_ids.into_iter().collect();
        let downloads =
            try_join_all(ids.iter().map(|id| self.fetch_account(id.as_ref()))).await?;
        Ok(downloads.into_iter().collect())
    }

    /// Fetch one account: its balance, then its transaction lists. Both
    /// requests must succeed for the account to produce a result.
    pub async fn fetch_account(
        &self,
        account_id: &str,
    ) -> SyncResult<(String, AccountDownload)> {
        debug!("fetching balances for account {account_id}");
        let payload = self
            .transport
            .get(&format!("accounts/{account_id}/balances/"), &[])
            .await?;
        let response: BalancesResponse = serde_json::from_value(payload)?;
        let balance = select_balance(&response.balances)
            .ok_or_else(|| SyncError::NoBalanceAvailable(account_id.to_string()))?;

        debug!("fetching transactions for account {account_id}");
        let payload = self
            .transport
            .get(&format!("accounts/{account_id}/transactions/"), &[])
            .await?;
        let response: TransactionsResponse = serde_json::from_value(payload)?;

        Ok((
            account_id.to_string(),
            AccountDownload {
                balance,
                transactions: response.transactions,
            },
        ))
    }
}

/// Pick the amount of the first balance type present from the priority list.
fn select_balance(balances: &[BalanceEntry]) -> Option<BigDecimal> {
    BALANCE_PRIORITY.iter().find_map(|wanted| {
        balances
            .iter()
            .find(|entry| entry.balance_type == *wanted)
            .map(|entry| entry.balance_amount.amount.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct MockTransport {
        responses: HashMap<String, Value>,
    }

    impl MockTransport {
        fn new(responses: &[(&str, Value)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(path, value)| ((*path).to_string(), value.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ApiTransport for MockTransport {
        async fn get(&self, path: &str, _query: &[(&str, &str)]) -> SyncResult<Value> {
            self.responses
                .get(path)
                .cloned()
                .ok_or_else(|| SyncError::Transport(format!("unexpected GET {path}")))
        }

        async fn post(&self, path: &str, _body: Value) -> SyncResult<Value> {
            Err(SyncError::Transport(format!("unexpected POST {path}")))
        }
    }

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn balances(entries: &[(&str, &str)]) -> Value {
        json!({
            "balances": entries
                .iter()
                .map(|(balance_type, amount)| {
                    json!({
                        "balanceType": balance_type,
                        "balanceAmount": {"amount": amount, "currency": "EUR"}
                    })
                })
                .collect::<Vec<_>>()
        })
    }

    fn transactions(booked: Value) -> Value {
        json!({"transactions": {"booked": booked, "pending": []}})
    }

    #[tokio::test]
    async fn fetches_balance_and_transactions() {
        let transport = MockTransport::new(&[
            (
                "accounts/acc-1/balances/",
                balances(&[("closingBooked", "1234.56")]),
            ),
            (
                "accounts/acc-1/transactions/",
                transactions(json!([{
                    "internalTransactionId": "tx-1",
                    "bookingDate": "2024-05-01",
                    "valueDate": "2024-05-02",
                    "remittanceInformationUnstructured": "CARD PAYMENT",
                    "transactionAmount": {"amount": "-12.30", "currency": "EUR"}
                }])),
            ),
        ]);

        let downloader = Downloader::new(transport);
        let (id, download) = downloader.fetch_account("acc-1").await.unwrap();

        assert_eq!(id, "acc-1");
        assert_eq!(download.balance, dec("1234.56"));
        assert_eq!(download.transactions.booked.len(), 1);
        let record = &download.transactions.booked[0];
        assert_eq!(record.internal_transaction_id, "tx-1");
        assert_eq!(record.description(), "CARD PAYMENT");
        assert_eq!(*record.amount(), dec("-12.30"));
    }

    #[test]
    fn balance_priority_prefers_the_most_authoritative_type() {
        let entries = balances(&[
            ("openingAvailable", "1.00"),
            ("interimBooked", "2.00"),
            ("closingBooked", "3.00"),
        ]);
        let response: BalancesResponse = serde_json::from_value(entries).unwrap();
        assert_eq!(select_balance(&response.balances), Some(dec("2.00")));
    }

    #[test]
    fn expected_closed_beats_everything() {
        let entries = balances(&[
            ("closingBooked", "3.00"),
            ("expectedClosed", "4.00"),
        ]);
        let response: BalancesResponse = serde_json::from_value(entries).unwrap();
        assert_eq!(select_balance(&response.balances), Some(dec("4.00")));
    }

    #[tokio::test]
    async fn unknown_balance_types_only_is_an_error() {
        let transport = MockTransport::new(&[(
            "accounts/acc-1/balances/",
            balances(&[("forwardAvailable", "9.99")]),
        )]);

        let downloader = Downloader::new(transport);
        let result = downloader.fetch_account("acc-1").await;
        assert!(matches!(result, Err(SyncError::NoBalanceAvailable(id)) if id == "acc-1"));
    }

    #[tokio::test]
    async fn fetch_all_keys_results_by_account() {
        let transport = MockTransport::new(&[
            (
                "accounts/acc-1/balances/",
                balances(&[("closingBooked", "10.00")]),
            ),
            ("accounts/acc-1/transactions/", transactions(json!([]))),
            (
                "accounts/acc-2/balances/",
                balances(&[("closingBooked", "20.00")]),
            ),
            ("accounts/acc-2/transactions/", transactions(json!([]))),
        ]);

        let downloader = Downloader::new(transport);
        let downloads = downloader.fetch_all(["acc-1", "acc-2"]).await.unwrap();

        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads["acc-1"].balance, dec("10.00"));
        assert_eq!(downloads["acc-2"].balance, dec("20.00"));
    }

    #[tokio::test]
    async fn one_failing_account_fails_the_fetch() {
        let transport = MockTransport::new(&[
            (
                "accounts/acc-1/balances/",
                balances(&[("closingBooked", "10.00")]),
            ),
            ("accounts/acc-1/transactions/", transactions(json!([]))),
        ]);

        let downloader = Downloader::new(transport);
        let result = downloader.fetch_all(["acc-1", "acc-missing"]).await;
        assert!(matches!(result, Err(SyncError::Transport(_))));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_decode_error() {
        let transport = MockTransport::new(&[(
            "accounts/acc-1/balances/",
            json!({"balances": "not-a-list"}),
        )]);

        let downloader = Downloader::new(transport);
        let result = downloader.fetch_account("acc-1").await;
        assert!(matches!(result, Err(SyncError::Decode(_))));
    }
}
