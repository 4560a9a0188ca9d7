//! End-to-end import run against the in-memory store
//!
//! Downloads canned aggregator payloads through a stub transport, then
//! reconciles them into a small ledger: one payroll fan-out from a recurring
//! pattern, one fuzzy match onto a hand-entered split, one fresh entry.

use std::collections::HashMap;

use async_trait::async_trait;
use banksync_core::utils::MemoryLedgerStore;
use banksync_core::{
    ApiTransport, Downloader, LedgerStore, ReconcileState, Reconciler, SyncConfig, SyncResult,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::{json, Value};

struct StubTransport {
    responses: HashMap<String, Value>,
}

#[async_trait]
impl ApiTransport for StubTransport {
    async fn get(&self, path: &str, _query: &[(&str, &str)]) -> SyncResult<Value> {
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| banksync_core::SyncError::Transport(format!("unexpected GET {path}")))
    }

    async fn post(&self, path: &str, _body: Value) -> SyncResult<Value> {
        Err(banksync_core::SyncError::Transport(format!(
            "unexpected POST {path}"
        )))
    }
}

fn dec(s: &str) -> BigDecimal {
    s.parse().expect("literal decimal")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("literal date")
}

fn stub_transport() -> StubTransport {
    let mut responses = HashMap::new();
    responses.insert(
        "accounts/acc-demo/balances/".to_string(),
        json!({"balances": [
            {"balanceType": "closingBooked", "balanceAmount": {"amount": "4143.90", "currency": "EUR"}}
        ]}),
    );
    responses.insert(
        "accounts/acc-demo/transactions/".to_string(),
        json!({"transactions": {"booked": [
            {
                "internalTransactionId": "tx-2024-0301",
                "bookingDate": "2024-03-25",
                "valueDate": "2024-03-25",
                "remittanceInformationUnstructured": "ACME CORP PAYROLL",
                "transactionAmount": {"amount": "2200", "currency": "EUR"}
            },
            {
                "internalTransactionId": "tx-2024-0302",
                "bookingDate": "2024-03-27",
                "valueDate": "2024-03-27",
                "remittanceInformationUnstructured": "SUPERMARKET 42",
                "transactionAmount": {"amount": "-52.10", "currency": "EUR"}
            },
            {
                "internalTransactionId": "tx-2024-0303",
                "bookingDate": "2024-03-28",
                "valueDate": "2024-03-28",
                "remittanceInformationUnstructured": "CITY PARKING",
                "transactionAmount": {"amount": "-4.00", "currency": "EUR"}
            }
        ], "pending": []}}),
    );
    StubTransport { responses }
}

fn seed_ledger() -> MemoryLedgerStore {
    let store = MemoryLedgerStore::new();
    store.add_currency("EUR");
    store.add_account("Assets:Checking");
    store.add_account("Assets:Savings");
    store.add_account("Income:Salary");

    // A previous payroll run: the fan-out template for future months.
    store.seed_entry(
        date(2024, 2, 23),
        "Salary",
        "EUR",
        &[
            (
                "Assets:Checking",
                dec("2000"),
                "TXID: tx-2024-0201; TXNAME: ACME CORP PAYROLL;",
                ReconcileState::Reconciled,
            ),
            (
                "Income:Salary",
                dec("-1600"),
                "",
                ReconcileState::Unreconciled,
            ),
            (
                "Assets:Savings",
                dec("-400"),
                "",
                ReconcileState::Unreconciled,
            ),
        ],
    );

    // A hand-entered purchase the bank feed will claim by fuzzy match.
    store.seed_entry(
        date(2024, 3, 25),
        "Groceries",
        "EUR",
        &[(
            "Assets:Checking",
            dec("-52.10"),
            "",
            ReconcileState::Unreconciled,
        )],
    );

    store
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::from_json(
        r#"{
            "ledgers": {
                "demo.ledger": {
                    "acc-demo": {
                        "ledger_account": "Assets:Checking",
                        "date_key": "bookingDate"
                    }
                }
            }
        }"#,
    )?;

    let downloader = Downloader::new(stub_transport());
    let downloads = downloader.fetch_all(config.account_ids()).await?;
    println!(
        "downloaded {} account(s), checking balance {}",
        downloads.len(),
        downloads["acc-demo"].balance
    );

    let accounts = &config.ledgers["demo.ledger"];
    let mut reconciler = Reconciler::new(seed_ledger());
    let report = reconciler.reconcile_ledger(accounts, &downloads).await?;

    for account in &report.accounts {
        println!(
            "{}: {} reconciled, {} annotated, {} created",
            account.ledger_account, account.reconciled, account.annotated, account.created
        );
        for warning in &account.warnings {
            println!("  warning: {warning}");
        }
    }

    let store = reconciler.into_store();
    let checking = store.lookup_account("Assets:Checking").await?;
    println!("\nAssets:Checking after the run:");
    for split in store.list_splits(&checking).await? {
        println!(
            "  {} {:>10}  {}  [{}]",
            split.entry_date,
            split.value,
            split.entry_description,
            split.memo
        );
    }
    println!("balance: {}", store.get_balance(&checking).await?);

    Ok(())
}
