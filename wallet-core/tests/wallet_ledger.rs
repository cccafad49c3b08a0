//! End-to-end tests for the wallet ledger
//!
//! Exercises the full mutation path (per-owner locking, reference
//! generation, atomic commit) and the read projections against a real
//! RocksDB instance in a scratch directory.

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;
use wallet_core::{
    is_valid_reference, Config, Currency, Error, Ledger, TransactionKind, TransactionStatus,
};

fn open_test_ledger() -> (Arc<Ledger>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    (Arc::new(Ledger::open(config).unwrap()), temp_dir)
}

fn cents(n: i64) -> Decimal {
    Decimal::new(n, 2)
}

#[tokio::test]
async fn test_first_deposit_on_new_wallet() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    let receipt = ledger
        .deposit(owner, cents(5000), Currency::USD, None)
        .await
        .unwrap();

    let txn = &receipt.transaction;
    assert_eq!(txn.balance_before, cents(0));
    assert_eq!(txn.balance_after, cents(5000));
    assert_eq!(txn.status, TransactionStatus::Completed);
    assert!(is_valid_reference(&txn.reference));
    assert_eq!(receipt.new_balance, cents(5000));
}

#[tokio::test]
async fn test_withdraw_then_overdraw() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    ledger
        .deposit(owner, cents(10000), Currency::USD, None)
        .await
        .unwrap();

    let receipt = ledger.withdraw(owner, cents(3000), None).await.unwrap();
    assert_eq!(receipt.new_balance, cents(7000));

    let err = ledger.withdraw(owner, cents(15000), None).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientBalance { .. }));

    let wallet = ledger.get_balance(owner).await.unwrap();
    assert_eq!(wallet.balance, cents(7000));
}

#[tokio::test]
async fn test_currency_mismatch_rejected() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    ledger
        .deposit(owner, cents(1000), Currency::USD, None)
        .await
        .unwrap();

    let err = ledger
        .deposit(owner, cents(1000), Currency::EUR, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CurrencyMismatch { .. }));

    let wallet = ledger.get_balance(owner).await.unwrap();
    assert_eq!(wallet.balance, cents(1000));
}

#[tokio::test]
async fn test_negative_deposit_creates_no_record() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    let err = ledger
        .deposit(owner, cents(-500), Currency::USD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAmount(_)));

    let page = ledger.list_transactions(owner, 1, 10).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.results.is_empty());
}

#[tokio::test]
async fn test_concurrent_deposits_no_lost_update() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    // Establish the wallet first so every task hits the same currency
    ledger
        .deposit(owner, cents(5000), Currency::USD, None)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .deposit(owner, cents(5000), Currency::USD, None)
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // 1 initial + 8 concurrent deposits of 50.00
    let wallet = ledger.get_balance(owner).await.unwrap();
    assert_eq!(wallet.balance, cents(45000));

    let page = ledger.list_transactions(owner, 1, 100).await.unwrap();
    assert_eq!(page.total, 9);
    assert_eq!(page.results.len(), 9);

    // References pairwise distinct and well-formed
    let refs: HashSet<&str> = page
        .results
        .iter()
        .map(|r| r.reference.as_str())
        .collect();
    assert_eq!(refs.len(), 9);
    assert!(page.results.iter().all(|r| is_valid_reference(&r.reference)));

    // Snapshots chain when ordered oldest-first
    let mut oldest_first = page.results.clone();
    oldest_first.reverse();
    assert_eq!(oldest_first[0].balance_before, cents(0));
    for pair in oldest_first.windows(2) {
        assert_eq!(pair[0].balance_after, pair[1].balance_before);
    }
    assert_eq!(oldest_first.last().unwrap().balance_after, cents(45000));
}

#[tokio::test]
async fn test_concurrent_mixed_mutations_conserve_balance() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    ledger
        .deposit(owner, cents(100_000), Currency::USD, None)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..12 {
        let ledger = ledger.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                ledger.deposit(owner, cents(1000), Currency::USD, None).await
            } else {
                ledger.withdraw(owner, cents(1000), None).await
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // 6 deposits and 6 withdrawals of 10.00 cancel out
    let wallet = ledger.get_balance(owner).await.unwrap();
    assert_eq!(wallet.balance, cents(100_000));

    let page = ledger.list_transactions(owner, 1, 100).await.unwrap();
    assert_eq!(page.total, 13);
    let mut oldest_first = page.results.clone();
    oldest_first.reverse();
    for pair in oldest_first.windows(2) {
        assert_eq!(pair[0].balance_after, pair[1].balance_before);
    }
}

#[tokio::test]
async fn test_independent_owners_do_not_interfere() {
    let (ledger, _temp) = open_test_ledger();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let a = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.deposit(alice, cents(5000), Currency::USD, None).await })
    };
    let b = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.deposit(bob, cents(7000), Currency::EUR, None).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(ledger.get_balance(alice).await.unwrap().balance, cents(5000));
    assert_eq!(ledger.get_balance(bob).await.unwrap().balance, cents(7000));
}

#[tokio::test]
async fn test_history_scoped_to_owner() {
    let (ledger, _temp) = open_test_ledger();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    ledger
        .deposit(alice, cents(5000), Currency::USD, None)
        .await
        .unwrap();
    let bob_receipt = ledger
        .deposit(bob, cents(7000), Currency::USD, None)
        .await
        .unwrap();

    let alice_page = ledger.list_transactions(alice, 1, 10).await.unwrap();
    assert_eq!(alice_page.total, 1);
    assert!(alice_page
        .results
        .iter()
        .all(|r| r.reference != bob_receipt.transaction.reference));

    // Alice cannot fetch Bob's record by ID
    let err = ledger
        .get_transaction(alice, bob_receipt.transaction.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransactionNotFound(_)));

    // Bob can
    let found = ledger
        .get_transaction(bob, bob_receipt.transaction.id)
        .await
        .unwrap();
    assert_eq!(found.reference, bob_receipt.transaction.reference);
}

#[tokio::test]
async fn test_pagination_newest_first() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    for i in 1..=5i64 {
        ledger
            .deposit(
                owner,
                cents(i * 100),
                Currency::USD,
                Some(format!("deposit {i}")),
            )
            .await
            .unwrap();
    }

    let first = ledger.list_transactions(owner, 1, 2).await.unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.results.len(), 2);
    assert_eq!(first.results[0].description, "deposit 5");
    assert_eq!(first.results[1].description, "deposit 4");

    let second = ledger.list_transactions(owner, 2, 2).await.unwrap();
    assert_eq!(second.results[0].description, "deposit 3");

    let last = ledger.list_transactions(owner, 3, 2).await.unwrap();
    assert_eq!(last.results.len(), 1);
    assert_eq!(last.results[0].description, "deposit 1");

    let beyond = ledger.list_transactions(owner, 4, 2).await.unwrap();
    assert!(beyond.results.is_empty());
    assert_eq!(beyond.total, 5);
}

#[tokio::test]
async fn test_ledger_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    let owner = Uuid::new_v4();

    let reference = {
        let ledger = Ledger::open(config.clone()).unwrap();
        let receipt = ledger
            .deposit(owner, cents(2500), Currency::GBP, None)
            .await
            .unwrap();
        receipt.transaction.reference
    };

    let ledger = Ledger::open(config).unwrap();
    let wallet = ledger.get_balance(owner).await.unwrap();
    assert_eq!(wallet.balance, cents(2500));
    assert_eq!(wallet.currency, Currency::GBP);

    let page = ledger.list_transactions(owner, 1, 10).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0].reference, reference);
}

#[tokio::test]
async fn test_receipt_wire_shape() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    let receipt = ledger
        .deposit(owner, cents(5000), Currency::USD, None)
        .await
        .unwrap();

    let value = serde_json::to_value(&receipt.transaction).unwrap();

    // Monetary fields serialize as exact fixed-point strings
    assert_eq!(value["amount"], "50.00");
    assert_eq!(value["balance_after"], "50.00");
    assert_eq!(value["kind"], "Deposit");
    assert_eq!(value["status"], "Completed");

    let reference = value["reference"].as_str().unwrap();
    assert_eq!(reference.len(), 12);
    assert!(reference.starts_with("TXN-"));
}

#[tokio::test]
async fn test_deposit_kind_and_withdraw_kind_recorded() {
    let (ledger, _temp) = open_test_ledger();
    let owner = Uuid::new_v4();

    ledger
        .deposit(owner, cents(5000), Currency::USD, None)
        .await
        .unwrap();
    ledger.withdraw(owner, cents(2000), None).await.unwrap();

    let page = ledger.list_transactions(owner, 1, 10).await.unwrap();
    assert_eq!(page.results[0].kind, TransactionKind::Withdrawal);
    assert_eq!(page.results[1].kind, TransactionKind::Deposit);

    assert_eq!(ledger.metrics().deposits_total.get(), 1);
    assert_eq!(ledger.metrics().withdrawals_total.get(), 1);
}
