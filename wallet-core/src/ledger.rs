//! Main ledger orchestration layer
//!
//! This module ties together storage, reference generation, and per-wallet
//! locking into a high-level API for balance mutation and history queries.
//!
//! Every mutation runs under the owning user's exclusive lock from the
//! moment the balance is read until the wallet row and transaction record
//! are committed in one atomic batch. Mutations on different owners never
//! block each other.
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//! use wallet_core::{Config, Currency, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     let owner = Uuid::new_v4();
//!     let receipt = ledger
//!         .deposit(owner, Decimal::new(5000, 2), Currency::USD, None)
//!         .await?;
//!     println!("{} -> {}", receipt.transaction.reference, receipt.new_balance);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    metrics::Metrics,
    reference::generate_reference,
    storage::{Storage, StorageStats},
    types::{
        validate_amount, Currency, Receipt, TransactionKind, TransactionPage, TransactionRecord,
        TransactionStatus, Wallet,
    },
    Config, Error, Result,
};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{timeout, Duration};
use uuid::Uuid;

/// Currency assigned when a wallet is provisioned on a balance lookup
const DEFAULT_CURRENCY: Currency = Currency::USD;

/// Description used when a deposit request omits one
const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Wallet top-up";

/// Description used when a withdrawal request omits one
const DEFAULT_WITHDRAWAL_DESCRIPTION: &str = "Wallet withdrawal";

/// Largest page size served by history queries
const MAX_PAGE_SIZE: u32 = 100;

/// Main ledger interface
pub struct Ledger {
    /// Durable store
    storage: Arc<Storage>,

    /// Per-owner mutation locks
    locks: DashMap<Uuid, Arc<Mutex<()>>>,

    /// Prometheus metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;

        Ok(Self {
            storage,
            locks: DashMap::new(),
            metrics,
            config,
        })
    }

    /// Deposit money into the owner's wallet
    ///
    /// Provisions a zero-balance wallet in the requested currency when the
    /// owner has none. Returns the committed record and the new balance.
    pub async fn deposit(
        &self,
        owner_id: Uuid,
        amount: Decimal,
        currency: Currency,
        description: Option<String>,
    ) -> Result<Receipt> {
        let result = self
            .deposit_locked(owner_id, amount, currency, description)
            .await;

        match &result {
            Ok(receipt) => {
                self.metrics.record_deposit();
                tracing::info!(
                    owner_id = %owner_id,
                    reference = %receipt.transaction.reference,
                    amount = %amount,
                    new_balance = %receipt.new_balance,
                    "Deposit committed"
                );
            }
            Err(e) if !e.is_retryable() => self.metrics.record_rejection(),
            Err(_) => {}
        }

        result
    }

    async fn deposit_locked(
        &self,
        owner_id: Uuid,
        amount: Decimal,
        currency: Currency,
        description: Option<String>,
    ) -> Result<Receipt> {
        let _guard = self.lock_owner(owner_id).await?;

        // Lazy provisioning: only the deposit path creates a wallet in the
        // requested currency. The wallet row is not persisted until the
        // mutation commits, so a failed validation leaves nothing behind.
        let mut wallet = match self.storage.get_wallet_by_owner(owner_id)? {
            Some(wallet) => wallet,
            None => Wallet::new(owner_id, currency),
        };

        if wallet.currency != currency {
            return Err(Error::CurrencyMismatch {
                wallet_currency: wallet.currency,
                requested: currency,
            });
        }

        validate_amount(amount)?;

        let balance_before = wallet.balance;
        wallet.deposit(amount)?;

        let record = self.commit_recorded(
            &wallet,
            TransactionKind::Deposit,
            amount,
            currency,
            description.unwrap_or_else(|| DEFAULT_DEPOSIT_DESCRIPTION.to_string()),
            balance_before,
        )?;

        Ok(Receipt {
            new_balance: wallet.balance,
            transaction: record,
        })
    }

    /// Withdraw money from the owner's wallet
    ///
    /// Fails with [`Error::WalletNotFound`] when the owner has no wallet;
    /// withdrawals never provision one.
    pub async fn withdraw(
        &self,
        owner_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Receipt> {
        let result = self.withdraw_locked(owner_id, amount, description).await;

        match &result {
            Ok(receipt) => {
                self.metrics.record_withdrawal();
                tracing::info!(
                    owner_id = %owner_id,
                    reference = %receipt.transaction.reference,
                    amount = %amount,
                    new_balance = %receipt.new_balance,
                    "Withdrawal committed"
                );
            }
            Err(e) if !e.is_retryable() => self.metrics.record_rejection(),
            Err(_) => {}
        }

        result
    }

    async fn withdraw_locked(
        &self,
        owner_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Receipt> {
        let _guard = self.lock_owner(owner_id).await?;

        let mut wallet = self
            .storage
            .get_wallet_by_owner(owner_id)?
            .ok_or(Error::WalletNotFound(owner_id))?;

        validate_amount(amount)?;

        if !wallet.can_withdraw(amount) {
            return Err(Error::InsufficientBalance {
                balance: wallet.balance,
                requested: amount,
            });
        }

        let balance_before = wallet.balance;
        wallet.withdraw(amount)?;

        let record = self.commit_recorded(
            &wallet,
            TransactionKind::Withdrawal,
            amount,
            wallet.currency,
            description.unwrap_or_else(|| DEFAULT_WITHDRAWAL_DESCRIPTION.to_string()),
            balance_before,
        )?;

        Ok(Receipt {
            new_balance: wallet.balance,
            transaction: record,
        })
    }

    /// Get the owner's wallet, provisioning a zero-balance wallet when absent
    pub async fn get_balance(&self, owner_id: Uuid) -> Result<Wallet> {
        if let Some(wallet) = self.storage.get_wallet_by_owner(owner_id)? {
            return Ok(wallet);
        }

        // Provisioning needs the owner lock so a concurrent deposit cannot
        // create a second wallet for the same owner.
        let _guard = self.lock_owner(owner_id).await?;

        match self.storage.get_wallet_by_owner(owner_id)? {
            Some(wallet) => Ok(wallet),
            None => {
                let wallet = Wallet::new(owner_id, DEFAULT_CURRENCY);
                self.storage.put_wallet(&wallet)?;
                tracing::info!(owner_id = %owner_id, wallet_id = %wallet.id, "Wallet provisioned on balance lookup");
                Ok(wallet)
            }
        }
    }

    /// List the owner's transactions, newest committed first
    ///
    /// `page` is 1-based; `page_size` is clamped to 1..=100. An owner with
    /// no wallet gets an empty page.
    pub async fn list_transactions(
        &self,
        owner_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<TransactionPage> {
        let wallet = match self.storage.get_wallet_by_owner(owner_id)? {
            Some(wallet) => wallet,
            None => {
                return Ok(TransactionPage {
                    results: vec![],
                    total: 0,
                })
            }
        };

        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page - 1) * u64::from(page_size);

        let results = self
            .storage
            .list_wallet_transactions(wallet.id, offset, u64::from(page_size))?;
        let total = self.storage.wallet_transaction_count(wallet.id)?;

        Ok(TransactionPage { results, total })
    }

    /// Get one of the owner's transactions by ID
    ///
    /// A record belonging to another owner's wallet is reported as not
    /// found, never disclosed.
    pub async fn get_transaction(
        &self,
        owner_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<TransactionRecord> {
        let wallet = self
            .storage
            .get_wallet_by_owner(owner_id)?
            .ok_or(Error::TransactionNotFound(transaction_id))?;

        let record = self.storage.get_transaction(transaction_id)?;
        if record.wallet_id != wallet.id {
            return Err(Error::TransactionNotFound(transaction_id));
        }

        Ok(record)
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Get metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Acquire the owner's mutation lock within the configured bound
    async fn lock_owner(&self, owner_id: Uuid) -> Result<OwnedMutexGuard<()>> {
        let lock = self
            .locks
            .entry(owner_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let wait = Duration::from_millis(self.config.mutation.lock_wait_ms);
        timeout(wait, lock.lock_owned())
            .await
            .map_err(|_| Error::Busy(self.config.mutation.lock_wait_ms))
    }

    /// Build the transaction record and commit it with the updated wallet,
    /// regenerating the reference on a store-level collision.
    fn commit_recorded(
        &self,
        wallet: &Wallet,
        kind: TransactionKind,
        amount: Decimal,
        currency: Currency,
        description: String,
        balance_before: Decimal,
    ) -> Result<TransactionRecord> {
        let max_attempts = self.config.mutation.max_reference_attempts;
        let started = Instant::now();

        for _attempt in 0..max_attempts {
            let now = Utc::now();
            let record = TransactionRecord {
                id: Uuid::new_v4(),
                wallet_id: wallet.id,
                kind,
                amount,
                currency,
                status: TransactionStatus::Completed,
                description: description.clone(),
                reference: generate_reference(),
                balance_before,
                balance_after: wallet.balance,
                created_at: now,
                updated_at: now,
            };

            match self.storage.commit_mutation(wallet, &record) {
                Ok(_) => {
                    self.metrics
                        .record_commit_duration(started.elapsed().as_secs_f64());
                    return Ok(record);
                }
                Err(Error::DuplicateReference(reference)) => {
                    self.metrics.record_reference_retry();
                    tracing::warn!(
                        wallet_id = %wallet.id,
                        reference = %reference,
                        "Reference collision, regenerating"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::ReferenceExhausted(max_attempts))
    }
}
