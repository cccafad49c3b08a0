//! Error types for the wallet ledger

use crate::types::Currency;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Amount is non-positive, too precise, or out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Withdrawal exceeds the current balance
    #[error("Insufficient balance: requested {requested}, current balance {balance}")]
    InsufficientBalance {
        /// Current wallet balance
        balance: Decimal,
        /// Requested withdrawal amount
        requested: Decimal,
    },

    /// Deposit currency differs from the wallet's established currency
    #[error("Currency mismatch: wallet currency is {wallet_currency}, requested {requested}")]
    CurrencyMismatch {
        /// The wallet's actual currency
        wallet_currency: Currency,
        /// The currency the caller requested
        requested: Currency,
    },

    /// No wallet exists for the given owner
    #[error("Wallet not found: {0}")]
    WalletNotFound(Uuid),

    /// Transaction does not exist or belongs to another wallet
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Reference already issued to another transaction
    #[error("Duplicate transaction reference: {0}")]
    DuplicateReference(String),

    /// Reference uniqueness retries exhausted
    #[error("Reference generation exhausted after {0} attempts")]
    ReferenceExhausted(u32),

    /// Per-wallet lock could not be acquired within the bounded wait
    #[error("Wallet busy: lock wait exceeded {0}ms")]
    Busy(u64),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller may retry the request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Busy(_) | Error::ReferenceExhausted(_) | Error::Storage(_)
        )
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
