//! Custodial Wallet Ledger Core
//!
//! Per-user balance tracking with an immutable transaction record for every
//! balance-affecting event.
//!
//! # Architecture
//!
//! - **Atomic mutation**: A balance update and its transaction record
//!   commit together or not at all
//! - **Per-owner locking**: Concurrent mutations on one wallet serialize;
//!   different wallets proceed independently
//! - **Exact arithmetic**: All money is fixed-point decimal, scale 2
//! - **Unique references**: Every record carries a `TXN-XXXXXXXX`
//!   reference, enforced unique by the store
//!
//! # Invariants
//!
//! - Balance never negative: rejected withdrawals leave it unchanged
//! - Conservation: balance_after = balance_before ± amount, exactly
//! - Snapshot chaining: consecutive records for a wallet compose

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod reference;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use reference::{generate_reference, is_valid_reference};
pub use types::{
    Currency, Receipt, TransactionKind, TransactionPage, TransactionRecord, TransactionStatus,
    Wallet,
};
