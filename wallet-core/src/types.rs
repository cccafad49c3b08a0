//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum representable amount: 15 total digits, 2 fractional
/// (999_999_999_999_999 scaled by 10^-2 = 9_999_999_999_999.99)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_7FFF, 0x0003_8D7E, 0, false, 2);

/// Minimum transaction amount (0.01)
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// Japanese Yen
    JPY,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Currency::USD => "US Dollar",
            Currency::EUR => "Euro",
            Currency::GBP => "British Pound",
            Currency::JPY => "Japanese Yen",
        }
    }

    /// Parse from a 3-letter code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validate a monetary amount against the wire format: strictly positive,
/// at most 2 fractional digits, at most 15 total digits.
pub fn validate_amount(amount: Decimal) -> crate::Result<()> {
    if amount <= Decimal::ZERO {
        return Err(crate::Error::InvalidAmount(amount));
    }
    if amount.normalize().scale() > 2 {
        return Err(crate::Error::InvalidAmount(amount));
    }
    if amount < MIN_AMOUNT || amount > MAX_AMOUNT {
        return Err(crate::Error::InvalidAmount(amount));
    }
    Ok(())
}

/// A user's wallet
///
/// Holds the current balance for exactly one owner. Balance mutations go
/// through [`deposit`](Wallet::deposit) and [`withdraw`](Wallet::withdraw),
/// which enforce the non-negativity invariant. These operations are pure
/// domain logic: persistence and transaction recording are composed around
/// them by [`Ledger`](crate::Ledger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet ID
    pub id: Uuid,

    /// Owning user (exactly one wallet per owner)
    pub owner_id: Uuid,

    /// Current balance (scale 2, never negative)
    pub balance: Decimal,

    /// Wallet currency
    pub currency: Currency,

    /// Active flag (policy extension point, not checked on mutation paths)
    pub is_active: bool,

    /// Created timestamp (immutable)
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp (bumped on every mutation)
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a new zero-balance wallet for an owner
    pub fn new(owner_id: Uuid, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            balance: Decimal::ZERO,
            currency,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the wallet can cover a withdrawal
    pub fn can_withdraw(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Add money to the wallet
    pub fn deposit(&mut self, amount: Decimal) -> crate::Result<()> {
        if amount <= Decimal::ZERO {
            return Err(crate::Error::InvalidAmount(amount));
        }
        self.balance += amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Withdraw money from the wallet
    pub fn withdraw(&mut self, amount: Decimal) -> crate::Result<()> {
        if amount <= Decimal::ZERO {
            return Err(crate::Error::InvalidAmount(amount));
        }
        if !self.can_withdraw(amount) {
            return Err(crate::Error::InsufficientBalance {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.owner_id, self.balance, self.currency)
    }
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Money added to a wallet
    Deposit = 1,
    /// Money removed from a wallet
    Withdrawal = 2,
    /// Wallet-to-wallet transfer (reserved, not produced by current paths)
    Transfer = 3,
}

impl TransactionKind {
    /// Wire code
    pub fn code(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Transaction status
///
/// Mutation paths produce `Completed` synchronously. The remaining states
/// are reserved for asynchronous settlement flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Awaiting settlement
    Pending = 1,
    /// Settled (terminal)
    Completed = 2,
    /// Settlement failed (terminal)
    Failed = 3,
    /// Cancelled before settlement (terminal)
    Cancelled = 4,
}

impl TransactionStatus {
    /// Wire code
    pub fn code(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Immutable audit record for one balance-affecting event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction ID
    pub id: Uuid,

    /// Owning wallet (immutable after creation)
    pub wallet_id: Uuid,

    /// Transaction kind
    pub kind: TransactionKind,

    /// Amount moved (exact decimal, strictly positive)
    pub amount: Decimal,

    /// Currency (same domain as the wallet currency)
    pub currency: Currency,

    /// Status
    pub status: TransactionStatus,

    /// Free-text description
    pub description: String,

    /// Unique human-readable reference (`TXN-` + 8 uppercase hex)
    pub reference: String,

    /// Balance at the moment the mutation began
    pub balance_before: Decimal,

    /// Balance committed together with this record
    pub balance_after: Decimal,

    /// Created timestamp (immutable)
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {} - {}",
            self.kind, self.amount, self.currency, self.status
        )
    }
}

/// Result of a successful balance mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// The committed transaction record
    pub transaction: TransactionRecord,

    /// Wallet balance after the mutation
    pub new_balance: Decimal,
}

/// One page of transaction history, newest-first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    /// Records on this page
    pub results: Vec<TransactionRecord>,

    /// Total records for the wallet across all pages
    pub total: u64,
}
