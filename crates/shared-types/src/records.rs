//! # Core Domain Records
//!
//! Defines the persisted record types for the Chainpay core.
//!
//! ## Clusters
//!
//! - **Pool**: `AddressRecord`, `ReservationRecord`
//! - **Ledger**: `TransactionRecord`, `BalanceRecord`, `UserStatus`
//!
//! Ownership of the write paths is split: the address pool exclusively
//! writes `AddressRecord`/`ReservationRecord`; the status sync engine
//! exclusively writes `UserStatus` and the tax-related balance deduction.

use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// A monetary amount in token base units.
///
/// Signed on purpose: non-negativity of balances is a policy enforced by
/// the calling handlers, not by the type.
pub type Amount = i64;

/// Surrogate key of a pooled receive-address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressId(pub u64);

/// Surrogate key of an address reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub u64);

/// Surrogate key of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

/// Surrogate key of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

// =============================================================================
// CLUSTER A: ADDRESS POOL
// =============================================================================

/// Allocation state of a pooled address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStatus {
    /// Free and allocatable (subject to grace period and soft-disable).
    #[default]
    Active,
    /// Held by exactly one active reservation.
    Reserved,
    /// Taken out of rotation.
    Inactive,
}

/// A blockchain receive-address managed by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Surrogate key.
    pub id: AddressId,
    /// The unique on-chain address string.
    pub address: String,
    /// Current allocation state.
    pub status: AddressStatus,
    /// Soft-disable flag for administrative removal from rotation.
    pub is_active: bool,
    /// Number of times this address has been leased.
    pub usage_count: u64,
    /// When the address was last reserved, if ever.
    pub last_reserved_at: Option<Timestamp>,
    /// When the address was last released, if ever. Drives FIFO rotation.
    pub last_released_at: Option<Timestamp>,
    /// Cooldown boundary; the address is not allocatable before this.
    pub grace_period_until: Option<Timestamp>,
    /// Creation time.
    pub created_at: Timestamp,
}

impl AddressRecord {
    /// Returns true if the address may be handed out at `now`.
    ///
    /// An address is eligible iff it is `Active`, not soft-disabled, and
    /// its grace period (if any) has elapsed.
    pub fn is_eligible(&self, now: Timestamp) -> bool {
        self.status == AddressStatus::Active
            && self.is_active
            && self.grace_period_until.map_or(true, |until| until <= now)
    }

    /// FIFO rotation key: oldest `last_released_at` first, never-used
    /// addresses (`None`) before all others, ties broken by lowest id.
    ///
    /// `Option`'s ordering puts `None` first, which is exactly the
    /// nulls-first semantics the rotation needs.
    pub fn rotation_key(&self) -> (Option<Timestamp>, AddressId) {
        (self.last_released_at, self.id)
    }
}

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// The lease is live; the address is held for its user.
    #[default]
    Active,
    /// The lease ended tied to a completed transaction.
    Used,
    /// The lease ran past `expires_at` or was released without a transaction.
    Expired,
    /// The lease was explicitly released.
    Released,
}

/// A time-bounded exclusive claim on one address by one user.
///
/// INVARIANT: at most one `Active` reservation exists per address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// Surrogate key.
    pub id: ReservationId,
    /// The reserved address.
    pub address_id: AddressId,
    /// The user holding the lease.
    pub user_id: UserId,
    /// Set once the caller creates its transaction against this lease.
    pub transaction_id: Option<TransactionId>,
    /// When the lease was taken.
    pub reserved_at: Timestamp,
    /// When the lease lapses unless released earlier.
    pub expires_at: Timestamp,
    /// When the lease ended, whichever way it ended.
    pub released_at: Option<Timestamp>,
    /// Lifecycle state.
    pub status: ReservationStatus,
}

impl ReservationRecord {
    /// Returns true if this reservation is live but past its deadline.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.status == ReservationStatus::Active && self.expires_at < now
    }
}

// =============================================================================
// CLUSTER B: TRANSACTION LEDGER
// =============================================================================

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

/// Processing state of a withdrawal-shaped transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Requested,
    Approved,
    Completed,
    Rejected,
    Cancelled,
}

impl WithdrawalStatus {
    /// The "active regular withdrawal" set: states in which a withdrawal
    /// still occupies the user.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Requested | Self::Pending | Self::Approved)
    }
}

/// Business purpose of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPurpose {
    #[default]
    Regular,
    SystemWithdrawal,
    SystemSwift,
    UserSwift,
    SystemTax,
    TaxPayment,
}

/// A deposit or withdrawal owned by the transaction ledger.
///
/// The core mutates only the address-assignment fields (pool) and reads
/// the rest; amount and status writes belong to the calling handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Surrogate key.
    pub id: TransactionId,
    /// Owning user.
    pub user_id: UserId,
    /// Amount in token base units.
    pub amount: Amount,
    /// Deposit or withdrawal.
    pub kind: TransactionKind,
    /// Withdrawal processing state; `None` for plain deposits.
    pub withdrawal_status: Option<WithdrawalStatus>,
    /// Business purpose.
    pub purpose: TransactionPurpose,
    /// Counterparty wallet address, if any.
    pub wallet_address: Option<String>,
    /// On-chain transaction id once observed.
    pub external_txid: Option<String>,
    /// Pool address linked to this transaction, if one was assigned.
    pub assigned_address_id: Option<AddressId>,
    /// Deadline inherited from the address reservation.
    pub address_expires_at: Option<Timestamp>,
    /// Free-form operator comment.
    pub comment: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// When the transaction reached a terminal state.
    pub processed_at: Option<Timestamp>,
}

impl TransactionRecord {
    /// Returns true if this is a withdrawal still occupying the user.
    pub fn is_active_withdrawal(&self) -> bool {
        self.kind == TransactionKind::Withdrawal
            && self.withdrawal_status.map_or(false, WithdrawalStatus::is_in_flight)
    }

    /// Returns true if this is a completed tax payment.
    pub fn is_completed_tax_payment(&self) -> bool {
        self.purpose == TransactionPurpose::TaxPayment
            && self.withdrawal_status == Some(WithdrawalStatus::Completed)
    }
}

/// Per-user balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Owning user (one balance row per user).
    pub user_id: UserId,
    /// Amount in token base units. Non-negative by policy.
    pub amount: Amount,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

/// A user's externally-visible withdrawal status.
///
/// Derived from the transaction set, cached on the user row for fast
/// reads, and always present with a defined default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// No withdrawal in flight.
    #[default]
    Available,
    /// A regular withdrawal was requested and awaits approval.
    RegularWithdrawalRequested,
    /// A regular withdrawal was approved and awaits completion.
    RegularWithdrawalApproved,
    /// A non-regular withdrawal (system, swift, tax) is in flight.
    WithdrawalInProgress,
}
