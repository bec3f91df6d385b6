//! Value objects for the status sync subsystem.

use serde::{Deserialize, Serialize};
use shared_types::{Amount, Timestamp, TransactionId, UserId, UserStatus};

/// Outcome of the tax-deduction step of a sync.
///
/// All variants are soft: a deduction that cannot be applied is reported,
/// logged, and the status sync proceeds regardless.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TaxDeduction {
    /// The balance covered the tax; deducted exactly once.
    Applied {
        /// Amount removed from the balance.
        deducted: Amount,
        /// Balance remaining after the deduction.
        remaining: Amount,
        /// The completed tax-payment transaction that was settled.
        transaction_id: TransactionId,
    },
    /// The balance does not cover the tax; nothing was touched.
    InsufficientBalance {
        /// Tax amount owed.
        required: Amount,
        /// Balance actually available.
        available: Amount,
    },
    /// The user has no balance row at all.
    NoBalanceRecord,
    /// No completed tax-payment transaction exists for the user.
    NoTaxTransaction,
}

/// Outcome of one user status sync.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// The user whose status was reconciled.
    pub user_id: UserId,
    /// The triggering transaction; `None` for force/batch syncs.
    pub transaction_id: Option<TransactionId>,
    /// Status before the sync.
    pub old_status: UserStatus,
    /// Status after the sync.
    pub new_status: UserStatus,
    /// True if `new_status` differs and was persisted.
    pub changed: bool,
    /// Opaque provenance tag naming the trigger site.
    pub source: String,
    /// Tax-deduction outcome, when the trigger was a completed tax payment.
    pub balance_deduction: Option<TaxDeduction>,
    /// When the sync ran.
    pub synced_at: Timestamp,
}

/// Outcome of a whole-population sync pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncAllReport {
    /// Users examined.
    pub total_users: u64,
    /// Users whose persisted status changed.
    pub changed_users: u64,
    /// Users whose sync failed (logged and skipped).
    pub failed_users: u64,
    /// Up to `sync_all_sample_limit` changed-user results.
    pub sample: Vec<SyncResult>,
}
