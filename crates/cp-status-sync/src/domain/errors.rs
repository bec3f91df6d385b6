//! Status sync error types.

use shared_types::{StoreError, TransactionId, UserId};
use thiserror::Error;

/// Status sync error type.
///
/// Only genuinely broken references are errors; degraded outcomes such
/// as an insufficient balance for a tax deduction ride in the sync
/// result as [`crate::domain::TaxDeduction`] values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The triggering transaction does not exist.
    #[error("transaction {} not found", .0 .0)]
    TransactionNotFound(TransactionId),

    /// The transaction's owner (or the force-sync target) does not exist.
    #[error("user {} not found", .0 .0)]
    UserNotFound(UserId),

    /// Underlying ledger failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
