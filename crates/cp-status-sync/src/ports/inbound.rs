//! Inbound (driving) port for the status sync subsystem.

use crate::domain::{SyncAllReport, SyncError, SyncResult};
use shared_types::{TransactionId, UserId};

/// The status sync engine's API, as seen by transaction handlers and
/// webhook processors.
pub trait SyncApi: Send + Sync {
    /// Reconciles the owning user's status after `transaction_id`
    /// changed state.
    ///
    /// One atomic unit: load the transaction and lock its user, settle
    /// a completed tax payment against the balance (soft outcomes only),
    /// recompute the status, persist iff it changed. `source` is an
    /// opaque provenance tag carried into the result and the logs.
    ///
    /// Errors: [`SyncError::TransactionNotFound`] for a dangling id,
    /// [`SyncError::UserNotFound`] when the owner row is gone.
    fn sync_on_transaction_change(
        &self,
        transaction_id: TransactionId,
        source: &str,
    ) -> Result<SyncResult, SyncError>;

    /// Recomputes and persists one user's status with no transaction
    /// context. Hard [`SyncError::UserNotFound`] for an unknown user.
    fn force_sync(&self, user_id: UserId) -> Result<SyncResult, SyncError>;

    /// Recomputes every user, each under its own atomic scope. Per-user
    /// failures are logged and counted, never abort the batch.
    fn sync_all(&self) -> Result<SyncAllReport, SyncError>;
}
