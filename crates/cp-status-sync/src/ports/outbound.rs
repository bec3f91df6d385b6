//! Outbound (driven) port for the status sync subsystem.
//!
//! The engine owns the derivation and persistence rules; this trait
//! defines what it needs from the transaction ledger: user rows with a
//! cached status, per-user transaction sets, and balance rows.

use shared_types::{
    BalanceRecord, StoreError, StoreTx, TransactionId, TransactionRecord, UserId, UserStatus,
};

/// A ledger transaction: the rows the sync engine reads and the two it
/// writes (user status, balance).
///
/// Locking contract mirrors the lease store: `lock_*` methods take the
/// row lock for the rest of the transaction, failing with
/// [`StoreError::Contention`] if another open transaction holds it;
/// writers implicitly lock; plain readers take no locks.
pub trait LedgerTx: StoreTx {
    /// Reads one transaction row. No lock.
    fn transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError>;

    /// Locks the user row and returns its cached status. `Ok(None)` if
    /// the user does not exist.
    fn lock_user_status(&mut self, user_id: UserId)
        -> Result<Option<UserStatus>, StoreError>;

    /// Writes the user's cached status.
    fn set_user_status(&mut self, user_id: UserId, status: UserStatus)
        -> Result<(), StoreError>;

    /// All transactions owned by `user_id`, id-ascending. No locks.
    fn user_transactions(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Locks the user's balance row. `Ok(None)` if no balance row exists.
    fn lock_balance(&mut self, user_id: UserId)
        -> Result<Option<BalanceRecord>, StoreError>;

    /// Writes back a mutated balance row.
    fn update_balance(&mut self, record: &BalanceRecord) -> Result<(), StoreError>;

    /// The user's most recently processed `Completed` tax-payment
    /// transaction, if any. No lock.
    fn latest_completed_tax_payment(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<TransactionRecord>, StoreError>;

    /// Every known user id, ascending. No locks.
    fn user_ids(&mut self) -> Result<Vec<UserId>, StoreError>;
}

/// A transactional ledger whose transactions speak [`LedgerTx`].
pub trait TransactionLedger: Send + Sync {
    /// The transaction type; borrows the ledger for its lifetime.
    type Tx<'a>: LedgerTx
    where
        Self: 'a;

    /// Opens a new transaction.
    fn begin(&self) -> Result<Self::Tx<'_>, StoreError>;
}
