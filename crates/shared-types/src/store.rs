//! # Scoped Atomic Operations
//!
//! The reusable transaction primitive for the core's stores. A unit of
//! work runs inside a store transaction (savepoint-equivalent); it is
//! committed only if the closure returns `Ok`, and rolled back on every
//! error path. Store adapters additionally roll back on drop, so an early
//! `?` inside a unit of work can never leave a partial mutation behind.
//!
//! Each subsystem declares its own store trait (`LeaseStore`,
//! `TransactionLedger`) whose `begin()` yields a transaction implementing
//! [`StoreTx`] plus the subsystem's row operations; [`atomically`] wraps
//! any of them:
//!
//! ```rust,ignore
//! atomically(store.begin(), |tx| {
//!     let row = tx.lock_address(id)?;
//!     // mutate, insert, ...
//!     Ok(outcome)
//! })
//! ```

use thiserror::Error;

/// Errors surfaced by a store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A required row is locked by a concurrent transaction.
    ///
    /// The only retriable variant; everything else is an operational fault.
    #[error("row locked by a concurrent transaction")]
    Contention,

    /// An internal lock was poisoned by a panicking holder.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// The store's invariants were violated (e.g., dangling reference).
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

/// An open store transaction.
///
/// Implementations must treat a dropped, uncommitted transaction as a
/// rollback and must release any row locks they hold on both paths.
pub trait StoreTx {
    /// Makes the transaction's mutations visible and releases its locks.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards the transaction's mutations and releases its locks.
    fn rollback(&mut self);
}

/// Runs `op` inside the given store transaction.
///
/// Takes the result of a store's `begin()` so it works with every store
/// trait in the workspace. Commits when `op` returns `Ok`; rolls back
/// when it returns `Err`. The error type only needs a `From<StoreError>`
/// conversion, so domain error enums with a `#[from]` store variant slot
/// in directly.
pub fn atomically<Tx, T, E, F>(begin: Result<Tx, StoreError>, op: F) -> Result<T, E>
where
    Tx: StoreTx,
    E: From<StoreError>,
    F: FnOnce(&mut Tx) -> Result<T, E>,
{
    let mut tx = begin?;
    match op(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback();
            Err(err)
        }
    }
}
