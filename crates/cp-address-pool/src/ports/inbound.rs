//! # Inbound Port - PoolApi
//!
//! Primary driving port exposing the address pool to the calling
//! handlers (deposit, admin, webhook).

use crate::domain::{LeasedAddress, PoolError, PoolStatus, ProvisionReport};
use shared_types::{AddressId, TransactionId, UserId};

/// Primary API for the address pool subsystem.
///
/// Safe to call from many concurrent request-handling threads; all
/// exclusion lives in the lease store's row locks.
pub trait PoolApi: Send + Sync {
    /// Acquires the longest-idle eligible address for `user_id` in one
    /// atomic unit: either the caller gets a uniquely reserved address
    /// with a matching reservation row, or nothing.
    ///
    /// # Errors
    /// - `PoolEmpty`: zero managed addresses (operational alarm)
    /// - `NoAddressAvailable`: pool exhausted (expected under load)
    /// - `Store`: lease store failure
    fn acquire(
        &self,
        user_id: UserId,
        reservation_ms: Option<u64>,
    ) -> Result<LeasedAddress, PoolError>;

    /// `acquire` with bounded retries absorbing transient store
    /// contention only; business errors pass straight through.
    fn acquire_with_retry(
        &self,
        user_id: UserId,
        reservation_ms: Option<u64>,
    ) -> Result<LeasedAddress, PoolError>;

    /// Releases an address back into rotation with a fresh grace period,
    /// closing its active reservation as `Used` (transaction supplied)
    /// or `Expired` (none).
    ///
    /// Returns `Ok(false)` without error if the address does not exist
    /// or was already released; address deletion races with in-flight
    /// releases under administrative pool edits.
    fn release(
        &self,
        address_id: AddressId,
        transaction_id: Option<TransactionId>,
    ) -> Result<bool, PoolError>;

    /// Links a transaction to an already-active reservation for the same
    /// user, stamping the transaction's address deadline from the
    /// reservation. `Ok(false)` if no matching reservation exists; this
    /// is a consistency check, never a fresh reservation.
    fn assign_to_transaction(
        &self,
        transaction_id: TransactionId,
        address_id: AddressId,
    ) -> Result<bool, PoolError>;

    /// Expires every active reservation past its deadline and releases
    /// the addresses still held by them. Idempotent; intended for a
    /// periodic external timer. Returns the number of reservations swept.
    fn sweep_expired(&self) -> Result<usize, PoolError>;

    /// Read-only status snapshot with health classification.
    fn pool_status(&self) -> Result<PoolStatus, PoolError>;

    /// Validates and inserts a batch of addresses, skipping duplicates.
    /// Best-effort: per-item errors are reported, validated insertions
    /// stick.
    fn provision(&self, addresses: &[String]) -> Result<ProvisionReport, PoolError>;
}
