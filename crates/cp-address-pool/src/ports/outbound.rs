//! Outbound (driven) ports for the address pool subsystem.
//!
//! The pool owns the allocation algorithm; these traits define what it
//! needs from its collaborators: a transactional lease store with
//! row-level locks and skip-locked scans, and a network-specific address
//! format rule.

use crate::domain::PoolCounts;
use shared_types::{
    AddressId, AddressRecord, AddressStatus, ReservationId, ReservationRecord, StoreError,
    StoreTx, Timestamp, TransactionId, TransactionRecord, UserId,
};

/// Insert payload for a new pooled address.
#[derive(Clone, Debug)]
pub struct NewAddress {
    /// The on-chain address string (unique).
    pub address: String,
    /// Initial allocation state.
    pub status: AddressStatus,
    /// Initial soft-disable flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Insert payload for a new reservation; inserted as `Active` with no
/// transaction linked yet.
#[derive(Clone, Debug)]
pub struct NewReservation {
    /// The address being leased.
    pub address_id: AddressId,
    /// The user taking the lease.
    pub user_id: UserId,
    /// Lease start.
    pub reserved_at: Timestamp,
    /// Lease deadline.
    pub expires_at: Timestamp,
}

/// A lease store transaction: row-level operations over addresses,
/// reservations, and the transaction columns the pool is allowed to touch.
///
/// Locking contract:
/// - `lock_*` methods take the row lock for the rest of the transaction,
///   failing with [`StoreError::Contention`] if another open transaction
///   holds it (the FIFO scan skips such rows instead).
/// - `update_*` methods implicitly take the row lock.
/// - Plain readers take no locks.
pub trait LeaseTx: StoreTx {
    /// Locks and returns the eligible address with the smallest rotation
    /// key, skipping rows locked by concurrent transactions.
    fn lock_first_eligible(&mut self, now: Timestamp)
        -> Result<Option<AddressRecord>, StoreError>;

    /// Locks one address row by id. `Ok(None)` if the row does not exist.
    fn lock_address(&mut self, id: AddressId) -> Result<Option<AddressRecord>, StoreError>;

    /// Writes back a mutated address row.
    fn update_address(&mut self, record: &AddressRecord) -> Result<(), StoreError>;

    /// Inserts a new address row and returns it.
    fn insert_address(&mut self, new: NewAddress) -> Result<AddressRecord, StoreError>;

    /// Looks an address up by its on-chain string. No lock.
    fn find_address(&mut self, address: &str) -> Result<Option<AddressRecord>, StoreError>;

    /// Inserts a new `Active` reservation and returns it.
    fn insert_reservation(&mut self, new: NewReservation)
        -> Result<ReservationRecord, StoreError>;

    /// Writes back a mutated reservation row.
    fn update_reservation(&mut self, record: &ReservationRecord) -> Result<(), StoreError>;

    /// Locks the `Active` reservation for an address, optionally scoped
    /// to the reservation linked to `transaction_id`.
    fn lock_active_reservation(
        &mut self,
        address_id: AddressId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Option<ReservationRecord>, StoreError>;

    /// Locks one reservation row by id. `Ok(None)` if it does not exist.
    fn lock_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<ReservationRecord>, StoreError>;

    /// The `Active` reservation held by `user_id` on `address_id`, if
    /// any. No lock; used for the assignment consistency check.
    fn active_reservation_for_user(
        &mut self,
        address_id: AddressId,
        user_id: UserId,
    ) -> Result<Option<ReservationRecord>, StoreError>;

    /// Active reservations whose deadline is already in the past. No
    /// locks; the sweep re-checks each row under its lock.
    fn expired_active_reservations(
        &mut self,
        now: Timestamp,
    ) -> Result<Vec<ReservationRecord>, StoreError>;

    /// Reads one ledger transaction row. No lock.
    fn transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError>;

    /// Writes back a transaction row (address-assignment columns only).
    fn update_transaction(&mut self, record: &TransactionRecord) -> Result<(), StoreError>;

    /// One consistent read of the counts behind the status snapshot.
    fn pool_counts(&mut self, now: Timestamp) -> Result<PoolCounts, StoreError>;
}

/// A transactional store whose transactions speak [`LeaseTx`].
pub trait LeaseStore: Send + Sync {
    /// The transaction type; borrows the store for its lifetime.
    type Tx<'a>: LeaseTx
    where
        Self: 'a;

    /// Opens a new transaction.
    fn begin(&self) -> Result<Self::Tx<'_>, StoreError>;
}

/// Network-specific address format rule. Injected, since the pool itself
/// is chain-agnostic.
pub trait AddressFormat: Send + Sync {
    /// Returns true if `address` is well-formed for the target network.
    fn is_valid(&self, address: &str) -> bool;
}
