//! In-memory lease store with row-level locks.
//!
//! Models the concurrency semantics the pool is written against:
//! per-row locks held for the life of a transaction, skip-locked scans
//! for the FIFO selection, and undo-log rollback. Transactions observe
//! and mutate the shared tables directly; every mutation is journaled
//! and reverted on rollback (including rollback-on-drop).
//!
//! Lock ordering is fixed as tables-then-locks; no method acquires them
//! in the opposite order.

use crate::domain::PoolCounts;
use crate::ports::{LeaseStore, LeaseTx, NewAddress, NewReservation};
use shared_types::{
    AddressId, AddressRecord, AddressStatus, ReservationId, ReservationRecord, ReservationStatus,
    StoreError, StoreTx, Timestamp, TransactionId, TransactionRecord, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies one lockable row across the three tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Address(AddressId),
    Reservation(ReservationId),
    Transaction(TransactionId),
}

/// One journaled mutation: the row's state before this transaction
/// touched it. `None` means the row did not exist.
#[derive(Debug)]
enum Undo {
    Address(AddressId, Option<AddressRecord>),
    Reservation(ReservationId, Option<ReservationRecord>),
    Transaction(TransactionId, Option<TransactionRecord>),
}

#[derive(Debug, Default)]
struct Tables {
    addresses: BTreeMap<AddressId, AddressRecord>,
    reservations: BTreeMap<ReservationId, ReservationRecord>,
    transactions: BTreeMap<TransactionId, TransactionRecord>,
    next_address_id: u64,
    next_reservation_id: u64,
}

#[derive(Debug)]
struct Inner {
    tables: Mutex<Tables>,
    /// Row lock table: key -> owning transaction id.
    locks: Mutex<HashMap<RowKey, u64>>,
    next_tx: AtomicU64,
}

/// Shared in-memory lease store. Cloning yields another handle to the
/// same tables.
#[derive(Debug, Clone)]
pub struct MemoryLeaseStore {
    inner: Arc<Inner>,
}

impl Default for MemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables {
                    next_address_id: 1,
                    next_reservation_id: 1,
                    ..Default::default()
                }),
                locks: Mutex::new(HashMap::new()),
                next_tx: AtomicU64::new(1),
            }),
        }
    }

    /// Committed snapshot of one address row. Test support.
    pub fn address(&self, id: AddressId) -> Option<AddressRecord> {
        self.inner.tables.lock().ok()?.addresses.get(&id).cloned()
    }

    /// Committed snapshot of one reservation row. Test support.
    pub fn reservation(&self, id: ReservationId) -> Option<ReservationRecord> {
        self.inner.tables.lock().ok()?.reservations.get(&id).cloned()
    }

    /// Committed snapshot of one transaction row. Test support.
    pub fn transaction(&self, id: TransactionId) -> Option<TransactionRecord> {
        self.inner.tables.lock().ok()?.transactions.get(&id).cloned()
    }

    /// Inserts a ledger transaction outside any store transaction. Test
    /// support for the assignment path, which only reads and updates
    /// transactions it did not create.
    pub fn seed_transaction(&self, record: TransactionRecord) {
        if let Ok(mut tables) = self.inner.tables.lock() {
            tables.transactions.insert(record.id, record);
        }
    }
}

impl LeaseStore for MemoryLeaseStore {
    type Tx<'a>
        = MemoryLeaseTx<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>, StoreError> {
        Ok(MemoryLeaseTx {
            inner: &self.inner,
            tx_id: self.inner.next_tx.fetch_add(1, Ordering::SeqCst),
            held: Vec::new(),
            undo: Vec::new(),
            finished: false,
        })
    }
}

/// An open transaction against a [`MemoryLeaseStore`].
#[derive(Debug)]
pub struct MemoryLeaseTx<'a> {
    inner: &'a Inner,
    tx_id: u64,
    held: Vec<RowKey>,
    undo: Vec<Undo>,
    finished: bool,
}

impl<'a> MemoryLeaseTx<'a> {
    // The guard borrows the shared tables, not `self`; methods mutate the
    // undo log and lock list while holding it.
    fn tables(&self) -> Result<MutexGuard<'a, Tables>, StoreError> {
        self.inner.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Takes the row lock for `key`. Re-entrant for locks this
    /// transaction already holds; [`StoreError::Contention`] if another
    /// open transaction holds it.
    fn lock_row(&mut self, key: RowKey) -> Result<(), StoreError> {
        let mut locks = self.inner.locks.lock().map_err(|_| StoreError::LockPoisoned)?;
        match locks.get(&key) {
            Some(&owner) if owner == self.tx_id => Ok(()),
            Some(_) => Err(StoreError::Contention),
            None => {
                locks.insert(key, self.tx_id);
                self.held.push(key);
                Ok(())
            }
        }
    }

    fn release_locks(&mut self) {
        if let Ok(mut locks) = self.inner.locks.lock() {
            for key in self.held.drain(..) {
                locks.remove(&key);
            }
        }
    }

    fn finish(&mut self, commit: bool) -> Result<(), StoreError> {
        self.finished = true;
        if !commit {
            // Revert newest-first so the journal restores the pre-tx state.
            match self.tables() {
                Ok(mut tables) => {
                    for entry in self.undo.drain(..).rev() {
                        match entry {
                            Undo::Address(id, Some(prev)) => {
                                tables.addresses.insert(id, prev);
                            }
                            Undo::Address(id, None) => {
                                tables.addresses.remove(&id);
                            }
                            Undo::Reservation(id, Some(prev)) => {
                                tables.reservations.insert(id, prev);
                            }
                            Undo::Reservation(id, None) => {
                                tables.reservations.remove(&id);
                            }
                            Undo::Transaction(id, Some(prev)) => {
                                tables.transactions.insert(id, prev);
                            }
                            Undo::Transaction(id, None) => {
                                tables.transactions.remove(&id);
                            }
                        }
                    }
                }
                Err(err) => {
                    self.release_locks();
                    return Err(err);
                }
            }
        }
        self.undo.clear();
        self.release_locks();
        Ok(())
    }
}

impl StoreTx for MemoryLeaseTx<'_> {
    fn commit(&mut self) -> Result<(), StoreError> {
        self.finish(true)
    }

    fn rollback(&mut self) {
        // Poisoning here means a panicking holder already corrupted the
        // shared state; nothing more to unwind.
        let _ = self.finish(false);
    }
}

impl Drop for MemoryLeaseTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback();
        }
    }
}

impl LeaseTx for MemoryLeaseTx<'_> {
    fn lock_first_eligible(
        &mut self,
        now: Timestamp,
    ) -> Result<Option<AddressRecord>, StoreError> {
        let candidates: Vec<AddressId> = {
            let tables = self.tables()?;
            let mut eligible: Vec<&AddressRecord> = tables
                .addresses
                .values()
                .filter(|a| a.is_eligible(now))
                .collect();
            eligible.sort_by_key(|a| a.rotation_key());
            eligible.iter().map(|a| a.id).collect()
        };

        for id in candidates {
            match self.lock_row(RowKey::Address(id)) {
                Ok(()) => {
                    // A competing acquire may have reserved and committed
                    // this row between the scan and winning its lock; only
                    // the state re-read under the lock counts.
                    if let Some(row) = self.tables()?.addresses.get(&id).cloned() {
                        if row.is_eligible(now) {
                            return Ok(Some(row));
                        }
                    }
                }
                // Skip-locked: a concurrent acquirer holds this row.
                Err(StoreError::Contention) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    fn lock_address(&mut self, id: AddressId) -> Result<Option<AddressRecord>, StoreError> {
        if self.tables()?.addresses.get(&id).is_none() {
            return Ok(None);
        }
        self.lock_row(RowKey::Address(id))?;
        Ok(self.tables()?.addresses.get(&id).cloned())
    }

    fn update_address(&mut self, record: &AddressRecord) -> Result<(), StoreError> {
        self.lock_row(RowKey::Address(record.id))?;
        let mut tables = self.tables()?;
        let prev = tables.addresses.insert(record.id, record.clone());
        drop(tables);
        self.undo.push(Undo::Address(record.id, prev));
        Ok(())
    }

    fn insert_address(&mut self, new: NewAddress) -> Result<AddressRecord, StoreError> {
        let record = {
            let mut tables = self.tables()?;
            let id = AddressId(tables.next_address_id);
            tables.next_address_id += 1;
            let record = AddressRecord {
                id,
                address: new.address,
                status: new.status,
                is_active: new.is_active,
                usage_count: 0,
                last_reserved_at: None,
                last_released_at: None,
                grace_period_until: None,
                created_at: new.created_at,
            };
            tables.addresses.insert(id, record.clone());
            record
        };
        self.lock_row(RowKey::Address(record.id))?;
        self.undo.push(Undo::Address(record.id, None));
        Ok(record)
    }

    fn find_address(&mut self, address: &str) -> Result<Option<AddressRecord>, StoreError> {
        Ok(self
            .tables()?
            .addresses
            .values()
            .find(|a| a.address == address)
            .cloned())
    }

    fn insert_reservation(
        &mut self,
        new: NewReservation,
    ) -> Result<ReservationRecord, StoreError> {
        let record = {
            let mut tables = self.tables()?;
            let id = ReservationId(tables.next_reservation_id);
            tables.next_reservation_id += 1;
            let record = ReservationRecord {
                id,
                address_id: new.address_id,
                user_id: new.user_id,
                transaction_id: None,
                reserved_at: new.reserved_at,
                expires_at: new.expires_at,
                released_at: None,
                status: ReservationStatus::Active,
            };
            tables.reservations.insert(id, record.clone());
            record
        };
        self.lock_row(RowKey::Reservation(record.id))?;
        self.undo.push(Undo::Reservation(record.id, None));
        Ok(record)
    }

    fn update_reservation(&mut self, record: &ReservationRecord) -> Result<(), StoreError> {
        self.lock_row(RowKey::Reservation(record.id))?;
        let mut tables = self.tables()?;
        let prev = tables.reservations.insert(record.id, record.clone());
        drop(tables);
        self.undo.push(Undo::Reservation(record.id, prev));
        Ok(())
    }

    fn lock_active_reservation(
        &mut self,
        address_id: AddressId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Option<ReservationRecord>, StoreError> {
        let wanted = |r: &ReservationRecord| {
            r.status == ReservationStatus::Active
                && r.address_id == address_id
                && transaction_id.map_or(true, |tid| r.transaction_id == Some(tid))
        };

        loop {
            let found = self
                .tables()?
                .reservations
                .values()
                .find(|&r| wanted(r))
                .map(|r| r.id);
            let Some(id) = found else {
                return Ok(None);
            };
            self.lock_row(RowKey::Reservation(id))?;
            match self.tables()?.reservations.get(&id).cloned() {
                Some(row) if wanted(&row) => return Ok(Some(row)),
                // Raced with a concurrent close between scan and lock;
                // rescan for another match.
                _ => continue,
            }
        }
    }

    fn lock_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<ReservationRecord>, StoreError> {
        if self.tables()?.reservations.get(&id).is_none() {
            return Ok(None);
        }
        self.lock_row(RowKey::Reservation(id))?;
        Ok(self.tables()?.reservations.get(&id).cloned())
    }

    fn active_reservation_for_user(
        &mut self,
        address_id: AddressId,
        user_id: UserId,
    ) -> Result<Option<ReservationRecord>, StoreError> {
        Ok(self
            .tables()?
            .reservations
            .values()
            .find(|r| {
                r.status == ReservationStatus::Active
                    && r.address_id == address_id
                    && r.user_id == user_id
            })
            .cloned())
    }

    fn expired_active_reservations(
        &mut self,
        now: Timestamp,
    ) -> Result<Vec<ReservationRecord>, StoreError> {
        Ok(self
            .tables()?
            .reservations
            .values()
            .filter(|r| r.is_expired(now))
            .cloned()
            .collect())
    }

    fn transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.tables()?.transactions.get(&id).cloned())
    }

    fn update_transaction(&mut self, record: &TransactionRecord) -> Result<(), StoreError> {
        self.lock_row(RowKey::Transaction(record.id))?;
        let mut tables = self.tables()?;
        let prev = tables.transactions.insert(record.id, record.clone());
        drop(tables);
        self.undo.push(Undo::Transaction(record.id, prev));
        Ok(())
    }

    fn pool_counts(&mut self, now: Timestamp) -> Result<PoolCounts, StoreError> {
        let tables = self.tables()?;
        // Soft-disabled rows are out of management entirely.
        Ok(PoolCounts {
            total: tables
                .addresses
                .values()
                .filter(|a| a.is_active)
                .count() as u64,
            eligible: tables
                .addresses
                .values()
                .filter(|a| a.is_eligible(now))
                .count() as u64,
            reserved: tables
                .addresses
                .values()
                .filter(|a| a.is_active && a.status == AddressStatus::Reserved)
                .count() as u64,
            expired_reservations: tables
                .reservations
                .values()
                .filter(|r| r.is_expired(now))
                .count() as u64,
        })
    }
}
