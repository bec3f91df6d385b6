//! In-memory transaction ledger with row-level locks.
//!
//! Same concurrency model as the pool's memory store: per-row locks held
//! for the life of a transaction, undo-log rollback, rollback-on-drop.
//! The sync engine only ever writes user-status and balance rows, so the
//! transaction table is read-only here and mutated solely through the
//! test seeding helpers.
//!
//! Lock ordering is fixed as tables-then-locks.

use crate::ports::{LedgerTx, TransactionLedger};
use shared_types::{
    BalanceRecord, StoreError, StoreTx, TransactionId, TransactionRecord, UserId, UserStatus,
    WithdrawalStatus,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies one lockable row. Transaction rows are never locked: the
/// engine only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    User(UserId),
    Balance(UserId),
}

/// One journaled mutation: the row's state before this transaction
/// touched it.
#[derive(Debug)]
enum Undo {
    UserStatus(UserId, Option<UserStatus>),
    Balance(UserId, Option<BalanceRecord>),
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserStatus>,
    balances: BTreeMap<UserId, BalanceRecord>,
    transactions: BTreeMap<TransactionId, TransactionRecord>,
}

#[derive(Debug)]
struct Inner {
    tables: Mutex<Tables>,
    locks: Mutex<HashMap<RowKey, u64>>,
    next_tx: AtomicU64,
}

/// Shared in-memory ledger. Cloning yields another handle to the same
/// tables.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    inner: Arc<Inner>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                locks: Mutex::new(HashMap::new()),
                next_tx: AtomicU64::new(1),
            }),
        }
    }

    /// Inserts a user row with a cached status. Test support.
    pub fn seed_user(&self, user_id: UserId, status: UserStatus) {
        if let Ok(mut tables) = self.inner.tables.lock() {
            tables.users.insert(user_id, status);
        }
    }

    /// Inserts a balance row. Test support.
    pub fn seed_balance(&self, user_id: UserId, amount: i64) {
        if let Ok(mut tables) = self.inner.tables.lock() {
            tables.balances.insert(
                user_id,
                BalanceRecord {
                    user_id,
                    amount,
                    updated_at: 0,
                },
            );
        }
    }

    /// Inserts a transaction row. Test support; the engine never creates
    /// transactions.
    pub fn seed_transaction(&self, record: TransactionRecord) {
        if let Ok(mut tables) = self.inner.tables.lock() {
            tables.transactions.insert(record.id, record);
        }
    }

    /// Flips a transaction's withdrawal status, simulating the handler
    /// write that precedes a sync. Test support.
    pub fn set_withdrawal_status(
        &self,
        id: TransactionId,
        status: WithdrawalStatus,
        processed_at: Option<u64>,
    ) {
        if let Ok(mut tables) = self.inner.tables.lock() {
            if let Some(txn) = tables.transactions.get_mut(&id) {
                txn.withdrawal_status = Some(status);
                txn.processed_at = processed_at;
            }
        }
    }

    /// Committed snapshot of a user's cached status. Test support.
    pub fn user_status(&self, user_id: UserId) -> Option<UserStatus> {
        self.inner.tables.lock().ok()?.users.get(&user_id).copied()
    }

    /// Committed snapshot of a user's balance amount. Test support.
    pub fn balance(&self, user_id: UserId) -> Option<i64> {
        Some(self.inner.tables.lock().ok()?.balances.get(&user_id)?.amount)
    }
}

impl TransactionLedger for MemoryLedger {
    type Tx<'a>
        = MemoryLedgerTx<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>, StoreError> {
        Ok(MemoryLedgerTx {
            inner: &self.inner,
            tx_id: self.inner.next_tx.fetch_add(1, Ordering::SeqCst),
            held: Vec::new(),
            undo: Vec::new(),
            finished: false,
        })
    }
}

/// An open transaction against a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemoryLedgerTx<'a> {
    inner: &'a Inner,
    tx_id: u64,
    held: Vec<RowKey>,
    undo: Vec<Undo>,
    finished: bool,
}

impl<'a> MemoryLedgerTx<'a> {
    // The guard borrows the shared tables, not `self`; methods mutate the
    // undo log and lock list while holding it.
    fn tables(&self) -> Result<MutexGuard<'a, Tables>, StoreError> {
        self.inner.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }

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
            match self.tables() {
                Ok(mut tables) => {
                    for entry in self.undo.drain(..).rev() {
                        match entry {
                            Undo::UserStatus(id, Some(prev)) => {
                                tables.users.insert(id, prev);
                            }
                            Undo::UserStatus(id, None) => {
                                tables.users.remove(&id);
                            }
                            Undo::Balance(id, Some(prev)) => {
                                tables.balances.insert(id, prev);
                            }
                            Undo::Balance(id, None) => {
                                tables.balances.remove(&id);
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

impl StoreTx for MemoryLedgerTx<'_> {
    fn commit(&mut self) -> Result<(), StoreError> {
        self.finish(true)
    }

    fn rollback(&mut self) {
        let _ = self.finish(false);
    }
}

impl Drop for MemoryLedgerTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback();
        }
    }
}

impl LedgerTx for MemoryLedgerTx<'_> {
    fn transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.tables()?.transactions.get(&id).cloned())
    }

    fn lock_user_status(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<UserStatus>, StoreError> {
        if self.tables()?.users.get(&user_id).is_none() {
            return Ok(None);
        }
        self.lock_row(RowKey::User(user_id))?;
        Ok(self.tables()?.users.get(&user_id).copied())
    }

    fn set_user_status(
        &mut self,
        user_id: UserId,
        status: UserStatus,
    ) -> Result<(), StoreError> {
        self.lock_row(RowKey::User(user_id))?;
        let mut tables = self.tables()?;
        let prev = tables.users.insert(user_id, status);
        drop(tables);
        self.undo.push(Undo::UserStatus(user_id, prev));
        Ok(())
    }

    fn user_transactions(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .tables()?
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    fn lock_balance(&mut self, user_id: UserId) -> Result<Option<BalanceRecord>, StoreError> {
        if self.tables()?.balances.get(&user_id).is_none() {
            return Ok(None);
        }
        self.lock_row(RowKey::Balance(user_id))?;
        Ok(self.tables()?.balances.get(&user_id).cloned())
    }

    fn update_balance(&mut self, record: &BalanceRecord) -> Result<(), StoreError> {
        self.lock_row(RowKey::Balance(record.user_id))?;
        let mut tables = self.tables()?;
        let prev = tables.balances.insert(record.user_id, record.clone());
        drop(tables);
        self.undo.push(Undo::Balance(record.user_id, prev));
        Ok(())
    }

    fn latest_completed_tax_payment(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self
            .tables()?
            .transactions
            .values()
            .filter(|t| t.user_id == user_id && t.is_completed_tax_payment())
            .max_by_key(|t| (t.processed_at, t.id))
            .cloned())
    }

    fn user_ids(&mut self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.tables()?.users.keys().copied().collect())
    }
}
