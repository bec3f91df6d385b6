//! # Threaded Stress Over the Row-Locked Stores
//!
//! Real threads against the real in-memory adapters. These tests pin the
//! concurrency claims: concurrent acquirers never share an address, the
//! sweep is safe alongside live traffic, and racing syncs always leave a
//! valid persisted status.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use cp_address_pool::adapters::{MemoryLeaseStore, TronAddressFormat};
    use cp_address_pool::domain::{AddressPool, PoolConfig, PoolError};
    use cp_status_sync::adapters::MemoryLedger;
    use cp_status_sync::domain::{StatusSyncEngine, SyncConfig, SyncError};
    use parking_lot::Mutex;
    use rand::Rng;
    use shared_types::{
        AddressId, ManualClock, StoreError, TransactionId, TransactionKind, TransactionPurpose,
        TransactionRecord, UserId, UserStatus, WithdrawalStatus,
    };

    const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    fn tron_addr(i: usize) -> String {
        let tail = BASE58.chars().nth(i % BASE58.len()).unwrap_or('1');
        format!("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLS{tail}")
    }

    type SharedPool = Arc<AddressPool<MemoryLeaseStore, TronAddressFormat, Arc<ManualClock>>>;

    fn shared_pool(count: usize, config: PoolConfig) -> (SharedPool, Arc<ManualClock>) {
        let store = MemoryLeaseStore::new();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let pool = AddressPool::new(store, TronAddressFormat, clock.clone(), config);
        let addresses: Vec<String> = (0..count).map(tron_addr).collect();
        assert_eq!(pool.provision(&addresses).unwrap().added as usize, count);
        (Arc::new(pool), clock)
    }

    fn jitter() {
        let us = rand::thread_rng().gen_range(0..200);
        thread::sleep(Duration::from_micros(us));
    }

    /// Sixteen simultaneous acquirers over eight addresses: exactly eight
    /// win distinct addresses, the rest are cleanly refused.
    #[test]
    fn test_concurrent_acquires_are_mutually_exclusive() {
        const ADDRESSES: usize = 8;
        const THREADS: usize = 16;

        crate::init_test_logging();
        let (pool, _) = shared_pool(ADDRESSES, PoolConfig::for_testing());
        let barrier = Arc::new(Barrier::new(THREADS));
        let outcomes: Arc<Mutex<Vec<Result<AddressId, PoolError>>>> =
            Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..THREADS)
            .map(|n| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                let outcomes = outcomes.clone();
                thread::spawn(move || {
                    barrier.wait();
                    jitter();
                    let outcome = pool
                        .acquire_with_retry(UserId(n as u64 + 1), None)
                        .map(|lease| lease.address.id);
                    outcomes.lock().push(outcome);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let outcomes = outcomes.lock();
        let won: Vec<AddressId> = outcomes.iter().filter_map(|o| o.clone().ok()).collect();
        let distinct: HashSet<AddressId> = won.iter().copied().collect();

        assert_eq!(won.len(), ADDRESSES);
        assert_eq!(distinct.len(), ADDRESSES, "an address was double-leased");
        for outcome in outcomes.iter() {
            if let Err(err) = outcome {
                assert_eq!(*err, PoolError::NoAddressAvailable);
            }
        }
    }

    /// Sustained churn with a concurrent sweeper: threads acquire, hold
    /// briefly, and release, while a tracked held-set proves no address is
    /// ever held twice at once. Afterwards the pool converges back to
    /// fully allocatable.
    #[test]
    fn test_acquire_release_churn_never_double_leases() {
        const ADDRESSES: usize = 3;
        const THREADS: usize = 4;
        const ITERATIONS: usize = 50;

        // Zero grace so released addresses return to rotation immediately.
        let config = PoolConfig {
            grace_period_ms: 0,
            retry_backoff_ms: 1,
            ..PoolConfig::for_testing()
        };
        let (pool, clock) = shared_pool(ADDRESSES, config);
        let held: Arc<Mutex<HashSet<AddressId>>> = Arc::new(Mutex::new(HashSet::new()));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let sweeper = {
            let pool = pool.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                    pool.sweep_expired().unwrap();
                    thread::sleep(Duration::from_micros(100));
                }
            })
        };

        let workers: Vec<_> = (0..THREADS)
            .map(|n| {
                let pool = pool.clone();
                let held = held.clone();
                thread::spawn(move || {
                    for _ in 0..ITERATIONS {
                        match pool.acquire_with_retry(UserId(n as u64 + 1), None) {
                            Ok(lease) => {
                                assert!(
                                    held.lock().insert(lease.address.id),
                                    "address {} leased twice concurrently",
                                    lease.address.id.0
                                );
                                jitter();
                                held.lock().remove(&lease.address.id);
                                // A scanning acquirer may briefly hold this
                                // row's lock while re-checking it.
                                loop {
                                    match pool.release(lease.address.id, None) {
                                        Ok(_) => break,
                                        Err(PoolError::Store(StoreError::Contention)) => jitter(),
                                        Err(err) => panic!("unexpected release error: {err}"),
                                    }
                                }
                            }
                            Err(PoolError::NoAddressAvailable) => jitter(),
                            Err(PoolError::Store(StoreError::Contention)) => jitter(),
                            Err(err) => panic!("unexpected pool error: {err}"),
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        sweeper.join().unwrap();

        // Convergence: expire any leftovers, sweep, and the whole pool is
        // allocatable again.
        clock.advance(60_000);
        pool.sweep_expired().unwrap();
        let status = pool.pool_status().unwrap();
        assert_eq!(status.reserved, 0);
        assert_eq!(status.active, ADDRESSES as u64);

        let mut ids = HashSet::new();
        for n in 0..ADDRESSES {
            ids.insert(pool.acquire(UserId(n as u64 + 100), None).unwrap().address.id);
        }
        assert_eq!(ids.len(), ADDRESSES);
    }

    /// One address hammered by many acquirers: a scan candidate that was
    /// reserved and committed by a rival between the scan and winning the
    /// row lock must not be handed out from its stale snapshot. The
    /// held-set panics the moment two leases overlap.
    #[test]
    fn test_preempted_scan_never_leases_an_address_twice() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 10_000;

        let config = PoolConfig {
            grace_period_ms: 0,
            ..PoolConfig::for_testing()
        };
        let (pool, _) = shared_pool(1, config);
        let held: Arc<Mutex<HashSet<AddressId>>> = Arc::new(Mutex::new(HashSet::new()));
        let barrier = Arc::new(Barrier::new(THREADS));

        let workers: Vec<_> = (0..THREADS)
            .map(|n| {
                let pool = pool.clone();
                let held = held.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..ITERATIONS {
                        match pool.acquire(UserId(n as u64 + 1), None) {
                            Ok(lease) => {
                                assert!(
                                    held.lock().insert(lease.address.id),
                                    "address {} leased twice concurrently",
                                    lease.address.id.0
                                );
                                held.lock().remove(&lease.address.id);
                                loop {
                                    match pool.release(lease.address.id, None) {
                                        Ok(_) => break,
                                        Err(PoolError::Store(StoreError::Contention)) => {}
                                        Err(err) => panic!("unexpected release error: {err}"),
                                    }
                                }
                            }
                            Err(PoolError::NoAddressAvailable) => {}
                            Err(PoolError::Store(StoreError::Contention)) => {}
                            Err(err) => panic!("unexpected pool error: {err}"),
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // The lone address ends the run allocatable.
        let lease = pool.acquire_with_retry(UserId(99), None).unwrap();
        assert_eq!(lease.address.id, AddressId(1));
    }

    /// Racing force-syncs on one user: some may lose the row lock, but
    /// the persisted status is always the correct recomputation and the
    /// only surfaced error is contention.
    #[test]
    fn test_racing_syncs_leave_a_valid_status() {
        const THREADS: usize = 8;

        let ledger = MemoryLedger::new();
        ledger.seed_user(UserId(1), UserStatus::Available);
        ledger.seed_transaction(TransactionRecord {
            id: TransactionId(1),
            user_id: UserId(1),
            amount: 100,
            kind: TransactionKind::Withdrawal,
            withdrawal_status: Some(WithdrawalStatus::Approved),
            purpose: TransactionPurpose::Regular,
            wallet_address: None,
            external_txid: None,
            assigned_address_id: None,
            address_expires_at: None,
            comment: None,
            created_at: 1_000_000,
            processed_at: None,
        });

        let engine = Arc::new(StatusSyncEngine::new(
            ledger.clone(),
            Arc::new(ManualClock::new(1_000_000)),
            SyncConfig::default(),
        ));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = engine.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    engine.force_sync(UserId(1))
                })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => wins += 1,
                Err(SyncError::Store(StoreError::Contention)) => {}
                Err(err) => panic!("unexpected sync error: {err}"),
            }
        }

        assert!(wins >= 1, "at least one sync must win the user row");
        assert_eq!(
            ledger.user_status(UserId(1)),
            Some(UserStatus::RegularWithdrawalApproved)
        );
    }
}
