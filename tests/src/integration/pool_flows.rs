//! # Address Lease Lifecycle Flows
//!
//! End-to-end choreography over the real in-memory lease store: the
//! deposit-address lifecycle as the transaction handlers drive it,
//! acquisition through assignment, release, cooldown, and re-lease.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cp_address_pool::adapters::{MemoryLeaseStore, TronAddressFormat};
    use cp_address_pool::domain::{AddressPool, PoolConfig, PoolError, PoolHealth};
    use shared_types::{
        AddressStatus, ManualClock, ReservationStatus, TransactionId, TransactionKind,
        TransactionPurpose, TransactionRecord, UserId,
    };

    const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    fn tron_addr(i: usize) -> String {
        let tail = BASE58.chars().nth(i % BASE58.len()).unwrap_or('1');
        format!("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLS{tail}")
    }

    fn deposit_transaction(id: u64, user: u64) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId(id),
            user_id: UserId(user),
            amount: 1_000,
            kind: TransactionKind::Deposit,
            withdrawal_status: None,
            purpose: TransactionPurpose::Regular,
            wallet_address: None,
            external_txid: None,
            assigned_address_id: None,
            address_expires_at: None,
            comment: None,
            created_at: 1_000_000,
            processed_at: None,
        }
    }

    fn pool_of(
        count: usize,
    ) -> (
        AddressPool<MemoryLeaseStore, TronAddressFormat, Arc<ManualClock>>,
        MemoryLeaseStore,
        Arc<ManualClock>,
    ) {
        let store = MemoryLeaseStore::new();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let pool = AddressPool::new(
            store.clone(),
            TronAddressFormat,
            clock.clone(),
            PoolConfig::for_testing(),
        );
        let addresses: Vec<String> = (0..count).map(tron_addr).collect();
        assert_eq!(pool.provision(&addresses).unwrap().added as usize, count);
        (pool, store, clock)
    }

    /// The single-address deposit lifecycle: acquire, assign, a second
    /// user is refused, release ties the reservation to the deposit,
    /// the grace period holds, then the next user gets the same address.
    #[test]
    fn test_single_address_deposit_lifecycle() {
        let (pool, store, clock) = pool_of(1);
        let alice = UserId(1);
        let bob = UserId(2);

        // Alice takes the only address for her deposit.
        let lease = pool.acquire(alice, Some(5_000)).unwrap();
        assert_eq!(lease.address.status, AddressStatus::Reserved);

        // Her deposit transaction gets linked to the live reservation.
        let txid = TransactionId(100);
        store.seed_transaction(deposit_transaction(100, 1));
        assert!(pool.assign_to_transaction(txid, lease.address.id).unwrap());

        let txn = store.transaction(txid).unwrap();
        assert_eq!(txn.assigned_address_id, Some(lease.address.id));
        assert_eq!(txn.address_expires_at, Some(lease.reservation.expires_at));

        // Bob is cleanly refused while the address is held.
        assert_eq!(
            pool.acquire(bob, None).unwrap_err(),
            PoolError::NoAddressAvailable
        );

        // Deposit confirmed: release against the transaction.
        assert!(pool.release(lease.address.id, Some(txid)).unwrap());
        assert_eq!(
            store.reservation(lease.reservation.id).unwrap().status,
            ReservationStatus::Used
        );

        // Cooldown still blocks Bob.
        assert_eq!(
            pool.acquire(bob, None).unwrap_err(),
            PoolError::NoAddressAvailable
        );

        // After the grace period the address rotates to Bob.
        clock.advance(pool.config().grace_period_ms);
        let next = pool.acquire(bob, None).unwrap();
        assert_eq!(next.address.id, lease.address.id);
        assert_eq!(next.reservation.user_id, bob);
        assert_eq!(next.address.usage_count, 2);
    }

    /// Rotation spreads load: with fresh addresses the pool hands out
    /// distinct rows, and after releases it returns the longest-idle one.
    #[test]
    fn test_rotation_spreads_across_the_pool() {
        let (pool, _, clock) = pool_of(3);

        let a = pool.acquire(UserId(1), None).unwrap();
        let b = pool.acquire(UserId(2), None).unwrap();
        let c = pool.acquire(UserId(3), None).unwrap();
        let mut ids = vec![a.address.id, b.address.id, c.address.id];
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        // Release in the order b, c, a; b becomes the longest idle.
        pool.release(b.address.id, None).unwrap();
        clock.advance(10);
        pool.release(c.address.id, None).unwrap();
        clock.advance(10);
        pool.release(a.address.id, None).unwrap();

        clock.advance(pool.config().grace_period_ms);
        assert_eq!(pool.acquire(UserId(4), None).unwrap().address.id, b.address.id);
        assert_eq!(pool.acquire(UserId(5), None).unwrap().address.id, c.address.id);
        assert_eq!(pool.acquire(UserId(6), None).unwrap().address.id, a.address.id);
    }

    /// An abandoned deposit: nobody releases, the reservation times out,
    /// and the sweep returns the address to rotation.
    #[test]
    fn test_abandoned_reservation_recovers_via_sweep() {
        let (pool, store, clock) = pool_of(1);

        let lease = pool.acquire(UserId(1), Some(1_000)).unwrap();
        clock.advance(1_500);

        // Still reserved until the sweep runs.
        assert_eq!(
            pool.acquire(UserId(2), None).unwrap_err(),
            PoolError::NoAddressAvailable
        );

        assert_eq!(pool.sweep_expired().unwrap(), 1);
        assert_eq!(
            store.reservation(lease.reservation.id).unwrap().status,
            ReservationStatus::Expired
        );

        clock.advance(pool.config().grace_period_ms);
        assert_eq!(
            pool.acquire(UserId(2), None).unwrap().address.id,
            lease.address.id
        );
    }

    /// Pool health follows the lifecycle: exhaustion is Critical and
    /// recovery restores it.
    #[test]
    fn test_health_tracks_exhaustion_and_recovery() {
        let (pool, _, clock) = pool_of(2);

        let a = pool.acquire(UserId(1), None).unwrap();
        let b = pool.acquire(UserId(2), None).unwrap();
        assert_eq!(pool.pool_status().unwrap().health, PoolHealth::Critical);

        pool.release(a.address.id, None).unwrap();
        pool.release(b.address.id, None).unwrap();
        // Cooling down still counts as not allocatable.
        assert_eq!(pool.pool_status().unwrap().health, PoolHealth::Critical);

        clock.advance(pool.config().grace_period_ms);
        let status = pool.pool_status().unwrap();
        assert_eq!(status.active, 2);
        assert_eq!(status.reserved, 0);
        assert_ne!(status.health, PoolHealth::Critical);
    }
}
