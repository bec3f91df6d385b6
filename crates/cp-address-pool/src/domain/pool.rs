//! # Address Pool - FIFO Rotation with Grace Periods
//!
//! Implements the allocation algorithm over the lease store.
//!
//! ## Allocation Policy
//!
//! - Eligible = `Active`, not soft-disabled, grace period elapsed.
//! - Selection = oldest `last_released_at` first (never-used addresses
//!   before all others), ties broken by lowest id.
//! - The selection-and-lock step uses skip-locked reads so concurrent
//!   acquirers never serialize on one contended row or double-assign.
//!
//! ## Invariants Enforced
//!
//! - INVARIANT-1: one active reservation per address (`acquire` inserts
//!   the reservation in the same transaction that flips the address).
//! - INVARIANT-4: selection + mutation is one atomic unit; a failure
//!   mid-sequence leaves no address/reservation mismatch.

use crate::domain::{
    LeasedAddress, PoolConfig, PoolError, PoolHealth, PoolStatus, ProvisionReport,
};
use crate::ports::{AddressFormat, LeaseStore, LeaseTx, NewAddress, NewReservation, PoolApi};
use shared_types::{
    atomically, AddressId, AddressStatus, Clock, ReservationStatus, StoreError, TransactionId,
    UserId,
};
use tracing::{debug, info, warn};

/// The address lease pool.
///
/// Owns the Address/Reservation write paths; everything else reaches
/// these rows through this component.
pub struct AddressPool<S, V, C> {
    store: S,
    format: V,
    clock: C,
    config: PoolConfig,
}

impl<S, V, C> AddressPool<S, V, C>
where
    S: LeaseStore,
    V: AddressFormat,
    C: Clock,
{
    /// Creates a pool over the given store, address-format rule, clock,
    /// and configuration.
    pub fn new(store: S, format: V, clock: C, config: PoolConfig) -> Self {
        Self {
            store,
            format,
            clock,
            config,
        }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Acquires the longest-idle eligible address for `user_id`.
    ///
    /// One atomic unit: select-and-lock (skip-locked), flip to
    /// `Reserved`, stamp rotation fields, insert the `Active`
    /// reservation. See [`PoolApi::acquire`] for the error contract.
    pub fn acquire(
        &self,
        user_id: UserId,
        reservation_ms: Option<u64>,
    ) -> Result<LeasedAddress, PoolError> {
        let now = self.clock.now();
        let duration = reservation_ms.unwrap_or(self.config.reservation_ms);

        atomically(self.store.begin(), |tx| {
            let counts = tx.pool_counts(now)?;
            if counts.total == 0 {
                warn!("[cp-pool] acquire refused: pool manages zero addresses");
                return Err(PoolError::PoolEmpty);
            }

            let Some(mut address) = tx.lock_first_eligible(now)? else {
                warn!(
                    reserved = counts.reserved,
                    total = counts.total,
                    "[cp-pool] no eligible address for user {}",
                    user_id.0
                );
                return Err(PoolError::NoAddressAvailable);
            };

            address.status = AddressStatus::Reserved;
            address.last_reserved_at = Some(now);
            address.usage_count += 1;
            tx.update_address(&address)?;

            let reservation = tx.insert_reservation(NewReservation {
                address_id: address.id,
                user_id,
                reserved_at: now,
                expires_at: now + duration,
            })?;

            debug!(
                "[cp-pool] address {} reserved for user {} until {}",
                address.address, user_id.0, reservation.expires_at
            );
            Ok(LeasedAddress {
                address,
                reservation,
            })
        })
    }

    /// `acquire` with bounded retries separated by a fixed backoff.
    ///
    /// Retries only transient store contention; `NoAddressAvailable` and
    /// `PoolEmpty` are not transient and pass straight through.
    pub fn acquire_with_retry(
        &self,
        user_id: UserId,
        reservation_ms: Option<u64>,
    ) -> Result<LeasedAddress, PoolError> {
        let attempts = self.config.max_acquire_attempts.max(1);

        for attempt in 1..=attempts {
            match self.acquire(user_id, reservation_ms) {
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(
                        "[cp-pool] acquire attempt {}/{} hit contention, backing off",
                        attempt, attempts
                    );
                    std::thread::sleep(std::time::Duration::from_millis(
                        self.config.retry_backoff_ms,
                    ));
                }
                Ok(lease) => {
                    info!(
                        "[cp-pool] address {} assigned to user {} (attempt {})",
                        lease.address.address, user_id.0, attempt
                    );
                    return Ok(lease);
                }
                Err(err) => return Err(err),
            }
        }

        // Unreachable: the final attempt always returns above.
        Err(PoolError::Store(StoreError::Contention))
    }

    /// Releases an address back into rotation with a fresh grace period.
    ///
    /// The matching active reservation (scoped to `transaction_id` when
    /// given) is closed as `Used` or `Expired`. Missing and
    /// already-released addresses return `Ok(false)` without touching
    /// `last_released_at` again.
    pub fn release(
        &self,
        address_id: AddressId,
        transaction_id: Option<TransactionId>,
    ) -> Result<bool, PoolError> {
        let now = self.clock.now();

        atomically(self.store.begin(), |tx| {
            let Some(mut address) = tx.lock_address(address_id)? else {
                warn!("[cp-pool] release: address {} not found", address_id.0);
                return Ok(false);
            };

            if let Some(mut reservation) = tx.lock_active_reservation(address_id, transaction_id)?
            {
                reservation.status = if transaction_id.is_some() {
                    ReservationStatus::Used
                } else {
                    ReservationStatus::Expired
                };
                reservation.released_at = Some(now);
                tx.update_reservation(&reservation)?;
            }

            if address.status != AddressStatus::Reserved {
                debug!(
                    "[cp-pool] release: address {} already released",
                    address_id.0
                );
                return Ok(false);
            }

            address.status = AddressStatus::Active;
            address.last_released_at = Some(now);
            address.grace_period_until = Some(now + self.config.grace_period_ms);
            tx.update_address(&address)?;

            debug!(
                "[cp-pool] address {} released, grace period until {}",
                address_id.0,
                now + self.config.grace_period_ms
            );
            Ok(true)
        })
    }

    /// Links a transaction to the active reservation its user holds on
    /// `address_id`. A consistency check: `Ok(false)` when the
    /// transaction or a matching reservation is missing.
    pub fn assign_to_transaction(
        &self,
        transaction_id: TransactionId,
        address_id: AddressId,
    ) -> Result<bool, PoolError> {
        atomically(self.store.begin(), |tx| {
            let Some(mut txn) = tx.transaction(transaction_id)? else {
                debug!(
                    "[cp-pool] assign: transaction {} not found",
                    transaction_id.0
                );
                return Ok(false);
            };

            let Some(mut reservation) =
                tx.active_reservation_for_user(address_id, txn.user_id)?
            else {
                debug!(
                    "[cp-pool] assign: no active reservation on address {} for user {}",
                    address_id.0, txn.user_id.0
                );
                return Ok(false);
            };

            txn.assigned_address_id = Some(address_id);
            txn.address_expires_at = Some(reservation.expires_at);
            tx.update_transaction(&txn)?;

            reservation.transaction_id = Some(transaction_id);
            tx.update_reservation(&reservation)?;

            info!(
                "[cp-pool] address {} assigned to transaction {}",
                address_id.0, transaction_id.0
            );
            Ok(true)
        })
    }

    /// Expires overdue reservations and frees their addresses.
    ///
    /// Candidates come from one read-only scan; each is then re-checked
    /// and swept under its own row locks, so the sweep is idempotent and
    /// safe to run concurrently with `acquire`/`release`. Per-row
    /// failures are logged and skipped.
    pub fn sweep_expired(&self) -> Result<usize, PoolError> {
        let now = self.clock.now();

        let candidates = atomically(self.store.begin(), |tx| {
            tx.expired_active_reservations(now).map_err(PoolError::from)
        })?;

        let mut swept = 0;
        for candidate in candidates {
            let result: Result<bool, PoolError> = atomically(self.store.begin(), |tx| {
                let Some(mut reservation) = tx.lock_reservation(candidate.id)? else {
                    return Ok(false);
                };
                if !reservation.is_expired(now) {
                    // Raced with a release between scan and lock.
                    return Ok(false);
                }

                reservation.status = ReservationStatus::Expired;
                reservation.released_at = Some(now);
                tx.update_reservation(&reservation)?;

                if let Some(mut address) = tx.lock_address(reservation.address_id)? {
                    if address.status == AddressStatus::Reserved {
                        address.status = AddressStatus::Active;
                        address.last_released_at = Some(now);
                        address.grace_period_until =
                            Some(now + self.config.grace_period_ms);
                        tx.update_address(&address)?;
                    }
                }
                Ok(true)
            });

            match result {
                Ok(true) => swept += 1,
                Ok(false) => {}
                Err(err) => warn!(
                    "[cp-pool] sweep: reservation {} skipped: {}",
                    candidate.id.0, err
                ),
            }
        }

        if swept > 0 {
            info!("[cp-pool] swept {} expired reservations", swept);
        }
        Ok(swept)
    }

    /// Read-only status snapshot with health classification.
    pub fn pool_status(&self) -> Result<PoolStatus, PoolError> {
        let now = self.clock.now();
        let counts = atomically(self.store.begin(), |tx| {
            tx.pool_counts(now).map_err(PoolError::from)
        })?;

        let utilization_percent = if counts.total > 0 {
            let raw = counts.reserved as f64 / counts.total as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        } else {
            0.0
        };

        let health = if counts.eligible == 0 {
            PoolHealth::Critical
        } else if counts.eligible <= self.config.low_water_mark {
            PoolHealth::Warning
        } else if utilization_percent > 90.0 {
            PoolHealth::HighUtilization
        } else {
            PoolHealth::Excellent
        };

        Ok(PoolStatus {
            total: counts.total,
            active: counts.eligible,
            reserved: counts.reserved,
            inactive: counts
                .total
                .saturating_sub(counts.eligible)
                .saturating_sub(counts.reserved),
            expired_reservations: counts.expired_reservations,
            utilization_percent,
            health,
            grace_period_ms: self.config.grace_period_ms,
        })
    }

    /// Validates and inserts a batch of addresses as `Active`.
    ///
    /// Best-effort batch: format failures are collected per item and do
    /// not abort the pass; duplicates are skipped.
    pub fn provision(&self, addresses: &[String]) -> Result<ProvisionReport, PoolError> {
        let now = self.clock.now();

        let report = atomically(self.store.begin(), |tx| {
            let mut report = ProvisionReport {
                total_processed: addresses.len(),
                ..Default::default()
            };

            for candidate in addresses {
                if !self.format.is_valid(candidate) {
                    report
                        .errors
                        .push(format!("invalid address format: {candidate}"));
                    continue;
                }

                if tx.find_address(candidate)?.is_some() {
                    report.skipped += 1;
                    continue;
                }

                tx.insert_address(NewAddress {
                    address: candidate.clone(),
                    status: AddressStatus::Active,
                    is_active: true,
                    created_at: now,
                })?;
                report.added += 1;
            }

            Ok::<_, PoolError>(report)
        })?;

        info!(
            "[cp-pool] provisioned {} addresses ({} skipped, {} rejected)",
            report.added,
            report.skipped,
            report.errors.len()
        );
        Ok(report)
    }
}

impl<S, V, C> PoolApi for AddressPool<S, V, C>
where
    S: LeaseStore,
    V: AddressFormat,
    C: Clock,
{
    fn acquire(
        &self,
        user_id: UserId,
        reservation_ms: Option<u64>,
    ) -> Result<LeasedAddress, PoolError> {
        AddressPool::acquire(self, user_id, reservation_ms)
    }

    fn acquire_with_retry(
        &self,
        user_id: UserId,
        reservation_ms: Option<u64>,
    ) -> Result<LeasedAddress, PoolError> {
        AddressPool::acquire_with_retry(self, user_id, reservation_ms)
    }

    fn release(
        &self,
        address_id: AddressId,
        transaction_id: Option<TransactionId>,
    ) -> Result<bool, PoolError> {
        AddressPool::release(self, address_id, transaction_id)
    }

    fn assign_to_transaction(
        &self,
        transaction_id: TransactionId,
        address_id: AddressId,
    ) -> Result<bool, PoolError> {
        AddressPool::assign_to_transaction(self, transaction_id, address_id)
    }

    fn sweep_expired(&self) -> Result<usize, PoolError> {
        AddressPool::sweep_expired(self)
    }

    fn pool_status(&self) -> Result<PoolStatus, PoolError> {
        AddressPool::pool_status(self)
    }

    fn provision(&self, addresses: &[String]) -> Result<ProvisionReport, PoolError> {
        AddressPool::provision(self, addresses)
    }
}
