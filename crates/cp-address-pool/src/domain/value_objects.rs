//! Value objects for the address pool subsystem.

use serde::{Deserialize, Serialize};
use shared_types::{AddressRecord, ReservationRecord};

/// A successfully acquired lease: the reserved address together with its
/// freshly inserted active reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeasedAddress {
    /// The address, already flipped to `Reserved`.
    pub address: AddressRecord,
    /// The matching `Active` reservation row.
    pub reservation: ReservationRecord,
}

/// Raw row counts the status snapshot is computed from.
///
/// Produced by the lease store in one consistent read; no row locks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolCounts {
    /// Managed (not soft-disabled) addresses.
    pub total: u64,
    /// Addresses allocatable right now (eligibility predicate).
    pub eligible: u64,
    /// Addresses currently held by a lease.
    pub reserved: u64,
    /// Active reservations already past their deadline.
    pub expired_reservations: u64,
}

/// Operational health classification of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolHealth {
    /// Zero allocatable addresses: deposits will be refused.
    Critical,
    /// Allocatable addresses at or below the low-water mark.
    Warning,
    /// More than 90% of the pool is reserved.
    HighUtilization,
    /// Plenty of headroom.
    Excellent,
}

/// Read-only pool status snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Managed addresses.
    pub total: u64,
    /// Allocatable right now.
    pub active: u64,
    /// Held by a lease.
    pub reserved: u64,
    /// Neither allocatable nor reserved (cooling down after release).
    pub inactive: u64,
    /// Active reservations past their deadline, awaiting the sweep.
    pub expired_reservations: u64,
    /// `reserved / total`, percent, two decimals.
    pub utilization_percent: f64,
    /// Health classification.
    pub health: PoolHealth,
    /// Grace period currently configured, for operator context.
    pub grace_period_ms: u64,
}

/// Outcome of a bulk provisioning pass.
///
/// The batch is best-effort: per-item failures land in `errors` while
/// validated insertions stick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionReport {
    /// Addresses inserted as `Active`.
    pub added: u64,
    /// Candidates already present in the pool.
    pub skipped: u64,
    /// Per-item validation failures.
    pub errors: Vec<String>,
    /// Total candidates examined.
    pub total_processed: usize,
}
