//! Pool configuration.

/// Address pool configuration.
///
/// Passed into [`crate::domain::AddressPool::new`]; nothing here is read
/// from global state.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Default reservation duration when the caller does not supply one.
    pub reservation_ms: u64,
    /// Cooldown applied to an address after every release.
    pub grace_period_ms: u64,
    /// Eligible-address count at or below which pool health is `Warning`.
    pub low_water_mark: u64,
    /// Suggested cadence for the external sweep timer.
    pub sweep_interval_ms: u64,
    /// Attempts for `acquire_with_retry` before surfacing the last error.
    pub max_acquire_attempts: u32,
    /// Fixed backoff between retry attempts.
    pub retry_backoff_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reservation_ms: 30 * 60 * 1000, // 30 minutes
            grace_period_ms: 10 * 60 * 1000, // 10 minutes
            low_water_mark: 10,
            sweep_interval_ms: 60_000, // 1 minute
            max_acquire_attempts: 3,
            retry_backoff_ms: 100,
        }
    }
}

impl PoolConfig {
    /// Creates a config with short durations for testing.
    pub fn for_testing() -> Self {
        Self {
            reservation_ms: 1_000,
            grace_period_ms: 500,
            low_water_mark: 1,
            sweep_interval_ms: 100,
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }
}
