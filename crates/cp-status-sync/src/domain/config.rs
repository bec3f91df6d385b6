//! Sync engine configuration.

/// Status sync configuration.
///
/// Passed into [`crate::domain::StatusSyncEngine::new`]; nothing here is
/// read from global state.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Maximum changed-user results carried back by `sync_all`.
    pub sync_all_sample_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_all_sample_limit: 10,
        }
    }
}

impl SyncConfig {
    /// Creates a config sized for testing.
    pub fn for_testing() -> Self {
        Self {
            sync_all_sample_limit: 3,
        }
    }
}
