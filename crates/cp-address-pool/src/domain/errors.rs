//! Address pool error types.

use shared_types::StoreError;
use thiserror::Error;

/// Address pool error type.
///
/// `PoolEmpty` and `NoAddressAvailable` are deliberately distinct:
/// an empty pool is an operational alarm (nobody provisioned addresses),
/// while an exhausted pool is expected under load and clears on its own.
/// Neither is retriable; only `Store(Contention)` is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every managed address is reserved, disabled, or cooling down.
    #[error("no eligible address available in the pool")]
    NoAddressAvailable,

    /// The pool manages zero addresses.
    #[error("the pool has no managed addresses")]
    PoolEmpty,

    /// Underlying lease store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PoolError {
    /// Returns true if a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(StoreError::Contention))
    }
}
