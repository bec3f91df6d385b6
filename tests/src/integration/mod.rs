//! Cross-subsystem integration and concurrency scenarios.

pub mod concurrency;
pub mod pool_flows;
pub mod sync_flows;
