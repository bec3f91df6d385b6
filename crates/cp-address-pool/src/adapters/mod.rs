//! Adapter implementations of the pool's outbound ports.

pub mod memory;
pub mod tron;

pub use memory::{MemoryLeaseStore, MemoryLeaseTx};
pub use tron::TronAddressFormat;
