//! Adapter implementations of the sync engine's outbound ports.

pub mod memory;

pub use memory::{MemoryLedger, MemoryLedgerTx};
