//! # Address Lease Pool Subsystem
//!
//! Assigns a scarce pool of blockchain receive-addresses to deposit
//! requests, guarantees each address is held by at most one in-flight
//! lease at a time, and reclaims addresses deterministically after use
//! or timeout.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | One active reservation per address | `domain/pool.rs` - `acquire()` selection under row lock |
//! | INVARIANT-2 | FIFO rotation (oldest release first) | `shared-types` `AddressRecord::rotation_key()` |
//! | INVARIANT-3 | Grace period blocks immediate re-lease | `shared-types` `AddressRecord::is_eligible()` |
//! | INVARIANT-4 | No partial reservation on any error path | `shared-types` `atomically()` rollback |
//!
//! ## Concurrency
//!
//! All exclusion is pushed down to the lease store's row locks. `acquire`
//! selects with lock-with-skip semantics: concurrent acquirers each lock a
//! different eligible row or get a clean `NoAddressAvailable`, never a
//! blocking wait. `release` and `sweep_expired` lock only the rows they
//! touch.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - In-memory lease store, TRON address format         │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - PoolApi trait                              │
//! │  ports/outbound.rs - LeaseStore, LeaseTx, AddressFormat traits  │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/pool.rs          - AddressPool allocation algorithm     │
//! │  domain/config.rs        - PoolConfig                           │
//! │  domain/value_objects.rs - LeasedAddress, PoolStatus, reports   │
//! │  domain/errors.rs        - PoolError enum                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
