//! # Shared Types Crate
//!
//! This crate contains the domain records, identifier newtypes, and the
//! scoped atomic-operation abstraction shared by the Chainpay core
//! subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem record types are
//!   defined here. The address pool and the status sync engine depend on
//!   these definitions, never on each other.
//! - **Explicit Atomicity**: Stores expose transactions implementing
//!   [`StoreTx`]; multi-row mutations run under [`atomically`], which
//!   commits on success and rolls back on every error path.
//! - **Injected Time**: Wall-clock access goes through the [`Clock`] port
//!   so every time-dependent rule is testable with a [`ManualClock`].

pub mod records;
pub mod store;
pub mod time;

pub use records::*;
pub use store::{atomically, StoreError, StoreTx};
pub use time::{Clock, ManualClock, SystemClock};
