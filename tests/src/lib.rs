//! # Chainpay Test Suite
//!
//! Unified test crate for scenarios that cross crate boundaries or need
//! real threads; single-crate behavior is tested in each crate's
//! colocated `#[cfg(test)]` modules.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── pool_flows.rs   # Address lease lifecycle end-to-end
//!     ├── sync_flows.rs   # Withdrawal status + tax deduction end-to-end
//!     └── concurrency.rs  # Threaded stress over the row-locked stores
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p cp-tests
//!
//! # By category
//! cargo test -p cp-tests integration::pool_flows
//! cargo test -p cp-tests integration::concurrency
//!
//! # With logs
//! RUST_LOG=debug cargo test -p cp-tests -- --nocapture
//! ```

#![allow(dead_code)]

pub mod integration;

/// Opt-in log capture for a test run; honors `RUST_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
