//! # Status Reconciliation Engine Subsystem
//!
//! Derives each user's externally-visible withdrawal status purely from
//! the current set of their transactions, persists it on the user row,
//! and applies the balance side-effect of completed tax payments.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Status is a pure function of the transaction set | `domain/status.rs` - `recompute()` |
//! | INVARIANT-2 | Status write + tax deduction are one atomic unit | `domain/engine.rs` - `sync_on_transaction_change()` |
//! | INVARIANT-3 | A tax payment is deducted at most once per sync | `domain/engine.rs` - deduction under balance row lock |
//! | INVARIANT-4 | Soft outcomes never abort a sync | `TaxDeduction` rides in `SyncResult`, never in `SyncError` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - In-memory transaction ledger                       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - SyncApi trait                              │
//! │  ports/outbound.rs - TransactionLedger, LedgerTx traits         │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/status.rs        - pure status derivation               │
//! │  domain/engine.rs        - StatusSyncEngine sync operations     │
//! │  domain/hooks.rs         - post-commit hook wrappers            │
//! │  domain/config.rs        - SyncConfig                           │
//! │  domain/value_objects.rs - SyncResult, TaxDeduction, reports    │
//! │  domain/errors.rs        - SyncError enum                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
