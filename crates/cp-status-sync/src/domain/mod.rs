//! Domain layer: status derivation, the sync engine, and its value objects.

pub mod config;
pub mod engine;
pub mod errors;
pub mod hooks;
pub mod status;
pub mod value_objects;

pub use config::SyncConfig;
pub use engine::StatusSyncEngine;
pub use errors::SyncError;
pub use hooks::{hook_transaction_changed, hook_transaction_completed, hook_webhook_processed};
pub use status::recompute;
pub use value_objects::{SyncAllReport, SyncResult, TaxDeduction};
