//! Ports: the sync engine's inbound API and its outbound ledger contract.

pub mod inbound;
pub mod outbound;

pub use inbound::SyncApi;
pub use outbound::{LedgerTx, TransactionLedger};
