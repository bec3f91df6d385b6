//! Post-commit hook wrappers.
//!
//! Transaction handlers and webhook processors call these after their
//! own commit, passing a short detail naming the trigger site; it is
//! formatted into the result's provenance tag. A failed reconciliation
//! must never break the call-site that already committed, so every error
//! is swallowed into a warn log and the caller gets `None`.

use crate::domain::SyncResult;
use crate::ports::SyncApi;
use shared_types::TransactionId;
use tracing::warn;

fn run_hook<A: SyncApi + ?Sized>(
    api: &A,
    transaction_id: TransactionId,
    source: &str,
) -> Option<SyncResult> {
    match api.sync_on_transaction_change(transaction_id, source) {
        Ok(result) => Some(result),
        Err(err) => {
            warn!(
                "[cp-sync] {} hook for transaction {} failed: {}",
                source, transaction_id.0, err
            );
            None
        }
    }
}

/// Hook for any transaction state change; `source` names the call-site
/// and is carried through unchanged.
pub fn hook_transaction_changed<A: SyncApi + ?Sized>(
    api: &A,
    transaction_id: TransactionId,
    source: &str,
) -> Option<SyncResult> {
    run_hook(api, transaction_id, source)
}

/// Hook for a transaction reaching a terminal state;
/// `completion_method` names how it completed (manual, on-chain, ...).
pub fn hook_transaction_completed<A: SyncApi + ?Sized>(
    api: &A,
    transaction_id: TransactionId,
    completion_method: &str,
) -> Option<SyncResult> {
    run_hook(
        api,
        transaction_id,
        &format!("completion_via_{completion_method}"),
    )
}

/// Hook for a processed payment-provider webhook; `webhook_type` names
/// the webhook variant.
pub fn hook_webhook_processed<A: SyncApi + ?Sized>(
    api: &A,
    transaction_id: TransactionId,
    webhook_type: &str,
) -> Option<SyncResult> {
    run_hook(api, transaction_id, &format!("webhook_{webhook_type}"))
}
