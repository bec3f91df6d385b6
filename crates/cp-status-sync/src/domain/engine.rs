//! # Status Sync Engine - Reconciliation Operations
//!
//! Wraps the pure [`recompute`] derivation with the transactional
//! plumbing: loading the trigger, locking the user row, settling tax
//! payments against the balance, and persisting the status only when it
//! actually changed.
//!
//! ## Invariants Enforced
//!
//! - INVARIANT-2: status write and tax deduction happen inside one
//!   atomic scope; an error after the deduction rolls both back.
//! - INVARIANT-3: the deduction runs under the balance row lock, so two
//!   racing syncs cannot both deduct.
//! - INVARIANT-4: every degraded deduction outcome is a value in the
//!   result, never an error.

use crate::domain::{
    recompute, SyncAllReport, SyncConfig, SyncError, SyncResult, TaxDeduction,
};
use crate::ports::{LedgerTx, SyncApi, TransactionLedger};
use shared_types::{atomically, Clock, Timestamp, TransactionId, UserId};
use tracing::{debug, info, warn};

/// The status reconciliation engine.
///
/// Exclusively owns the user-status and tax-deduction write paths.
pub struct StatusSyncEngine<L, C> {
    ledger: L,
    clock: C,
    config: SyncConfig,
}

impl<L, C> StatusSyncEngine<L, C>
where
    L: TransactionLedger,
    C: Clock,
{
    /// Creates an engine over the given ledger, clock, and configuration.
    pub fn new(ledger: L, clock: C, config: SyncConfig) -> Self {
        Self {
            ledger,
            clock,
            config,
        }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconciles the owning user's status after a transaction changed.
    /// See [`SyncApi::sync_on_transaction_change`] for the contract.
    pub fn sync_on_transaction_change(
        &self,
        transaction_id: TransactionId,
        source: &str,
    ) -> Result<SyncResult, SyncError> {
        let now = self.clock.now();

        atomically(self.ledger.begin(), |tx| {
            let txn = tx
                .transaction(transaction_id)?
                .ok_or(SyncError::TransactionNotFound(transaction_id))?;
            let user_id = txn.user_id;

            let old_status = tx
                .lock_user_status(user_id)?
                .ok_or(SyncError::UserNotFound(user_id))?;

            let balance_deduction = if txn.is_completed_tax_payment() {
                Some(self.settle_tax(tx, user_id, now)?)
            } else {
                None
            };

            let new_status = recompute(&tx.user_transactions(user_id)?);
            let changed = new_status != old_status;
            if changed {
                tx.set_user_status(user_id, new_status)?;
                info!(
                    "[cp-sync] user {} status {:?} -> {:?} ({})",
                    user_id.0, old_status, new_status, source
                );
            } else {
                debug!(
                    "[cp-sync] user {} status unchanged at {:?} ({})",
                    user_id.0, old_status, source
                );
            }

            Ok(SyncResult {
                user_id,
                transaction_id: Some(transaction_id),
                old_status,
                new_status,
                changed,
                source: source.to_owned(),
                balance_deduction,
                synced_at: now,
            })
        })
    }

    /// Settles the user's latest completed tax payment against their
    /// balance. Every degraded outcome is soft; only store failures
    /// propagate.
    fn settle_tax<Tx: LedgerTx>(
        &self,
        tx: &mut Tx,
        user_id: UserId,
        now: Timestamp,
    ) -> Result<TaxDeduction, SyncError> {
        let Some(tax) = tx.latest_completed_tax_payment(user_id)? else {
            warn!(
                "[cp-sync] tax settle: no completed tax payment for user {}",
                user_id.0
            );
            return Ok(TaxDeduction::NoTaxTransaction);
        };

        let Some(mut balance) = tx.lock_balance(user_id)? else {
            warn!("[cp-sync] tax settle: user {} has no balance row", user_id.0);
            return Ok(TaxDeduction::NoBalanceRecord);
        };

        if balance.amount < tax.amount {
            warn!(
                "[cp-sync] tax settle: user {} balance {} below tax {}",
                user_id.0, balance.amount, tax.amount
            );
            return Ok(TaxDeduction::InsufficientBalance {
                required: tax.amount,
                available: balance.amount,
            });
        }

        balance.amount -= tax.amount;
        balance.updated_at = now;
        tx.update_balance(&balance)?;

        info!(
            "[cp-sync] tax settle: deducted {} from user {}, {} remaining",
            tax.amount, user_id.0, balance.amount
        );
        Ok(TaxDeduction::Applied {
            deducted: tax.amount,
            remaining: balance.amount,
            transaction_id: tax.id,
        })
    }

    /// Recomputes and persists one user's status with no transaction
    /// context. Hard [`SyncError::UserNotFound`] for an unknown user.
    pub fn force_sync(&self, user_id: UserId) -> Result<SyncResult, SyncError> {
        self.sync_user(user_id, "force_sync")
    }

    fn sync_user(&self, user_id: UserId, source: &str) -> Result<SyncResult, SyncError> {
        let now = self.clock.now();

        atomically(self.ledger.begin(), |tx| {
            let old_status = tx
                .lock_user_status(user_id)?
                .ok_or(SyncError::UserNotFound(user_id))?;

            let new_status = recompute(&tx.user_transactions(user_id)?);
            let changed = new_status != old_status;
            if changed {
                tx.set_user_status(user_id, new_status)?;
                info!(
                    "[cp-sync] user {} status {:?} -> {:?} ({})",
                    user_id.0, old_status, new_status, source
                );
            }

            Ok(SyncResult {
                user_id,
                transaction_id: None,
                old_status,
                new_status,
                changed,
                source: source.to_owned(),
                balance_deduction: None,
                synced_at: now,
            })
        })
    }

    /// Recomputes every user, each under its own atomic scope, so one
    /// contended or broken user never poisons the batch.
    pub fn sync_all(&self) -> Result<SyncAllReport, SyncError> {
        let user_ids = atomically(self.ledger.begin(), |tx| {
            tx.user_ids().map_err(SyncError::from)
        })?;

        let mut report = SyncAllReport {
            total_users: user_ids.len() as u64,
            ..Default::default()
        };

        for user_id in user_ids {
            match self.sync_user(user_id, "sync_all") {
                Ok(result) if result.changed => {
                    report.changed_users += 1;
                    if report.sample.len() < self.config.sync_all_sample_limit {
                        report.sample.push(result);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("[cp-sync] sync_all: user {} failed: {}", user_id.0, err);
                    report.failed_users += 1;
                }
            }
        }

        info!(
            "[cp-sync] sync_all: {} users, {} changed, {} failed",
            report.total_users, report.changed_users, report.failed_users
        );
        Ok(report)
    }
}

impl<L, C> SyncApi for StatusSyncEngine<L, C>
where
    L: TransactionLedger,
    C: Clock,
{
    fn sync_on_transaction_change(
        &self,
        transaction_id: TransactionId,
        source: &str,
    ) -> Result<SyncResult, SyncError> {
        StatusSyncEngine::sync_on_transaction_change(self, transaction_id, source)
    }

    fn force_sync(&self, user_id: UserId) -> Result<SyncResult, SyncError> {
        StatusSyncEngine::force_sync(self, user_id)
    }

    fn sync_all(&self) -> Result<SyncAllReport, SyncError> {
        StatusSyncEngine::sync_all(self)
    }
}
