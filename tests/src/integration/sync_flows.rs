//! # Withdrawal Status Reconciliation Flows
//!
//! End-to-end choreography over the real in-memory ledger: handlers
//! mutate transaction state, then the post-commit hooks drive the sync
//! engine and the persisted user status follows.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cp_status_sync::adapters::MemoryLedger;
    use cp_status_sync::domain::{
        hook_transaction_changed, hook_transaction_completed, hook_webhook_processed,
        StatusSyncEngine, SyncConfig, TaxDeduction,
    };
    use shared_types::{
        Clock, ManualClock, TransactionId, TransactionKind, TransactionPurpose,
        TransactionRecord, UserId, UserStatus, WithdrawalStatus,
    };

    fn withdrawal(
        id: u64,
        user: u64,
        amount: i64,
        purpose: TransactionPurpose,
        status: WithdrawalStatus,
    ) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId(id),
            user_id: UserId(user),
            amount,
            kind: TransactionKind::Withdrawal,
            withdrawal_status: Some(status),
            purpose,
            wallet_address: Some("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE".into()),
            external_txid: None,
            assigned_address_id: None,
            address_expires_at: None,
            comment: None,
            created_at: 1_000_000,
            processed_at: None,
        }
    }

    fn engine() -> (
        StatusSyncEngine<MemoryLedger, Arc<ManualClock>>,
        MemoryLedger,
        Arc<ManualClock>,
    ) {
        let ledger = MemoryLedger::new();
        let clock = Arc::new(ManualClock::new(1_000_000));
        (
            StatusSyncEngine::new(ledger.clone(), clock.clone(), SyncConfig::default()),
            ledger,
            clock,
        )
    }

    /// A regular withdrawal walks requested -> approved -> completed and
    /// the persisted status tracks every step through the hooks.
    #[test]
    fn test_regular_withdrawal_status_follows_lifecycle() {
        let (engine, ledger, clock) = engine();
        let user = UserId(1);
        let txid = TransactionId(10);

        ledger.seed_user(user, UserStatus::Available);
        ledger.seed_transaction(withdrawal(
            10,
            1,
            300,
            TransactionPurpose::Regular,
            WithdrawalStatus::Requested,
        ));

        // Handler created the request, hook reconciles.
        let result = hook_transaction_changed(&engine, txid, "withdrawal_request").unwrap();
        assert!(result.changed);
        assert_eq!(result.source, "withdrawal_request");
        assert_eq!(
            ledger.user_status(user),
            Some(UserStatus::RegularWithdrawalRequested)
        );

        // Operator approves.
        ledger.set_withdrawal_status(txid, WithdrawalStatus::Approved, None);
        hook_transaction_changed(&engine, txid, "admin_approval").unwrap();
        assert_eq!(
            ledger.user_status(user),
            Some(UserStatus::RegularWithdrawalApproved)
        );

        // On-chain confirmation completes it; the user frees up.
        clock.advance(60_000);
        ledger.set_withdrawal_status(txid, WithdrawalStatus::Completed, Some(clock.now()));
        let result = hook_transaction_completed(&engine, txid, "blockchain").unwrap();
        assert!(result.changed);
        assert_eq!(result.source, "completion_via_blockchain");
        assert_eq!(result.new_status, UserStatus::Available);
        assert_eq!(ledger.user_status(user), Some(UserStatus::Available));
    }

    /// A rejected withdrawal frees the user just like a completed one.
    #[test]
    fn test_rejected_withdrawal_frees_the_user() {
        let (engine, ledger, _) = engine();
        ledger.seed_user(UserId(1), UserStatus::RegularWithdrawalRequested);
        ledger.seed_transaction(withdrawal(
            10,
            1,
            300,
            TransactionPurpose::Regular,
            WithdrawalStatus::Rejected,
        ));

        hook_transaction_changed(&engine, TransactionId(10), "admin_rejection").unwrap();
        assert_eq!(ledger.user_status(UserId(1)), Some(UserStatus::Available));
    }

    /// A tax payment completing via webhook deducts the balance exactly
    /// once inside the same sync that frees the user.
    #[test]
    fn test_tax_payment_webhook_settles_balance_and_status() {
        let (engine, ledger, clock) = engine();
        let user = UserId(1);
        let txid = TransactionId(20);

        ledger.seed_user(user, UserStatus::WithdrawalInProgress);
        ledger.seed_balance(user, 1_000);
        let mut tax = withdrawal(
            20,
            1,
            250,
            TransactionPurpose::TaxPayment,
            WithdrawalStatus::Completed,
        );
        tax.processed_at = Some(clock.now());
        ledger.seed_transaction(tax);

        let result = hook_webhook_processed(&engine, txid, "tax").unwrap();
        assert_eq!(result.source, "webhook_tax");
        assert_eq!(
            result.balance_deduction,
            Some(TaxDeduction::Applied {
                deducted: 250,
                remaining: 750,
                transaction_id: txid,
            })
        );
        assert_eq!(ledger.balance(user), Some(750));
        assert_eq!(ledger.user_status(user), Some(UserStatus::Available));
    }

    /// An underfunded tax payment reports the shortfall but still
    /// reconciles the status; the balance is untouched.
    #[test]
    fn test_underfunded_tax_payment_still_syncs_status() {
        let (engine, ledger, clock) = engine();
        let user = UserId(1);

        ledger.seed_user(user, UserStatus::WithdrawalInProgress);
        ledger.seed_balance(user, 100);
        let mut tax = withdrawal(
            20,
            1,
            250,
            TransactionPurpose::TaxPayment,
            WithdrawalStatus::Completed,
        );
        tax.processed_at = Some(clock.now());
        ledger.seed_transaction(tax);

        let result = hook_webhook_processed(&engine, TransactionId(20), "tax").unwrap();
        assert_eq!(
            result.balance_deduction,
            Some(TaxDeduction::InsufficientBalance {
                required: 250,
                available: 100,
            })
        );
        assert_eq!(ledger.balance(user), Some(100));
        // The status sync was not blocked by the failed deduction.
        assert_eq!(ledger.user_status(user), Some(UserStatus::Available));
    }

    /// A mixed population: sync_all repairs every stale status in one
    /// pass and reports the damage.
    #[test]
    fn test_sync_all_repairs_a_mixed_population() {
        let (engine, ledger, _) = engine();

        // User 1: stale Available, actually has an in-flight withdrawal.
        ledger.seed_user(UserId(1), UserStatus::Available);
        ledger.seed_transaction(withdrawal(
            1,
            1,
            100,
            TransactionPurpose::Regular,
            WithdrawalStatus::Approved,
        ));
        // User 2: stale in-progress, all settled.
        ledger.seed_user(UserId(2), UserStatus::WithdrawalInProgress);
        // User 3: already correct.
        ledger.seed_user(UserId(3), UserStatus::Available);

        let report = engine.sync_all().unwrap();
        assert_eq!(report.total_users, 3);
        assert_eq!(report.changed_users, 2);
        assert_eq!(report.failed_users, 0);

        assert_eq!(
            ledger.user_status(UserId(1)),
            Some(UserStatus::RegularWithdrawalApproved)
        );
        assert_eq!(ledger.user_status(UserId(2)), Some(UserStatus::Available));
        assert_eq!(ledger.user_status(UserId(3)), Some(UserStatus::Available));
    }
}
