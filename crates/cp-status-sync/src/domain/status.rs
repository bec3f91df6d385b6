//! Pure status derivation.
//!
//! The single source of truth for what a user's withdrawal status IS:
//! a total function from their transaction set, with no store access and
//! no clock. Everything else in this crate is plumbing around it.

use shared_types::{TransactionPurpose, TransactionRecord, UserStatus, WithdrawalStatus};

/// Derives a user's withdrawal status from their transactions.
///
/// The first withdrawal still in flight (status `Requested`, `Pending`,
/// or `Approved`) decides the outcome; callers pass transactions in a
/// stable order (the ledger returns them id-ascending) so the result is
/// deterministic. With no in-flight withdrawal the user is `Available`.
///
/// For a `Regular` withdrawal the exact in-flight status maps through:
/// `Requested` and `Approved` get their dedicated variants, while a
/// regular `Pending` and every non-regular purpose collapse to
/// `WithdrawalInProgress`.
pub fn recompute(transactions: &[TransactionRecord]) -> UserStatus {
    let Some(active) = transactions.iter().find(|t| t.is_active_withdrawal()) else {
        return UserStatus::Available;
    };

    if active.purpose == TransactionPurpose::Regular {
        match active.withdrawal_status {
            Some(WithdrawalStatus::Requested) => UserStatus::RegularWithdrawalRequested,
            Some(WithdrawalStatus::Approved) => UserStatus::RegularWithdrawalApproved,
            _ => UserStatus::WithdrawalInProgress,
        }
    } else {
        UserStatus::WithdrawalInProgress
    }
}
