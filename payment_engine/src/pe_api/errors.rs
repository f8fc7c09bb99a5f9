use pay_common::MinorUnits;
use thiserror::Error;

use crate::{
    db_types::{AccountId, PaymentId},
    statements::StatementStreamError,
    traits::{LedgerError, PaymentDbError},
};

/// Errors returned by the payment lifecycle calls.
///
/// Soft outcomes such as "Insufficient funds" or "Invalid transaction" are not errors. They come back as the status of
/// a successful [`PaymentOutcome`](crate::pe_api::payment_objects::PaymentOutcome).
#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Account {0} does not exist")]
    AccountNotFound(AccountId),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(PaymentId),
    #[error("Account {0} cannot pay itself")]
    MerchantIsCustomer(AccountId),
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
    #[error("Payment database error: {0}")]
    Database(String),
    #[error("Statement propagation failed: {0}")]
    StatementPropagation(#[from] StatementStreamError),
    #[error("Moving {amount} would take the {field} of account {account_id} below zero")]
    BalanceUnderflow { account_id: AccountId, field: &'static str, amount: MinorUnits },
    #[error("Moving {amount} would overflow the {field} of account {account_id}")]
    BalanceOverflow { account_id: AccountId, field: &'static str, amount: MinorUnits },
    /// The call failed and at least one of its balance moves could not be undone. Never retried.
    #[error("{cause}. The balance moves on {accounts:?} could not be undone and need manual attention")]
    CompensationFailed { cause: String, accounts: Vec<AccountId> },
    #[error("The balances kept changing underneath the payment. Gave up after {0} attempts")]
    ConcurrencyRetriesExhausted(u32),
}

impl PaymentFlowError {
    /// True when a balance compare-and-set lost against a concurrent writer. These attempts can be retried.
    pub fn is_balance_conflict(&self) -> bool {
        matches!(self, PaymentFlowError::Ledger(LedgerError::VersionConflict { .. }))
    }
}

impl From<LedgerError> for PaymentFlowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AccountNotFound(id) => PaymentFlowError::AccountNotFound(id),
            e => PaymentFlowError::Ledger(e),
        }
    }
}

impl From<PaymentDbError> for PaymentFlowError {
    fn from(e: PaymentDbError) -> Self {
        match e {
            PaymentDbError::PaymentNotFound(id) => PaymentFlowError::PaymentNotFound(id),
            PaymentDbError::DatabaseError(s) | PaymentDbError::ConversionError(s) => PaymentFlowError::Database(s),
        }
    }
}
