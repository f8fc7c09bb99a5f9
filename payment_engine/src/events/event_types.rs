use serde::{Deserialize, Serialize};

use crate::db_types::{AccountId, Payment};

/// Published after a payment row has been committed to the log and every statement it produced has been
/// acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecordedEvent {
    pub payment: Payment,
}

impl PaymentRecordedEvent {
    pub fn new(payment: Payment) -> Self {
        Self { payment }
    }
}

/// Published when a compensating balance restore could not be applied. The account is left as it was after the
/// failed step and needs manual attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationFailedEvent {
    pub account_id: AccountId,
    /// What the saga step that was being undone did.
    pub step: String,
    pub reason: String,
}

impl CompensationFailedEvent {
    pub fn new<S: Into<String>>(account_id: AccountId, step: S, reason: S) -> Self {
        Self { account_id, step: step.into(), reason: reason.into() }
    }
}
