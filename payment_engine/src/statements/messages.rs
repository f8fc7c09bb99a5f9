use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{AccountId, PaymentId};

/// Asks the ledger to append `payment_id` to the statement of `account_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRequest {
    pub account_id: AccountId,
    pub payment_id: PaymentId,
}

impl StatementRequest {
    pub fn new(account_id: AccountId, payment_id: PaymentId) -> Self {
        Self { account_id, payment_id }
    }

    pub fn is_acknowledged_by(&self, ack: &StatementAck) -> bool {
        self.account_id == ack.account_id && self.payment_id == ack.payment_id
    }
}

/// The ledger's reply to a single [`StatementRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementAck {
    pub account_id: AccountId,
    pub payment_id: PaymentId,
    /// Length of the account's statement once the entry was appended.
    pub statement_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementStreamError {
    #[error("Could not send the statement request: {0}")]
    Send(String),
    #[error("The stream ended before the outstanding request was acknowledged")]
    MissingAck,
    #[error("Expected an acknowledgement for {expected}, but received one for {received}")]
    AckMismatch { expected: String, received: String },
    #[error("The ledger rejected the statement request: {0}")]
    Rejected(String),
    #[error("The send side of the stream is closed")]
    Closed,
    #[error("Invalid stream operation: {0}")]
    InvalidState(&'static str),
}
