use pay_common::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::db_types::{AccountId, CardDetails, Payment, PaymentId, PaymentStatus};

/// A request to authorize `amount` from `customer` to `merchant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub merchant: AccountId,
    pub customer: AccountId,
    /// The card as presented. It must match the customer's stored card exactly.
    pub card: CardDetails,
    pub currency: String,
    pub amount: MinorUnits,
}

impl CreatePaymentRequest {
    pub fn new<S: Into<String>>(
        merchant: AccountId,
        customer: AccountId,
        card: CardDetails,
        currency: S,
        amount: MinorUnits,
    ) -> Self {
        Self { merchant, customer, card, currency: currency.into(), amount }
    }
}

/// What every lifecycle call hands back: the id of the payment row that was written, and its status.
///
/// When the status is [`PaymentStatus::InvalidTransaction`] no row was written and `payment_id` is the id the caller
/// supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
}

impl PaymentOutcome {
    pub fn new(payment_id: PaymentId, status: PaymentStatus) -> Self {
        Self { payment_id, status }
    }

    pub fn invalid_transaction(payment_id: &PaymentId) -> Self {
        Self::new(payment_id.clone(), PaymentStatus::InvalidTransaction)
    }
}

impl From<&Payment> for PaymentOutcome {
    fn from(payment: &Payment) -> Self {
        Self::new(payment.payment_id.clone(), payment.status)
    }
}
