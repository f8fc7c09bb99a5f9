//! The payment lifecycle rules, without any I/O.
//!
//! ```text
//! (none) --create--> Authorization{wrong payment request | Insufficient funds | Approved}
//! Authorization{Approved} --capture--> Capture{Invalid amount | Successful payment}
//! Authorization{Approved} --cancel--> Cancel{Invalid amount | Successful cancel}
//! Capture{Successful payment} --refund--> Refund{Invalid amount | Successful refund}
//! ```
//!
//! Each function looks at the account snapshots (and the referenced payment) and returns a [`Decision`]: the row to
//! write, the balance moves to apply, and the accounts whose statements must record the new payment.
use pay_common::MinorUnits;

use crate::{
    db_types::{Account, AccountId, NewPayment, Operation, Payment, PaymentStatus},
    pe_api::{errors::PaymentFlowError, payment_objects::CreatePaymentRequest, saga::BalanceMove},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub row: NewPayment,
    pub moves: Vec<BalanceMove>,
    pub statements: Vec<AccountId>,
}

impl Decision {
    /// A recorded outcome that moves no money. Only the merchant's statement records it.
    fn merchant_only(row: NewPayment) -> Self {
        let statements = vec![row.merchant.clone()];
        Self { row, moves: Vec::new(), statements }
    }

    /// Customer first, then merchant, for both the balance moves and the statements.
    fn settled(row: NewPayment, customer: BalanceMove, merchant: BalanceMove) -> Self {
        let statements = vec![row.customer.clone(), row.merchant.clone()];
        Self { row, moves: vec![customer, merchant], statements }
    }
}

/// The state a referenced payment must be in for `operation` to apply to it.
pub fn required_predecessor(operation: Operation) -> Option<(Operation, PaymentStatus)> {
    match operation {
        Operation::Authorization => None,
        Operation::Capture | Operation::Cancel => Some((Operation::Authorization, PaymentStatus::Approved)),
        Operation::Refund => Some((Operation::Capture, PaymentStatus::SuccessfulPayment)),
    }
}

pub fn accepts(referenced: &Payment, operation: Operation) -> bool {
    match required_predecessor(operation) {
        Some((op, status)) => referenced.is(op, status),
        None => false,
    }
}

pub fn decide_authorization(
    request: &CreatePaymentRequest,
    customer: &Account,
    merchant: &Account,
) -> Result<Decision, PaymentFlowError> {
    let amount = request.amount;
    let row = |status| NewPayment {
        merchant: merchant.id.clone(),
        customer: customer.id.clone(),
        card: request.card.snapshot(),
        currency: request.currency.clone(),
        operation: Operation::Authorization,
        status,
        amount,
    };
    if customer.card != request.card {
        return Ok(Decision::merchant_only(row(PaymentStatus::WrongPaymentRequest)));
    }
    if customer.balance < amount {
        return Ok(Decision::merchant_only(row(PaymentStatus::InsufficientFunds)));
    }
    let customer_move = BalanceMove::on(customer, "customer hold").debit_balance(amount)?.block(amount)?;
    let merchant_move = BalanceMove::on(merchant, "merchant hold").block(amount)?;
    Ok(Decision::settled(row(PaymentStatus::Approved), customer_move, merchant_move))
}

pub fn decide_capture(
    referenced: &Payment,
    customer: &Account,
    merchant: &Account,
    amount: MinorUnits,
) -> Result<Decision, PaymentFlowError> {
    if referenced.amount < amount {
        return Ok(invalid_amount(referenced, Operation::Capture, amount));
    }
    let customer_move = BalanceMove::on(customer, "customer capture").release(amount)?;
    let merchant_move = BalanceMove::on(merchant, "merchant capture").credit_balance(amount)?.release(amount)?;
    let row = NewPayment::reacting_to(referenced, Operation::Capture, PaymentStatus::SuccessfulPayment, amount);
    Ok(Decision::settled(row, customer_move, merchant_move))
}

pub fn decide_cancel(
    referenced: &Payment,
    customer: &Account,
    merchant: &Account,
    amount: MinorUnits,
) -> Result<Decision, PaymentFlowError> {
    if referenced.amount < amount {
        return Ok(invalid_amount(referenced, Operation::Cancel, amount));
    }
    let customer_move = BalanceMove::on(customer, "customer release").credit_balance(amount)?.release(amount)?;
    let merchant_move = BalanceMove::on(merchant, "merchant release").release(amount)?;
    let row = NewPayment::reacting_to(referenced, Operation::Cancel, PaymentStatus::SuccessfulCancel, amount);
    Ok(Decision::settled(row, customer_move, merchant_move))
}

pub fn decide_refund(
    referenced: &Payment,
    customer: &Account,
    merchant: &Account,
    amount: MinorUnits,
) -> Result<Decision, PaymentFlowError> {
    if referenced.amount < amount {
        return Ok(invalid_amount(referenced, Operation::Refund, amount));
    }
    let customer_move = BalanceMove::on(customer, "customer refund").credit_balance(amount)?;
    let merchant_move = BalanceMove::on(merchant, "merchant refund").debit_balance(amount)?;
    let row = NewPayment::reacting_to(referenced, Operation::Refund, PaymentStatus::SuccessfulRefund, amount);
    Ok(Decision::settled(row, customer_move, merchant_move))
}

fn invalid_amount(referenced: &Payment, operation: Operation, amount: MinorUnits) -> Decision {
    Decision::merchant_only(NewPayment::reacting_to(referenced, operation, PaymentStatus::InvalidAmount, amount))
}
