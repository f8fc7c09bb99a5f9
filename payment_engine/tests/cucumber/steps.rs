use std::str::FromStr;

use cucumber::{then, when};
use pay_common::MinorUnits;
use payment_engine::{
    db_types::{CardDetails, PaymentStatus},
    CreatePaymentRequest,
    PaymentOutcome,
};

use crate::cucumber::PaymentWorld;

async fn authorize(
    world: &mut PaymentWorld,
    customer: &str,
    merchant: &str,
    card: CardDetails,
    amount: u64,
) -> PaymentOutcome {
    let sys = world.system();
    let customer_id = sys.account(customer).0.clone();
    let merchant_id = sys.account(merchant).0.clone();
    let request = CreatePaymentRequest::new(merchant_id, customer_id, card, "RUB", MinorUnits::from(amount));
    sys.flow.create_payment(request).await.expect("Error creating payment")
}

#[when(expr = "'{word}' pays '{word}' {int} as [{word}]")]
async fn create_payment(world: &mut PaymentWorld, customer: String, merchant: String, amount: u64, name: String) {
    let card = world.system().account(&customer).1.clone();
    let outcome = authorize(world, &customer, &merchant, card, amount).await;
    world.system().outcomes.insert(name, outcome);
}

#[when(expr = "'{word}' pays '{word}' {int} with cvc {word} as [{word}]")]
async fn create_payment_with_cvc(
    world: &mut PaymentWorld,
    customer: String,
    merchant: String,
    amount: u64,
    cvc: String,
    name: String,
) {
    let stored = world.system().account(&customer).1.clone();
    let card = CardDetails::new(stored.card_number, stored.card_expiry_month, stored.card_expiry_year, cvc);
    let outcome = authorize(world, &customer, &merchant, card, amount).await;
    world.system().outcomes.insert(name, outcome);
}

#[when(expr = "[{word}] is {word} for {int} as [{word}]")]
async fn react(world: &mut PaymentWorld, referenced: String, action: String, amount: u64, name: String) {
    let sys = world.system();
    let payment_id = sys.outcome(&referenced).payment_id.clone();
    let amount = MinorUnits::from(amount);
    let outcome = match action.as_str() {
        "captured" => sys.flow.capture_payment(&payment_id, amount).await,
        "cancelled" => sys.flow.cancel_payment(&payment_id, amount).await,
        "refunded" => sys.flow.refund_payment(&payment_id, amount).await,
        _ => panic!("Unknown action {action}"),
    }
    .expect("Error processing payment");
    sys.outcomes.insert(name, outcome);
}

#[then(expr = "[{word}] has status {string}")]
async fn check_status(world: &mut PaymentWorld, name: String, status: String) {
    let expected = PaymentStatus::from_str(&status).expect("Unknown payment status");
    assert_eq!(world.system().outcome(&name).status, expected, "Status of [{name}] is incorrect");
}

#[then(expr = "[{word}] refers to [{word}]")]
async fn check_same_payment(world: &mut PaymentWorld, name: String, referenced: String) {
    let sys = world.system();
    assert_eq!(sys.outcome(&name).payment_id, sys.outcome(&referenced).payment_id);
}

#[then(expr = "'{word}' has a balance of {int} with {int} blocked")]
async fn check_balances(world: &mut PaymentWorld, name: String, balance: u64, blocked: u64) {
    let sys = world.system();
    let id = sys.account(&name).0.clone();
    let account = sys.ledger.account_by_id(&id).await.expect("Error fetching account");
    assert_eq!(account.balance, MinorUnits::from(balance), "Balance of '{name}' is incorrect");
    assert_eq!(account.blocked_money, MinorUnits::from(blocked), "Blocked money of '{name}' is incorrect");
}

#[then(expr = "the statement of '{word}' is {string}")]
async fn check_statement(world: &mut PaymentWorld, name: String, payments: String) {
    let sys = world.system();
    let id = sys.account(&name).0.clone();
    let statement = sys.ledger.statement_for_account(&id).await.expect("Error fetching statement");
    let expected = payments
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|p| sys.outcome(p).payment_id.clone())
        .collect::<Vec<_>>();
    assert_eq!(statement, expected, "Statement of '{name}' is incorrect");
}

#[then(expr = "'{word}' has {int} payments on record")]
async fn check_payment_count(world: &mut PaymentWorld, name: String, count: usize) {
    let sys = world.system();
    let id = sys.account(&name).0.clone();
    let payments = sys.flow.payments_for_account(&id).await.expect("Error fetching payments");
    assert_eq!(payments.len(), count, "Payment count for '{name}' is incorrect");
}
