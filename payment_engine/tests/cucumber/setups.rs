use cucumber::given;
use pay_common::MinorUnits;
use payment_engine::db_types::{CardDetails, NewAccount};

use crate::cucumber::{payment_world::PaymentSystem, PaymentWorld};

#[given("a fresh payment engine")]
async fn fresh_engine(world: &mut PaymentWorld) {
    let system = PaymentSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "an account '{word}' with card {word} cvc {word} and {int} deposited")]
async fn open_account(world: &mut PaymentWorld, name: String, card_number: String, cvc: String, funds: u64) {
    let sys = world.system();
    let card = CardDetails::new(card_number.as_str(), "12", "30", cvc.as_str());
    let account = sys
        .ledger
        .create_account(NewAccount::new(name.as_str(), "Test", card.clone()))
        .await
        .expect("Error opening account");
    if funds > 0 {
        sys.ledger.deposit(&card_number, MinorUnits::from(funds)).await.expect("Error funding account");
    }
    sys.accounts.insert(name, (account.id, card));
}
