use std::collections::HashMap;

use cucumber::World;
use log::*;
use payment_engine::{
    db_types::{AccountId, CardDetails},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_stores, TestFlowApi},
    AccountLedgerApi,
    LocalLedgerClient,
    PaymentFlowApi,
    PaymentOutcome,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct PaymentWorld {
    pub system: Option<PaymentSystem>,
}

/// A ledger and a payment flow on fresh stores, plus the names the scenario gave to accounts and payments.
#[derive(Debug)]
pub struct PaymentSystem {
    pub ledger: AccountLedgerApi<SqliteDatabase>,
    pub flow: TestFlowApi,
    pub accounts: HashMap<String, (AccountId, CardDetails)>,
    pub outcomes: HashMap<String, PaymentOutcome>,
}

impl PaymentWorld {
    pub fn system(&mut self) -> &mut PaymentSystem {
        self.system.as_mut().expect("Payment engine not initialised")
    }
}

impl PaymentSystem {
    pub async fn new() -> Self {
        let (ledger_db, payment_db) = prepare_test_stores().await;
        debug!("Created databases: {} and {}", ledger_db.url(), payment_db.url());
        let ledger = AccountLedgerApi::new(ledger_db);
        let client = LocalLedgerClient::new(ledger.clone(), 1);
        let flow = PaymentFlowApi::new(payment_db, client, EventProducers::default());
        Self { ledger, flow, accounts: HashMap::new(), outcomes: HashMap::new() }
    }

    pub fn account(&self, name: &str) -> &(AccountId, CardDetails) {
        self.accounts.get(name).unwrap_or_else(|| panic!("No account called '{name}'"))
    }

    pub fn outcome(&self, name: &str) -> &PaymentOutcome {
        self.outcomes.get(name).unwrap_or_else(|| panic!("No payment called [{name}]"))
    }
}
