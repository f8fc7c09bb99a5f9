//! A mocked ledger client backed by an in-memory account table that honours version checks.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use pay_common::MinorUnits;

use crate::{
    db_types::{Account, AccountId, BalanceUpdate},
    rpc::MockLedgerClient,
    traits::LedgerError,
};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    updates: Vec<AccountId>,
}

#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<State>>,
}

impl InMemoryLedger {
    /// Serves `get_account_by_id` and `update_balance` on `mock` from the table. Expectations set on `mock` before
    /// this call take precedence, so tests can inject failures for specific calls.
    pub fn install(mock: &mut MockLedgerClient, accounts: Vec<Account>) -> Self {
        let ledger = Self::default();
        {
            let mut state = ledger.state.lock().unwrap();
            state.accounts = accounts.into_iter().map(|a| (a.id.clone(), a)).collect();
        }
        let reader = ledger.clone();
        mock.expect_get_account_by_id().returning(move |id| {
            let state = reader.state.lock().unwrap();
            state.accounts.get(id).cloned().ok_or_else(|| LedgerError::AccountNotFound(id.clone()))
        });
        let writer = ledger.clone();
        mock.expect_update_balance().returning(move |id, update| writer.apply(id, update));
        ledger
    }

    fn apply(&self, id: &AccountId, update: BalanceUpdate) -> Result<Account, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let account = state.accounts.get_mut(id).ok_or_else(|| LedgerError::AccountNotFound(id.clone()))?;
        if let Some(expected) = update.expected_version {
            if expected != account.version {
                return Err(LedgerError::VersionConflict {
                    account_id: id.clone(),
                    expected,
                    actual: account.version,
                });
            }
        }
        if let Some(balance) = update.balance {
            account.balance = balance;
        }
        if let Some(blocked) = update.blocked_money {
            account.blocked_money = blocked;
        }
        account.version += 1;
        let account = account.clone();
        state.updates.push(id.clone());
        Ok(account)
    }

    /// The accounts of every successful balance update, in the order they were applied.
    pub fn updates(&self) -> Vec<AccountId> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn account(&self, id: &str) -> Account {
        self.state.lock().unwrap().accounts.get(&AccountId::from(id)).cloned().expect("No such account")
    }

    /// Changes the balances behind the flow's back, as a concurrent writer would.
    pub fn set_balances(&self, id: &str, balance: u64, blocked: u64) {
        let mut state = self.state.lock().unwrap();
        let account = state.accounts.get_mut(&AccountId::from(id)).expect("No such account");
        account.balance = MinorUnits::from(balance);
        account.blocked_money = MinorUnits::from(blocked);
        account.version += 1;
    }

    pub fn remove(&self, id: &str) {
        self.state.lock().unwrap().accounts.remove(&AccountId::from(id));
    }
}
