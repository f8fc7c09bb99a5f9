//! Balance mutations with compensation.
//!
//! A lifecycle call plans its balance changes as [`BalanceMove`]s up front, using checked arithmetic on the account
//! snapshots it read. A [`Saga`] then applies the moves one by one through the ledger client. If a later step fails,
//! [`Saga::compensate`] undoes the applied moves in reverse order.
//!
//! Undoing a move does not write the old snapshot back. Another payment may have touched the account since, so the
//! saga re-reads the account and takes back exactly the amounts the move added or removed, as a version-checked
//! update. A lost race means another read and another try. An account that cannot be restored (it has gone, or the
//! money has already been spent elsewhere) is reported as a [`CompensationFailure`].
//!
//! Nothing about a saga is persisted. A crash between a move and its compensation leaves the move in place.
use log::*;
use pay_common::MinorUnits;

use crate::{
    db_types::{Account, AccountId, BalanceUpdate},
    pe_api::errors::PaymentFlowError,
    rpc::LedgerClient,
    traits::LedgerError,
};

/// How many times a single compensation re-reads the account after losing a race before giving up.
pub const COMPENSATION_ATTEMPTS: u32 = 5;

/// A planned change to one account's balances, relative to the snapshot it was planned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMove {
    pub account_id: AccountId,
    pub label: &'static str,
    /// The account version the plan was made against.
    pub from_version: i64,
    pub old_balance: MinorUnits,
    pub old_blocked_money: MinorUnits,
    pub new_balance: MinorUnits,
    pub new_blocked_money: MinorUnits,
}

impl BalanceMove {
    /// Starts a plan that changes nothing.
    pub fn on(account: &Account, label: &'static str) -> Self {
        Self {
            account_id: account.id.clone(),
            label,
            from_version: account.version,
            old_balance: account.balance,
            old_blocked_money: account.blocked_money,
            new_balance: account.balance,
            new_blocked_money: account.blocked_money,
        }
    }

    pub fn credit_balance(mut self, amount: MinorUnits) -> Result<Self, PaymentFlowError> {
        self.new_balance = self.new_balance.checked_add(amount).ok_or_else(|| self.overflow("balance", amount))?;
        Ok(self)
    }

    pub fn debit_balance(mut self, amount: MinorUnits) -> Result<Self, PaymentFlowError> {
        self.new_balance = self.new_balance.checked_sub(amount).ok_or_else(|| self.underflow("balance", amount))?;
        Ok(self)
    }

    /// Moves `amount` into blocked money.
    pub fn block(mut self, amount: MinorUnits) -> Result<Self, PaymentFlowError> {
        self.new_blocked_money =
            self.new_blocked_money.checked_add(amount).ok_or_else(|| self.overflow("blocked money", amount))?;
        Ok(self)
    }

    /// Takes `amount` out of blocked money.
    pub fn release(mut self, amount: MinorUnits) -> Result<Self, PaymentFlowError> {
        self.new_blocked_money =
            self.new_blocked_money.checked_sub(amount).ok_or_else(|| self.underflow("blocked money", amount))?;
        Ok(self)
    }

    pub fn forward(&self) -> BalanceUpdate {
        BalanceUpdate::default()
            .with_balance(self.new_balance)
            .with_blocked_money(self.new_blocked_money)
            .expecting_version(self.from_version)
    }

    /// The update that takes back what this move did, applied to the account as it is now.
    pub fn undo_on(&self, current: &Account) -> Result<BalanceUpdate, PaymentFlowError> {
        let balance = self.reverse("balance", current.balance, self.old_balance, self.new_balance)?;
        let blocked_money =
            self.reverse("blocked money", current.blocked_money, self.old_blocked_money, self.new_blocked_money)?;
        Ok(BalanceUpdate::default()
            .with_balance(balance)
            .with_blocked_money(blocked_money)
            .expecting_version(current.version))
    }

    fn reverse(
        &self,
        field: &'static str,
        current: MinorUnits,
        old: MinorUnits,
        new: MinorUnits,
    ) -> Result<MinorUnits, PaymentFlowError> {
        match new.checked_sub(old) {
            Some(added) => current.checked_sub(added).ok_or_else(|| self.underflow(field, added)),
            None => {
                let removed = MinorUnits::from(old.value() - new.value());
                current.checked_add(removed).ok_or_else(|| self.overflow(field, removed))
            },
        }
    }

    fn underflow(&self, field: &'static str, amount: MinorUnits) -> PaymentFlowError {
        PaymentFlowError::BalanceUnderflow { account_id: self.account_id.clone(), field, amount }
    }

    fn overflow(&self, field: &'static str, amount: MinorUnits) -> PaymentFlowError {
        PaymentFlowError::BalanceOverflow { account_id: self.account_id.clone(), field, amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    pub account_id: AccountId,
    pub step: String,
    pub reason: String,
}

pub struct Saga<'a, L: ?Sized> {
    ledger: &'a L,
    name: String,
    applied: Vec<BalanceMove>,
}

impl<'a, L> Saga<'a, L>
where L: LedgerClient + ?Sized
{
    pub fn new<S: Into<String>>(ledger: &'a L, name: S) -> Self {
        Self { ledger, name: name.into(), applied: Vec::new() }
    }

    pub fn applied(&self) -> usize {
        self.applied.len()
    }

    /// Writes the move to the ledger and remembers it for compensation. A move that fails is not recorded.
    pub async fn apply(&mut self, planned: BalanceMove) -> Result<Account, LedgerError> {
        let account = self.ledger.update_balance(&planned.account_id, planned.forward()).await?;
        trace!(
            "💳️ [{}] {} on {} applied. balance {} -> {}, blocked {} -> {}",
            self.name,
            planned.label,
            planned.account_id,
            planned.old_balance,
            planned.new_balance,
            planned.old_blocked_money,
            planned.new_blocked_money
        );
        self.applied.push(planned);
        Ok(account)
    }

    /// Forgets the recorded compensations.
    pub fn complete(self) {
        trace!("💳️ [{}] Saga complete after {} balance moves", self.name, self.applied.len());
    }

    /// Undoes every applied move, newest first. Keeps going past failures and returns them.
    pub async fn compensate(self) -> Vec<CompensationFailure> {
        let Self { ledger, name, applied } = self;
        let mut failures = Vec::new();
        for step in applied.into_iter().rev() {
            match undo(ledger, &step).await {
                Ok(account) => warn!(
                    "💳️ [{name}] Compensated {} on account {}. balance {}, blocked {}",
                    step.label, step.account_id, account.balance, account.blocked_money
                ),
                Err(reason) => {
                    error!(
                        "💳️ [{name}] Could not undo {} on account {}. The account needs manual attention. {reason}",
                        step.label, step.account_id
                    );
                    failures.push(CompensationFailure {
                        account_id: step.account_id.clone(),
                        step: step.label.to_string(),
                        reason,
                    });
                },
            }
        }
        failures
    }
}

async fn undo<L>(ledger: &L, step: &BalanceMove) -> Result<Account, String>
where L: LedgerClient + ?Sized {
    for attempt in 1..=COMPENSATION_ATTEMPTS {
        let current = ledger.get_account_by_id(&step.account_id).await.map_err(|e| e.to_string())?;
        let update = step.undo_on(&current).map_err(|e| e.to_string())?;
        match ledger.update_balance(&step.account_id, update).await {
            Ok(account) => return Ok(account),
            Err(e @ LedgerError::VersionConflict { .. }) => {
                debug!("💳️ Undo of {} lost a race (attempt {attempt}/{COMPENSATION_ATTEMPTS}). {e}", step.label);
            },
            Err(e) => return Err(e.to_string()),
        }
    }
    Err(format!("The account kept changing. Gave up after {COMPENSATION_ATTEMPTS} attempts"))
}
