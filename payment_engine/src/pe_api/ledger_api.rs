use std::fmt::Debug;

use log::*;
use pay_common::MinorUnits;

use crate::{
    db_types::{Account, AccountId, AccountUpdate, BalanceUpdate, NewAccount, PaymentId},
    pe_api::account_stream::AccountStream,
    traits::{LedgerDatabase, LedgerError},
};

/// `AccountLedgerApi` owns the account rows: identity, card, balances and statements.
///
/// The ledger knows nothing about payments. Balances change only through [`Self::update_balance`] (driven by the
/// payment flow) and [`Self::deposit`] (funding). It performs no retries; storage errors are returned as they are.
#[derive(Clone)]
pub struct AccountLedgerApi<B> {
    db: B,
}

impl<B> Debug for AccountLedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountLedgerApi")
    }
}

impl<B> AccountLedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> AccountLedgerApi<B>
where B: LedgerDatabase
{
    pub async fn create_account(&self, account: NewAccount) -> Result<Account, LedgerError> {
        let account = self.db.create_account(account).await?;
        info!("🏦️ Account {} opened for {} {}", account.id, account.first_name, account.last_name);
        Ok(account)
    }

    pub async fn account_by_id(&self, account_id: &AccountId) -> Result<Account, LedgerError> {
        self.db.fetch_account(account_id).await?.ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))
    }

    /// Changes the identity or card details of an account. Balances and the statement are not affected.
    pub async fn update_account(&self, account_id: &AccountId, update: AccountUpdate) -> Result<Account, LedgerError> {
        let account = self
            .db
            .update_account(account_id, update)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;
        debug!("🏦️ Account {account_id} updated");
        Ok(account)
    }

    pub async fn delete_account(&self, account_id: &AccountId) -> Result<(), LedgerError> {
        if self.db.delete_account(account_id).await? {
            info!("🏦️ Account {account_id} deleted");
            Ok(())
        } else {
            Err(LedgerError::AccountNotFound(account_id.clone()))
        }
    }

    /// Credits `amount` to the available balance of the account holding `card_number`.
    pub async fn deposit(&self, card_number: &str, amount: MinorUnits) -> Result<Account, LedgerError> {
        let account = self.db.deposit(card_number, amount).await?.ok_or(LedgerError::CardNotFound)?;
        info!("🏦️ {amount} deposited into account {}", account.id);
        Ok(account)
    }

    pub async fn update_balance(&self, account_id: &AccountId, update: BalanceUpdate) -> Result<Account, LedgerError> {
        if update.is_noop() {
            trace!("🏦️ Balance update for {account_id} changes nothing");
        }
        match self.db.update_balance(account_id, update).await {
            Ok(account) => {
                debug!(
                    "🏦️ Account {account_id} balances are now {} available, {} blocked (v{})",
                    account.balance, account.blocked_money, account.version
                );
                Ok(account)
            },
            Err(e @ LedgerError::VersionConflict { .. }) => {
                debug!("🏦️ Balance update rejected. {e}");
                Err(e)
            },
            Err(e) => Err(e),
        }
    }

    /// Appends `payment_id` to the account's statement and returns the statement length afterwards.
    pub async fn append_statement(&self, account_id: &AccountId, payment_id: &PaymentId) -> Result<usize, LedgerError> {
        let len = self.db.append_statement(account_id, payment_id).await?;
        trace!("🏦️ {payment_id} is entry #{len} on the statement of {account_id}");
        Ok(len)
    }

    pub async fn statement_for_account(&self, account_id: &AccountId) -> Result<Vec<PaymentId>, LedgerError> {
        self.db.fetch_statement(account_id).await?.ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))
    }

    /// A lazy scan over every account, ordered by id. Accounts are fetched `page_size` at a time as the stream is
    /// consumed. The stream ends after the last account and cannot be restarted.
    pub fn stream_accounts(&self, page_size: u32) -> AccountStream {
        AccountStream::spawn(self.db.clone(), page_size)
    }
}
