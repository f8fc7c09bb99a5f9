use async_trait::async_trait;
use pay_common::{MinorUnits, MinorUnitsConversionError};
use thiserror::Error;

use crate::db_types::{Account, AccountId, AccountUpdate, BalanceUpdate, ConversionError, NewAccount, PaymentId};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Account {0} does not exist")]
    AccountNotFound(AccountId),
    #[error("No account holds the given card")]
    CardNotFound,
    #[error("Account {account_id} has version {actual}, but the update expected version {expected}")]
    VersionConflict { account_id: AccountId, expected: i64, actual: i64 },
    #[error("The ledger stream was closed: {0}")]
    StreamClosed(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Could not convert a stored value: {0}")]
    ConversionError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<MinorUnitsConversionError> for LedgerError {
    fn from(e: MinorUnitsConversionError) -> Self {
        LedgerError::ConversionError(e.to_string())
    }
}

impl From<ConversionError> for LedgerError {
    fn from(e: ConversionError) -> Self {
        LedgerError::ConversionError(e.to_string())
    }
}

/// Behaviour a storage backend must expose to act as the account ledger.
///
/// The ledger performs no retries of its own. Any storage error aborts the call and is handed back unchanged.
/// Methods that take an account id return `Ok(None)` (or `AccountNotFound` where a value must be produced) when the
/// account does not exist.
#[async_trait]
pub trait LedgerDatabase: Clone + Send + Sync + 'static {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Opens a new account with zero balances and an empty statement.
    async fn create_account(&self, account: NewAccount) -> Result<Account, LedgerError>;

    async fn fetch_account(&self, account_id: &AccountId) -> Result<Option<Account>, LedgerError>;

    /// Fetches up to `limit` accounts ordered by id, starting strictly after `after`. Used for lazy full scans.
    async fn fetch_accounts_page(&self, after: Option<AccountId>, limit: u32) -> Result<Vec<Account>, LedgerError>;

    /// Applies identity and card changes. Balances are untouched.
    async fn update_account(
        &self,
        account_id: &AccountId,
        update: AccountUpdate,
    ) -> Result<Option<Account>, LedgerError>;

    /// Removes the account and its statement. Returns `false` if there was nothing to delete.
    async fn delete_account(&self, account_id: &AccountId) -> Result<bool, LedgerError>;

    /// Credits `amount` to the available balance of the account holding `card_number`.
    async fn deposit(&self, card_number: &str, amount: MinorUnits) -> Result<Option<Account>, LedgerError>;

    /// Writes the present fields of `update` and bumps the account version.
    ///
    /// Fails with [`LedgerError::VersionConflict`] without changing anything if `update.expected_version` is set and
    /// does not match the stored version.
    async fn update_balance(&self, account_id: &AccountId, update: BalanceUpdate) -> Result<Account, LedgerError>;

    /// Appends `payment_id` to the account's statement and returns the statement length afterwards.
    async fn append_statement(&self, account_id: &AccountId, payment_id: &PaymentId) -> Result<usize, LedgerError>;

    async fn fetch_statement(&self, account_id: &AccountId) -> Result<Option<Vec<PaymentId>>, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}
