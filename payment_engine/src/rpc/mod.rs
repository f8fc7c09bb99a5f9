//! The seam between the payment flow and the account ledger.
//!
//! The payment flow only ever talks to the ledger through [`LedgerClient`]. [`LocalLedgerClient`] serves the calls
//! in-process from an [`AccountLedgerApi`](crate::pe_api::ledger_api::AccountLedgerApi); a networked transport would
//! implement the same trait.
mod local;
#[cfg(test)]
pub(crate) mod test_ledger;

use async_trait::async_trait;
pub use local::LocalLedgerClient;

use crate::{
    db_types::{Account, AccountId, BalanceUpdate},
    statements::StatementStream,
    traits::LedgerError,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fails with [`LedgerError::AccountNotFound`] if there is no such account.
    async fn get_account_by_id(&self, account_id: &AccountId) -> Result<Account, LedgerError>;

    /// Writes the present fields of `update`. See [`LedgerDatabase::update_balance`](crate::traits::LedgerDatabase).
    async fn update_balance(&self, account_id: &AccountId, update: BalanceUpdate) -> Result<Account, LedgerError>;

    /// Opens a duplex statement stream to the ledger.
    async fn open_statement_stream(&self) -> Result<StatementStream, LedgerError>;
}
