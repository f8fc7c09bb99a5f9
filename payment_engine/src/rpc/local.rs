use std::fmt::Debug;

use async_trait::async_trait;
use log::*;

use crate::{
    db_types::{Account, AccountId, BalanceUpdate},
    pe_api::ledger_api::AccountLedgerApi,
    rpc::LedgerClient,
    statements::{serve_statement_stream, StatementStream},
    traits::{LedgerDatabase, LedgerError},
};

/// In-process ledger transport. Every statement stream gets its own server task.
#[derive(Clone)]
pub struct LocalLedgerClient<B> {
    ledger: AccountLedgerApi<B>,
    stream_buffer: usize,
}

impl<B> Debug for LocalLedgerClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalLedgerClient (buffer: {})", self.stream_buffer)
    }
}

impl<B> LocalLedgerClient<B> {
    pub fn new(ledger: AccountLedgerApi<B>, stream_buffer: usize) -> Self {
        Self { ledger, stream_buffer }
    }

    pub fn ledger(&self) -> &AccountLedgerApi<B> {
        &self.ledger
    }
}

#[async_trait]
impl<B: LedgerDatabase> LedgerClient for LocalLedgerClient<B> {
    async fn get_account_by_id(&self, account_id: &AccountId) -> Result<Account, LedgerError> {
        self.ledger.account_by_id(account_id).await
    }

    async fn update_balance(&self, account_id: &AccountId, update: BalanceUpdate) -> Result<Account, LedgerError> {
        self.ledger.update_balance(account_id, update).await
    }

    async fn open_statement_stream(&self) -> Result<StatementStream, LedgerError> {
        let (stream, server) = StatementStream::channel(self.stream_buffer);
        let ledger = self.ledger.clone();
        tokio::spawn(serve_statement_stream(ledger, server));
        trace!("🧾️ Statement stream opened");
        Ok(stream)
    }
}
