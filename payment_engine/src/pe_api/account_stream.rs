use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::Stream;
use log::*;
use tokio::sync::mpsc;

use crate::{
    db_types::{Account, AccountId},
    traits::{LedgerDatabase, LedgerError},
};

/// A one-way, finite stream of accounts.
///
/// A background task pages through the ledger and feeds a channel that holds at most one page, so only as much is read
/// as the consumer asks for. A storage error is delivered as the final item. Dropping the stream stops the task.
pub struct AccountStream {
    receiver: mpsc::Receiver<Result<Account, LedgerError>>,
}

impl AccountStream {
    pub(crate) fn spawn<B: LedgerDatabase>(db: B, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let (sender, receiver) = mpsc::channel(page_size as usize);
        tokio::spawn(async move {
            let mut after: Option<AccountId> = None;
            let mut sent = 0usize;
            loop {
                let page = match db.fetch_accounts_page(after.clone(), page_size).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("🏦️ Account stream aborted after {sent} accounts. {e}");
                        let _ = sender.send(Err(e)).await;
                        return;
                    },
                };
                let last_page = page.len() < page_size as usize;
                after = page.last().map(|a| a.id.clone());
                for account in page {
                    if sender.send(Ok(account)).await.is_err() {
                        trace!("🏦️ Account stream dropped by the consumer after {sent} accounts");
                        return;
                    }
                    sent += 1;
                }
                if last_page || after.is_none() {
                    break;
                }
            }
            trace!("🏦️ Account stream finished. {sent} accounts sent");
        });
        Self { receiver }
    }
}

impl Stream for AccountStream {
    type Item = Result<Account, LedgerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
