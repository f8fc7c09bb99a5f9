use log::*;

use crate::{
    pe_api::ledger_api::AccountLedgerApi,
    statements::{StatementAck, StatementStreamError, StatementStreamServer},
    traits::LedgerDatabase,
};

/// Runs the ledger side of a statement stream until the caller closes it.
///
/// Each request is appended and acknowledged before the next one is read. A rejected append is reported to the caller
/// and ends the stream.
pub async fn serve_statement_stream<B: LedgerDatabase>(ledger: AccountLedgerApi<B>, server: StatementStreamServer) {
    let StatementStreamServer { mut requests, acks } = server;
    let mut handled = 0usize;
    while let Some(request) = requests.recv().await {
        let reply = ledger
            .append_statement(&request.account_id, &request.payment_id)
            .await
            .map(|statement_len| StatementAck {
                account_id: request.account_id.clone(),
                payment_id: request.payment_id.clone(),
                statement_len,
            })
            .map_err(|e| StatementStreamError::Rejected(e.to_string()));
        let rejected = reply.is_err();
        if let Err(e) = &reply {
            warn!("🧾️ Statement append for {} on {} rejected. {e}", request.payment_id, request.account_id);
        }
        if acks.send(reply).await.is_err() {
            warn!("🧾️ The caller hung up before receiving the acknowledgement for {}", request.payment_id);
            return;
        }
        if rejected {
            return;
        }
        handled += 1;
    }
    trace!("🧾️ Statement stream finished after {handled} appends");
}
