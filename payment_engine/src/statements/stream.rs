use log::*;
use tokio::sync::mpsc;

use crate::statements::{StatementAck, StatementRequest, StatementStreamError};

pub type AckResult = Result<StatementAck, StatementStreamError>;

/// The caller's end of a duplex statement stream: requests go out, acknowledgements come back.
///
/// The stream itself does not enforce turn-taking. Drive it through a
/// [`StatementPropagator`](crate::statements::StatementPropagator) for that.
pub struct StatementStream {
    requests: Option<mpsc::Sender<StatementRequest>>,
    acks: mpsc::Receiver<AckResult>,
}

/// The ledger's end of a duplex statement stream.
pub struct StatementStreamServer {
    pub(crate) requests: mpsc::Receiver<StatementRequest>,
    pub(crate) acks: mpsc::Sender<AckResult>,
}

impl StatementStream {
    pub fn new(requests: mpsc::Sender<StatementRequest>, acks: mpsc::Receiver<AckResult>) -> Self {
        Self { requests: Some(requests), acks }
    }

    /// Creates a connected client/server pair. Each direction holds at most `buffer` messages.
    pub fn channel(buffer: usize) -> (StatementStream, StatementStreamServer) {
        let buffer = buffer.max(1);
        let (req_tx, req_rx) = mpsc::channel(buffer);
        let (ack_tx, ack_rx) = mpsc::channel(buffer);
        (Self::new(req_tx, ack_rx), StatementStreamServer::new(req_rx, ack_tx))
    }

    pub async fn send(&mut self, request: StatementRequest) -> Result<(), StatementStreamError> {
        let sender = self.requests.as_ref().ok_or(StatementStreamError::Closed)?;
        sender.send(request).await.map_err(|e| StatementStreamError::Send(e.to_string()))
    }

    /// The next acknowledgement, or `None` once the ledger has finished the stream.
    pub async fn recv(&mut self) -> Option<AckResult> {
        self.acks.recv().await
    }

    /// Half-closes the stream. Acknowledgements already in flight can still be received.
    pub fn close_send(&mut self) {
        if self.requests.take().is_some() {
            trace!("🧾️ Statement stream send side closed");
        }
    }

    pub fn is_send_closed(&self) -> bool {
        self.requests.is_none()
    }
}

impl StatementStreamServer {
    pub fn new(requests: mpsc::Receiver<StatementRequest>, acks: mpsc::Sender<AckResult>) -> Self {
        Self { requests, acks }
    }
}
