use log::*;

use crate::statements::{StatementAck, StatementRequest, StatementStream, StatementStreamError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagatorState {
    /// No request is outstanding. The next request may be sent.
    ReadyToSend,
    /// A request was sent and its acknowledgement has not arrived yet.
    AwaitingAck(StatementRequest),
    /// The send side was closed after every request had been acknowledged.
    Closed,
    /// A send or acknowledgement failed. The stream cannot be used any further.
    Failed,
}

/// Enforces strict send-then-acknowledge turn-taking on a [`StatementStream`].
///
/// Out-of-turn calls are rejected with [`StatementStreamError::InvalidState`] and leave the state untouched. Any
/// transport error, missing acknowledgement or mismatched acknowledgement moves the propagator to
/// [`PropagatorState::Failed`]; entries acknowledged before the failure stay recorded in
/// [`StatementPropagator::acknowledged`].
pub struct StatementPropagator {
    stream: StatementStream,
    state: PropagatorState,
    acknowledged: Vec<StatementAck>,
}

impl StatementPropagator {
    pub fn new(stream: StatementStream) -> Self {
        Self { stream, state: PropagatorState::ReadyToSend, acknowledged: Vec::new() }
    }

    pub fn state(&self) -> &PropagatorState {
        &self.state
    }

    pub fn acknowledged(&self) -> &[StatementAck] {
        &self.acknowledged
    }

    pub async fn send(&mut self, request: StatementRequest) -> Result<(), StatementStreamError> {
        match self.state {
            PropagatorState::ReadyToSend => {},
            PropagatorState::AwaitingAck(_) => {
                return Err(StatementStreamError::InvalidState("the previous request has not been acknowledged"))
            },
            PropagatorState::Closed => return Err(StatementStreamError::InvalidState("the stream is closed")),
            PropagatorState::Failed => return Err(StatementStreamError::InvalidState("the stream has failed")),
        }
        trace!("🧾️ Sending statement request for {} on account {}", request.payment_id, request.account_id);
        match self.stream.send(request.clone()).await {
            Ok(()) => {
                self.state = PropagatorState::AwaitingAck(request);
                Ok(())
            },
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn await_ack(&mut self) -> Result<StatementAck, StatementStreamError> {
        let PropagatorState::AwaitingAck(pending) = &self.state else {
            return Err(StatementStreamError::InvalidState("no request is awaiting acknowledgement"));
        };
        let pending = pending.clone();
        match self.stream.recv().await {
            None => Err(self.fail(StatementStreamError::MissingAck)),
            Some(Err(e)) => Err(self.fail(e)),
            Some(Ok(ack)) if !pending.is_acknowledged_by(&ack) => {
                let err = StatementStreamError::AckMismatch {
                    expected: format!("{}@{}", pending.payment_id, pending.account_id),
                    received: format!("{}@{}", ack.payment_id, ack.account_id),
                };
                Err(self.fail(err))
            },
            Some(Ok(ack)) => {
                trace!(
                    "🧾️ Account {} acknowledged {}. Statement length {}",
                    ack.account_id,
                    ack.payment_id,
                    ack.statement_len
                );
                self.acknowledged.push(ack.clone());
                self.state = PropagatorState::ReadyToSend;
                Ok(ack)
            },
        }
    }

    /// Sends `request` and waits for its acknowledgement.
    pub async fn append(&mut self, request: StatementRequest) -> Result<StatementAck, StatementStreamError> {
        self.send(request).await?;
        self.await_ack().await
    }

    /// Half-closes the stream and drains whatever the ledger still sends. Only allowed between turns.
    pub async fn close(&mut self) -> Result<(), StatementStreamError> {
        match self.state {
            PropagatorState::ReadyToSend => {},
            PropagatorState::AwaitingAck(_) => {
                let reason = "cannot close while a request is awaiting acknowledgement";
                return Err(StatementStreamError::InvalidState(reason));
            },
            PropagatorState::Closed => return Ok(()),
            PropagatorState::Failed => return Err(StatementStreamError::InvalidState("the stream has failed")),
        }
        self.stream.close_send();
        while let Some(extra) = self.stream.recv().await {
            match extra {
                Ok(ack) => {
                    warn!("🧾️ Ignoring unsolicited acknowledgement for {} on {}", ack.payment_id, ack.account_id)
                },
                Err(e) => return Err(self.fail(e)),
            }
        }
        self.state = PropagatorState::Closed;
        trace!("🧾️ Statement stream closed after {} acknowledgements", self.acknowledged.len());
        Ok(())
    }

    fn fail(&mut self, err: StatementStreamError) -> StatementStreamError {
        warn!("🧾️ Statement propagation failed after {} acknowledgements. {err}", self.acknowledged.len());
        self.stream.close_send();
        self.state = PropagatorState::Failed;
        err
    }
}

/// Appends every request in order, one turn at a time, then closes the stream.
///
/// The first failure aborts the whole batch. Entries acknowledged before it are not retracted.
pub async fn propagate_statements(
    stream: StatementStream,
    requests: Vec<StatementRequest>,
) -> Result<Vec<StatementAck>, StatementStreamError> {
    let mut propagator = StatementPropagator::new(stream);
    for request in requests {
        propagator.append(request).await?;
    }
    propagator.close().await?;
    Ok(propagator.acknowledged)
}
