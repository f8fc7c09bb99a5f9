//! # Statement propagation
//!
//! Which accounts a payment touched is recorded by appending the payment id to each account's statement on the
//! ledger. The appends travel over a duplex [`StatementStream`]. The caller sends one [`StatementRequest`] and must
//! receive its [`StatementAck`] before sending the next; [`StatementPropagator`] enforces this turn-taking. Any failure
//! aborts the whole batch, but entries that were already acknowledged stay on their statements.
//!
//! [`serve_statement_stream`] is the ledger side of the stream.
mod messages;
mod propagator;
mod server;
mod stream;

pub use messages::{StatementAck, StatementRequest, StatementStreamError};
pub use propagator::{propagate_statements, PropagatorState, StatementPropagator};
pub use server::serve_statement_stream;
pub use stream::{AckResult, StatementStream, StatementStreamServer};
