//! # Storage backends
//!
//! This module defines the interface contracts for the two stores behind the payment engine. The stores belong to
//! different services and never share a transaction.
//!
//! * [`LedgerDatabase`] owns accounts: identity, card, balances and the append-only statement of payment ids. It
//!   knows nothing about payment semantics.
//! * [`PaymentDatabase`] owns the append-only payment log. Rows are written inside a [`PaymentTransaction`] so that
//!   the orchestrator can hold the insert open until remote statement propagation has succeeded.
//!
//! Backends (currently only SQLite) implement these traits; the public APIs in [`crate::pe_api`] are generic over
//! them.
mod ledger_database;
mod payment_database;

pub use ledger_database::{LedgerDatabase, LedgerError};
pub use payment_database::{PaymentDatabase, PaymentDbError, PaymentTransaction};
