//! Payment Engine
//!
//! The payment engine moves money between a customer and a merchant through a four-stage lifecycle: authorize,
//! capture, cancel and refund. Account balances and the payment log are owned by two separate components that only
//! talk to each other through calls:
//!
//! 1. The account ledger ([`AccountLedgerApi`]) owns accounts, their `balance` and `blocked_money`, and an
//!    append-only statement of the payments that touched each account.
//! 2. The payment orchestrator ([`PaymentFlowApi`]) owns the append-only payment log. It decides the outcome of each
//!    lifecycle call, moves balances on the ledger, records the payment locally, and fans out statement entries over a
//!    [`statements::StatementStream`].
//!
//! There is no shared transaction between the two. Balance moves are version-checked, and a failed call compensates
//! the moves it already applied. See [`pe_api::saga`].
//!
//! Storage backends implement the traits in [`traits`]. [`SqliteDatabase`] implements all of them. The orchestrator
//! reaches the ledger through the [`LedgerClient`] trait; [`LocalLedgerClient`] serves it in-process.
//!
//! Subscribers can hook into payment events through [`events::EventHooks`].
pub mod config;
pub mod db_types;
pub mod events;
pub mod pe_api;
pub mod rpc;
pub mod statements;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::EngineConfig;
pub use pe_api::{
    errors::PaymentFlowError,
    ledger_api::AccountLedgerApi,
    payment_flow_api::PaymentFlowApi,
    payment_objects::{CreatePaymentRequest, PaymentOutcome},
};
pub use rpc::{LedgerClient, LocalLedgerClient};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase, SqliteEngine, SqlitePaymentFlow, SqlitePaymentTransaction};
pub use traits::{LedgerDatabase, LedgerError, PaymentDatabase, PaymentDbError, PaymentTransaction};
