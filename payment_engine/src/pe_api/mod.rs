//! # Payment engine public API
//!
//! * [`ledger_api`] is the account ledger: accounts, balances and statements. It has no notion of payments.
//! * [`payment_flow_api`] is the payment orchestrator. It drives the authorize, capture, cancel and refund lifecycle
//!   against a local payment log and a remote ledger.
//!
//! The other submodules hold the lifecycle rules, the compensating saga, and the request and error types.
//!
//! # API usage
//!
//! Each API is created by supplying the backends it needs.
//!
//! ```rust,ignore
//! use payment_engine::{AccountLedgerApi, LocalLedgerClient, PaymentFlowApi, SqliteDatabase};
//! let ledger_db = SqliteDatabase::new_with_url("sqlite://data/ledger_store.db", 5).await?;
//! let payment_db = SqliteDatabase::new_with_url("sqlite://data/payment_store.db", 5).await?;
//! let ledger = AccountLedgerApi::new(ledger_db);
//! let client = LocalLedgerClient::new(ledger.clone(), 1);
//! let flow = PaymentFlowApi::new(payment_db, client, EventProducers::default());
//! let outcome = flow.create_payment(request).await?;
//! ```
pub mod account_stream;
pub mod errors;
pub mod ledger_api;
pub mod lifecycle;
pub mod payment_flow_api;
pub mod payment_objects;
pub mod saga;
