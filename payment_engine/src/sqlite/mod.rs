//! SQLite backend for the account ledger and the payment log.
//!
//! The same [`SqliteDatabase`] type implements both storage traits. Ledger and payment log are normally opened on
//! separate database files, in the same way the ledger and the orchestrator own separate stores.
mod engine;
mod sqlite_impl;

pub mod db;
pub use engine::{SqliteEngine, SqlitePaymentFlow};
pub use sqlite_impl::{SqliteDatabase, SqlitePaymentTransaction};
