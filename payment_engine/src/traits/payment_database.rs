use pay_common::MinorUnitsConversionError;
use thiserror::Error;

use crate::db_types::{AccountId, ConversionError, NewPayment, Payment, PaymentId};

#[derive(Debug, Clone, Error)]
pub enum PaymentDbError {
    #[error("Payment {0} does not exist")]
    PaymentNotFound(PaymentId),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Could not convert a stored value: {0}")]
    ConversionError(String),
}

impl From<sqlx::Error> for PaymentDbError {
    fn from(e: sqlx::Error) -> Self {
        PaymentDbError::DatabaseError(e.to_string())
    }
}

impl From<MinorUnitsConversionError> for PaymentDbError {
    fn from(e: MinorUnitsConversionError) -> Self {
        PaymentDbError::ConversionError(e.to_string())
    }
}

impl From<ConversionError> for PaymentDbError {
    fn from(e: ConversionError) -> Self {
        PaymentDbError::ConversionError(e.to_string())
    }
}

/// Behaviour a storage backend must expose to hold the payment log.
///
/// The log is append-only: rows are inserted through a [`PaymentTransaction`] and are never updated or deleted.
#[allow(async_fn_in_trait)]
pub trait PaymentDatabase: Clone {
    type Transaction: PaymentTransaction;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Starts a local transaction. Nothing inserted through it is visible until [`PaymentTransaction::commit`].
    async fn begin(&self) -> Result<Self::Transaction, PaymentDbError>;

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PaymentDbError>;

    /// Every row where the account is the merchant or the customer, oldest first.
    async fn fetch_payments_for_account(&self, account_id: &AccountId) -> Result<Vec<Payment>, PaymentDbError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentDbError> {
        Ok(())
    }
}

/// A local transaction on the payment log. Dropping it without committing rolls it back.
#[allow(async_fn_in_trait)]
pub trait PaymentTransaction {
    /// Mints a new payment id, stamps the creation time and writes the row.
    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, PaymentDbError>;

    async fn commit(self) -> Result<(), PaymentDbError>;

    async fn rollback(self) -> Result<(), PaymentDbError>;
}
