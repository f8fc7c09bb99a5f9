use chrono::{DateTime, Utc};
use log::debug;
use pay_common::MinorUnits;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{AccountId, CardSnapshot, NewPayment, Payment, PaymentId},
    traits::PaymentDbError,
};

const PAYMENT_COLUMNS: &str = "payment_id, merchant, customer, card_number, card_expiry_month, card_expiry_year, \
                               currency, operation, status, amount, created_at";

#[derive(Debug, FromRow)]
struct PaymentRow {
    payment_id: String,
    merchant: String,
    customer: String,
    card_number: String,
    card_expiry_month: String,
    card_expiry_year: String,
    currency: String,
    operation: String,
    status: String,
    amount: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PaymentDbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            payment_id: PaymentId(row.payment_id),
            merchant: AccountId(row.merchant),
            customer: AccountId(row.customer),
            card: CardSnapshot {
                card_number: row.card_number,
                card_expiry_month: row.card_expiry_month,
                card_expiry_year: row.card_expiry_year,
            },
            currency: row.currency,
            operation: row.operation.parse()?,
            status: row.status.parse()?,
            amount: MinorUnits::try_from(row.amount)?,
            created_at: row.created_at,
        })
    }
}

/// Writes a new row to the payment log. The payment id and creation timestamp are assigned here.
pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PaymentDbError> {
    let payment = Payment {
        payment_id: PaymentId::random(),
        merchant: payment.merchant,
        customer: payment.customer,
        card: payment.card,
        currency: payment.currency,
        operation: payment.operation,
        status: payment.status,
        amount: payment.amount,
        created_at: Utc::now(),
    };
    sqlx::query(
        r#"INSERT INTO payments (payment_id, merchant, customer, card_number, card_expiry_month, card_expiry_year,
            currency, operation, status, amount, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
    )
    .bind(payment.payment_id.as_str())
    .bind(payment.merchant.as_str())
    .bind(payment.customer.as_str())
    .bind(&payment.card.card_number)
    .bind(&payment.card.card_expiry_month)
    .bind(&payment.card.card_expiry_year)
    .bind(&payment.currency)
    .bind(payment.operation.to_string())
    .bind(payment.status.as_str())
    .bind(i64::try_from(payment.amount)?)
    .bind(payment.created_at)
    .execute(conn)
    .await?;
    debug!(
        "🗃️ Payment {} recorded. {} {} for {} ({})",
        payment.payment_id, payment.operation, payment.amount, payment.merchant, payment.status
    );
    Ok(payment)
}

pub async fn fetch_payment(
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentDbError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1");
    let row = sqlx::query_as::<_, PaymentRow>(&sql).bind(payment_id.as_str()).fetch_optional(conn).await?;
    row.map(Payment::try_from).transpose()
}

/// Every payment where the account is either the merchant or the customer, in insertion order.
pub async fn fetch_payments_for_account(
    account_id: &AccountId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, PaymentDbError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE merchant = $1 OR customer = $1 ORDER BY rowid");
    let rows = sqlx::query_as::<_, PaymentRow>(&sql).bind(account_id.as_str()).fetch_all(conn).await?;
    rows.into_iter().map(Payment::try_from).collect()
}
