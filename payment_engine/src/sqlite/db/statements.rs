use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{AccountId, PaymentId},
    traits::LedgerError,
};

/// Appends `payment_id` to the end of the account's statement and returns the new statement length.
pub async fn append_statement(
    account_id: &AccountId,
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<usize, LedgerError> {
    let inserted = sqlx::query(
        r#"INSERT INTO account_statements (account_id, payment_id, created_at)
        SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM accounts WHERE id = $1)"#,
    )
    .bind(account_id.as_str())
    .bind(payment_id.as_str())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(LedgerError::AccountNotFound(account_id.clone()));
    }
    let len: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account_statements WHERE account_id = $1")
        .bind(account_id.as_str())
        .fetch_one(&mut *conn)
        .await?;
    trace!("🗃️ Payment {payment_id} appended to statement of {account_id}. Statement has {len} entries");
    usize::try_from(len).map_err(|e| LedgerError::ConversionError(e.to_string()))
}

/// The account's statement, oldest entry first. An unknown account simply has an empty statement here.
pub async fn fetch_statement(
    account_id: &AccountId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentId>, sqlx::Error> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT payment_id FROM account_statements WHERE account_id = $1 ORDER BY id")
            .bind(account_id.as_str())
            .fetch_all(conn)
            .await?;
    Ok(ids.into_iter().map(PaymentId::from).collect())
}

pub async fn delete_statement(account_id: &AccountId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM account_statements WHERE account_id = $1")
        .bind(account_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
