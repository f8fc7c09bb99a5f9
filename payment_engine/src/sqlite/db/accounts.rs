use chrono::{DateTime, Utc};
use log::{debug, trace};
use pay_common::{MinorUnits, Secret};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Account, AccountId, AccountUpdate, BalanceUpdate, CardDetails, NewAccount, PaymentId},
    sqlite::db::statements,
    traits::LedgerError,
};

const ACCOUNT_COLUMNS: &str = "id, first_name, last_name, card_number, card_expiry_month, card_expiry_year, \
                               card_security_code, balance, blocked_money, version, created_at";

#[derive(Debug, FromRow)]
struct AccountRow {
    id: String,
    first_name: String,
    last_name: String,
    card_number: String,
    card_expiry_month: String,
    card_expiry_year: String,
    card_security_code: String,
    balance: i64,
    blocked_money: i64,
    version: i64,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, statement: Vec<PaymentId>) -> Result<Account, LedgerError> {
        Ok(Account {
            id: AccountId(self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            card: CardDetails {
                card_number: self.card_number,
                card_expiry_month: self.card_expiry_month,
                card_expiry_year: self.card_expiry_year,
                card_security_code: Secret::new(self.card_security_code),
            },
            balance: MinorUnits::try_from(self.balance)?,
            blocked_money: MinorUnits::try_from(self.blocked_money)?,
            statement,
            version: self.version,
            created_at: self.created_at,
        })
    }
}

async fn fetch_row(account_id: &AccountId, conn: &mut SqliteConnection) -> Result<Option<AccountRow>, sqlx::Error> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
    sqlx::query_as::<_, AccountRow>(&sql).bind(account_id.as_str()).fetch_optional(conn).await
}

async fn with_statement(row: AccountRow, conn: &mut SqliteConnection) -> Result<Account, LedgerError> {
    let id = AccountId(row.id.clone());
    let statement = statements::fetch_statement(&id, conn).await?;
    row.into_account(statement)
}

/// Opens a new account with a freshly minted id. Balances start at zero and the statement is empty.
pub async fn insert_account(account: NewAccount, conn: &mut SqliteConnection) -> Result<Account, LedgerError> {
    let id = AccountId::random();
    let now = Utc::now();
    sqlx::query(
        r#"INSERT INTO accounts (id, first_name, last_name, card_number, card_expiry_month, card_expiry_year,
            card_security_code, balance, blocked_money, version, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, 0, $8)"#,
    )
    .bind(id.as_str())
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.card.card_number)
    .bind(&account.card.card_expiry_month)
    .bind(&account.card.card_expiry_year)
    .bind(account.card.card_security_code.reveal())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    debug!("🗃️ Account {id} created for {} {}", account.first_name, account.last_name);
    fetch_account(&id, conn).await?.ok_or(LedgerError::AccountNotFound(id))
}

pub async fn fetch_account(
    account_id: &AccountId,
    conn: &mut SqliteConnection,
) -> Result<Option<Account>, LedgerError> {
    match fetch_row(account_id, &mut *conn).await? {
        Some(row) => Ok(Some(with_statement(row, conn).await?)),
        None => Ok(None),
    }
}

/// Keyset pagination over the accounts table, ordered by id.
pub async fn fetch_accounts_page(
    after: Option<AccountId>,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Account>, LedgerError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE ($1 IS NULL OR id > $1) ORDER BY id LIMIT $2");
    let rows = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(after.map(|id| id.0))
        .bind(i64::from(limit))
        .fetch_all(&mut *conn)
        .await?;
    trace!("🗃️ Fetched a page of {} accounts", rows.len());
    let mut accounts = Vec::with_capacity(rows.len());
    for row in rows {
        accounts.push(with_statement(row, &mut *conn).await?);
    }
    Ok(accounts)
}

pub async fn update_account(
    account_id: &AccountId,
    update: AccountUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Account>, LedgerError> {
    if update.is_empty() {
        trace!("🗃️ Empty update for account {account_id}. Nothing to write");
        return fetch_account(account_id, conn).await;
    }
    let result = sqlx::query(
        r#"UPDATE accounts SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            card_number = COALESCE($3, card_number),
            card_expiry_month = COALESCE($4, card_expiry_month),
            card_expiry_year = COALESCE($5, card_expiry_year),
            card_security_code = COALESCE($6, card_security_code),
            version = version + 1
        WHERE id = $7"#,
    )
    .bind(update.first_name)
    .bind(update.last_name)
    .bind(update.card_number)
    .bind(update.card_expiry_month)
    .bind(update.card_expiry_year)
    .bind(update.card_security_code.map(|code| code.reveal().clone()))
    .bind(account_id.as_str())
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    debug!("🗃️ Account {account_id} details updated");
    fetch_account(account_id, conn).await
}

pub async fn delete_account(account_id: &AccountId, conn: &mut SqliteConnection) -> Result<bool, LedgerError> {
    let removed = statements::delete_statement(account_id, &mut *conn).await?;
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1").bind(account_id.as_str()).execute(conn).await?;
    let deleted = result.rows_affected() > 0;
    if deleted {
        debug!("🗃️ Account {account_id} deleted along with {removed} statement entries");
    }
    Ok(deleted)
}

/// Credits the account that holds `card_number`. If several accounts share the card, the oldest one is credited.
pub async fn deposit(
    card_number: &str,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<Option<Account>, LedgerError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE card_number = $1 ORDER BY created_at LIMIT 1");
    let row = sqlx::query_as::<_, AccountRow>(&sql).bind(card_number).fetch_optional(&mut *conn).await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let id = AccountId(row.id.clone());
    let current = MinorUnits::try_from(row.balance)?;
    let balance = current
        .checked_add(amount)
        .ok_or_else(|| LedgerError::ConversionError(format!("Depositing {amount} into {id} overflows the balance")))?;
    let update = BalanceUpdate::default().with_balance(balance).expecting_version(row.version);
    let account = update_balance(&id, update, conn).await?;
    debug!("🗃️ Deposited {amount} into account {id}. Balance is now {}", account.balance);
    Ok(Some(account))
}

/// Writes the present fields of `update` in a single statement. The version guard only applies when
/// `expected_version` is given; an unversioned update always lands on the current row.
pub async fn update_balance(
    account_id: &AccountId,
    update: BalanceUpdate,
    conn: &mut SqliteConnection,
) -> Result<Account, LedgerError> {
    let balance = update.balance.map(i64::try_from).transpose()?;
    let blocked_money = update.blocked_money.map(i64::try_from).transpose()?;
    let result = sqlx::query(
        r#"UPDATE accounts SET
            balance = COALESCE($1, balance),
            blocked_money = COALESCE($2, blocked_money),
            version = version + 1
        WHERE id = $3 AND ($4 IS NULL OR version = $4)"#,
    )
    .bind(balance)
    .bind(blocked_money)
    .bind(account_id.as_str())
    .bind(update.expected_version)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        let current = fetch_row(account_id, &mut *conn).await?;
        return match (current, update.expected_version) {
            (Some(row), Some(expected)) => {
                Err(LedgerError::VersionConflict { account_id: account_id.clone(), expected, actual: row.version })
            },
            _ => Err(LedgerError::AccountNotFound(account_id.clone())),
        };
    }
    let account =
        fetch_account(account_id, conn).await?.ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;
    trace!(
        "🗃️ Account {account_id} balances written. balance: {:?}, blocked: {:?}, version: {}",
        update.balance,
        update.blocked_money,
        account.version
    );
    Ok(account)
}
