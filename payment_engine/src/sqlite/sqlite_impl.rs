//! `SqliteDatabase` is the concrete storage backend of the payment engine.
//!
//! It implements [`LedgerDatabase`] for accounts and statements, and [`PaymentDatabase`] for the payment log.
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use pay_common::MinorUnits;
use sqlx::{migrate, Sqlite, SqlitePool, Transaction};

use super::db::{accounts, new_pool, payments, statements};
use crate::{
    db_types::{Account, AccountId, AccountUpdate, BalanceUpdate, NewAccount, NewPayment, Payment, PaymentId},
    traits::{LedgerDatabase, LedgerError, PaymentDatabase, PaymentDbError, PaymentTransaction},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on an already migrated database.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }
}

#[async_trait]
impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let account = accounts::insert_account(account, &mut tx).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn fetch_account(&self, account_id: &AccountId) -> Result<Option<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(account_id, &mut conn).await
    }

    async fn fetch_accounts_page(&self, after: Option<AccountId>, limit: u32) -> Result<Vec<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_accounts_page(after, limit, &mut conn).await
    }

    async fn update_account(
        &self,
        account_id: &AccountId,
        update: AccountUpdate,
    ) -> Result<Option<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::update_account(account_id, update, &mut conn).await
    }

    async fn delete_account(&self, account_id: &AccountId) -> Result<bool, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let deleted = accounts::delete_account(account_id, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn deposit(&self, card_number: &str, amount: MinorUnits) -> Result<Option<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::deposit(card_number, amount, &mut conn).await
    }

    // No transaction here. A lost race is caught by the version guard on the UPDATE and reported as a conflict.
    async fn update_balance(&self, account_id: &AccountId, update: BalanceUpdate) -> Result<Account, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::update_balance(account_id, update, &mut conn).await
    }

    async fn append_statement(&self, account_id: &AccountId, payment_id: &PaymentId) -> Result<usize, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let len = statements::append_statement(account_id, payment_id, &mut tx).await?;
        tx.commit().await?;
        Ok(len)
    }

    async fn fetch_statement(&self, account_id: &AccountId) -> Result<Option<Vec<PaymentId>>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        match accounts::fetch_account(account_id, &mut conn).await? {
            Some(account) => Ok(Some(account.statement)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl PaymentDatabase for SqliteDatabase {
    type Transaction = SqlitePaymentTransaction;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn begin(&self) -> Result<Self::Transaction, PaymentDbError> {
        let tx = self.pool.begin().await?;
        Ok(SqlitePaymentTransaction { tx })
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PaymentDbError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(payment_id, &mut conn).await
    }

    async fn fetch_payments_for_account(&self, account_id: &AccountId) -> Result<Vec<Payment>, PaymentDbError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_account(account_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), PaymentDbError> {
        self.pool.close().await;
        Ok(())
    }
}

/// An open transaction on the payment log.
pub struct SqlitePaymentTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl PaymentTransaction for SqlitePaymentTransaction {
    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, PaymentDbError> {
        payments::insert_payment(payment, &mut self.tx).await
    }

    async fn commit(self) -> Result<(), PaymentDbError> {
        self.tx.commit().await?;
        trace!("🗃️ Payment transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), PaymentDbError> {
        self.tx.rollback().await?;
        trace!("🗃️ Payment transaction rolled back");
        Ok(())
    }
}
