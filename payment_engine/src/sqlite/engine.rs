use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use super::SqliteDatabase;
use crate::{
    config::EngineConfig,
    events::{EventHandlers, EventHooks},
    AccountLedgerApi,
    LocalLedgerClient,
    PaymentFlowApi,
};

pub type SqlitePaymentFlow = PaymentFlowApi<SqliteDatabase, LocalLedgerClient<SqliteDatabase>>;

/// The ledger and the payment flow on their own SQLite stores, wired together in-process.
#[derive(Debug)]
pub struct SqliteEngine {
    pub ledger: AccountLedgerApi<SqliteDatabase>,
    pub flow: SqlitePaymentFlow,
}

impl SqliteEngine {
    /// Opens (creating and migrating if needed) both stores named in `config`.
    ///
    /// The returned handlers carry the hooks. Call [`EventHandlers::start_handlers`] on them to have events
    /// delivered.
    pub async fn connect(config: &EngineConfig, hooks: EventHooks) -> Result<(Self, EventHandlers), sqlx::Error> {
        let ledger_db = open_store(&config.ledger_database_url, config.max_db_connections).await?;
        let payment_db = open_store(&config.payment_database_url, config.max_db_connections).await?;
        let handlers = EventHandlers::new(config.event_buffer_size, hooks);
        let ledger = AccountLedgerApi::new(ledger_db);
        let client = LocalLedgerClient::new(ledger.clone(), config.statement_stream_buffer);
        let flow = PaymentFlowApi::new(payment_db, client, handlers.producers())
            .with_balance_update_retries(config.balance_update_retries);
        info!(
            "🗃️ Payment engine ready. Ledger at {}, payment log at {}",
            config.ledger_database_url, config.payment_database_url
        );
        Ok((Self { ledger, flow }, handlers))
    }
}

async fn open_store(url: &str, max_connections: u32) -> Result<SqliteDatabase, sqlx::Error> {
    if !Sqlite::database_exists(url).await? {
        info!("🗃️ Creating database {url}");
        Sqlite::create_database(url).await?;
    }
    let db = SqliteDatabase::new_with_url(url, max_connections).await?;
    db.migrate().await?;
    Ok(db)
}
