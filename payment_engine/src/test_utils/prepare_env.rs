use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    events::EventProducers,
    AccountLedgerApi,
    LocalLedgerClient,
    PaymentFlowApi,
    SqliteDatabase,
    SqlitePaymentFlow,
};

pub type TestFlowApi = SqlitePaymentFlow;

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/pe_test_store_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// A fresh ledger store and a fresh payment store, each in its own database file.
pub async fn prepare_test_stores() -> (SqliteDatabase, SqliteDatabase) {
    let ledger_url = random_db_path();
    let payment_url = random_db_path();
    prepare_test_env(&ledger_url).await;
    prepare_test_env(&payment_url).await;
    let ledger_db = SqliteDatabase::new_with_url(&ledger_url, 5).await.expect("Error connecting to the ledger store");
    let payment_db =
        SqliteDatabase::new_with_url(&payment_url, 5).await.expect("Error connecting to the payment store");
    (ledger_db, payment_db)
}

/// A ledger and a payment flow wired together in-process, on fresh stores.
pub async fn prepare_engine(
    producers: EventProducers,
    retries: u32,
) -> (AccountLedgerApi<SqliteDatabase>, TestFlowApi) {
    let (ledger_db, payment_db) = prepare_test_stores().await;
    let ledger = AccountLedgerApi::new(ledger_db);
    let client = LocalLedgerClient::new(ledger.clone(), 1);
    let flow = PaymentFlowApi::new(payment_db, client, producers).with_balance_update_retries(retries);
    (ledger, flow)
}
