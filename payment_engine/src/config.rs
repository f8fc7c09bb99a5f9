//! Engine configuration.
//!
//! Values are read from `PE_*` environment variables. Loading a `.env` file first is up to the caller. Malformed values
//! are logged and replaced by their defaults, so [`EngineConfig::from_env_or_default`] never fails.
use std::{env, fmt::Display, str::FromStr};

use log::*;

pub const DEFAULT_LEDGER_DATABASE_URL: &str = "sqlite://data/ledger_store.db";
pub const DEFAULT_PAYMENT_DATABASE_URL: &str = "sqlite://data/payment_store.db";
pub const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;
pub const DEFAULT_BALANCE_UPDATE_RETRIES: u32 = 3;
pub const DEFAULT_STATEMENT_STREAM_BUFFER: usize = 1;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub ledger_database_url: String,
    pub payment_database_url: String,
    pub max_db_connections: u32,
    /// How many times a lifecycle call is retried after losing a balance compare-and-set race.
    pub balance_update_retries: u32,
    /// Channel capacity of each direction of an in-process statement stream.
    pub statement_stream_buffer: usize,
    pub event_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger_database_url: DEFAULT_LEDGER_DATABASE_URL.into(),
            payment_database_url: DEFAULT_PAYMENT_DATABASE_URL.into(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            balance_update_retries: DEFAULT_BALANCE_UPDATE_RETRIES,
            statement_stream_buffer: DEFAULT_STATEMENT_STREAM_BUFFER,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let ledger_database_url = env::var("PE_LEDGER_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ PE_LEDGER_DATABASE_URL is not set. Using the default, {DEFAULT_LEDGER_DATABASE_URL}.");
            DEFAULT_LEDGER_DATABASE_URL.into()
        });
        let payment_database_url = env::var("PE_PAYMENT_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ PE_PAYMENT_DATABASE_URL is not set. Using the default, {DEFAULT_PAYMENT_DATABASE_URL}.");
            DEFAULT_PAYMENT_DATABASE_URL.into()
        });
        if ledger_database_url == payment_database_url {
            warn!(
                "🪛️ The ledger and the payment log share the database {ledger_database_url}. An open payment \
                 transaction will block statement appends. Use separate databases."
            );
        }
        let max_db_connections = parse_at_least("PE_MAX_DB_CONNECTIONS", 1, DEFAULT_MAX_DB_CONNECTIONS);
        let balance_update_retries = parse_or_default("PE_BALANCE_UPDATE_RETRIES", DEFAULT_BALANCE_UPDATE_RETRIES);
        let statement_stream_buffer = parse_or_default("PE_STATEMENT_STREAM_BUFFER", DEFAULT_STATEMENT_STREAM_BUFFER);
        let event_buffer_size = parse_or_default("PE_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        Self {
            ledger_database_url,
            payment_database_url,
            max_db_connections,
            balance_update_retries,
            statement_stream_buffer,
            event_buffer_size,
        }
    }
}

fn parse_or_default<T>(var: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    env::var(var)
        .map(|s| {
            s.parse::<T>().unwrap_or_else(|e| {
                error!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
                default
            })
        })
        .ok()
        .unwrap_or(default)
}

/// As [`parse_or_default`], but values below `min` are also replaced by the default.
fn parse_at_least<T>(var: &str, min: T, default: T) -> T
where
    T: FromStr + Display + Copy + PartialOrd,
    T::Err: Display,
{
    let value = parse_or_default(var, default);
    if value < min {
        error!(
            "🪛️ {value} is not a valid value for {var}. It must be at least {min}. Using the default, {default}, \
             instead."
        );
        return default;
    }
    value
}

#[cfg(test)]
mod test {
    use super::*;

    // Variable names are unique per test.
    #[test]
    fn malformed_values_fall_back_to_defaults() {
        env::set_var("PE_TEST_MALFORMED_RETRIES", "many");
        assert_eq!(parse_or_default("PE_TEST_MALFORMED_RETRIES", 3u32), 3);
        env::set_var("PE_TEST_NEGATIVE_BUFFER", "-1");
        assert_eq!(parse_or_default("PE_TEST_NEGATIVE_BUFFER", 1usize), 1);
    }

    #[test]
    fn an_empty_pool_is_refused() {
        env::set_var("PE_TEST_ZERO_CONNECTIONS", "0");
        assert_eq!(parse_at_least("PE_TEST_ZERO_CONNECTIONS", 1u32, 5), 5);
        env::set_var("PE_TEST_ONE_CONNECTION", "1");
        assert_eq!(parse_at_least("PE_TEST_ONE_CONNECTION", 1u32, 5), 1);
        assert_eq!(parse_at_least("PE_TEST_UNSET_CONNECTIONS", 1u32, 5), 5);
    }

    #[test]
    fn valid_values_are_used() {
        env::set_var("PE_TEST_VALID_RETRIES", "7");
        assert_eq!(parse_or_default("PE_TEST_VALID_RETRIES", 3u32), 7);
        assert_eq!(parse_or_default("PE_TEST_UNSET_VARIABLE", 25usize), 25);
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ledger_database_url, "sqlite://data/ledger_store.db");
        assert_eq!(config.payment_database_url, "sqlite://data/payment_store.db");
        assert_eq!(config.max_db_connections, 5);
        assert_eq!(config.balance_update_retries, 3);
        assert_eq!(config.statement_stream_buffer, 1);
        assert_eq!(config.event_buffer_size, 25);
    }
}
