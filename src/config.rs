use std::{env, str::FromStr, time::Duration};

use actix_web::cookie::Key;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

use crate::errors::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://locative.db";
const DEFAULT_AGENCY_NAME: &str = "NIVAL IMPACT";
const MIN_SESSION_KEY_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub agency_name: String,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let port = match env::var("PORT") {
            Ok(port) => port
                .parse()
                .map_err(|_| AppError::ConfigError(format!("invalid PORT: {}", port)))?,
            Err(_) => 8080,
        };
        let secure_cookies = match env::var("SECURE_COOKIES") {
            Ok(value) => parse_bool(&value)
                .ok_or_else(|| AppError::ConfigError(format!("invalid SECURE_COOKIES: {}", value)))?,
            Err(_) => false,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_owned()),
            port,
            agency_name: env::var("AGENCY_NAME")
                .unwrap_or_else(|_| DEFAULT_AGENCY_NAME.to_owned()),
            secure_cookies,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Reads `SESSION_KEY`; the cookie signing key needs at least 64 bytes.
pub fn session_key() -> Result<Key, AppError> {
    let key_str = env::var("SESSION_KEY").map_err(|e| {
        log::error!("FATAL: SESSION_KEY environment variable not set");
        AppError::EnvVarError(e)
    })?;
    session_key_from(&key_str)
}

fn session_key_from(key_str: &str) -> Result<Key, AppError> {
    if key_str.len() < MIN_SESSION_KEY_LEN {
        return Err(AppError::ConfigError(format!(
            "SESSION_KEY must be at least {} bytes long",
            MIN_SESSION_KEY_LEN
        )));
    }
    Ok(Key::from(key_str.as_bytes()))
}

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let db_pool = SqlitePool::connect_with(opts).await?;

    sqlx::migrate!().run(&db_pool).await?;
    log::info!("Database migrated successfully");

    Ok(db_pool)
}
