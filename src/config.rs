use std::{str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Full connection string; takes precedence over the individual parts.
    pub url_override: Option<String>,
    pub max_connections: u32,
    pub connect_retries: u32,
    pub connect_backoff_secs: u64,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_secs(self.connect_backoff_secs)
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            user: var_or("POSTGRES_USER", "user"),
            password: var_or("POSTGRES_PASSWORD", "password"),
            name: var_or("POSTGRES_DB", "registration_db"),
            host: var_or("POSTGRES_HOST", "localhost"),
            port: parse_or("POSTGRES_PORT", 5432)?,
            url_override: std::env::var("DATABASE_URL").ok(),
            max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            connect_retries: parse_or("DB_CONNECT_RETRIES", 10)?,
            connect_backoff_secs: parse_or("DB_CONNECT_BACKOFF_SECS", 2)?,
        };
        let smtp = SmtpConfig {
            host: var_or("SMTP_HOST", "localhost"),
            port: parse_or("SMTP_PORT", 1025)?,
            timeout_secs: parse_or("SMTP_TIMEOUT_SECS", 3)?,
            from: var_or("EMAILS_FROM", "noreply@example.com"),
        };
        Ok(Self {
            database,
            smtp,
            host: var_or("APP_HOST", "0.0.0.0"),
            port: parse_or("APP_PORT", 8080)?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
