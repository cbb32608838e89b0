use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::DatabaseConfig;

/// Open the pool, retrying while the database is still coming up.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let url = config.url();
    let attempts = config.connect_retries.max(1);
    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&url)
            .await;
        match result {
            Ok(pool) => {
                info!(attempt, "database connection pool initialized");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                warn!(error = %e, attempt, attempts, "database not reachable yet; retrying");
                tokio::time::sleep(config.connect_backoff()).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("connect to database after {attempts} attempts")
                });
            }
        }
    }
}

/// Ensure the `users` table exists.
pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    info!("database schema is up to date");
    Ok(())
}

/// Release pooled connections on shutdown.
pub async fn close(db: PgPool) {
    db.close().await;
    info!("database connection pool closed");
}
