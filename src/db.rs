use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Connect to the warehouse.
///
/// The DSN comes from the `WAREHOUSE_URL` environment variable, falling
/// back to `[warehouse] url` in the config file. Callers own the pool and
/// close it explicitly at the end of the job.
pub async fn connect(config: &Config) -> Result<PgPool> {
    let url = match std::env::var("WAREHOUSE_URL") {
        Ok(url) => url,
        Err(_) => config
            .warehouse
            .url
            .clone()
            .context("WAREHOUSE_URL not set and no [warehouse] url configured")?,
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.warehouse.max_connections)
        .connect(&url)
        .await
        .context("Failed to connect to warehouse")?;

    Ok(pool)
}
