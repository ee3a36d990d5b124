use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::Config;

pub mod user;
pub mod listing;
pub mod transaction;
pub mod withdrawal;
pub mod reward;
pub mod inventory;

const SCHEMA: &str = include_str!("../../migrations/create_tables.sql");

/// Open the SQLite pool, create tables and seed the catalog
pub async fn init_db(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    create_tables(&pool).await?;
    let seeded = listing::seed_catalog(&pool, &config.catalog).await?;
    info!("Catalog ready ({} new listings seeded)", seeded);

    Ok(pool)
}

/// Create all database tables
pub async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Timestamp written to every `*_at` column
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
