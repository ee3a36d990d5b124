use sqlx::sqlite::{SqliteExecutor, SqlitePool};

use crate::models::InventoryCode;

/// Add a redeemable code to stock
pub async fn add_code(
    pool: &SqlitePool,
    listing_name: &str,
    denomination: f64,
    code: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO inventory (listing_name, denomination, code, available) VALUES (?, ?, ?, 1)",
    )
    .bind(listing_name)
    .bind(denomination)
    .bind(code)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Flip the oldest available matching code to unavailable and return it.
/// The select and update are one statement, so two buyers never get the same code.
pub async fn consume_code<'e, E: SqliteExecutor<'e>>(
    executor: E,
    listing_name: &str,
    denomination: f64,
) -> Result<Option<InventoryCode>, sqlx::Error> {
    sqlx::query_as::<_, InventoryCode>(
        "UPDATE inventory SET available = 0
         WHERE id = (
            SELECT id FROM inventory
            WHERE listing_name = ? AND denomination = ? AND available = 1
            ORDER BY id LIMIT 1
         )
         RETURNING id, listing_name, denomination, code, available",
    )
    .bind(listing_name)
    .bind(denomination)
    .fetch_optional(executor)
    .await
}

pub async fn count_available(
    pool: &SqlitePool,
    listing_name: &str,
    denomination: f64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM inventory WHERE listing_name = ? AND denomination = ? AND available = 1",
    )
    .bind(listing_name)
    .bind(denomination)
    .fetch_one(pool)
    .await
}

/// Available codes for a listing across every denomination
pub async fn count_listing_stock(pool: &SqlitePool, listing_name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory WHERE listing_name = ? AND available = 1")
        .bind(listing_name)
        .fetch_one(pool)
        .await
}
