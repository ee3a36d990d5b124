use sqlx::sqlite::SqlitePool;

use crate::config::CatalogEntry;
use crate::models::{Listing, RateBounds};

/// Insert missing catalog entries and their default rate rows. Returns how many listings were new.
pub async fn seed_catalog(pool: &SqlitePool, catalog: &[CatalogEntry]) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for entry in catalog {
        let result = sqlx::query("INSERT OR IGNORE INTO listings (name, image_url) VALUES (?, ?)")
            .bind(&entry.name)
            .bind(&entry.image_url)
            .execute(&mut *tx)
            .await?;
        inserted += result.rows_affected();

        sqlx::query("INSERT OR IGNORE INTO rate_bounds (listing_name) VALUES (?)")
            .bind(&entry.name)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Create a listing with default rate bounds
pub async fn create_listing(
    pool: &SqlitePool,
    name: &str,
    image_url: Option<&str>,
) -> Result<Listing, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let listing = sqlx::query_as::<_, Listing>(
        "INSERT INTO listings (name, image_url) VALUES (?, ?) RETURNING id, name, image_url",
    )
    .bind(name)
    .bind(image_url)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO rate_bounds (listing_name) VALUES (?)")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(listing)
}

pub async fn get_listing(pool: &SqlitePool, id: i64) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as::<_, Listing>("SELECT id, name, image_url FROM listings WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Case-insensitive lookup by name
pub async fn get_listing_by_name(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as::<_, Listing>(
        "SELECT id, name, image_url FROM listings WHERE name = ? COLLATE NOCASE",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// One page of the catalog in seed order
pub async fn list_page(
    pool: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Listing>, sqlx::Error> {
    sqlx::query_as::<_, Listing>(
        "SELECT id, name, image_url FROM listings ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_listings(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM listings")
        .fetch_one(pool)
        .await
}

pub async fn get_rate_bounds(
    pool: &SqlitePool,
    listing_name: &str,
) -> Result<Option<RateBounds>, sqlx::Error> {
    sqlx::query_as::<_, RateBounds>(
        "SELECT listing_name, sell_min, sell_max, buy_min, buy_max FROM rate_bounds WHERE listing_name = ?",
    )
    .bind(listing_name)
    .fetch_optional(pool)
    .await
}

/// Insert or replace the bounds row for a listing
pub async fn set_rate_bounds(pool: &SqlitePool, bounds: &RateBounds) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO rate_bounds (listing_name, sell_min, sell_max, buy_min, buy_max)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(listing_name) DO UPDATE SET
            sell_min = excluded.sell_min,
            sell_max = excluded.sell_max,
            buy_min = excluded.buy_min,
            buy_max = excluded.buy_max",
    )
    .bind(&bounds.listing_name)
    .bind(bounds.sell_min)
    .bind(bounds.sell_max)
    .bind(bounds.buy_min)
    .bind(bounds.buy_max)
    .execute(pool)
    .await?;

    Ok(())
}

/// Every listing with its bounds, falling back to defaults where no row exists
pub async fn list_with_bounds(pool: &SqlitePool) -> Result<Vec<RateBounds>, sqlx::Error> {
    sqlx::query_as::<_, RateBounds>(
        "SELECT l.name AS listing_name,
                COALESCE(r.sell_min, 5.0) AS sell_min,
                COALESCE(r.sell_max, 25.0) AS sell_max,
                COALESCE(r.buy_min, 10.0) AS buy_min,
                COALESCE(r.buy_max, 30.0) AS buy_max
         FROM listings l LEFT JOIN rate_bounds r ON r.listing_name = l.name
         ORDER BY l.id",
    )
    .fetch_all(pool)
    .await
}

/// Listings with the most completed transactions
pub async fn trending(pool: &SqlitePool, limit: i64) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT listing_name, COUNT(*) AS total FROM transactions
         WHERE status = 'completed'
         GROUP BY listing_name
         ORDER BY total DESC, listing_name
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
