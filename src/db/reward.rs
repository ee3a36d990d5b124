use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteExecutor, SqlitePool};

use crate::models::Reward;

pub async fn exists_for_pair<'e, E: SqliteExecutor<'e>>(
    executor: E,
    referrer_id: i64,
    referred_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM rewards WHERE referrer_id = ? AND referred_id = ?)",
    )
    .bind(referrer_id)
    .bind(referred_id)
    .fetch_one(executor)
    .await
}

/// Insert a pending reward unless the pair already has one. Returns the new row.
pub async fn create_reward<'e, E: SqliteExecutor<'e>>(
    executor: E,
    referrer_id: i64,
    referred_id: i64,
    tx_id: &str,
    amount: f64,
    now: NaiveDateTime,
) -> Result<Option<Reward>, sqlx::Error> {
    sqlx::query_as::<_, Reward>(
        "INSERT INTO rewards (referrer_id, referred_id, tx_id, amount, status, created_at)
         VALUES (?, ?, ?, ?, 'pending', ?)
         ON CONFLICT(referrer_id, referred_id) DO NOTHING
         RETURNING id, referrer_id, referred_id, tx_id, amount, status, created_at",
    )
    .bind(referrer_id)
    .bind(referred_id)
    .bind(tx_id)
    .bind(amount)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub async fn get_reward<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Reward>, sqlx::Error> {
    sqlx::query_as::<_, Reward>(
        "SELECT id, referrer_id, referred_id, tx_id, amount, status, created_at FROM rewards WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// pending -> paid
pub async fn mark_paid<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE rewards SET status = 'paid' WHERE id = ? AND status = 'pending'")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// (pending total, paid total) owed to a referrer
pub async fn totals_for_referrer(pool: &SqlitePool, referrer_id: i64) -> Result<(f64, f64), sqlx::Error> {
    sqlx::query_as::<_, (f64, f64)>(
        "SELECT
            COALESCE(SUM(CASE WHEN status = 'pending' THEN amount END), 0.0),
            COALESCE(SUM(CASE WHEN status = 'paid' THEN amount END), 0.0)
         FROM rewards WHERE referrer_id = ?",
    )
    .bind(referrer_id)
    .fetch_one(pool)
    .await
}

pub async fn count_for_pair(pool: &SqlitePool, referrer_id: i64, referred_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM rewards WHERE referrer_id = ? AND referred_id = ?",
    )
    .bind(referrer_id)
    .bind(referred_id)
    .fetch_one(pool)
    .await
}
