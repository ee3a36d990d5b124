use sqlx::sqlite::{SqliteExecutor, SqlitePool};

use crate::models::Withdrawal;

const WD_COLUMNS: &str =
    "wd_id, user_id, method, amount, fee, net_amount, details, status, reason, created_at";

pub async fn create_withdrawal<'e, E: SqliteExecutor<'e>>(
    executor: E,
    wd: &Withdrawal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO withdrawals (wd_id, user_id, method, amount, fee, net_amount, details, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&wd.wd_id)
    .bind(wd.user_id)
    .bind(wd.method)
    .bind(wd.amount)
    .bind(wd.fee)
    .bind(wd.net_amount)
    .bind(&wd.details)
    .bind(wd.status)
    .bind(wd.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_withdrawal<'e, E: SqliteExecutor<'e>>(
    executor: E,
    wd_id: &str,
) -> Result<Option<Withdrawal>, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>(&format!(
        "SELECT {} FROM withdrawals WHERE wd_id = ?",
        WD_COLUMNS
    ))
    .bind(wd_id)
    .fetch_optional(executor)
    .await
}

/// pending -> paid
pub async fn mark_paid<'e, E: SqliteExecutor<'e>>(
    executor: E,
    wd_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE withdrawals SET status = 'paid' WHERE wd_id = ? AND status = 'pending'",
    )
    .bind(wd_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// pending -> denied with a reason
pub async fn mark_denied<'e, E: SqliteExecutor<'e>>(
    executor: E,
    wd_id: &str,
    reason: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE withdrawals SET status = 'denied', reason = ? WHERE wd_id = ? AND status = 'pending'",
    )
    .bind(reason)
    .bind(wd_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn recent_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>(&format!(
        "SELECT {} FROM withdrawals WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        WD_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Oldest pending first, the order admins work through them
pub async fn list_pending(pool: &SqlitePool, limit: i64) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>(&format!(
        "SELECT {} FROM withdrawals WHERE status = 'pending' ORDER BY created_at LIMIT ?",
        WD_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Number of pending withdrawals and the net total still to be sent
pub async fn pending_totals(pool: &SqlitePool) -> Result<(i64, f64), sqlx::Error> {
    sqlx::query_as::<_, (i64, f64)>(
        "SELECT COUNT(*), COALESCE(SUM(net_amount), 0.0) FROM withdrawals WHERE status = 'pending'",
    )
    .fetch_one(pool)
    .await
}
