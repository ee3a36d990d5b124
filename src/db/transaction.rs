use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteExecutor, SqlitePool};

use crate::models::{Transaction, TransactionKind};

const TX_COLUMNS: &str = "tx_id, user_id, kind, listing_name, denomination, settlement, status, reason, created_at, completed_at";

/// Insert a new pending transaction
pub async fn create_transaction(pool: &SqlitePool, tx: &Transaction) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO transactions (tx_id, user_id, kind, listing_name, denomination, settlement, status, reason, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&tx.tx_id)
    .bind(tx.user_id)
    .bind(tx.kind)
    .bind(&tx.listing_name)
    .bind(tx.denomination)
    .bind(tx.settlement)
    .bind(tx.status)
    .bind(&tx.reason)
    .bind(tx.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_transaction<'e, E: SqliteExecutor<'e>>(
    executor: E,
    tx_id: &str,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {} FROM transactions WHERE tx_id = ?",
        TX_COLUMNS
    ))
    .bind(tx_id)
    .fetch_optional(executor)
    .await
}

/// pending -> completed. Returns false if the row was not pending or is of another kind.
pub async fn complete_transaction<'e, E: SqliteExecutor<'e>>(
    executor: E,
    tx_id: &str,
    kind: TransactionKind,
    now: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE transactions SET status = 'completed', completed_at = ?
         WHERE tx_id = ? AND kind = ? AND status = 'pending'",
    )
    .bind(now)
    .bind(tx_id)
    .bind(kind)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// pending -> failed with a reason
pub async fn fail_transaction<'e, E: SqliteExecutor<'e>>(
    executor: E,
    tx_id: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE transactions SET status = 'failed', reason = ?, completed_at = ?
         WHERE tx_id = ? AND status = 'pending'",
    )
    .bind(reason)
    .bind(now)
    .bind(tx_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Newest first
pub async fn recent_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {} FROM transactions WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        TX_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {} FROM transactions ORDER BY created_at DESC, rowid DESC LIMIT ?",
        TX_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_completed_for_user(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM transactions WHERE user_id = ? AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn count_pending(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE status = 'pending'")
        .fetch_one(pool)
        .await
}
