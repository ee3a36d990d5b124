use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteExecutor, SqlitePool};

use crate::models::User;

const USER_COLUMNS: &str =
    "user_id, handle, referral_code, referred_by, balance, created_at, last_activity";

/// Get a user by platform id
pub async fn get_user(pool: &SqlitePool, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE user_id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Find the owner of a referral code (codes are stored upper-case)
pub async fn get_user_by_referral_code(
    pool: &SqlitePool,
    code: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE referral_code = ?",
        USER_COLUMNS
    ))
    .bind(code.to_uppercase())
    .fetch_optional(pool)
    .await
}

/// Insert a user. Returns false when the id already exists.
pub async fn create_user(
    pool: &SqlitePool,
    user_id: i64,
    handle: &str,
    referral_code: &str,
    referred_by: Option<i64>,
    now: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (user_id, handle, referral_code, referred_by, balance, created_at, last_activity)
         VALUES (?, ?, ?, ?, 0.0, ?, ?)
         ON CONFLICT(user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(handle)
    .bind(referral_code)
    .bind(referred_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Refresh the handle and last-activity timestamp
pub async fn touch_user(
    pool: &SqlitePool,
    user_id: i64,
    handle: &str,
    now: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET handle = ?, last_activity = ? WHERE user_id = ?")
        .bind(handle)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Add to a balance. Returns false if the user does not exist.
pub async fn credit_balance<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    amount: f64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET balance = ROUND(balance + ?, 2) WHERE user_id = ?")
        .bind(amount)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Subtract from a balance only if it covers the amount. Returns the new balance, `None` if it did not.
pub async fn debit_balance<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    amount: f64,
) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        "UPDATE users SET balance = ROUND(balance - ?, 2) WHERE user_id = ? AND balance >= ? RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .bind(amount)
    .fetch_optional(executor)
    .await
}

pub async fn get_balance(pool: &SqlitePool, user_id: i64) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar::<_, f64>("SELECT balance FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Number of users who joined with this user's code
pub async fn count_referrals(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE referred_by = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

/// Most recently active users first
pub async fn list_users(pool: &SqlitePool, limit: i64) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users ORDER BY last_activity DESC LIMIT ?",
        USER_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}
