//! User models

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// A marketplace participant, created on first interaction and never deleted
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub handle: String,
    pub referral_code: String,
    pub referred_by: Option<i64>,
    pub balance: f64,
    pub created_at: NaiveDateTime,
    pub last_activity: NaiveDateTime,
}

/// Aggregated numbers shown on the dashboard and the balance screen
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub handle: String,
    pub balance: f64,
    pub completed_transactions: i64,
    pub referrals: i64,
    pub pending_rewards: f64,
    pub paid_rewards: f64,
}
