//! Referral reward models

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    Pending,
    Paid,
}

/// Bonus owed to a referrer for the first completed trade of someone they referred
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reward {
    pub id: i64,
    pub referrer_id: i64,
    pub referred_id: i64,
    pub tx_id: String,
    pub amount: f64,
    pub status: RewardStatus,
    pub created_at: NaiveDateTime,
}
