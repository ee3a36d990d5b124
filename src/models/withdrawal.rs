//! Withdrawal models

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalMethod {
    Crypto,
    Bank,
}

impl WithdrawalMethod {
    pub const ALL: [WithdrawalMethod; 2] = [WithdrawalMethod::Crypto, WithdrawalMethod::Bank];

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalMethod::Crypto => "crypto",
            WithdrawalMethod::Bank => "bank",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WithdrawalMethod::Crypto => "🔗 Crypto (USDT)",
            WithdrawalMethod::Bank => "🏦 Bank Transfer",
        }
    }
}

impl fmt::Display for WithdrawalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crypto" => Ok(WithdrawalMethod::Crypto),
            "bank" => Ok(WithdrawalMethod::Bank),
            _ => Err(format!("unknown withdrawal method: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Paid,
    Denied,
}

impl WithdrawalStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "⏳",
            WithdrawalStatus::Paid => "✅",
            WithdrawalStatus::Denied => "❌",
        }
    }
}

/// A payout request. The amount leaves the balance when the row is created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Withdrawal {
    pub wd_id: String,
    pub user_id: i64,
    pub method: WithdrawalMethod,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub details: String,
    pub status: WithdrawalStatus,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}
