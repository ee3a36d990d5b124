//! Transaction models

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Direction of a trade, also the direction the rate is drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Sell,
    Buy,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sell => "sell",
            TransactionKind::Buy => "buy",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "⏳ Pending",
            TransactionStatus::Completed => "✅ Completed",
            TransactionStatus::Failed => "❌ Failed",
        }
    }
}

/// A sell or buy request and its review outcome
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub tx_id: String,
    pub user_id: i64,
    pub kind: TransactionKind,
    pub listing_name: String,
    pub denomination: f64,
    pub settlement: f64,
    pub status: TransactionStatus,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// Why an admin rejected a sell or buy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UsedCode,
    InvalidCode,
    InvalidPayment,
    Other,
}

impl RejectReason {
    /// Short token used inside button payloads
    pub fn token(&self) -> &'static str {
        match self {
            RejectReason::UsedCode => "used",
            RejectReason::InvalidCode => "code",
            RejectReason::InvalidPayment => "payment",
            RejectReason::Other => "other",
        }
    }

    /// Text stored on the transaction and shown to the user
    pub fn describe(&self) -> &'static str {
        match self {
            RejectReason::UsedCode => "Used Code",
            RejectReason::InvalidCode => "Invalid Code",
            RejectReason::InvalidPayment => "Invalid Payment",
            RejectReason::Other => "Other Issue",
        }
    }
}

impl FromStr for RejectReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "used" => Ok(RejectReason::UsedCode),
            "code" => Ok(RejectReason::InvalidCode),
            "payment" => Ok(RejectReason::InvalidPayment),
            "other" => Ok(RejectReason::Other),
            _ => Err(format!("unknown reject reason: {}", s)),
        }
    }
}
