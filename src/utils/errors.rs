use thiserror::Error;

/// Errors surfaced by commands, review actions and the ledger
#[derive(Debug, Error)]
pub enum BotError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} was already resolved")]
    AlreadyResolved(String),

    #[error("you are not allowed to do that")]
    Unauthorized,

    #[error("insufficient balance: requested ${requested:.2}, available ${available:.2}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("{0}")]
    InvalidInput(String),

    #[error("messaging error: {0}")]
    Messaging(String),
}

impl BotError {
    /// Text shown to whoever triggered the failing action
    pub fn user_message(&self) -> String {
        match self {
            BotError::Database(e) => format!("❌ {}", extract_clean_error(&e.to_string())),
            BotError::NotFound(what) => format!("⚠️ {} not found.", what),
            BotError::AlreadyResolved(what) => format!("⚠️ {} was already handled.", what),
            BotError::Unauthorized => "⛔ This action is for admins only.".to_string(),
            BotError::InsufficientBalance { requested, available } => format!(
                "❌ Insufficient balance. Requested ${:.2}, available ${:.2}.",
                requested, available
            ),
            BotError::InvalidInput(msg) => format!("❌ {}", msg),
            BotError::Messaging(_) => {
                "⚠️ **Network Error**: Having trouble reaching Discord. Please try again.".to_string()
            }
        }
    }
}

/// A UNIQUE or PRIMARY KEY constraint rejected the write
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Extract clean error message from database error strings
///
/// Removes technical error codes and prefixes like:
/// "error returned from database: (code: 2067) UNIQUE constraint failed: inventory.code"
///
/// Returns only the meaningful error message:
/// "UNIQUE constraint failed: inventory.code"
pub fn extract_clean_error(error_msg: &str) -> String {
    let Some(rest) = error_msg.split("error returned from database:").nth(1) else {
        return error_msg.to_string();
    };
    let rest = rest.trim();
    // SQLite prefixes the message with "(code: N)"
    match rest.strip_prefix("(code:").and_then(|r| r.split_once(')')) {
        Some((_, message)) => message.trim().to_string(),
        None => rest.to_string(),
    }
}
