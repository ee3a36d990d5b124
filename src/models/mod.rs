//! Data models for the marketplace ledger and its services
//!
//! Row types map one-to-one onto the tables in `migrations/create_tables.sql`.
//! Result types carry what a service hands back to the command layer.

pub mod user;
pub mod listing;
pub mod transaction;
pub mod withdrawal;
pub mod reward;
pub mod inventory;
pub mod message;

// Re-export commonly used types for convenience
pub use user::{User, UserStats};
pub use listing::{Listing, RateBounds};
pub use transaction::{RejectReason, Transaction, TransactionKind, TransactionStatus};
pub use withdrawal::{Withdrawal, WithdrawalMethod, WithdrawalStatus};
pub use reward::{Reward, RewardStatus};
pub use inventory::InventoryCode;
pub use message::{Button, ButtonStyle, OutboundMessage};
