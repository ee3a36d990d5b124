pub mod table;
pub mod page;
pub mod errors;
pub mod ratelimit;
pub mod format;

pub use table::Table;
pub use page::Page;
pub use errors::BotError;
pub use ratelimit::Cooldowns;
pub use format::{format_currency, round_cents};
