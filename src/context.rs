use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::sqlite::SqlitePool;
use tracing::warn;

use crate::config::Config;
use crate::messaging::Messenger;
use crate::models::OutboundMessage;
use crate::services::flow_service::Conversations;
use crate::utils::Cooldowns;

const COMMAND_COOLDOWN: Duration = Duration::from_secs(2);

/// Everything a handler needs, built once in `main` and shared behind an `Arc`
pub struct AppContext {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub conversations: Conversations,
    pub cooldowns: Cooldowns,
    pub messenger: Arc<dyn Messenger>,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(pool: SqlitePool, config: Config, messenger: Arc<dyn Messenger>) -> Self {
        AppContext {
            pool,
            conversations: Conversations::new(config.state_timeout),
            config: Arc::new(config),
            cooldowns: Cooldowns::new(COMMAND_COOLDOWN),
            messenger,
            started_at: Instant::now(),
        }
    }

    /// Notify a user, logging instead of failing when delivery is impossible
    pub async fn notify_user(&self, user_id: i64, message: &OutboundMessage) {
        if let Err(e) = self.messenger.send_to_user(user_id, message).await {
            warn!("Could not notify user {}: {}", user_id, e);
        }
    }

    /// Post to the admin channel, logging instead of failing
    pub async fn notify_admins(&self, message: &OutboundMessage) {
        let channel = self.config.admin_channel_id;
        if let Err(e) = self.messenger.send_to_channel(channel, message).await {
            warn!("Could not post to admin channel {}: {}", channel, e);
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use serenity::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::db;
    use crate::models::OutboundMessage;
    use crate::utils::BotError;

    pub const ADMIN_ID: i64 = 900;
    pub const ADMIN_CHANNEL: u64 = 901;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recipient {
        User(i64),
        Channel(u64),
    }

    /// Records every send; users in `unreachable` fail like a blocked DM
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<(Recipient, OutboundMessage)>>,
        pub unreachable: Mutex<HashSet<i64>>,
    }

    impl RecordingMessenger {
        pub fn to_user(&self, user_id: i64) -> Vec<OutboundMessage> {
            self.filtered(Recipient::User(user_id))
        }

        pub fn to_admins(&self) -> Vec<OutboundMessage> {
            self.filtered(Recipient::Channel(ADMIN_CHANNEL))
        }

        pub fn block(&self, user_id: i64) {
            self.unreachable.lock().unwrap().insert(user_id);
        }

        fn filtered(&self, recipient: Recipient) -> Vec<OutboundMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(r, _)| *r == recipient)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_to_user(&self, user_id: i64, message: &OutboundMessage) -> Result<(), BotError> {
            if self.unreachable.lock().unwrap().contains(&user_id) {
                return Err(BotError::Messaging("Cannot send messages to this user".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((Recipient::User(user_id), message.clone()));
            Ok(())
        }

        async fn send_to_channel(&self, channel_id: u64, message: &OutboundMessage) -> Result<(), BotError> {
            self.sent
                .lock()
                .unwrap()
                .push((Recipient::Channel(channel_id), message.clone()));
            Ok(())
        }
    }

    pub fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "DISCORD_TOKEN" => Some("test-token".to_string()),
            "ADMIN_IDS" => Some(ADMIN_ID.to_string()),
            "ADMIN_CHANNEL_ID" => Some(ADMIN_CHANNEL.to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// In-memory database with the full schema and the default catalog
    pub async fn test_pool(config: &Config) -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::create_tables(&pool).await.unwrap();
        db::listing::seed_catalog(&pool, &config.catalog).await.unwrap();
        pool
    }

    pub async fn test_context_with(config: Config) -> (Arc<AppContext>, Arc<RecordingMessenger>) {
        let pool = test_pool(&config).await;
        let messenger = Arc::new(RecordingMessenger::default());
        let app = AppContext::new(pool, config, messenger.clone());
        (Arc::new(app), messenger)
    }

    pub async fn test_context() -> (Arc<AppContext>, Arc<RecordingMessenger>) {
        test_context_with(test_config()).await
    }

    /// Create a user directly, optionally referred, with a starting balance
    pub async fn seed_user(app: &AppContext, user_id: i64, code: &str, referred_by: Option<i64>, balance: f64) {
        db::user::create_user(&app.pool, user_id, &format!("user{}", user_id), code, referred_by, db::now())
            .await
            .unwrap();
        if balance > 0.0 {
            db::user::credit_balance(&app.pool, user_id, balance).await.unwrap();
        }
    }

    pub async fn balance_of(app: &AppContext, user_id: i64) -> f64 {
        db::user::get_balance(&app.pool, user_id).await.unwrap().unwrap()
    }
}
