use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod action;
mod commands;
mod config;
mod context;
mod db;
mod health;
mod interactions;
mod messaging;
mod models;
mod services;
mod utils;

use crate::config::Config;
use crate::context::AppContext;
use crate::messaging::DiscordMessenger;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Handler {
    app: Arc<AppContext>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        commands::handle_message(&self.app, &ctx, &msg).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        interactions::handle_interaction(&self.app, &ctx, interaction).await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        // Check for rate limits now that bot is connected
        debug!("Checking Discord rate limit status...");
        match ctx.http.get_current_user().await {
            Ok(_) => info!("No rate limit detected - Bot is fully ready!"),
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("429") || error_msg.contains("rate limit") || error_msg.contains("Ratelimited") {
                    warn!("Bot is being rate limited by Discord! Error: {}", error_msg);
                } else {
                    warn!("Failed to check rate limit status: {}", error_msg);
                }
            }
        }
    }
}

/// Drop idle conversations and stale cooldown entries once a minute
fn spawn_sweeper(app: Arc<AppContext>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let expired = app.conversations.sweep().await;
            app.cooldowns.prune().await;
            if expired > 0 {
                debug!("Swept {} expired conversation(s)", expired);
            }
        }
    });
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("giftdesk=debug".parse().unwrap())
                .add_directive("serenity=warn".parse().unwrap()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("🎁 Starting giftdesk...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded config: {} admin(s), {} listing(s), {}s flow timeout",
        config.admin_ids.len(),
        config.catalog.len(),
        config.state_timeout.as_secs()
    );

    // Initialize database
    info!("Initializing database...");
    let pool = match db::init_db(&config).await {
        Ok(p) => {
            info!("Database initialized successfully");
            p
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let token = config.discord_token.clone();
    let health_port = config.health_port;
    let messenger = Arc::new(DiscordMessenger::new(Arc::new(Http::new(&token))));
    let app = Arc::new(AppContext::new(pool, config, messenger));

    spawn_sweeper(app.clone());

    let started_at = app.started_at;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_port, started_at).await {
            error!("Health endpoint failed: {}", e);
        }
    });

    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGES;

    let mut client = match Client::builder(&token, intents).event_handler(Handler { app }).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }
}
