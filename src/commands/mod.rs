pub mod admin;
pub mod balance;
pub mod flow;
pub mod help;
pub mod menu;
pub mod price;
pub mod start;
pub mod transaction;

use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::{debug, error, warn};

use crate::context::AppContext;
use crate::messaging::to_create_message;
use crate::models::OutboundMessage;
use crate::services::flow_service::{self, FlowInput};
use crate::services::user_service;
use crate::utils::BotError;

const PREFIX: char = '$';

/// Send an outbound message into the channel the command came from
pub async fn reply(ctx: &Context, msg: &Message, message: &OutboundMessage) -> Result<(), BotError> {
    msg.channel_id
        .send_message(ctx, to_create_message(message))
        .await
        .map_err(|e| BotError::Messaging(e.to_string()))?;
    Ok(())
}

/// First image attachment on the message, used as photo proof
fn image_attachment(msg: &Message) -> Option<String> {
    msg.attachments
        .iter()
        .find(|a| a.content_type.as_deref().is_some_and(|t| t.starts_with("image/")))
        .map(|a| a.url.clone())
}

pub async fn handle_message(app: &AppContext, ctx: &Context, msg: &Message) {
    if msg.author.bot {
        return;
    }

    let user_id = msg.author.id.get() as i64;
    let parts: Vec<&str> = msg.content.split_whitespace().collect();

    let result = match parts.first().filter(|word| word.starts_with(PREFIX)) {
        Some(&command) => {
            let args = &parts[1..];
            if !is_known(command) {
                return;
            }

            // Check rate limit before processing command
            if let Err((remaining, should_warn)) = app.cooldowns.check(user_id, command).await {
                if should_warn {
                    let notice = OutboundMessage::text(format!(
                        "⏳ Please wait {} second(s) before using `{}` again.",
                        remaining, command
                    ));
                    if let Err(e) = reply(ctx, msg, &notice).await {
                        warn!("Failed to send cooldown notice to {}: {}", user_id, e);
                    }
                }
                return;
            }

            run_command(app, ctx, msg, command, args).await
        }
        None => handle_free_input(app, ctx, msg).await,
    };

    if let Err(e) = result {
        match &e {
            BotError::Database(_) | BotError::Messaging(_) => {
                error!("❌ Error handling message from {}: {}", user_id, e)
            }
            _ => debug!("Message from {} rejected: {}", user_id, e),
        }

        let notice = OutboundMessage::text(format!("❌ **Command Error**\n{}", e.user_message()))
            .row(vec![flow_service::home_button()]);
        if let Err(send_err) = reply(ctx, msg, &notice).await {
            warn!("Failed to report error to {}: {}", user_id, send_err);
        }
    }
}

fn is_known(command: &str) -> bool {
    matches!(
        command,
        "$start"
            | "$menu"
            | "$sell"
            | "$buy"
            | "$withdraw"
            | "$balance"
            | "$bal"
            | "$history"
            | "$transactions"
            | "$refer"
            | "$rates"
            | "$help"
            | "$cancel"
            | "$admin"
            | "$addcard"
            | "$setrate"
            | "$addstock"
    )
}

async fn run_command(
    app: &AppContext,
    ctx: &Context,
    msg: &Message,
    command: &str,
    args: &[&str],
) -> Result<(), BotError> {
    // $start handles its own onboarding so it can apply a referral code
    if command != "$start" {
        user_service::ensure_user(app, msg.author.id.get() as i64, &msg.author.name, None).await?;
    }

    match command {
        "$start" => start::execute(app, ctx, msg, args).await,
        "$menu" => start::menu(app, ctx, msg).await,
        "$sell" | "$buy" | "$withdraw" | "$cancel" => flow::execute(app, ctx, msg, command).await,
        "$balance" | "$bal" => balance::execute(app, ctx, msg).await,
        "$refer" => balance::refer(app, ctx, msg).await,
        "$history" | "$transactions" => transaction::execute(app, ctx, msg).await,
        "$rates" => price::execute(app, ctx, msg).await,
        "$help" => help::execute(app, ctx, msg).await,
        "$admin" => admin::panel(app, ctx, msg).await,
        "$addcard" => admin::add_card(app, ctx, msg, args).await,
        "$setrate" => admin::set_rate(app, ctx, msg, args).await,
        "$addstock" => admin::add_stock(app, ctx, msg, args).await,
        _ => Ok(()),
    }
}

/// Plain text or a photo. It goes to the user's flow when one exists; in DMs a stray
/// message gets a hint, elsewhere it is ignored.
async fn handle_free_input(app: &AppContext, ctx: &Context, msg: &Message) -> Result<(), BotError> {
    let user_id = msg.author.id.get() as i64;
    let has_flow = app.conversations.get(user_id).await.is_some();
    if !has_flow && msg.guild_id.is_some() {
        return Ok(());
    }

    let input = match image_attachment(msg) {
        Some(url) => FlowInput::Photo(url),
        None if !msg.content.trim().is_empty() => FlowInput::Text(msg.content.trim().to_string()),
        None => return Ok(()),
    };

    user_service::ensure_user(app, user_id, &msg.author.name, None).await?;
    let response = flow_service::handle_input(app, user_id, input).await?;
    reply(ctx, msg, &response).await
}
