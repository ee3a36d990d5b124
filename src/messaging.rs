//! Outbound messaging capability
//!
//! Services talk to users and the admin channel only through [`Messenger`], so the
//! ledger and review logic never touch serenity directly and tests can record sends.

use std::sync::Arc;

use serenity::all::ButtonStyle as DiscordButtonStyle;
use serenity::async_trait;
use serenity::builder::{
    CreateActionRow, CreateButton, CreateEmbed, CreateInteractionResponseMessage, CreateMessage,
};
use serenity::http::Http;
use serenity::model::channel::Embed;
use serenity::model::id::{ChannelId, UserId};
use tracing::debug;

use crate::models::{Button, ButtonStyle, OutboundMessage};
use crate::utils::errors::BotError;

// Discord limits per message
const MAX_ROWS: usize = 5;
const MAX_BUTTONS_PER_ROW: usize = 5;
const MAX_TITLE_LEN: usize = 256;
const MAX_DESCRIPTION_LEN: usize = 4096;
const MAX_LABEL_LEN: usize = 80;

const COLOR_SUCCESS: u32 = 0x00ff00;
const COLOR_ERROR: u32 = 0xff0000;
const COLOR_WARNING: u32 = 0xffa500;
const COLOR_INFO: u32 = 0x00b0f4;

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Direct message to a user
    async fn send_to_user(&self, user_id: i64, message: &OutboundMessage) -> Result<(), BotError>;

    /// Post to a channel, e.g. the admin review channel
    async fn send_to_channel(&self, channel_id: u64, message: &OutboundMessage) -> Result<(), BotError>;
}

/// [`Messenger`] backed by the Discord REST client
pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        DiscordMessenger { http }
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_to_user(&self, user_id: i64, message: &OutboundMessage) -> Result<(), BotError> {
        debug!("DM to {}: {} chars", user_id, message.text.len());
        UserId::new(user_id as u64)
            .direct_message(&*self.http, to_create_message(message))
            .await
            .map_err(|e| BotError::Messaging(e.to_string()))?;
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: u64, message: &OutboundMessage) -> Result<(), BotError> {
        debug!("Message to channel {}: {} chars", channel_id, message.text.len());
        ChannelId::new(channel_id)
            .send_message(&*self.http, to_create_message(message))
            .await
            .map_err(|e| BotError::Messaging(e.to_string()))?;
        Ok(())
    }
}

/// Split off a leading `**Heading**` line to use as the embed title
fn split_heading(text: &str) -> (Option<String>, &str) {
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    if !first.contains("**") {
        return (None, text);
    }
    let title = first.replace("**", "").trim().to_string();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return (None, text);
    }
    (Some(title), rest.trim_start_matches('\n'))
}

fn color_for(text: &str) -> u32 {
    if ["✅", "🎉", "🎁"].iter().any(|p| text.starts_with(p)) {
        COLOR_SUCCESS
    } else if ["❌", "⛔"].iter().any(|p| text.starts_with(p)) {
        COLOR_ERROR
    } else if ["⚠️", "⏳", "⌛"].iter().any(|p| text.starts_with(p)) {
        COLOR_WARNING
    } else {
        COLOR_INFO
    }
}

/// Render the text as an embed: heading line as the title, the rest as the description
pub fn to_embed(message: &OutboundMessage) -> CreateEmbed {
    let (title, body) = split_heading(&message.text);
    let mut embed = CreateEmbed::new().color(color_for(&message.text));
    if let Some(title) = title {
        embed = embed.title(title);
    }
    if !body.trim().is_empty() {
        embed = embed.description(truncate(body, MAX_DESCRIPTION_LEN));
    }
    if let Some(url) = &message.image_url {
        embed = embed.image(url);
    }
    embed
}

/// Build a new Discord message
pub fn to_create_message(message: &OutboundMessage) -> CreateMessage {
    CreateMessage::new()
        .embed(to_embed(message))
        .components(action_rows(&message.buttons))
}

/// Build the replacement body used when a button press edits its own message
pub fn to_update_message(message: &OutboundMessage) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content("")
        .embeds(vec![to_embed(message)])
        .components(action_rows(&message.buttons))
}

/// Annotate a resolved review message in place: keep its embed, append the outcome,
/// and remove the buttons so nobody presses them again
pub fn to_resolved_message(original: Option<&Embed>, note: &str) -> CreateInteractionResponseMessage {
    let embed = match original {
        Some(embed) => {
            let description = match &embed.description {
                Some(text) => format!("{}\n\n{}", text, note),
                None => note.to_string(),
            };
            CreateEmbed::from(embed.clone()).description(truncate(&description, MAX_DESCRIPTION_LEN))
        }
        None => CreateEmbed::new().description(note).color(COLOR_INFO),
    };
    CreateInteractionResponseMessage::new()
        .embeds(vec![embed])
        .components(Vec::new())
}

fn action_rows(rows: &[Vec<Button>]) -> Vec<CreateActionRow> {
    rows.iter()
        .flat_map(|row| row.chunks(MAX_BUTTONS_PER_ROW))
        .take(MAX_ROWS)
        .map(|chunk| CreateActionRow::Buttons(chunk.iter().map(to_button).collect()))
        .collect()
}

fn to_button(button: &Button) -> CreateButton {
    let style = match button.style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    };
    CreateButton::new(button.payload.clone())
        .label(truncate(&button.label, MAX_LABEL_LEN))
        .style(style)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = "x".repeat(100);
        let cut = truncate(&long, 80);
        assert_eq!(cut.chars().count(), 80);
        assert!(cut.ends_with('…'));
    }

    fn rendered(message: &OutboundMessage) -> serde_json::Value {
        serde_json::to_value(to_embed(message)).unwrap()
    }

    #[test]
    fn test_heading_becomes_embed_title() {
        let message = OutboundMessage::text("✅ **Sale Approved!**\n\nTransaction ID: `TX1`")
            .image(Some("https://cdn.example/card.png".into()));
        let embed = rendered(&message);
        assert_eq!(embed["title"], "✅ Sale Approved!");
        assert_eq!(embed["description"], "Transaction ID: `TX1`");
        assert_eq!(embed["color"], COLOR_SUCCESS);
        assert_eq!(embed["image"]["url"], "https://cdn.example/card.png");
    }

    #[test]
    fn test_plain_text_has_no_title() {
        let embed = rendered(&OutboundMessage::text("Nothing to cancel."));
        assert!(embed.get("title").is_none());
        assert_eq!(embed["description"], "Nothing to cancel.");
        assert_eq!(embed["color"], COLOR_INFO);

        let embed = rendered(&OutboundMessage::text("❌ **Command Error**\n❌ Invalid amount."));
        assert_eq!(embed["title"], "❌ Command Error");
        assert_eq!(embed["color"], COLOR_ERROR);
        assert_eq!(rendered(&OutboundMessage::text("⚠️ Out of stock"))["color"], COLOR_WARNING);
    }

    #[test]
    fn test_rows_are_split_to_discord_limits() {
        let row: Vec<Button> = (0..8).map(|i| Button::new(format!("b{}", i), i)).collect();
        let rows = action_rows(&[row.clone(), row.clone(), row]);
        // 8 buttons become rows of 5 and 3, capped at 5 rows
        assert_eq!(rows.len(), MAX_ROWS);
    }
}
