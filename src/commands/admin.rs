use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::context::AppContext;
use crate::db;
use crate::models::{OutboundMessage, RateBounds};
use crate::services::{admin_service, permission_service, rate_service};
use crate::utils::{format_currency, BotError};

fn author(msg: &Message) -> i64 {
    msg.author.id.get() as i64
}

async fn send_usage(ctx: &Context, msg: &Message, title: &str, usage: &str, example: &str) -> Result<(), BotError> {
    let embed = CreateEmbed::default()
        .title(title)
        .field("Usage", usage, false)
        .field("Example", example, false)
        .color(0xffa500);
    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| BotError::Messaging(e.to_string()))?;
    Ok(())
}

/// `$admin`
pub async fn panel(app: &AppContext, ctx: &Context, msg: &Message) -> Result<(), BotError> {
    let panel = admin_service::panel(app, author(msg)).await?;
    super::reply(ctx, msg, &panel).await
}

/// `$addcard <name> [image_url]`
pub async fn add_card(app: &AppContext, ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), BotError> {
    permission_service::require_admin(&app.config, author(msg))?;
    let Some((name, image_url)) = parse_add_card(args) else {
        return send_usage(
            ctx,
            msg,
            "🎁 Add Gift Card",
            "`$addcard <name> [image_url]`",
            "`$addcard Roblox https://example.com/roblox.png`",
        )
        .await;
    };

    let listing = admin_service::add_listing(app, author(msg), &name, image_url).await?;
    let reply = OutboundMessage::text(format!(
        "✅ **{}** added (listing #{}) with default rates: sell {:.0}-{:.0}%, buy {:.0}-{:.0}%.",
        listing.name,
        listing.id,
        RateBounds::DEFAULT_SELL.0,
        RateBounds::DEFAULT_SELL.1,
        RateBounds::DEFAULT_BUY.0,
        RateBounds::DEFAULT_BUY.1
    ));
    super::reply(ctx, msg, &reply).await
}

/// `$setrate <listing> <sell_min> <sell_max> [<buy_min> <buy_max>]`
pub async fn set_rate(app: &AppContext, ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), BotError> {
    permission_service::require_admin(&app.config, author(msg))?;
    let Some((name, numbers)) = parse_set_rate(args) else {
        return send_usage(
            ctx,
            msg,
            "📈 Set Rates",
            "`$setrate <listing> <sell_min> <sell_max> [<buy_min> <buy_max>]`",
            "`$setrate Apple / iTunes 8 20 12 28`",
        )
        .await;
    };

    let listing = db::listing::get_listing_by_name(&app.pool, &name)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("Listing {}", name)))?;

    // Buy bounds are optional and keep their current values when omitted
    let current = rate_service::bounds_for(&app.pool, &listing.name).await?;
    let bounds = RateBounds {
        listing_name: listing.name,
        sell_min: numbers[0],
        sell_max: numbers[1],
        buy_min: numbers.get(2).copied().unwrap_or(current.buy_min),
        buy_max: numbers.get(3).copied().unwrap_or(current.buy_max),
    };

    let stored = admin_service::set_rates(app, author(msg), bounds).await?;
    let reply = OutboundMessage::text(format!(
        "✅ **{}** rates updated: sell {:.1}-{:.1}%, buy {:.1}-{:.1}%.",
        stored.listing_name, stored.sell_min, stored.sell_max, stored.buy_min, stored.buy_max
    ));
    super::reply(ctx, msg, &reply).await
}

/// `$addstock <listing> <denomination> <code>`
pub async fn add_stock(app: &AppContext, ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), BotError> {
    permission_service::require_admin(&app.config, author(msg))?;
    let Some((name, denomination, code)) = parse_add_stock(args) else {
        return send_usage(
            ctx,
            msg,
            "📦 Add Stock",
            "`$addstock <listing> <denomination> <code>`",
            "`$addstock Amazon 50 AQ7X-99KD-2LMN`",
        )
        .await;
    };

    let (listing, stock) = admin_service::add_stock(app, author(msg), &name, denomination, code).await?;
    let reply = OutboundMessage::text(format!(
        "✅ Code added. **{} {}** now has {} in stock.",
        listing,
        format_currency(denomination),
        stock
    ));
    super::reply(ctx, msg, &reply).await
}

/// Name is every word except a trailing URL
fn parse_add_card<'a>(args: &[&'a str]) -> Option<(String, Option<&'a str>)> {
    let (image_url, name_words) = match args.split_last() {
        Some((last, rest)) if last.starts_with("http") => (Some(*last), rest),
        _ => (None, args),
    };
    if name_words.is_empty() {
        return None;
    }
    Some((name_words.join(" "), image_url))
}

/// Listing names may contain spaces, so the numbers are read from the end
fn parse_set_rate(args: &[&str]) -> Option<(String, Vec<f64>)> {
    let trailing = args.iter().rev().take_while(|a| a.parse::<f64>().is_ok()).count();
    let count = match trailing {
        n if n >= 4 && args.len() > 4 => 4,
        n if n >= 2 && args.len() > 2 => 2,
        _ => return None,
    };
    let (name_words, numbers) = args.split_at(args.len() - count);
    let numbers = numbers.iter().filter_map(|n| n.parse().ok()).collect();
    Some((name_words.join(" "), numbers))
}

fn parse_add_stock<'a>(args: &[&'a str]) -> Option<(String, f64, &'a str)> {
    let (code, rest) = args.split_last()?;
    let (denomination, name_words) = rest.split_last()?;
    if name_words.is_empty() {
        return None;
    }
    let denomination = denomination.trim_start_matches('$').parse().ok()?;
    Some((name_words.join(" "), denomination, *code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_card() {
        assert_eq!(
            parse_add_card(&["Apple", "/", "iTunes"]),
            Some(("Apple / iTunes".to_string(), None))
        );
        assert_eq!(
            parse_add_card(&["Roblox", "https://cdn.example/r.png"]),
            Some(("Roblox".to_string(), Some("https://cdn.example/r.png")))
        );
        assert_eq!(parse_add_card(&["https://cdn.example/r.png"]), None);
        assert_eq!(parse_add_card(&[]), None);
    }

    #[test]
    fn test_parse_set_rate() {
        assert_eq!(
            parse_set_rate(&["American", "Express", "5", "20"]),
            Some(("American Express".to_string(), vec![5.0, 20.0]))
        );
        assert_eq!(
            parse_set_rate(&["Amazon", "5", "20", "10", "25"]),
            Some(("Amazon".to_string(), vec![5.0, 20.0, 10.0, 25.0]))
        );
        // three numbers: the first belongs to the name
        assert_eq!(
            parse_set_rate(&["Steam", "5", "20", "25"]),
            Some(("Steam 5".to_string(), vec![20.0, 25.0]))
        );
        assert_eq!(parse_set_rate(&["5", "20"]), None);
        assert_eq!(parse_set_rate(&["Amazon", "5"]), None);
    }

    #[test]
    fn test_parse_add_stock() {
        assert_eq!(
            parse_add_stock(&["Best", "Buy", "$50", "BB-1234"]),
            Some(("Best Buy".to_string(), 50.0, "BB-1234"))
        );
        assert_eq!(parse_add_stock(&["50", "BB-1234"]), None);
        assert_eq!(parse_add_stock(&["Amazon", "fifty", "X"]), None);
    }
}
