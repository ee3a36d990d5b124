use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::info;

use crate::action::MenuItem;
use crate::context::AppContext;
use crate::services::user_service;
use crate::utils::BotError;

/// `$start [CODE]`: onboard the user, apply a referral code on first contact, show the dashboard
pub async fn execute(app: &AppContext, ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), BotError> {
    let user_id = msg.author.id.get() as i64;
    let onboarding = user_service::ensure_user(app, user_id, &msg.author.name, args.first().copied()).await?;

    if let Some(referrer) = &onboarding.referrer {
        info!("User {} joined through {}'s referral code", user_id, referrer.user_id);
        super::reply(ctx, msg, &user_service::referral_welcome(app, referrer)).await?;
    }

    menu(app, ctx, msg).await
}

/// `$menu`: drop any flow in progress and show the dashboard
pub async fn menu(app: &AppContext, ctx: &Context, msg: &Message) -> Result<(), BotError> {
    let dashboard = super::menu::open(app, msg.author.id.get() as i64, MenuItem::Home).await?;
    super::reply(ctx, msg, &dashboard).await
}
