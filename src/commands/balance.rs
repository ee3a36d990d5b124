use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::action::MenuItem;
use crate::context::AppContext;
use crate::utils::BotError;

pub async fn execute(app: &AppContext, ctx: &Context, msg: &Message) -> Result<(), BotError> {
    let view = super::menu::open(app, msg.author.id.get() as i64, MenuItem::Balance).await?;
    super::reply(ctx, msg, &view).await
}

pub async fn refer(app: &AppContext, ctx: &Context, msg: &Message) -> Result<(), BotError> {
    let view = super::menu::open(app, msg.author.id.get() as i64, MenuItem::Refer).await?;
    super::reply(ctx, msg, &view).await
}
