use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::action::MenuItem;
use crate::context::AppContext;
use crate::utils::BotError;

/// `$rates`: rate ranges for the whole catalog
pub async fn execute(app: &AppContext, ctx: &Context, msg: &Message) -> Result<(), BotError> {
    let overview = super::menu::open(app, msg.author.id.get() as i64, MenuItem::Rates).await?;
    super::reply(ctx, msg, &overview).await
}
