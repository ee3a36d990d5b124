use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::action::MenuItem;
use crate::context::AppContext;
use crate::services::flow_service::{self, FlowInput};
use crate::utils::BotError;

/// `$sell`, `$buy`, `$withdraw` start a flow; `$cancel` abandons the current one
pub async fn execute(app: &AppContext, ctx: &Context, msg: &Message, command: &str) -> Result<(), BotError> {
    let user_id = msg.author.id.get() as i64;
    let response = match command {
        "$sell" => super::menu::open(app, user_id, MenuItem::Sell).await?,
        "$buy" => super::menu::open(app, user_id, MenuItem::Buy).await?,
        "$withdraw" => super::menu::open(app, user_id, MenuItem::Withdraw).await?,
        _ => flow_service::handle_input(app, user_id, FlowInput::Cancel).await?,
    };
    super::reply(ctx, msg, &response).await
}
