use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::context::AppContext;
use crate::models::OutboundMessage;
use crate::services::flow_service::home_button;
use crate::utils::{format_currency, BotError};

pub fn help_message(app: &AppContext) -> OutboundMessage {
    let config = &app.config;
    let text = format!(
        "🆘 **Help & Support**\n\n\
         **🎯 General**\n\
         `$start [CODE]` - Open the dashboard (optionally with a friend's referral code)\n\
         `$menu` - Back to the dashboard\n\
         `$cancel` - Abandon the current request\n\n\
         **🛒 Trading**\n\
         `$sell` - Sell a gift card for balance\n\
         `$buy` - Buy a gift card code\n\
         `$rates` - Current rate ranges\n\
         `$history` - Your last 10 transactions\n\n\
         **💰 Balance**\n\
         `$balance` - Balance, rewards and withdrawals\n\
         `$withdraw` - Cash out (crypto from {}, bank from {} with a {:.0}% fee)\n\
         `$refer` - Your referral code, {} per friend\n\n\
         **⚡ Limits**\n\
         Card values from {} to {}. Requests expire after {} minutes of inactivity.\n\
         {}-second cooldown per command.",
        format_currency(config.crypto.min),
        format_currency(config.bank.min),
        config.bank.fee_pct,
        format_currency(config.referral_reward),
        format_currency(config.min_amount),
        format_currency(config.max_amount),
        config.state_timeout.as_secs() / 60,
        app.cooldowns.window_seconds()
    );
    OutboundMessage::text(text).row(vec![home_button()])
}

pub async fn execute(app: &AppContext, ctx: &Context, msg: &Message) -> Result<(), BotError> {
    super::reply(ctx, msg, &help_message(app)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::test_context;

    #[tokio::test]
    async fn test_help_uses_configured_limits() {
        let (app, _) = test_context().await;
        let help = help_message(&app);
        assert!(help.text.contains("bank from $100.00 with a 7% fee"));
        assert!(help.text.contains("$10.00 to $10,000.00"));
        assert!(help.text.contains("expire after 5 minutes"));
    }
}
