use crate::action::MenuItem;
use crate::context::AppContext;
use crate::models::OutboundMessage;
use crate::services::flow_service::{self, FlowKind};
use crate::services::{balance_service, rate_service, transaction_service, user_service};
use crate::utils::BotError;

use super::help;

/// Screen for a main-menu entry, shared by `$` commands and menu buttons.
///
/// Sell, buy and withdraw start a flow. Going home abandons any flow in progress.
pub async fn open(app: &AppContext, user_id: i64, item: MenuItem) -> Result<OutboundMessage, BotError> {
    match item {
        MenuItem::Sell => flow_service::start_flow(app, user_id, FlowKind::Sell).await,
        MenuItem::Buy => flow_service::start_flow(app, user_id, FlowKind::Buy).await,
        MenuItem::Withdraw => flow_service::start_flow(app, user_id, FlowKind::Withdraw).await,
        MenuItem::Balance => balance_service::balance_view(app, user_id).await,
        MenuItem::History => transaction_service::history_view(app, user_id).await,
        MenuItem::Refer => balance_service::refer_view(app, user_id).await,
        MenuItem::Rates => Ok(OutboundMessage::text(rate_service::overview(&app.pool).await?)
            .row(vec![flow_service::home_button()])),
        MenuItem::Help => Ok(help::help_message(app)),
        MenuItem::Home => {
            app.conversations.remove(user_id).await;
            user_service::dashboard(app, user_id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{seed_user, test_context};

    #[tokio::test]
    async fn test_home_abandons_flow() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;

        open(&app, 1, MenuItem::Sell).await.unwrap();
        assert!(app.conversations.is_active(1).await);

        let home = open(&app, 1, MenuItem::Home).await.unwrap();
        assert!(home.text.contains("Gift Card Exchange"));
        assert!(!app.conversations.is_active(1).await);
    }

    #[tokio::test]
    async fn test_every_screen_renders() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        for item in [
            MenuItem::Balance,
            MenuItem::History,
            MenuItem::Refer,
            MenuItem::Rates,
            MenuItem::Help,
            MenuItem::Buy,
        ] {
            let screen = open(&app, 1, item).await.unwrap();
            assert!(!screen.text.is_empty());
            assert!(!screen.buttons.is_empty());
        }
    }

    #[tokio::test]
    async fn test_withdraw_with_no_balance_starts_nothing() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        let reply = open(&app, 1, MenuItem::Withdraw).await.unwrap();
        assert!(reply.text.contains("Insufficient balance"));
        assert!(!app.conversations.is_active(1).await);
    }
}
