//! Balance, withdrawal history and referral screens

use crate::action::{Action, MenuItem};
use crate::context::AppContext;
use crate::db;
use crate::models::{Button, ButtonStyle, OutboundMessage, User};
use crate::services::user_service;
use crate::utils::format::format_date;
use crate::utils::{format_currency, BotError};

const RECENT_WITHDRAWALS: i64 = 3;

async fn load_user(app: &AppContext, user_id: i64) -> Result<User, BotError> {
    db::user::get_user(&app.pool, user_id)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("User {}", user_id)))
}

/// Balance with referral earnings, the last few withdrawals, and a withdraw button
/// when the balance covers at least one method's minimum
pub async fn balance_view(app: &AppContext, user_id: i64) -> Result<OutboundMessage, BotError> {
    let user = load_user(app, user_id).await?;
    let stats = user_service::get_stats(app, &user).await?;
    let withdrawals = db::withdrawal::recent_for_user(&app.pool, user_id, RECENT_WITHDRAWALS).await?;

    let mut text = format!(
        "💰 **Your Balance**\n\nAvailable: **{}**\n\n👥 Referral Earnings\n  Referrals: {}\n  Pending: {}\n  Paid: {}",
        format_currency(stats.balance),
        stats.referrals,
        format_currency(stats.pending_rewards),
        format_currency(stats.paid_rewards)
    );

    if !withdrawals.is_empty() {
        text.push_str("\n\n📤 **Recent Withdrawals**");
        for wd in &withdrawals {
            text.push_str(&format!(
                "\n  {} {} via {} on {}",
                wd.status.emoji(),
                format_currency(wd.amount),
                wd.method,
                format_date(wd.created_at)
            ));
        }
    }

    let min = app.config.lowest_withdrawal_min();
    let can_withdraw = user.balance >= min;
    if !can_withdraw {
        text.push_str(&format!("\n\nMinimum withdrawal is {}.", format_currency(min)));
    }

    let mut message = OutboundMessage::text(text);
    if can_withdraw {
        message = message.row(vec![
            Button::new("💸 Withdraw Funds", Action::Menu(MenuItem::Withdraw)).style(ButtonStyle::Success),
        ]);
    }
    Ok(message.row(vec![Button::new("🏠 Back to Menu", Action::Menu(MenuItem::Home))]))
}

/// The user's referral code and what it has earned
pub async fn refer_view(app: &AppContext, user_id: i64) -> Result<OutboundMessage, BotError> {
    let user = load_user(app, user_id).await?;
    let stats = user_service::get_stats(app, &user).await?;
    let reward = format_currency(app.config.referral_reward);

    Ok(OutboundMessage::text(format!(
        "👥 **Refer & Earn**\n\nEarn **{}** for every friend who completes their first transaction!\n\nYour code: `{}`\nFriends join with: `$start {}`\n\n📊 Your Stats\n  Referrals: {}\n  Pending rewards: {}\n  Paid rewards: {}",
        reward,
        user.referral_code,
        user.referral_code,
        stats.referrals,
        format_currency(stats.pending_rewards),
        format_currency(stats.paid_rewards)
    ))
    .row(vec![Button::new("🏠 Back to Menu", Action::Menu(MenuItem::Home))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{seed_user, test_context};
    use crate::models::WithdrawalMethod;
    use crate::services::submission_service::new_withdrawal;

    #[tokio::test]
    async fn test_withdraw_button_needs_minimum() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 29.99).await;
        seed_user(&app, 2, "AAAA0002", None, 30.0).await;

        let poor = balance_view(&app, 1).await.unwrap();
        assert!(!poor.payloads().contains(&"menu:withdraw"));
        assert!(poor.text.contains("Minimum withdrawal is $30.00"));

        let ok = balance_view(&app, 2).await.unwrap();
        assert_eq!(ok.payloads()[0], "menu:withdraw");
    }

    #[tokio::test]
    async fn test_balance_lists_recent_withdrawals() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 200.0).await;
        new_withdrawal(&app, 1, WithdrawalMethod::Bank, 100.0, "Jane Doe, First Bank, 0001".into())
            .await
            .unwrap();

        let view = balance_view(&app, 1).await.unwrap();
        assert!(view.text.contains("Available: **$100.00**"));
        assert!(view.text.contains("Recent Withdrawals"));
        assert!(view.text.contains("$100.00 via bank"));
    }

    #[tokio::test]
    async fn test_refer_shows_code() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "ABCD1234", None, 0.0).await;
        seed_user(&app, 2, "BBBB0002", Some(1), 0.0).await;

        let view = refer_view(&app, 1).await.unwrap();
        assert!(view.text.contains("`$start ABCD1234`"));
        assert!(view.text.contains("Referrals: 1"));
    }
}
