use tracing::info;

use crate::action::Action;
use crate::context::AppContext;
use crate::db;
use crate::models::{Button, ButtonStyle, OutboundMessage, Reward, Transaction};
use crate::utils::{format_currency, BotError};

/// Called after a transaction reaches `completed`.
///
/// Creates a pending reward for the owner's referrer the first time only, and asks the
/// admin channel to pay it out.
pub async fn on_transaction_completed(app: &AppContext, tx: &Transaction) -> Result<Option<Reward>, BotError> {
    let Some(user) = db::user::get_user(&app.pool, tx.user_id).await? else {
        return Ok(None);
    };
    let Some(referrer_id) = user.referred_by else {
        return Ok(None);
    };

    if db::reward::exists_for_pair(&app.pool, referrer_id, user.user_id).await? {
        return Ok(None);
    }

    let Some(reward) = db::reward::create_reward(
        &app.pool,
        referrer_id,
        user.user_id,
        &tx.tx_id,
        app.config.referral_reward,
        db::now(),
    )
    .await?
    else {
        return Ok(None);
    };

    info!(
        "Reward #{} of {} created for referrer {} (referred {}, tx {})",
        reward.id, reward.amount, referrer_id, user.user_id, tx.tx_id
    );

    let referrer_handle = db::user::get_user(&app.pool, referrer_id)
        .await?
        .map(|r| r.handle)
        .unwrap_or_else(|| "Unknown".to_string());

    let message = OutboundMessage::text(format!(
        "🎁 **REFERRAL REWARD DUE**\n\nReward ID: `{}`\nReferrer: {} (ID: {})\nReferred: {} (ID: {})\nFirst transaction: `{}`\nAmount: **{}**",
        reward.id,
        referrer_handle,
        referrer_id,
        user.handle,
        user.user_id,
        tx.tx_id,
        format_currency(reward.amount)
    ))
    .row(vec![
        Button::new("💸 Mark Paid", Action::RewardPaid(reward.id)).style(ButtonStyle::Success),
    ]);
    app.notify_admins(&message).await;

    Ok(Some(reward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{seed_user, test_context};
    use crate::models::{TransactionKind, TransactionStatus};

    fn completed_tx(tx_id: &str, user_id: i64) -> Transaction {
        Transaction {
            tx_id: tx_id.to_string(),
            user_id,
            kind: TransactionKind::Sell,
            listing_name: "Amazon".into(),
            denomination: 100.0,
            settlement: 90.0,
            status: TransactionStatus::Completed,
            reason: None,
            created_at: db::now(),
            completed_at: Some(db::now()),
        }
    }

    #[tokio::test]
    async fn test_reward_is_one_shot() {
        let (app, messenger) = test_context().await;
        seed_user(&app, 1, "ABCD1234", None, 0.0).await;
        seed_user(&app, 2, "FFFF0000", Some(1), 0.0).await;

        let first = on_transaction_completed(&app, &completed_tx("TXAAAA0001", 2)).await.unwrap();
        assert_eq!(first.unwrap().amount, 5.0);
        let second = on_transaction_completed(&app, &completed_tx("TXAAAA0002", 2)).await.unwrap();
        assert!(second.is_none());

        assert_eq!(db::reward::count_for_pair(&app.pool, 1, 2).await.unwrap(), 1);
        let admin_msgs = messenger.to_admins();
        assert_eq!(admin_msgs.len(), 1);
        assert!(admin_msgs[0].payloads()[0].starts_with("admin:reward_paid:"));
    }

    #[tokio::test]
    async fn test_no_referrer_no_reward() {
        let (app, messenger) = test_context().await;
        seed_user(&app, 3, "CCCC0000", None, 0.0).await;
        assert!(on_transaction_completed(&app, &completed_tx("TXBBBB0001", 3)).await.unwrap().is_none());
        assert!(messenger.to_admins().is_empty());
    }
}
