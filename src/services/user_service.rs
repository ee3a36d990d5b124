use tracing::{info, warn};

use crate::action::{Action, MenuItem};
use crate::context::AppContext;
use crate::db;
use crate::models::{Button, ButtonStyle, OutboundMessage, User, UserStats};
use crate::utils::format::new_referral_code;
use crate::utils::{format_currency, BotError};

const CODE_ATTEMPTS: usize = 5;
const TRENDING_LIMIT: i64 = 5;

/// Result of looking up a user on an inbound event
#[derive(Debug)]
pub struct Onboarding {
    pub user: User,
    pub created: bool,
    pub referrer: Option<User>,
}

/// Make sure the user exists and mark them active.
///
/// A referral code is honoured only when the row is created, and never for the user's own code.
pub async fn ensure_user(
    app: &AppContext,
    user_id: i64,
    handle: &str,
    referral_code: Option<&str>,
) -> Result<Onboarding, BotError> {
    let now = db::now();

    if let Some(user) = db::user::get_user(&app.pool, user_id).await? {
        db::user::touch_user(&app.pool, user_id, handle, now).await?;
        return Ok(Onboarding { user, created: false, referrer: None });
    }

    let referrer = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => db::user::get_user_by_referral_code(&app.pool, code)
            .await?
            .filter(|r| r.user_id != user_id),
        None => None,
    };
    let referred_by = referrer.as_ref().map(|r| r.user_id);

    let mut created = false;
    for _ in 0..CODE_ATTEMPTS {
        let code = new_referral_code();
        match db::user::create_user(&app.pool, user_id, handle, &code, referred_by, now).await {
            Ok(inserted) => {
                created = inserted;
                break;
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!("Referral code {} collided, retrying", code);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let user = db::user::get_user(&app.pool, user_id)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("User {}", user_id)))?;

    if created {
        info!(
            "New user {} ({}) with code {}, referred by {:?}",
            user_id, handle, user.referral_code, user.referred_by
        );
    }

    // A concurrent event may have created the row first; only report the referrer we stored
    let referrer = referrer.filter(|r| created && user.referred_by == Some(r.user_id));
    Ok(Onboarding { user, created, referrer })
}

pub async fn get_stats(app: &AppContext, user: &User) -> Result<UserStats, BotError> {
    let completed_transactions = db::transaction::count_completed_for_user(&app.pool, user.user_id).await?;
    let referrals = db::user::count_referrals(&app.pool, user.user_id).await?;
    let (pending_rewards, paid_rewards) = db::reward::totals_for_referrer(&app.pool, user.user_id).await?;

    Ok(UserStats {
        handle: user.handle.clone(),
        balance: user.balance,
        completed_transactions,
        referrals,
        pending_rewards,
        paid_rewards,
    })
}

/// Main menu with the user's stats and the trending cards
pub async fn dashboard(app: &AppContext, user_id: i64) -> Result<OutboundMessage, BotError> {
    let user = db::user::get_user(&app.pool, user_id)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("User {}", user_id)))?;
    let stats = get_stats(app, &user).await?;
    let trending = db::listing::trending(&app.pool, TRENDING_LIMIT).await?;

    let mut text = format!(
        "🏦 **Gift Card Exchange**\n\n👤 User: {}\n💰 Balance: {}\n📊 Transactions: {} completed\n👥 Referrals: {} users",
        stats.handle,
        format_currency(stats.balance),
        stats.completed_transactions,
        stats.referrals
    );
    if !trending.is_empty() {
        text.push_str("\n\n🔥 **Trending Cards**");
        for (i, (name, sales)) in trending.iter().enumerate() {
            text.push_str(&format!("\n  {}. {} ({} sales)", i + 1, name, sales));
        }
    }
    text.push_str("\n\nChoose an option below:");

    Ok(OutboundMessage::text(text)
        .row(vec![
            Button::new("🛒 Sell Gift Card", Action::Menu(MenuItem::Sell)).style(ButtonStyle::Primary),
            Button::new("💳 Buy Gift Card", Action::Menu(MenuItem::Buy)).style(ButtonStyle::Primary),
        ])
        .row(vec![
            Button::new("📈 View Rates", Action::Menu(MenuItem::Rates)),
            Button::new("📜 My Transactions", Action::Menu(MenuItem::History)),
        ])
        .row(vec![
            Button::new("💰 Balance & Withdraw", Action::Menu(MenuItem::Balance)),
            Button::new(
                format!("👥 Refer & Earn {}", format_currency(app.config.referral_reward)),
                Action::Menu(MenuItem::Refer),
            ),
        ])
        .row(vec![Button::new("🆘 Help & Support", Action::Menu(MenuItem::Help))]))
}

/// Greeting sent once when a referral code was accepted
pub fn referral_welcome(app: &AppContext, referrer: &User) -> OutboundMessage {
    OutboundMessage::text(format!(
        "🎉 Welcome! You were referred by {}!\nComplete your first transaction and they earn {}! 💰",
        referrer.handle,
        format_currency(app.config.referral_reward)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{seed_user, test_context};

    #[tokio::test]
    async fn test_user_created_once() {
        let (app, _) = test_context().await;
        let first = ensure_user(&app, 10, "alice", None).await.unwrap();
        assert!(first.created);
        assert_eq!(first.user.balance, 0.0);
        assert_eq!(first.user.referral_code.len(), 8);

        let again = ensure_user(&app, 10, "alice_renamed", None).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.user.referral_code, first.user.referral_code);
        let stored = db::user::get_user(&app.pool, 10).await.unwrap().unwrap();
        assert_eq!(stored.handle, "alice_renamed");
    }

    #[tokio::test]
    async fn test_referral_code_applies_only_at_creation() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "ABCD1234", None, 0.0).await;
        seed_user(&app, 2, "EEEE0000", None, 0.0).await;

        let joined = ensure_user(&app, 3, "carol", Some("abcd1234")).await.unwrap();
        assert_eq!(joined.user.referred_by, Some(1));
        assert_eq!(joined.referrer.map(|r| r.user_id), Some(1));

        // an existing user cannot switch referrer
        let again = ensure_user(&app, 3, "carol", Some("EEEE0000")).await.unwrap();
        assert_eq!(again.user.referred_by, Some(1));
        assert!(again.referrer.is_none());
    }

    #[tokio::test]
    async fn test_unknown_code_ignored() {
        let (app, _) = test_context().await;
        let joined = ensure_user(&app, 4, "dave", Some("NOPE0000")).await.unwrap();
        assert!(joined.created);
        assert_eq!(joined.user.referred_by, None);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "ABCD1234", None, 12.5).await;
        seed_user(&app, 2, "BBBB0000", Some(1), 0.0).await;

        let menu = dashboard(&app, 1).await.unwrap();
        assert!(menu.text.contains("$12.50"));
        assert!(menu.text.contains("Referrals: 1 users"));
        assert!(menu.payloads().contains(&"menu:sell"));
        assert!(menu.payloads().contains(&"menu:help"));
    }
}
