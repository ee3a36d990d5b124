use crate::action::{Action, MenuItem};
use crate::context::AppContext;
use crate::db;
use crate::models::{Button, OutboundMessage, TransactionKind};
use crate::utils::format::format_date;
use crate::utils::{format_currency, BotError};

const HISTORY_LIMIT: i64 = 10;

/// The user's most recent transactions, newest first
pub async fn history_view(app: &AppContext, user_id: i64) -> Result<OutboundMessage, BotError> {
    let transactions = db::transaction::recent_for_user(&app.pool, user_id, HISTORY_LIMIT).await?;

    let back = vec![Button::new("🏠 Back to Menu", Action::Menu(MenuItem::Home))];
    if transactions.is_empty() {
        return Ok(OutboundMessage::text(
            "📜 **Transaction History**\n\nNo transactions yet. Sell or buy a gift card to get started!",
        )
        .row(back));
    }

    let mut message = String::from("📜 **Transaction History** (Most Recent)\n");
    for tx in &transactions {
        let (icon, settle_label) = match tx.kind {
            TransactionKind::Sell => ("🛒", "Received"),
            TransactionKind::Buy => ("💳", "Paid"),
        };
        message.push_str(&format!(
            "\n{} **{}** {} {} | {}: {}\n└─ `{}` {} · {}",
            icon,
            tx.kind.as_str().to_uppercase(),
            tx.listing_name,
            format_currency(tx.denomination),
            settle_label,
            format_currency(tx.settlement),
            tx.tx_id,
            tx.status.label(),
            format_date(tx.created_at)
        ));
        if let Some(reason) = &tx.reason {
            message.push_str(&format!(" ({})", reason));
        }
    }

    Ok(OutboundMessage::text(message).row(back))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{seed_user, test_context};
    use crate::models::{Transaction, TransactionStatus};

    #[tokio::test]
    async fn test_empty_history() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        let view = history_view(&app, 1).await.unwrap();
        assert!(view.text.contains("No transactions yet"));
        assert_eq!(view.payloads(), vec!["menu:home"]);
    }

    #[tokio::test]
    async fn test_history_caps_at_ten() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        for i in 0..12 {
            let tx = Transaction {
                tx_id: format!("TX{:08}", i),
                user_id: 1,
                kind: TransactionKind::Sell,
                listing_name: "Amazon".into(),
                denomination: 100.0,
                settlement: 85.0,
                status: TransactionStatus::Failed,
                reason: Some("Used Code".into()),
                created_at: db::now(),
                completed_at: None,
            };
            db::transaction::create_transaction(&app.pool, &tx).await.unwrap();
        }

        let view = history_view(&app, 1).await.unwrap();
        assert_eq!(view.text.matches("└─").count(), 10);
        assert!(view.text.contains("TX00000011"));
        assert!(!view.text.contains("TX00000000"));
        assert!(view.text.contains("(Used Code)"));
    }
}
