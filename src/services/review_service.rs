//! Admin review actions on pending transactions, withdrawals and rewards
//!
//! Every action is a compare-and-swap on `status = 'pending'` inside one database
//! transaction, so a second press on the same item changes nothing and reports
//! [`BotError::AlreadyResolved`]. User notifications are sent after commit and their
//! failures are only logged.

use tracing::{error, info};

use crate::action::Action;
use crate::context::AppContext;
use crate::db;
use crate::models::{
    Button, ButtonStyle, OutboundMessage, RejectReason, Transaction, TransactionKind, TransactionStatus, User,
    Withdrawal,
};
use crate::services::flow_service::Proof;
use crate::services::{permission_service, referral_service};
use crate::utils::format::format_date;
use crate::utils::{format_currency, BotError};

pub const OUT_OF_STOCK: &str = "Out of stock";
pub const DENIED_BY_ADMIN: &str = "Denied by admin";

/// Review request posted to the admin channel for a new sell or buy
pub fn transaction_review_request(tx: &Transaction, user: &User, rate: f64, proof: &Proof) -> OutboundMessage {
    let (title, rate_line, amount_label) = match tx.kind {
        TransactionKind::Sell => ("🛒 **NEW SALE REQUEST**", format!("-{:.1}%", rate), "Payout"),
        TransactionKind::Buy => ("💳 **NEW PURCHASE REQUEST**", format!("+{:.1}%", rate), "Paid"),
    };
    let proof_line = match proof {
        Proof::Photo(_) => "📸 Photo attached".to_string(),
        Proof::Text(text) if tx.kind == TransactionKind::Sell => format!("Code: `{}`", text),
        Proof::Text(text) => format!("Payment hash: `{}`", text),
    };

    let text = format!(
        "{}\n\nTransaction ID: `{}`\nUser: {} (ID: {})\n\nGift Card: {}\nFace Value: {}\n{}: {}\nRate: {}\n\n{}\n\nStatus: ⏳ Awaiting Verification",
        title,
        tx.tx_id,
        user.handle,
        user.user_id,
        tx.listing_name,
        format_currency(tx.denomination),
        amount_label,
        format_currency(tx.settlement),
        rate_line,
        proof_line
    );

    let tx_id = tx.tx_id.clone();
    let reject = |label: &str, reason: RejectReason| {
        Button::new(label, Action::Reject { reason, tx_id: tx_id.clone() }).style(ButtonStyle::Danger)
    };
    let buttons = match tx.kind {
        TransactionKind::Sell => vec![
            Button::new("✅ Valid", Action::Approve(tx_id.clone())).style(ButtonStyle::Success),
            reject("❌ Used Code", RejectReason::UsedCode),
            reject("⚠️ Invalid Code", RejectReason::InvalidCode),
            reject("🔄 Other Issue", RejectReason::Other),
        ],
        TransactionKind::Buy => vec![
            Button::new("📦 Deliver Code", Action::Deliver(tx_id.clone())).style(ButtonStyle::Success),
            reject("❌ Invalid Payment", RejectReason::InvalidPayment),
            reject("🔄 Other Issue", RejectReason::Other),
        ],
    };

    let image = match proof {
        Proof::Photo(url) => Some(url.clone()),
        Proof::Text(_) => None,
    };
    OutboundMessage::text(text).image(image).row(buttons)
}

/// Review request posted to the admin channel for a new withdrawal
pub fn withdrawal_review_request(wd: &Withdrawal, user: &User) -> OutboundMessage {
    OutboundMessage::text(format!(
        "💸 **NEW WITHDRAWAL REQUEST**\n\nWithdrawal ID: `{}`\nUser: {} (ID: {})\n\nMethod: {}\nAmount: {}\nFee: {}\nSend: **{}**\n\nDetails:\n```\n{}\n```\nRequested: {}",
        wd.wd_id,
        user.handle,
        user.user_id,
        wd.method.label(),
        format_currency(wd.amount),
        format_currency(wd.fee),
        format_currency(wd.net_amount),
        wd.details,
        format_date(wd.created_at)
    ))
    .row(vec![
        Button::new("✅ Mark Paid", Action::WithdrawalApprove(wd.wd_id.clone())).style(ButtonStyle::Success),
        Button::new("❌ Deny & Refund", Action::WithdrawalDeny(wd.wd_id.clone())).style(ButtonStyle::Danger),
    ])
}

async fn load_transaction(app: &AppContext, tx_id: &str) -> Result<Transaction, BotError> {
    db::transaction::get_transaction(&app.pool, tx_id)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("Transaction {}", tx_id)))
}

/// Run the referral trigger without letting its failure undo an approval
async fn trigger_referral(app: &AppContext, tx: &Transaction) {
    if let Err(e) = referral_service::on_transaction_completed(app, tx).await {
        error!("Referral processing failed for {}: {}", tx.tx_id, e);
    }
}

/// Approve a pending sell: complete it and credit the settlement
pub async fn approve_sell(app: &AppContext, admin_id: i64, tx_id: &str) -> Result<String, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;
    let tx = load_transaction(app, tx_id).await?;
    if tx.kind != TransactionKind::Sell {
        return Err(BotError::InvalidInput(format!("{} is not a sell", tx_id)));
    }

    let mut dbtx = app.pool.begin().await?;
    if !db::transaction::complete_transaction(&mut *dbtx, tx_id, TransactionKind::Sell, db::now()).await? {
        dbtx.rollback().await?;
        return Err(BotError::AlreadyResolved(format!("Transaction {}", tx_id)));
    }
    if !db::user::credit_balance(&mut *dbtx, tx.user_id, tx.settlement).await? {
        dbtx.rollback().await?;
        return Err(BotError::NotFound(format!("User {}", tx.user_id)));
    }
    dbtx.commit().await?;

    info!(
        "Admin {} approved sell {}: credited {:.2} to user {}",
        admin_id, tx_id, tx.settlement, tx.user_id
    );

    app.notify_user(
        tx.user_id,
        &OutboundMessage::text(format!(
            "✅ **Sale Approved!**\n\nTransaction ID: `{}`\nCard: {}\n**{}** has been added to your balance.",
            tx.tx_id,
            tx.listing_name,
            format_currency(tx.settlement)
        )),
    )
    .await;
    trigger_referral(app, &tx).await;

    Ok(format!(
        "✅ Approved by <@{}>. Credited {} to the user.",
        admin_id,
        format_currency(tx.settlement)
    ))
}

/// Reject a pending sell or buy with one of the fixed reasons
pub async fn reject_transaction(
    app: &AppContext,
    admin_id: i64,
    tx_id: &str,
    reason: RejectReason,
) -> Result<String, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;
    let tx = load_transaction(app, tx_id).await?;

    if !db::transaction::fail_transaction(&app.pool, tx_id, reason.describe(), db::now()).await? {
        return Err(BotError::AlreadyResolved(format!("Transaction {}", tx_id)));
    }

    info!("Admin {} rejected {} {}: {}", admin_id, tx.kind, tx_id, reason.describe());

    app.notify_user(
        tx.user_id,
        &OutboundMessage::text(format!(
            "❌ **Transaction Rejected**\n\nTransaction ID: `{}`\nCard: {}\nReason: **{}**\n\nContact support if you think this is a mistake.",
            tx.tx_id,
            tx.listing_name,
            reason.describe()
        )),
    )
    .await;

    Ok(format!("❌ Rejected by <@{}>: {}", admin_id, reason.describe()))
}

/// Deliver a pending buy from inventory, or fail it when no code is in stock
pub async fn deliver_buy(app: &AppContext, admin_id: i64, tx_id: &str) -> Result<String, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;
    let tx = load_transaction(app, tx_id).await?;
    if tx.kind != TransactionKind::Buy {
        return Err(BotError::InvalidInput(format!("{} is not a buy", tx_id)));
    }
    if tx.status != TransactionStatus::Pending {
        return Err(BotError::AlreadyResolved(format!("Transaction {}", tx_id)));
    }

    let now = db::now();
    let mut dbtx = app.pool.begin().await?;
    let code = db::inventory::consume_code(&mut *dbtx, &tx.listing_name, tx.denomination).await?;

    let Some(code) = code else {
        if !db::transaction::fail_transaction(&mut *dbtx, tx_id, OUT_OF_STOCK, now).await? {
            dbtx.rollback().await?;
            return Err(BotError::AlreadyResolved(format!("Transaction {}", tx_id)));
        }
        dbtx.commit().await?;

        info!("Buy {} failed: no {} {:.2} code in stock", tx_id, tx.listing_name, tx.denomination);
        app.notify_user(
            tx.user_id,
            &OutboundMessage::text(format!(
                "⚠️ **Out of Stock**\n\nTransaction ID: `{}`\nWe're out of {} {} codes. Your payment of {} will be refunded by our team shortly.",
                tx.tx_id,
                tx.listing_name,
                format_currency(tx.denomination),
                format_currency(tx.settlement)
            )),
        )
        .await;
        return Ok(format!("⚠️ Out of stock. Marked failed; refund {} manually.", format_currency(tx.settlement)));
    };

    if !db::transaction::complete_transaction(&mut *dbtx, tx_id, TransactionKind::Buy, now).await? {
        // rolling back also returns the code to stock
        dbtx.rollback().await?;
        return Err(BotError::AlreadyResolved(format!("Transaction {}", tx_id)));
    }
    dbtx.commit().await?;

    info!("Admin {} delivered code #{} for buy {}", admin_id, code.id, tx_id);

    app.notify_user(
        tx.user_id,
        &OutboundMessage::text(format!(
            "🎉 **Your Gift Card is Ready!**\n\nTransaction ID: `{}`\nCard: {} {}\n\nCode: `{}`\n\nThank you for your purchase!",
            tx.tx_id,
            tx.listing_name,
            format_currency(tx.denomination),
            code.code
        )),
    )
    .await;
    trigger_referral(app, &tx).await;

    Ok(format!("📦 Delivered by <@{}> (inventory #{}).", admin_id, code.id))
}

async fn load_withdrawal(app: &AppContext, wd_id: &str) -> Result<Withdrawal, BotError> {
    db::withdrawal::get_withdrawal(&app.pool, wd_id)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("Withdrawal {}", wd_id)))
}

/// Mark a pending withdrawal paid. The balance was debited at submission.
pub async fn approve_withdrawal(app: &AppContext, admin_id: i64, wd_id: &str) -> Result<String, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;
    let wd = load_withdrawal(app, wd_id).await?;

    if !db::withdrawal::mark_paid(&app.pool, wd_id).await? {
        return Err(BotError::AlreadyResolved(format!("Withdrawal {}", wd_id)));
    }
    info!("Admin {} paid withdrawal {} ({:.2} net)", admin_id, wd_id, wd.net_amount);

    app.notify_user(
        wd.user_id,
        &OutboundMessage::text(format!(
            "✅ **Withdrawal Sent!**\n\nWithdrawal ID: `{}`\n{} has been sent via {}.",
            wd.wd_id,
            format_currency(wd.net_amount),
            wd.method.label()
        )),
    )
    .await;

    Ok(format!("✅ Paid by <@{}>.", admin_id))
}

/// Deny a pending withdrawal and refund the full amount
pub async fn deny_withdrawal(app: &AppContext, admin_id: i64, wd_id: &str) -> Result<String, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;
    let wd = load_withdrawal(app, wd_id).await?;

    let mut dbtx = app.pool.begin().await?;
    if !db::withdrawal::mark_denied(&mut *dbtx, wd_id, DENIED_BY_ADMIN).await? {
        dbtx.rollback().await?;
        return Err(BotError::AlreadyResolved(format!("Withdrawal {}", wd_id)));
    }
    db::user::credit_balance(&mut *dbtx, wd.user_id, wd.amount).await?;
    dbtx.commit().await?;

    info!("Admin {} denied withdrawal {}: refunded {:.2} to user {}", admin_id, wd_id, wd.amount, wd.user_id);

    app.notify_user(
        wd.user_id,
        &OutboundMessage::text(format!(
            "❌ **Withdrawal Denied**\n\nWithdrawal ID: `{}`\nReason: {}\n{} has been returned to your balance.",
            wd.wd_id,
            DENIED_BY_ADMIN,
            format_currency(wd.amount)
        )),
    )
    .await;

    Ok(format!("❌ Denied by <@{}>. Refunded {}.", admin_id, format_currency(wd.amount)))
}

/// Pay out a pending referral reward to the referrer's balance
pub async fn mark_reward_paid(app: &AppContext, admin_id: i64, reward_id: i64) -> Result<String, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;

    let mut dbtx = app.pool.begin().await?;
    let Some(reward) = db::reward::get_reward(&mut *dbtx, reward_id).await? else {
        dbtx.rollback().await?;
        return Err(BotError::NotFound(format!("Reward #{}", reward_id)));
    };
    if !db::reward::mark_paid(&mut *dbtx, reward_id).await? {
        dbtx.rollback().await?;
        return Err(BotError::AlreadyResolved(format!("Reward #{}", reward_id)));
    }
    db::user::credit_balance(&mut *dbtx, reward.referrer_id, reward.amount).await?;
    dbtx.commit().await?;

    info!("Admin {} paid reward #{}: {:.2} to user {}", admin_id, reward_id, reward.amount, reward.referrer_id);

    app.notify_user(
        reward.referrer_id,
        &OutboundMessage::text(format!(
            "🎁 **Referral Bonus!**\n\n{} has been added to your balance. Thanks for spreading the word!",
            format_currency(reward.amount)
        )),
    )
    .await;

    Ok(format!("💸 Reward paid by <@{}>.", admin_id))
}
