//! Terminal action of a confirmed flow: write the pending row and ask the admins to review it
//!
//! Every fallible step runs before or inside the ledger write. An `Err` from [`submit`]
//! means nothing was stored and the flow may be confirmed again.

use tracing::{info, warn};

use crate::action::{Action, MenuItem};
use crate::context::AppContext;
use crate::db;
use crate::models::{
    Button, OutboundMessage, Transaction, TransactionKind, TransactionStatus, Withdrawal, WithdrawalMethod,
    WithdrawalStatus,
};
use crate::services::flow_service::{ConversationState, Proof};
use crate::services::review_service;
use crate::utils::errors::is_unique_violation;
use crate::utils::format::{new_transaction_id, new_withdrawal_id};
use crate::utils::{format_currency, round_cents, BotError};

pub async fn submit(app: &AppContext, user_id: i64, state: &ConversationState) -> Result<OutboundMessage, BotError> {
    match state.kind.trade_kind() {
        Some(kind) => submit_trade(app, user_id, kind, state).await,
        None => submit_withdrawal(app, user_id, state).await,
    }
}

const ID_ATTEMPTS: usize = 5;

fn missing(field: &str) -> BotError {
    BotError::InvalidInput(format!("The request is missing its {}. Please start again.", field))
}

async fn submit_trade(
    app: &AppContext,
    user_id: i64,
    kind: TransactionKind,
    state: &ConversationState,
) -> Result<OutboundMessage, BotError> {
    let data = &state.data;
    let listing = data.listing.as_ref().ok_or_else(|| missing("gift card"))?;
    let denomination = data.amount.ok_or_else(|| missing("amount"))?;
    let settlement = data.settlement.ok_or_else(|| missing("amount"))?;
    let rate = data.rate.ok_or_else(|| missing("rate"))?;
    let proof = data.proof.as_ref().ok_or_else(|| missing("proof"))?;

    let user = db::user::get_user(&app.pool, user_id)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("User {}", user_id)))?;

    let mut tx = Transaction {
        tx_id: new_transaction_id(),
        user_id,
        kind,
        listing_name: listing.name.clone(),
        denomination,
        settlement,
        status: TransactionStatus::Pending,
        reason: None,
        created_at: db::now(),
        completed_at: None,
    };
    let mut attempt = 1;
    loop {
        match db::transaction::create_transaction(&app.pool, &tx).await {
            Ok(()) => break,
            Err(e) if is_unique_violation(&e) && attempt < ID_ATTEMPTS => {
                warn!("Transaction id {} collided, retrying", tx.tx_id);
                tx.tx_id = new_transaction_id();
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(
        "Transaction {} created: user {} {} {} {:.2} -> {:.2}",
        tx.tx_id, user_id, kind, tx.listing_name, denomination, settlement
    );

    app.notify_admins(&review_service::transaction_review_request(&tx, &user, rate, proof))
        .await;

    let text = match kind {
        TransactionKind::Sell => format!(
            "✅ **Sale Submitted Successfully!**\n\nTransaction ID: `{}`\nCard: {}\nAmount: {}\n\nStatus: ⏳ Pending Verification\n\n\
             Your card is being verified by our team. You'll be notified once verified and funds will be added to your balance.",
            tx.tx_id,
            tx.listing_name,
            format_currency(settlement)
        ),
        TransactionKind::Buy => format!(
            "✅ **Order Submitted Successfully!**\n\nTransaction ID: `{}`\nCard: {} {}\nPaid: {}\n\nStatus: ⏳ Verifying Payment\n\n\
             Once your payment is confirmed, the card code will be sent to you here.",
            tx.tx_id,
            tx.listing_name,
            format_currency(denomination),
            format_currency(settlement)
        ),
    };

    Ok(OutboundMessage::text(text).row(vec![
        Button::new("🏠 Back to Menu", Action::Menu(MenuItem::Home)),
        Button::new("📜 View Transactions", Action::Menu(MenuItem::History)),
    ]))
}

async fn submit_withdrawal(
    app: &AppContext,
    user_id: i64,
    state: &ConversationState,
) -> Result<OutboundMessage, BotError> {
    let data = &state.data;
    let method = data.method.ok_or_else(|| missing("payout method"))?;
    let amount = data.amount.ok_or_else(|| missing("amount"))?;
    let details = match data.proof.as_ref() {
        Some(Proof::Text(details)) => details.clone(),
        _ => return Err(missing("payout details")),
    };

    let mut user = db::user::get_user(&app.pool, user_id)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("User {}", user_id)))?;

    let (wd, balance) = new_withdrawal(app, user_id, method, amount, details).await?;
    user.balance = balance;
    app.notify_admins(&review_service::withdrawal_review_request(&wd, &user))
        .await;

    Ok(OutboundMessage::text(format!(
        "✅ **Withdrawal Requested!**\n\nWithdrawal ID: `{}`\nMethod: {}\nAmount: {}\nFee: {}\nYou Receive: **{}**\n\n\
         Status: ⏳ Processing\nNew balance: {}",
        wd.wd_id,
        method.label(),
        format_currency(wd.amount),
        format_currency(wd.fee),
        format_currency(wd.net_amount),
        format_currency(user.balance)
    ))
    .row(vec![Button::new("🏠 Back to Menu", Action::Menu(MenuItem::Home))]))
}

/// Validate, debit the balance and write the pending withdrawal in one database transaction.
/// Returns the withdrawal and the balance left after the debit.
pub async fn new_withdrawal(
    app: &AppContext,
    user_id: i64,
    method: WithdrawalMethod,
    amount: f64,
    details: String,
) -> Result<(Withdrawal, f64), BotError> {
    let rule = app.config.withdrawal_rule(method);
    let amount = round_cents(amount);
    if amount < rule.min {
        return Err(BotError::InvalidInput(format!(
            "Minimum {} withdrawal is {}.",
            method,
            format_currency(rule.min)
        )));
    }

    let fee = round_cents(amount * rule.fee_pct / 100.0);
    let mut wd = Withdrawal {
        wd_id: new_withdrawal_id(),
        user_id,
        method,
        amount,
        fee,
        net_amount: round_cents(amount - fee),
        details,
        status: WithdrawalStatus::Pending,
        reason: None,
        created_at: db::now(),
    };

    let mut tx = app.pool.begin().await?;
    let Some(balance) = db::user::debit_balance(&mut *tx, user_id, amount).await? else {
        tx.rollback().await?;
        let available = db::user::get_balance(&app.pool, user_id).await?.unwrap_or(0.0);
        return Err(BotError::InsufficientBalance { requested: amount, available });
    };

    // A failed insert aborts only that statement, so the debit stays in the open transaction
    let mut attempt = 1;
    loop {
        match db::withdrawal::create_withdrawal(&mut *tx, &wd).await {
            Ok(()) => break,
            Err(e) if is_unique_violation(&e) && attempt < ID_ATTEMPTS => {
                warn!("Withdrawal id {} collided, retrying", wd.wd_id);
                wd.wd_id = new_withdrawal_id();
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    tx.commit().await?;

    info!(
        "Withdrawal {} created: user {} {} {:.2} (fee {:.2}, net {:.2}), balance now {:.2}",
        wd.wd_id, user_id, method, amount, fee, wd.net_amount, balance
    );
    Ok((wd, balance))
}
