//! Conversation flows for selling, buying and withdrawing
//!
//! Each user has at most one [`ConversationState`]. A flow moves linearly through
//! select item, enter amount, collect proof or details, and confirm. Cancel or an idle
//! timeout discards the state without touching the ledger. Bad input re-prompts in place.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::action::{Action, MenuItem};
use crate::context::AppContext;
use crate::db;
use crate::models::{Button, ButtonStyle, Listing, OutboundMessage, TransactionKind, WithdrawalMethod};
use crate::services::{rate_service, submission_service};
use crate::utils::format::rate_table;
use crate::utils::{format_currency, round_cents, BotError, Page};

const LISTINGS_PER_ROW: usize = 4;
const MIN_PAYMENT_REF_LEN: usize = 20;
const MIN_PAYOUT_DETAILS_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Sell,
    Buy,
    Withdraw,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Sell => "sell",
            FlowKind::Buy => "buy",
            FlowKind::Withdraw => "withdraw",
        }
    }

    /// Trade direction, `None` for withdrawals
    pub fn trade_kind(&self) -> Option<TransactionKind> {
        match self {
            FlowKind::Sell => Some(TransactionKind::Sell),
            FlowKind::Buy => Some(TransactionKind::Buy),
            FlowKind::Withdraw => None,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            FlowKind::Sell => "🛒 **Sell Your Gift Card**",
            FlowKind::Buy => "💳 **Buy a Gift Card**",
            FlowKind::Withdraw => "💸 **Withdraw Funds**",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sell" => Ok(FlowKind::Sell),
            "buy" => Ok(FlowKind::Buy),
            "withdraw" => Ok(FlowKind::Withdraw),
            _ => Err(format!("unknown flow: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SelectItem { page: usize },
    EnterAmount,
    CollectDetails,
    Confirm,
}

/// What the user handed over at the proof/details step
#[derive(Debug, Clone, PartialEq)]
pub enum Proof {
    Photo(String),
    Text(String),
}

impl Proof {
    pub fn as_text(&self) -> &str {
        match self {
            Proof::Photo(url) | Proof::Text(url) => url,
        }
    }
}

/// Data gathered so far in a flow
#[derive(Debug, Clone, Default)]
pub struct FlowData {
    pub listing: Option<Listing>,
    pub rate: Option<f64>,
    pub method: Option<WithdrawalMethod>,
    pub amount: Option<f64>,
    pub settlement: Option<f64>,
    pub fee: Option<f64>,
    pub proof: Option<Proof>,
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    pub kind: FlowKind,
    pub step: Step,
    pub data: FlowData,
    pub updated_at: Instant,
}

impl ConversationState {
    pub fn new(kind: FlowKind) -> Self {
        ConversationState {
            kind,
            step: Step::SelectItem { page: 0 },
            data: FlowData::default(),
            updated_at: Instant::now(),
        }
    }
}

/// One inbound event addressed to the active flow
#[derive(Debug, Clone, PartialEq)]
pub enum FlowInput {
    Page { flow: FlowKind, page: usize },
    Pick { flow: FlowKind, listing_id: i64 },
    Method(WithdrawalMethod),
    Text(String),
    Photo(String),
    Confirm,
    Cancel,
}

impl FlowInput {
    /// Map a button payload onto flow input, if it is one
    pub fn from_action(action: &Action) -> Option<FlowInput> {
        Some(match action {
            Action::Page { flow, page } => FlowInput::Page { flow: *flow, page: *page },
            Action::Pick { flow, listing_id } => FlowInput::Pick { flow: *flow, listing_id: *listing_id },
            Action::Method(method) => FlowInput::Method(*method),
            Action::Confirm => FlowInput::Confirm,
            Action::Cancel => FlowInput::Cancel,
            _ => return None,
        })
    }
}

/// One user's conversation. Its lock serializes inputs for that user.
type Slot = Arc<Mutex<ConversationState>>;

/// In-memory store of active conversations keyed by user id
///
/// Starting or cancelling a flow swaps the map entry without waiting on the slot, so a step
/// still running against the old slot can never write over the new one.
pub struct Conversations {
    timeout: Duration,
    states: Mutex<HashMap<i64, Slot>>,
}

impl Conversations {
    pub fn new(timeout: Duration) -> Self {
        Conversations {
            timeout,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Replace whatever the user had with a fresh state
    pub async fn start(&self, user_id: i64, kind: FlowKind) {
        self.states
            .lock()
            .await
            .insert(user_id, Arc::new(Mutex::new(ConversationState::new(kind))));
    }

    /// Drop the user's state. Returns whether there was one.
    pub async fn remove(&self, user_id: i64) -> bool {
        self.states.lock().await.remove(&user_id).is_some()
    }

    /// Snapshot of the user's state, waiting for any step in progress
    pub async fn get(&self, user_id: i64) -> Option<ConversationState> {
        let slot = self.slot(user_id).await?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// A state that is mid-step counts as active
    pub async fn is_active(&self, user_id: i64) -> bool {
        let now = Instant::now();
        match self.states.lock().await.get(&user_id) {
            None => false,
            Some(slot) => slot.try_lock().map_or(true, |s| !self.is_expired(&s, now)),
        }
    }

    /// Drop every expired state. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut states = self.states.lock().await;
        let before = states.len();
        states.retain(|_, slot| slot.try_lock().map_or(true, |s| !self.is_expired(&s, now)));
        before - states.len()
    }

    fn is_expired(&self, state: &ConversationState, now: Instant) -> bool {
        now.duration_since(state.updated_at) > self.timeout
    }

    async fn slot(&self, user_id: i64) -> Option<Slot> {
        self.states.lock().await.get(&user_id).cloned()
    }

    /// Whether `slot` is still the user's conversation
    async fn is_current(&self, user_id: i64, slot: &Slot) -> bool {
        self.states
            .lock()
            .await
            .get(&user_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Remove `slot` unless a newer flow has already replaced it
    async fn discard(&self, user_id: i64, slot: &Slot) {
        let mut states = self.states.lock().await;
        if states.get(&user_id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            states.remove(&user_id);
        }
    }
}

/// Start a flow, discarding any unfinished one
pub async fn start_flow(app: &AppContext, user_id: i64, kind: FlowKind) -> Result<OutboundMessage, BotError> {
    if kind == FlowKind::Withdraw {
        let balance = db::user::get_balance(&app.pool, user_id).await?.unwrap_or(0.0);
        let lowest = app.config.lowest_withdrawal_min();
        if balance < lowest {
            app.conversations.remove(user_id).await;
            return Ok(OutboundMessage::text(format!(
                "❌ **Insufficient balance**\n\nYour balance is {}. The minimum withdrawal is {}.",
                format_currency(balance),
                format_currency(lowest)
            ))
            .row(vec![home_button()]));
        }
        app.conversations.start(user_id, kind).await;
        info!("User {} started a {} flow", user_id, kind);
        return Ok(render_methods(app, balance));
    }

    app.conversations.start(user_id, kind).await;
    info!("User {} started a {} flow", user_id, kind);
    render_select(app, kind, 0).await
}

/// Feed one input to the user's active flow and return the reply
pub async fn handle_input(app: &AppContext, user_id: i64, input: FlowInput) -> Result<OutboundMessage, BotError> {
    if input == FlowInput::Cancel {
        // cancel does not wait for a step in progress
        if !app.conversations.remove(user_id).await {
            return Ok(no_active_flow(&input));
        }
        info!("User {} cancelled their flow", user_id);
        return Ok(cancelled());
    }

    loop {
        let Some(slot) = app.conversations.slot(user_id).await else {
            return Ok(no_active_flow(&input));
        };
        let mut state = slot.lock().await;
        if !app.conversations.is_current(user_id, &slot).await {
            // replaced or finished while we waited; look again
            continue;
        }

        if app.conversations.is_expired(&state, Instant::now()) {
            let kind = state.kind;
            drop(state);
            app.conversations.discard(user_id, &slot).await;
            info!("Flow {} for user {} expired", kind, user_id);
            let mut reply = start_flow(app, user_id, kind).await?;
            reply.text = format!("⌛ Your previous session expired. Starting over.\n\n{}", reply.text);
            return Ok(reply);
        }

        if state.step == Step::Confirm && input == FlowInput::Confirm {
            // An error means nothing was written, so the flow stays at Confirm
            let reply = submission_service::submit(app, user_id, &state).await?;
            app.conversations.discard(user_id, &slot).await;
            return Ok(reply);
        }

        let result = advance(app, user_id, &mut state, input).await;
        state.updated_at = Instant::now();
        return result;
    }
}

/// Apply a non-terminal input. Invalid input leaves the step unchanged and re-prompts.
async fn advance(
    app: &AppContext,
    user_id: i64,
    state: &mut ConversationState,
    input: FlowInput,
) -> Result<OutboundMessage, BotError> {
    debug!("User {} {:?} at {:?}: {:?}", user_id, state.kind, state.step, input);

    match (state.step, input) {
        (Step::SelectItem { .. }, FlowInput::Page { flow, page }) if flow == state.kind => {
            if flow == FlowKind::Withdraw {
                let balance = db::user::get_balance(&app.pool, user_id).await?.unwrap_or(0.0);
                return Ok(render_methods(app, balance));
            }
            let reply = render_select(app, flow, page).await?;
            state.step = Step::SelectItem { page };
            Ok(reply)
        }

        (Step::SelectItem { page }, FlowInput::Pick { flow, listing_id }) if flow == state.kind => {
            let Some(kind) = flow.trade_kind() else {
                return Ok(reprompt(app, user_id, state, "Please choose a payout method.").await?);
            };
            let Some(listing) = db::listing::get_listing(&app.pool, listing_id).await? else {
                let mut reply = render_select(app, flow, page).await?;
                reply.text = format!("⚠️ That gift card is no longer available.\n\n{}", reply.text);
                return Ok(reply);
            };

            let rate = rate_service::rate(&app.pool, &listing.name, kind).await?;
            state.data.rate = Some(rate);
            state.data.listing = Some(listing);
            state.step = Step::EnterAmount;
            Ok(render_step(app, state))
        }

        (Step::SelectItem { .. }, FlowInput::Method(method)) if state.kind == FlowKind::Withdraw => {
            let balance = db::user::get_balance(&app.pool, user_id).await?.unwrap_or(0.0);
            let rule = app.config.withdrawal_rule(method);
            if balance < rule.min {
                let mut reply = render_methods(app, balance);
                reply.text = format!(
                    "⚠️ {} needs at least {}.\n\n{}",
                    method.label(),
                    format_currency(rule.min),
                    reply.text
                );
                return Ok(reply);
            }
            state.data.method = Some(method);
            state.step = Step::EnterAmount;
            Ok(render_step(app, state))
        }

        (Step::EnterAmount, FlowInput::Text(text)) => {
            let amount = match parse_amount(&text) {
                Some(amount) => amount,
                None => return reprompt(app, user_id, state, "❌ Invalid amount. Please enter numbers only (e.g., 100).").await,
            };

            match state.kind.trade_kind() {
                Some(kind) => {
                    let (min, max) = (app.config.min_amount, app.config.max_amount);
                    if amount < min || amount > max {
                        let msg = format!(
                            "⚠️ Amount must be between {} and {}.",
                            format_currency(min),
                            format_currency(max)
                        );
                        return reprompt(app, user_id, state, &msg).await;
                    }
                    let rate = state.data.rate.unwrap_or_default();
                    state.data.amount = Some(amount);
                    state.data.settlement = Some(rate_service::settle(kind, amount, rate));
                }
                None => {
                    let method = state.data.method.unwrap_or(WithdrawalMethod::Crypto);
                    let rule = app.config.withdrawal_rule(method);
                    let balance = db::user::get_balance(&app.pool, user_id).await?.unwrap_or(0.0);
                    if amount < rule.min {
                        let msg = format!("⚠️ Minimum withdrawal is {}.", format_currency(rule.min));
                        return reprompt(app, user_id, state, &msg).await;
                    }
                    if amount > balance {
                        let msg = format!("⚠️ Insufficient balance. You have {}.", format_currency(balance));
                        return reprompt(app, user_id, state, &msg).await;
                    }
                    let fee = round_cents(amount * rule.fee_pct / 100.0);
                    state.data.amount = Some(amount);
                    state.data.fee = Some(fee);
                    state.data.settlement = Some(round_cents(amount - fee));
                }
            }

            state.step = Step::CollectDetails;
            Ok(render_step(app, state))
        }

        (Step::CollectDetails, FlowInput::Photo(url)) if state.kind == FlowKind::Sell => {
            state.data.proof = Some(Proof::Photo(url));
            state.step = Step::Confirm;
            Ok(render_step(app, state))
        }

        (Step::CollectDetails, FlowInput::Text(text)) => {
            let text = text.trim().to_string();
            let min_len = match state.kind {
                FlowKind::Sell => 1,
                FlowKind::Buy => MIN_PAYMENT_REF_LEN,
                FlowKind::Withdraw => MIN_PAYOUT_DETAILS_LEN,
            };
            if text.chars().count() < min_len {
                let msg = match state.kind {
                    FlowKind::Sell => "❌ Please send a photo of the card or type the code.".to_string(),
                    FlowKind::Buy => format!(
                        "❌ That doesn't look like a transaction hash. It must be at least {} characters.",
                        MIN_PAYMENT_REF_LEN
                    ),
                    FlowKind::Withdraw => format!(
                        "❌ Payout details are too short. Please send at least {} characters.",
                        MIN_PAYOUT_DETAILS_LEN
                    ),
                };
                return reprompt(app, user_id, state, &msg).await;
            }
            state.data.proof = Some(Proof::Text(text));
            state.step = Step::Confirm;
            Ok(render_step(app, state))
        }

        (_, FlowInput::Page { .. } | FlowInput::Pick { .. } | FlowInput::Method(_)) => {
            reprompt(app, user_id, state, "⚠️ That button is from an earlier step.").await
        }

        (Step::SelectItem { .. }, _) => reprompt(app, user_id, state, "👆 Please choose using the buttons.").await,
        (Step::Confirm, _) => reprompt(app, user_id, state, "👆 Please confirm or cancel using the buttons.").await,
        (_, FlowInput::Photo(_)) => reprompt(app, user_id, state, "❌ A photo isn't expected here.").await,
        (_, _) => reprompt(app, user_id, state, "❌ Unexpected input.").await,
    }
}

/// Repeat the prompt for the current step with a warning on top
async fn reprompt(
    app: &AppContext,
    user_id: i64,
    state: &ConversationState,
    warning: &str,
) -> Result<OutboundMessage, BotError> {
    let mut reply = match state.step {
        Step::SelectItem { page } if state.kind != FlowKind::Withdraw => render_select(app, state.kind, page).await?,
        Step::SelectItem { .. } => {
            let balance = db::user::get_balance(&app.pool, user_id).await?.unwrap_or(0.0);
            render_methods(app, balance)
        }
        _ => render_step(app, state),
    };
    reply.text = format!("{}\n\n{}", warning, reply.text);
    Ok(reply)
}

/// The catalog page for a sell or buy flow
pub async fn render_select(app: &AppContext, kind: FlowKind, page: usize) -> Result<OutboundMessage, BotError> {
    let total = db::listing::count_listings(&app.pool).await? as usize;
    let window = Page::new(page, total, app.config.cards_per_page);
    let listings = db::listing::list_page(&app.pool, window.offset() as i64, window.per_page as i64).await?;

    let verb = if kind == FlowKind::Sell { "sell" } else { "buy" };
    let mut message = OutboundMessage::text(format!(
        "{}\n\nStep 1/4: Choose the gift card you want to {}.\n{}",
        kind.title(),
        verb,
        window.indicator()
    ));

    for chunk in listings.chunks(LISTINGS_PER_ROW) {
        let row = chunk
            .iter()
            .map(|l| Button::new(l.name.clone(), Action::Pick { flow: kind, listing_id: l.id }))
            .collect();
        message = message.row(row);
    }

    let mut nav = Vec::new();
    if let Some(prev) = window.previous() {
        nav.push(Button::new("◀️ Prev", Action::Page { flow: kind, page: prev }));
    }
    if let Some(next) = window.next() {
        nav.push(Button::new("Next ▶️", Action::Page { flow: kind, page: next }));
    }
    nav.push(cancel_button());
    Ok(message.row(nav))
}

/// Withdrawal method choice, offering only methods the balance covers
fn render_methods(app: &AppContext, balance: f64) -> OutboundMessage {
    let mut text = format!(
        "{}\n\nStep 1/4: Choose a payout method.\nAvailable balance: **{}**\n",
        FlowKind::Withdraw.title(),
        format_currency(balance)
    );

    let mut row = Vec::new();
    for method in WithdrawalMethod::ALL {
        let rule = app.config.withdrawal_rule(method);
        text.push_str(&format!(
            "\n{} (min {}, fee {}%)",
            method.label(),
            format_currency(rule.min),
            rule.fee_pct
        ));
        if balance >= rule.min {
            row.push(Button::new(method.label(), Action::Method(method)).style(ButtonStyle::Primary));
        }
    }
    row.push(cancel_button());

    OutboundMessage::text(text).row(row)
}

/// Prompt for the step the state is in (amount, details or confirm)
fn render_step(app: &AppContext, state: &ConversationState) -> OutboundMessage {
    let data = &state.data;
    let listing_name = data.listing.as_ref().map(|l| l.name.as_str()).unwrap_or("");
    let rate = data.rate.unwrap_or_default();
    let amount = data.amount.unwrap_or_default();
    let settlement = data.settlement.unwrap_or_default();

    match (state.kind, state.step) {
        (_, Step::SelectItem { .. }) => OutboundMessage::text(state.kind.title()).row(vec![cancel_button()]),

        (FlowKind::Withdraw, Step::EnterAmount) => {
            let method = data.method.unwrap_or(WithdrawalMethod::Crypto);
            let rule = app.config.withdrawal_rule(method);
            OutboundMessage::text(format!(
                "{}\n\nStep 2/4: Enter amount\n\nMethod: {}\nMinimum: {}\nFee: {}%\n\n💬 Type the amount you want to withdraw:",
                FlowKind::Withdraw.title(),
                method.label(),
                format_currency(rule.min),
                rule.fee_pct
            ))
            .row(vec![cancel_button()])
        }

        (kind, Step::EnterAmount) => {
            let sell = kind == FlowKind::Sell;
            OutboundMessage::text(format!(
                "{}\n\nStep 2/4: Enter amount\n\nCard: **{}**\n\n{}\n\n💬 Type the card value ({} - {}):",
                kind.title(),
                listing_name,
                rate_table(rate, sell),
                format_currency(app.config.min_amount),
                format_currency(app.config.max_amount)
            ))
            .image(data.listing.as_ref().and_then(|l| l.image_url.clone()))
            .row(vec![cancel_button()])
        }

        (FlowKind::Sell, Step::CollectDetails) => OutboundMessage::text(format!(
            "{}\n\nStep 3/4: Upload card\n\nCard: {}\nFace Value: {}\nYou'll Receive: **{}**\nRate: -{:.1}%\n\n\
             📸 Send a clear photo of the card (front & back), or type/paste the card code.",
            FlowKind::Sell.title(),
            listing_name,
            format_currency(amount),
            format_currency(settlement),
            rate
        ))
        .row(vec![cancel_button()]),

        (FlowKind::Buy, Step::CollectDetails) => OutboundMessage::text(format!(
            "{}\n\nStep 3/4: Payment\n\nCard: {}\nFace Value: {}\nYou Pay: **{}**\nRate: +{:.1}%\n\n\
             Send exactly **{}** (USDT TRC20) to:\n`{}`\n\n💬 Then reply with the transaction hash.",
            FlowKind::Buy.title(),
            listing_name,
            format_currency(amount),
            format_currency(settlement),
            rate,
            format_currency(settlement),
            app.config.payment_address
        ))
        .row(vec![cancel_button()]),

        (FlowKind::Withdraw, Step::CollectDetails) => {
            let method = data.method.unwrap_or(WithdrawalMethod::Crypto);
            let ask = match method {
                WithdrawalMethod::Crypto => "🔗 Send your USDT (TRC20) wallet address.",
                WithdrawalMethod::Bank => "🏦 Send your bank details: account holder, bank name, account and routing number.",
            };
            OutboundMessage::text(format!(
                "{}\n\nStep 3/4: Payout details\n\nAmount: {}\nFee: {}\nYou Receive: **{}**\n\n{}",
                FlowKind::Withdraw.title(),
                format_currency(amount),
                format_currency(data.fee.unwrap_or_default()),
                format_currency(settlement),
                ask
            ))
            .row(vec![cancel_button()])
        }

        (kind, Step::Confirm) => {
            let summary = match kind {
                FlowKind::Sell => format!(
                    "Card: {}\nFace Value: {}\nYou'll Receive: **{}**\nRate: -{:.1}%\n\n{}",
                    listing_name,
                    format_currency(amount),
                    format_currency(settlement),
                    rate,
                    match &data.proof {
                        Some(Proof::Photo(_)) => "📸 Photo uploaded ✓",
                        _ => "💬 Code received ✓",
                    }
                ),
                FlowKind::Buy => format!(
                    "Card: {}\nFace Value: {}\nYou Pay: **{}**\nRate: +{:.1}%\n\nPayment reference: `{}`",
                    listing_name,
                    format_currency(amount),
                    format_currency(settlement),
                    rate,
                    data.proof.as_ref().map(Proof::as_text).unwrap_or("")
                ),
                FlowKind::Withdraw => format!(
                    "Method: {}\nAmount: {}\nFee: {}\nYou Receive: **{}**\n\nDetails: {}",
                    data.method.map(|m| m.label()).unwrap_or(""),
                    format_currency(amount),
                    format_currency(data.fee.unwrap_or_default()),
                    format_currency(settlement),
                    truncate_details(data.proof.as_ref().map(Proof::as_text).unwrap_or(""))
                ),
            };
            OutboundMessage::text(format!(
                "✅ **Confirm**\n\nStep 4/4: Review & Submit\n\n{}\n\nReady to submit?",
                summary
            ))
            .row(vec![
                Button::new("✅ Confirm", Action::Confirm).style(ButtonStyle::Success),
                cancel_button(),
            ])
        }
    }
}

fn truncate_details(details: &str) -> String {
    if details.chars().count() > 100 {
        format!("{}...", details.chars().take(100).collect::<String>())
    } else {
        details.to_string()
    }
}

/// Accepts "100", "$100", "1,000.50"
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let amount: f64 = cleaned.parse().ok()?;
    (amount.is_finite() && amount > 0.0).then(|| round_cents(amount))
}

fn cancelled() -> OutboundMessage {
    OutboundMessage::text("❌ Cancelled. Nothing was submitted.").row(vec![home_button()])
}

fn no_active_flow(input: &FlowInput) -> OutboundMessage {
    let text = match input {
        FlowInput::Cancel => "Nothing to cancel.",
        FlowInput::Text(_) | FlowInput::Photo(_) => {
            "💡 No active request. Use `$sell`, `$buy` or `$withdraw`, or open the menu."
        }
        _ => "⌛ This menu is no longer active. Please start again.",
    };
    OutboundMessage::text(text).row(vec![home_button()])
}

pub fn cancel_button() -> Button {
    Button::new("❌ Cancel", Action::Cancel).style(ButtonStyle::Danger)
}

pub fn home_button() -> Button {
    Button::new("🏠 Menu", Action::Menu(MenuItem::Home))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{seed_user, test_config, test_context, test_context_with};

    fn picks(message: &OutboundMessage, kind: FlowKind) -> usize {
        let prefix = format!("flow:{}:pick:", kind);
        message.payloads().iter().filter(|p| p.starts_with(&prefix)).count()
    }

    #[tokio::test]
    async fn test_pagination_of_25_listings() {
        let (app, _) = test_context().await;

        let first = render_select(&app, FlowKind::Sell, 0).await.unwrap();
        assert_eq!(picks(&first, FlowKind::Sell), 8);
        assert!(first.payloads().contains(&"flow:sell:page:1"));
        assert!(!first.buttons.iter().flatten().any(|b| b.label.contains("Prev")));

        let last = render_select(&app, FlowKind::Sell, 3).await.unwrap();
        assert_eq!(picks(&last, FlowKind::Sell), 1);
        assert!(!last.payloads().contains(&"flow:sell:page:4"));
        assert!(last.payloads().contains(&"flow:sell:page:2"));
        assert!(last.text.contains("4/4"));
    }

    #[tokio::test]
    async fn test_page_navigation_keeps_select_step() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        start_flow(&app, 1, FlowKind::Buy).await.unwrap();

        let reply = handle_input(&app, 1, FlowInput::Page { flow: FlowKind::Buy, page: 2 })
            .await
            .unwrap();
        assert_eq!(picks(&reply, FlowKind::Buy), 8);
        let state = app.conversations.get(1).await.unwrap();
        assert_eq!(state.step, Step::SelectItem { page: 2 });
    }

    #[tokio::test]
    async fn test_sell_flow_to_confirm_with_reprompts() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        start_flow(&app, 1, FlowKind::Sell).await.unwrap();

        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 1 })
            .await
            .unwrap();
        let state = app.conversations.get(1).await.unwrap();
        assert_eq!(state.step, Step::EnterAmount);
        let rate = state.data.rate.unwrap();
        assert!((5.0..=25.0).contains(&rate));

        for bad in ["abc", "5", "10001", "-20"] {
            let reply = handle_input(&app, 1, FlowInput::Text(bad.into())).await.unwrap();
            assert!(reply.text.contains("⚠️") || reply.text.contains("❌"), "{}", bad);
            assert_eq!(app.conversations.get(1).await.unwrap().step, Step::EnterAmount);
        }

        handle_input(&app, 1, FlowInput::Text("$100".into())).await.unwrap();
        let state = app.conversations.get(1).await.unwrap();
        assert_eq!(state.step, Step::CollectDetails);
        assert_eq!(state.data.settlement, Some(rate_service::sell_settle(100.0, rate)));

        let reply = handle_input(&app, 1, FlowInput::Photo("https://cdn.example/card.png".into()))
            .await
            .unwrap();
        assert!(reply.payloads().contains(&"flow:confirm"));
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::Confirm);
    }

    #[tokio::test]
    async fn test_buy_reference_minimum_length() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        start_flow(&app, 1, FlowKind::Buy).await.unwrap();
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Buy, listing_id: 2 }).await.unwrap();
        let reply = handle_input(&app, 1, FlowInput::Text("50".into())).await.unwrap();
        assert!(reply.text.contains(&app.config.payment_address));

        handle_input(&app, 1, FlowInput::Text("short-hash".into())).await.unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::CollectDetails);

        // photos are only proof for sells
        handle_input(&app, 1, FlowInput::Photo("https://cdn.example/x.png".into())).await.unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::CollectDetails);

        handle_input(&app, 1, FlowInput::Text("0x9f8e7d6c5b4a39281706f5e4d3c2b1a0".into()))
            .await
            .unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::Confirm);
    }

    #[tokio::test]
    async fn test_cancel_discards_without_writes() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        start_flow(&app, 1, FlowKind::Sell).await.unwrap();
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 1 }).await.unwrap();

        let reply = handle_input(&app, 1, FlowInput::Cancel).await.unwrap();
        assert!(reply.text.contains("Cancelled"));
        assert!(app.conversations.get(1).await.is_none());
        let history = db::transaction::recent_for_user(&app.pool, 1, 10).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_idle_flow_starts_fresh() {
        let mut config = test_config();
        config.state_timeout = Duration::from_millis(150);
        let (app, _) = test_context_with(config).await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;

        start_flow(&app, 1, FlowKind::Sell).await.unwrap();
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 1 }).await.unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::EnterAmount);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!app.conversations.is_active(1).await);

        // an amount that would have been valid in the stale flow
        let reply = handle_input(&app, 1, FlowInput::Text("100".into())).await.unwrap();
        assert!(reply.text.contains("expired"));
        let state = app.conversations.get(1).await.unwrap();
        assert_eq!(state.kind, FlowKind::Sell);
        assert_eq!(state.step, Step::SelectItem { page: 0 });
        assert!(state.data.listing.is_none());
    }

    #[tokio::test]
    async fn test_cancel_after_expiry() {
        let mut config = test_config();
        config.state_timeout = Duration::from_millis(150);
        let (app, _) = test_context_with(config).await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;

        start_flow(&app, 1, FlowKind::Sell).await.unwrap();
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 1 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        // cancel on a stale flow clears it instead of restarting it
        let reply = handle_input(&app, 1, FlowInput::Cancel).await.unwrap();
        assert!(reply.text.contains("Cancelled"));
        assert!(app.conversations.get(1).await.is_none());

        let reply = handle_input(&app, 1, FlowInput::Cancel).await.unwrap();
        assert!(reply.text.contains("Nothing to cancel"));
        assert!(db::transaction::recent_for_user(&app.pool, 1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_flow_wins_over_pending_step() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        start_flow(&app, 1, FlowKind::Sell).await.unwrap();
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 1 }).await.unwrap();

        // hold the sell conversation as if a step were still running
        let slot = app.conversations.slot(1).await.unwrap();
        let held = slot.lock().await;
        let pending = tokio::spawn({
            let app = app.clone();
            async move { handle_input(&app, 1, FlowInput::Text("100".into())).await }
        });
        // map, this test and the waiting input each hold the slot
        while Arc::strong_count(&slot) < 3 {
            tokio::task::yield_now().await;
        }

        start_flow(&app, 1, FlowKind::Buy).await.unwrap();
        drop(held);

        // the late input is applied to the buy flow, which does not take text yet
        let reply = pending.await.unwrap().unwrap();
        assert!(reply.text.contains("Please choose using the buttons"));
        let state = app.conversations.get(1).await.unwrap();
        assert_eq!(state.kind, FlowKind::Buy);
        assert_eq!(state.step, Step::SelectItem { page: 0 });
        assert!(state.data.amount.is_none());
    }

    #[tokio::test]
    async fn test_cancel_does_not_wait_for_pending_step() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        start_flow(&app, 1, FlowKind::Sell).await.unwrap();
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 1 }).await.unwrap();

        let slot = app.conversations.slot(1).await.unwrap();
        let mut held = slot.lock().await;
        let reply = handle_input(&app, 1, FlowInput::Cancel).await.unwrap();
        assert!(reply.text.contains("Cancelled"));

        // a step finishing after the cancel lands in the discarded state
        held.step = Step::Confirm;
        drop(held);
        assert!(app.conversations.get(1).await.is_none());
        assert!(!app.conversations.is_active(1).await);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired() {
        let conversations = Conversations::new(Duration::from_millis(20));
        conversations.start(1, FlowKind::Sell).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        conversations.start(2, FlowKind::Buy).await;
        assert_eq!(conversations.sweep().await, 1);
        assert!(conversations.get(1).await.is_none());
        assert!(conversations.get(2).await.is_some());
    }

    #[tokio::test]
    async fn test_new_flow_overwrites_old() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 0.0).await;
        start_flow(&app, 1, FlowKind::Sell).await.unwrap();
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 1 }).await.unwrap();
        start_flow(&app, 1, FlowKind::Buy).await.unwrap();
        let state = app.conversations.get(1).await.unwrap();
        assert_eq!(state.kind, FlowKind::Buy);
        assert_eq!(state.step, Step::SelectItem { page: 0 });

        // a stale sell button does nothing to the buy flow
        handle_input(&app, 1, FlowInput::Pick { flow: FlowKind::Sell, listing_id: 3 }).await.unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::SelectItem { page: 0 });
    }

    #[tokio::test]
    async fn test_withdraw_needs_minimum_balance() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 20.0).await;
        let reply = start_flow(&app, 1, FlowKind::Withdraw).await.unwrap();
        assert!(reply.text.contains("Insufficient balance"));
        assert!(app.conversations.get(1).await.is_none());

        seed_user(&app, 2, "AAAA0002", None, 50.0).await;
        let reply = start_flow(&app, 2, FlowKind::Withdraw).await.unwrap();
        assert!(reply.payloads().contains(&"flow:withdraw:method:crypto"));
        assert!(!reply.payloads().contains(&"flow:withdraw:method:bank"));
    }

    #[tokio::test]
    async fn test_withdraw_amount_checks() {
        let (app, _) = test_context().await;
        seed_user(&app, 1, "AAAA0001", None, 150.0).await;
        start_flow(&app, 1, FlowKind::Withdraw).await.unwrap();
        handle_input(&app, 1, FlowInput::Method(WithdrawalMethod::Bank)).await.unwrap();

        handle_input(&app, 1, FlowInput::Text("99".into())).await.unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::EnterAmount);
        handle_input(&app, 1, FlowInput::Text("151".into())).await.unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::EnterAmount);

        handle_input(&app, 1, FlowInput::Text("100".into())).await.unwrap();
        let state = app.conversations.get(1).await.unwrap();
        assert_eq!(state.data.fee, Some(7.0));
        assert_eq!(state.data.settlement, Some(93.0));

        handle_input(&app, 1, FlowInput::Text("too short".into())).await.unwrap();
        assert_eq!(app.conversations.get(1).await.unwrap().step, Step::CollectDetails);
    }

    #[tokio::test]
    async fn test_input_without_flow_gets_hint() {
        let (app, _) = test_context().await;
        let reply = handle_input(&app, 5, FlowInput::Text("hello".into())).await.unwrap();
        assert!(reply.text.contains("No active request"));
        assert!(app.conversations.get(5).await.is_none());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100"), Some(100.0));
        assert_eq!(parse_amount(" $1,000.50 "), Some(1000.5));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("NaN"), None);
    }
}
