//! Button presses: every component `custom_id` is an [`Action`] payload

use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::model::application::{ComponentInteraction, Interaction};
use serenity::prelude::Context;
use tracing::{debug, error, info, warn};

use crate::action::Action;
use crate::commands::menu;
use crate::context::AppContext;
use crate::messaging::{to_resolved_message, to_update_message};
use crate::models::OutboundMessage;
use crate::services::flow_service::{self, FlowInput};
use crate::services::{admin_service, permission_service, review_service, user_service};
use crate::utils::BotError;

/// What to do with the message that carried the pressed button
#[derive(Debug)]
pub enum Outcome {
    /// Replace the message with a new screen
    Update(OutboundMessage),
    /// A review item reached a final state; annotate the message and drop its buttons
    Resolved(String),
    /// Tell only the presser, leave the message as is
    Ephemeral(String),
}

pub async fn handle_interaction(app: &AppContext, ctx: &Context, interaction: Interaction) {
    let Interaction::Component(component) = interaction else {
        return;
    };

    let user_id = component.user.id.get() as i64;
    let action = match component.data.custom_id.parse::<Action>() {
        Ok(action) => action,
        Err(e) => {
            debug!("Ignoring button from {}: {}", user_id, e);
            acknowledge(ctx, &component).await;
            return;
        }
    };

    let outcome = dispatch(app, user_id, &component.user.name, action).await;
    respond(ctx, &component, outcome).await;
}

/// Route one parsed action. Errors are turned into an outcome here so every press gets an answer.
pub async fn dispatch(app: &AppContext, user_id: i64, handle: &str, action: Action) -> Outcome {
    if action.is_admin_only() {
        if let Err(e) = permission_service::require_admin(&app.config, user_id) {
            return Outcome::Ephemeral(e.user_message());
        }
        return admin_action(app, user_id, action).await;
    }

    let result = match user_service::ensure_user(app, user_id, handle, None).await {
        Err(e) => Err(e),
        Ok(_) => match (&action, FlowInput::from_action(&action)) {
            (Action::Menu(item), _) => menu::open(app, user_id, *item).await,
            (_, Some(input)) => flow_service::handle_input(app, user_id, input).await,
            _ => {
                debug!("Action {} has no handler", action);
                return Outcome::Ephemeral("⚠️ This button is no longer active.".to_string());
            }
        },
    };

    match result {
        Ok(message) => Outcome::Update(message),
        Err(e) => {
            log_failure(user_id, &action, &e);
            Outcome::Ephemeral(e.user_message())
        }
    }
}

async fn admin_action(app: &AppContext, admin_id: i64, action: Action) -> Outcome {
    let result = match &action {
        Action::Panel(view) => {
            return match admin_service::panel_view(app, admin_id, *view).await {
                Ok(message) => Outcome::Update(message),
                Err(e) => Outcome::Ephemeral(e.user_message()),
            };
        }
        Action::Approve(tx_id) => review_service::approve_sell(app, admin_id, tx_id).await,
        Action::Reject { reason, tx_id } => review_service::reject_transaction(app, admin_id, tx_id, *reason).await,
        Action::Deliver(tx_id) => review_service::deliver_buy(app, admin_id, tx_id).await,
        Action::WithdrawalApprove(wd_id) => review_service::approve_withdrawal(app, admin_id, wd_id).await,
        Action::WithdrawalDeny(wd_id) => review_service::deny_withdrawal(app, admin_id, wd_id).await,
        Action::RewardPaid(reward_id) => review_service::mark_reward_paid(app, admin_id, *reward_id).await,
        _ => return Outcome::Ephemeral("⚠️ This button is no longer active.".to_string()),
    };

    match result {
        Ok(summary) => {
            info!("Admin {} resolved {}", admin_id, action);
            Outcome::Resolved(summary)
        }
        // Nothing left to act on, so the buttons go away too
        Err(e @ (BotError::NotFound(_) | BotError::AlreadyResolved(_))) => {
            info!("Admin {} pressed {} on a settled item: {}", admin_id, action, e);
            Outcome::Resolved(e.user_message())
        }
        Err(e) => {
            log_failure(admin_id, &action, &e);
            Outcome::Ephemeral(e.user_message())
        }
    }
}

fn log_failure(user_id: i64, action: &Action, e: &BotError) {
    match e {
        BotError::Database(_) | BotError::Messaging(_) => {
            error!("❌ Action {} from {} failed: {}", action, user_id, e)
        }
        _ => debug!("Action {} from {} refused: {}", action, user_id, e),
    }
}

async fn respond(ctx: &Context, component: &ComponentInteraction, outcome: Outcome) {
    let response = match outcome {
        Outcome::Update(message) => CreateInteractionResponse::UpdateMessage(to_update_message(&message)),
        Outcome::Resolved(note) => CreateInteractionResponse::UpdateMessage(to_resolved_message(
            component.message.embeds.first(),
            &note,
        )),
        Outcome::Ephemeral(text) => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new().content(text).ephemeral(true),
        ),
    };

    if let Err(e) = component.create_response(ctx, response).await {
        warn!("Failed to answer interaction {}: {}", component.data.custom_id, e);
    }
}

async fn acknowledge(ctx: &Context, component: &ComponentInteraction) {
    if let Err(e) = component.create_response(ctx, CreateInteractionResponse::Acknowledge).await {
        warn!("Failed to acknowledge interaction: {}", e);
    }
}
