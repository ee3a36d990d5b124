//! Button payload codec
//!
//! Every `custom_id` the bot puts on a button is rendered from an [`Action`] and parsed back
//! into one when pressed. Payloads stay well under Discord's 100 character limit.

use std::fmt;
use std::str::FromStr;

use crate::models::{RejectReason, WithdrawalMethod};
use crate::services::flow_service::FlowKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Sell,
    Buy,
    Withdraw,
    Balance,
    History,
    Refer,
    Rates,
    Help,
    Home,
}

impl MenuItem {
    fn as_str(&self) -> &'static str {
        match self {
            MenuItem::Sell => "sell",
            MenuItem::Buy => "buy",
            MenuItem::Withdraw => "withdraw",
            MenuItem::Balance => "balance",
            MenuItem::History => "history",
            MenuItem::Refer => "refer",
            MenuItem::Rates => "rates",
            MenuItem::Help => "help",
            MenuItem::Home => "home",
        }
    }
}

impl FromStr for MenuItem {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sell" => MenuItem::Sell,
            "buy" => MenuItem::Buy,
            "withdraw" => MenuItem::Withdraw,
            "balance" => MenuItem::Balance,
            "history" => MenuItem::History,
            "refer" => MenuItem::Refer,
            "rates" => MenuItem::Rates,
            "help" => MenuItem::Help,
            "home" => MenuItem::Home,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelView {
    Users,
    Transactions,
    Withdrawals,
    Listings,
}

impl PanelView {
    pub const ALL: [PanelView; 4] = [
        PanelView::Users,
        PanelView::Transactions,
        PanelView::Withdrawals,
        PanelView::Listings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PanelView::Users => "users",
            PanelView::Transactions => "transactions",
            PanelView::Withdrawals => "withdrawals",
            PanelView::Listings => "listings",
        }
    }
}

impl FromStr for PanelView {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PanelView::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Menu(MenuItem),
    Page { flow: FlowKind, page: usize },
    Pick { flow: FlowKind, listing_id: i64 },
    Method(WithdrawalMethod),
    Confirm,
    Cancel,
    Approve(String),
    Reject { reason: RejectReason, tx_id: String },
    Deliver(String),
    WithdrawalApprove(String),
    WithdrawalDeny(String),
    RewardPaid(i64),
    Panel(PanelView),
}

impl Action {
    /// Review actions that only admins may trigger
    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Action::Approve(_)
                | Action::Reject { .. }
                | Action::Deliver(_)
                | Action::WithdrawalApprove(_)
                | Action::WithdrawalDeny(_)
                | Action::RewardPaid(_)
                | Action::Panel(_)
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Menu(item) => write!(f, "menu:{}", item.as_str()),
            Action::Page { flow, page } => write!(f, "flow:{}:page:{}", flow, page),
            Action::Pick { flow, listing_id } => write!(f, "flow:{}:pick:{}", flow, listing_id),
            Action::Method(method) => write!(f, "flow:withdraw:method:{}", method),
            Action::Confirm => f.write_str("flow:confirm"),
            Action::Cancel => f.write_str("flow:cancel"),
            Action::Approve(tx_id) => write!(f, "admin:approve:{}", tx_id),
            Action::Reject { reason, tx_id } => write!(f, "admin:reject:{}:{}", reason.token(), tx_id),
            Action::Deliver(tx_id) => write!(f, "admin:deliver:{}", tx_id),
            Action::WithdrawalApprove(wd_id) => write!(f, "admin:wd_approve:{}", wd_id),
            Action::WithdrawalDeny(wd_id) => write!(f, "admin:wd_deny:{}", wd_id),
            Action::RewardPaid(id) => write!(f, "admin:reward_paid:{}", id),
            Action::Panel(view) => write!(f, "admin:panel:{}", view.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown button payload: {}", self.0)
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownAction(s.to_string());
        let parts: Vec<&str> = s.split(':').collect();

        let action = match parts.as_slice() {
            ["menu", item] => Action::Menu(item.parse().map_err(|_| unknown())?),
            ["flow", "confirm"] => Action::Confirm,
            ["flow", "cancel"] => Action::Cancel,
            ["flow", flow, "page", page] => Action::Page {
                flow: flow.parse().map_err(|_| unknown())?,
                page: page.parse().map_err(|_| unknown())?,
            },
            ["flow", flow, "pick", id] => {
                let flow: FlowKind = flow.parse().map_err(|_| unknown())?;
                if flow == FlowKind::Withdraw {
                    return Err(unknown());
                }
                Action::Pick {
                    flow,
                    listing_id: id.parse().map_err(|_| unknown())?,
                }
            }
            ["flow", "withdraw", "method", method] => {
                Action::Method(method.parse().map_err(|_| unknown())?)
            }
            ["admin", "approve", tx_id] if !tx_id.is_empty() => Action::Approve(tx_id.to_string()),
            ["admin", "reject", reason, tx_id] if !tx_id.is_empty() => Action::Reject {
                reason: reason.parse().map_err(|_| unknown())?,
                tx_id: tx_id.to_string(),
            },
            ["admin", "deliver", tx_id] if !tx_id.is_empty() => Action::Deliver(tx_id.to_string()),
            ["admin", "wd_approve", wd_id] if !wd_id.is_empty() => {
                Action::WithdrawalApprove(wd_id.to_string())
            }
            ["admin", "wd_deny", wd_id] if !wd_id.is_empty() => Action::WithdrawalDeny(wd_id.to_string()),
            ["admin", "reward_paid", id] => Action::RewardPaid(id.parse().map_err(|_| unknown())?),
            ["admin", "panel", view] => Action::Panel(view.parse().map_err(|_| unknown())?),
            _ => return Err(unknown()),
        };

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_strings() {
        assert_eq!(Action::Menu(MenuItem::Sell).to_string(), "menu:sell");
        assert_eq!(
            Action::Page { flow: FlowKind::Buy, page: 3 }.to_string(),
            "flow:buy:page:3"
        );
        assert_eq!(
            Action::Reject { reason: RejectReason::InvalidPayment, tx_id: "TX0A1B2C3D".into() }.to_string(),
            "admin:reject:payment:TX0A1B2C3D"
        );
        assert_eq!(Action::Method(WithdrawalMethod::Bank).to_string(), "flow:withdraw:method:bank");
    }

    #[test]
    fn test_parse_admin_payloads() {
        assert_eq!(
            "admin:wd_deny:WD00FF00FF".parse::<Action>().unwrap(),
            Action::WithdrawalDeny("WD00FF00FF".into())
        );
        assert_eq!("admin:reward_paid:42".parse::<Action>().unwrap(), Action::RewardPaid(42));
        assert_eq!(
            "admin:panel:listings".parse::<Action>().unwrap(),
            Action::Panel(PanelView::Listings)
        );
    }

    #[test]
    fn test_parse_flow_payloads() {
        assert_eq!(
            "flow:sell:pick:7".parse::<Action>().unwrap(),
            Action::Pick { flow: FlowKind::Sell, listing_id: 7 }
        );
        assert_eq!("flow:confirm".parse::<Action>().unwrap(), Action::Confirm);
        assert!("flow:withdraw:pick:1".parse::<Action>().is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in ["", "menu", "menu:shop", "flow:sell:page:-1", "admin:approve:", "admin:reject:bogus:TX1", "x:y:z"] {
            assert!(bad.parse::<Action>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_admin_gate() {
        assert!(Action::Approve("TX1".into()).is_admin_only());
        assert!(Action::Panel(PanelView::Users).is_admin_only());
        assert!(!Action::Confirm.is_admin_only());
        assert!(!Action::Menu(MenuItem::Home).is_admin_only());
    }
}
