//! Admin panel views and catalog maintenance

use tracing::info;

use crate::action::{Action, PanelView};
use crate::context::AppContext;
use crate::db;
use crate::models::{Button, Listing, OutboundMessage, RateBounds};
use crate::services::{permission_service, rate_service};
use crate::utils::errors::is_unique_violation;
use crate::utils::format::format_date;
use crate::utils::{format_currency, round_cents, BotError, Table};

const PANEL_ROWS: i64 = 15;

fn panel_buttons() -> Vec<Button> {
    PanelView::ALL
        .iter()
        .map(|view| {
            let label = match view {
                PanelView::Users => "👥 Users",
                PanelView::Transactions => "📜 Transactions",
                PanelView::Withdrawals => "💸 Withdrawals",
                PanelView::Listings => "🎁 Listings",
            };
            Button::new(label, Action::Panel(*view))
        })
        .collect()
}

/// Summary counts plus the view buttons
pub async fn panel(app: &AppContext, admin_id: i64) -> Result<OutboundMessage, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;

    let users = db::user::count_users(&app.pool).await?;
    let pending_tx = db::transaction::count_pending(&app.pool).await?;
    let (pending_wd, owed) = db::withdrawal::pending_totals(&app.pool).await?;
    let listings = db::listing::count_listings(&app.pool).await?;

    Ok(OutboundMessage::text(format!(
        "🛠️ **Admin Panel**\n\nUsers: {}\nListings: {}\nPending transactions: {}\nPending withdrawals: {} ({} owed)\n\nChoose a view:",
        users,
        listings,
        pending_tx,
        pending_wd,
        format_currency(round_cents(owed))
    ))
    .row(panel_buttons()))
}

/// Render one panel view as a table
pub async fn panel_view(app: &AppContext, admin_id: i64, view: PanelView) -> Result<OutboundMessage, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;

    let (title, table) = match view {
        PanelView::Users => {
            let mut table = Table::new(&["ID", "Handle", "Code", "Balance", "Last seen"]);
            for user in db::user::list_users(&app.pool, PANEL_ROWS).await? {
                table.add_row(&[
                    user.user_id.to_string(),
                    user.handle,
                    user.referral_code,
                    format_currency(user.balance),
                    format_date(user.last_activity),
                ]);
            }
            ("👥 Recent Users", table)
        }
        PanelView::Transactions => {
            let mut table = Table::new(&["ID", "User", "Kind", "Card", "Face", "Settle", "Status"]);
            for tx in db::transaction::recent(&app.pool, PANEL_ROWS).await? {
                table.add_row(&[
                    tx.tx_id,
                    tx.user_id.to_string(),
                    tx.kind.to_string(),
                    tx.listing_name,
                    format_currency(tx.denomination),
                    format_currency(tx.settlement),
                    tx.status.label().to_string(),
                ]);
            }
            ("📜 Recent Transactions", table)
        }
        PanelView::Withdrawals => {
            let mut table = Table::new(&["ID", "User", "Method", "Amount", "Send", "Requested"]);
            for wd in db::withdrawal::list_pending(&app.pool, PANEL_ROWS).await? {
                table.add_row(&[
                    wd.wd_id,
                    wd.user_id.to_string(),
                    wd.method.to_string(),
                    format_currency(wd.amount),
                    format_currency(wd.net_amount),
                    format_date(wd.created_at),
                ]);
            }
            ("💸 Pending Withdrawals", table)
        }
        PanelView::Listings => {
            let mut table = Table::new(&["Listing", "Sell %", "Buy %", "In stock"]);
            for bounds in db::listing::list_with_bounds(&app.pool).await? {
                let stock = db::inventory::count_listing_stock(&app.pool, &bounds.listing_name).await?;
                table.add_row(&[
                    bounds.listing_name.clone(),
                    format!("{:.1}-{:.1}", bounds.sell_min, bounds.sell_max),
                    format!("{:.1}-{:.1}", bounds.buy_min, bounds.buy_max),
                    stock.to_string(),
                ]);
            }
            ("🎁 Listings", table)
        }
    };

    let body = if table.is_empty() {
        "_Nothing to show._".to_string()
    } else {
        table.render()
    };
    Ok(OutboundMessage::text(format!("**{}**\n{}", title, body)).row(panel_buttons()))
}

/// Add a listing to the catalog with default rate bounds
pub async fn add_listing(
    app: &AppContext,
    admin_id: i64,
    name: &str,
    image_url: Option<&str>,
) -> Result<Listing, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(BotError::InvalidInput("Listing name cannot be empty".to_string()));
    }
    if let Some(url) = image_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BotError::InvalidInput(format!("`{}` is not an image URL", url)));
        }
    }
    if db::listing::get_listing_by_name(&app.pool, name).await?.is_some() {
        return Err(BotError::InvalidInput(format!("{} is already listed", name)));
    }

    let listing = match db::listing::create_listing(&app.pool, name, image_url).await {
        Ok(listing) => listing,
        Err(e) if is_unique_violation(&e) => {
            return Err(BotError::InvalidInput(format!("{} is already listed", name)));
        }
        Err(e) => return Err(e.into()),
    };

    info!("Admin {} added listing #{} {}", admin_id, listing.id, listing.name);
    Ok(listing)
}

/// Replace a listing's rate bounds
pub async fn set_rates(app: &AppContext, admin_id: i64, bounds: RateBounds) -> Result<RateBounds, BotError> {
    permission_service::require_admin(&app.config, admin_id)?;
    rate_service::set_bounds(&app.pool, bounds).await
}

/// Put a redeemable code into stock, returning the listing's canonical name and new stock level
pub async fn add_stock(
    app: &AppContext,
    admin_id: i64,
    listing_name: &str,
    denomination: f64,
    code: &str,
) -> Result<(String, i64), BotError> {
    permission_service::require_admin(&app.config, admin_id)?;

    let listing = db::listing::get_listing_by_name(&app.pool, listing_name.trim())
        .await?
        .ok_or_else(|| BotError::NotFound(format!("Listing {}", listing_name)))?;

    let (min, max) = (app.config.min_amount, app.config.max_amount);
    if !denomination.is_finite() || denomination < min || denomination > max {
        return Err(BotError::InvalidInput(format!(
            "Denomination must be between {} and {}",
            format_currency(min),
            format_currency(max)
        )));
    }
    let code = code.trim();
    if code.is_empty() {
        return Err(BotError::InvalidInput("Code cannot be empty".to_string()));
    }

    let denomination = round_cents(denomination);
    match db::inventory::add_code(&app.pool, &listing.name, denomination, code).await {
        Ok(id) => info!("Admin {} stocked code #{} for {} {:.2}", admin_id, id, listing.name, denomination),
        Err(e) if is_unique_violation(&e) => {
            return Err(BotError::InvalidInput("That code is already in stock".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    let stock = db::inventory::count_available(&app.pool, &listing.name, denomination).await?;
    Ok((listing.name, stock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{seed_user, test_context, ADMIN_ID};

    #[tokio::test]
    async fn test_panel_requires_admin() {
        let (app, _) = test_context().await;
        assert!(matches!(panel(&app, 1).await, Err(BotError::Unauthorized)));
        assert!(matches!(panel_view(&app, 1, PanelView::Users).await, Err(BotError::Unauthorized)));
        assert!(matches!(add_listing(&app, 1, "Roblox", None).await, Err(BotError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_panel_summary_and_views() {
        let (app, _) = test_context().await;
        seed_user(&app, 42, "AAAA0042", None, 12.5).await;

        let summary = panel(&app, ADMIN_ID).await.unwrap();
        assert!(summary.text.contains("Users: 1"));
        assert!(summary.text.contains("Listings: 25"));
        assert_eq!(summary.payloads().len(), PanelView::ALL.len());

        let users = panel_view(&app, ADMIN_ID, PanelView::Users).await.unwrap();
        assert!(users.text.contains("user42"));
        assert!(users.text.contains("$12.50"));

        let listings = panel_view(&app, ADMIN_ID, PanelView::Listings).await.unwrap();
        assert!(listings.text.contains("Amazon"));
        assert!(listings.text.contains("5.0-25.0"));

        let empty = panel_view(&app, ADMIN_ID, PanelView::Withdrawals).await.unwrap();
        assert!(empty.text.contains("Nothing to show"));
    }

    #[tokio::test]
    async fn test_add_listing() {
        let (app, _) = test_context().await;
        let listing = add_listing(&app, ADMIN_ID, "Roblox", Some("https://cdn.example/roblox.png"))
            .await
            .unwrap();
        assert_eq!(listing.name, "Roblox");
        assert_eq!(db::listing::count_listings(&app.pool).await.unwrap(), 26);

        let bounds = rate_service::bounds_for(&app.pool, "Roblox").await.unwrap();
        assert_eq!(bounds, RateBounds::defaults("Roblox"));

        assert!(matches!(add_listing(&app, ADMIN_ID, "roblox", None).await, Err(BotError::InvalidInput(_))));
        assert!(matches!(add_listing(&app, ADMIN_ID, "Xbox", Some("ftp://x")).await, Err(BotError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_stock() {
        let (app, _) = test_context().await;
        let (name, stock) = add_stock(&app, ADMIN_ID, "amazon", 50.0, "AMZ-1").await.unwrap();
        assert_eq!((name.as_str(), stock), ("Amazon", 1));
        let (_, stock) = add_stock(&app, ADMIN_ID, "Amazon", 50.0, "AMZ-2").await.unwrap();
        assert_eq!(stock, 2);

        assert!(matches!(add_stock(&app, ADMIN_ID, "Amazon", 50.0, "AMZ-1").await, Err(BotError::InvalidInput(_))));
        assert!(matches!(add_stock(&app, ADMIN_ID, "Nope", 50.0, "X").await, Err(BotError::NotFound(_))));
        assert!(matches!(add_stock(&app, ADMIN_ID, "Amazon", 5.0, "X").await, Err(BotError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_set_rates_validates() {
        let (app, _) = test_context().await;
        let mut bounds = RateBounds::defaults("AMAZON");
        bounds.sell_min = 30.0;
        assert!(matches!(set_rates(&app, ADMIN_ID, bounds.clone()).await, Err(BotError::InvalidInput(_))));

        bounds.sell_max = 40.0;
        let stored = set_rates(&app, ADMIN_ID, bounds).await.unwrap();
        assert_eq!(stored.listing_name, "Amazon");
        assert_eq!(rate_service::bounds_for(&app.pool, "Amazon").await.unwrap().sell_min, 30.0);
    }
}
