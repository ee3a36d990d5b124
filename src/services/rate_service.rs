use rand::Rng;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info};

use crate::db;
use crate::models::{RateBounds, TransactionKind};
use crate::utils::{round_cents, BotError};

/// Configured bounds for a listing, or the global defaults when it has no row
pub async fn bounds_for(pool: &SqlitePool, listing_name: &str) -> Result<RateBounds, sqlx::Error> {
    let bounds = db::listing::get_rate_bounds(pool, listing_name)
        .await?
        .unwrap_or_else(|| RateBounds::defaults(listing_name));
    Ok(bounds)
}

/// Draw a percentage uniformly from the bounds for one direction
pub fn draw(bounds: &RateBounds, kind: TransactionKind) -> f64 {
    let (min, max) = bounds.range(kind);
    if min >= max {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

/// `rate(listing, direction)`: look up the bounds and draw once
pub async fn rate(pool: &SqlitePool, listing_name: &str, kind: TransactionKind) -> Result<f64, sqlx::Error> {
    let bounds = bounds_for(pool, listing_name).await?;
    let rate = draw(&bounds, kind);
    debug!("Drew {} rate {:.2}% for {}", kind, rate, listing_name);
    Ok(rate)
}

/// What the user receives for selling a card
pub fn sell_settle(denomination: f64, rate: f64) -> f64 {
    round_cents(denomination * (1.0 - rate / 100.0))
}

/// What the user pays for buying a card
pub fn buy_settle(denomination: f64, rate: f64) -> f64 {
    round_cents(denomination * (1.0 + rate / 100.0))
}

pub fn settle(kind: TransactionKind, denomination: f64, rate: f64) -> f64 {
    match kind {
        TransactionKind::Sell => sell_settle(denomination, rate),
        TransactionKind::Buy => buy_settle(denomination, rate),
    }
}

/// Validate and store new bounds for an existing listing
pub async fn set_bounds(pool: &SqlitePool, bounds: RateBounds) -> Result<RateBounds, BotError> {
    bounds.validate().map_err(BotError::InvalidInput)?;

    let listing = db::listing::get_listing_by_name(pool, &bounds.listing_name)
        .await?
        .ok_or_else(|| BotError::NotFound(format!("Listing {}", bounds.listing_name)))?;

    // Store under the canonical name so lookups by listing keep matching
    let bounds = RateBounds {
        listing_name: listing.name,
        ..bounds
    };
    db::listing::set_rate_bounds(pool, &bounds).await?;

    info!(
        "Rate bounds for {} set to sell {:.2}-{:.2}%, buy {:.2}-{:.2}%",
        bounds.listing_name, bounds.sell_min, bounds.sell_max, bounds.buy_min, bounds.buy_max
    );
    Ok(bounds)
}

/// Rate ranges for every listing. Actual rates are drawn per request inside these bounds.
pub async fn overview(pool: &SqlitePool) -> Result<String, BotError> {
    let mut text = String::from("📈 **Current Rate Ranges**\n\nSell = discount you take, Buy = premium you pay.\n");
    for bounds in db::listing::list_with_bounds(pool).await? {
        text.push_str(&format!(
            "\n• **{}**  sell -{:.0}% to -{:.0}%  ·  buy +{:.0}% to +{:.0}%",
            bounds.listing_name, bounds.sell_min, bounds.sell_max, bounds.buy_min, bounds.buy_max
        ));
    }
    text.push_str("\n\nYour exact rate is shown when you pick a card.");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_config, test_pool};

    #[test]
    fn test_draws_stay_in_bounds() {
        let bounds = RateBounds {
            listing_name: "Steam".into(),
            sell_min: 7.5,
            sell_max: 12.25,
            buy_min: 10.0,
            buy_max: 30.0,
        };
        for _ in 0..10_000 {
            let sell = draw(&bounds, TransactionKind::Sell);
            assert!((7.5..=12.25).contains(&sell), "sell rate {} out of bounds", sell);
            let buy = draw(&bounds, TransactionKind::Buy);
            assert!((10.0..=30.0).contains(&buy), "buy rate {} out of bounds", buy);
        }
    }

    #[test]
    fn test_degenerate_bounds() {
        let mut bounds = RateBounds::defaults("Xbox");
        bounds.sell_min = 12.0;
        bounds.sell_max = 12.0;
        assert_eq!(draw(&bounds, TransactionKind::Sell), 12.0);
    }

    #[test]
    fn test_settlement_formulas() {
        assert_eq!(sell_settle(100.0, 10.0), 90.0);
        assert_eq!(buy_settle(100.0, 10.0), 110.0);
        assert_eq!(settle(TransactionKind::Sell, 50.0, 25.0), 37.5);
    }

    #[test]
    fn test_settlement_monotonic_in_denomination() {
        for rate in [5.0, 17.3, 25.0] {
            let mut prev_sell = f64::MIN;
            let mut prev_buy = f64::MIN;
            for denom in (10..=10_000).step_by(10) {
                let d = denom as f64;
                let s = sell_settle(d, rate);
                let b = buy_settle(d, rate);
                assert!(s > prev_sell && b > prev_buy);
                prev_sell = s;
                prev_buy = b;
            }
        }
    }

    #[tokio::test]
    async fn test_rate_uses_stored_bounds_and_defaults() {
        let config = test_config();
        let pool = test_pool(&config).await;

        set_bounds(
            &pool,
            RateBounds {
                listing_name: "amazon".into(),
                sell_min: 1.0,
                sell_max: 2.0,
                buy_min: 3.0,
                buy_max: 4.0,
            },
        )
        .await
        .unwrap();

        let r = rate(&pool, "Amazon", TransactionKind::Sell).await.unwrap();
        assert!((1.0..=2.0).contains(&r));

        // no row at all: global defaults
        let r = rate(&pool, "Unlisted Card", TransactionKind::Buy).await.unwrap();
        assert!((10.0..=30.0).contains(&r));
    }

    #[tokio::test]
    async fn test_inverted_bounds_rejected_at_write() {
        let config = test_config();
        let pool = test_pool(&config).await;
        let mut bounds = RateBounds::defaults("Nike");
        bounds.sell_min = 30.0;
        bounds.sell_max = 10.0;
        assert!(matches!(set_bounds(&pool, bounds).await, Err(BotError::InvalidInput(_))));

        let unknown = RateBounds::defaults("Nope");
        assert!(matches!(set_bounds(&pool, unknown).await, Err(BotError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_overview_lists_catalog() {
        let pool = test_pool(&test_config()).await;
        let text = overview(&pool).await.unwrap();
        assert!(text.contains("**Amazon**  sell -5% to -25%  ·  buy +10% to +30%"));
        assert_eq!(text.matches("\n• ").count(), 25);
    }
}
