//! Gift-card catalog models

use serde::Serialize;
use sqlx::FromRow;

use crate::models::TransactionKind;

/// A gift-card brand offered for sale or purchase
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Listing {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
}

/// Percentage bounds the rate generator draws from, per listing
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RateBounds {
    pub listing_name: String,
    pub sell_min: f64,
    pub sell_max: f64,
    pub buy_min: f64,
    pub buy_max: f64,
}

impl RateBounds {
    pub const DEFAULT_SELL: (f64, f64) = (5.0, 25.0);
    pub const DEFAULT_BUY: (f64, f64) = (10.0, 30.0);

    /// Bounds used when a listing has no rate row
    pub fn defaults(listing_name: &str) -> Self {
        RateBounds {
            listing_name: listing_name.to_string(),
            sell_min: Self::DEFAULT_SELL.0,
            sell_max: Self::DEFAULT_SELL.1,
            buy_min: Self::DEFAULT_BUY.0,
            buy_max: Self::DEFAULT_BUY.1,
        }
    }

    /// `[min, max]` for the given direction
    pub fn range(&self, kind: TransactionKind) -> (f64, f64) {
        match kind {
            TransactionKind::Sell => (self.sell_min, self.sell_max),
            TransactionKind::Buy => (self.buy_min, self.buy_max),
        }
    }

    /// Reject inverted, negative or non-finite bounds. A sell discount of 100% or more
    /// would settle at zero or below, so it is refused as well.
    pub fn validate(&self) -> Result<(), String> {
        let pairs = [
            ("sell", self.sell_min, self.sell_max),
            ("buy", self.buy_min, self.buy_max),
        ];
        for (label, min, max) in pairs {
            if !min.is_finite() || !max.is_finite() {
                return Err(format!("{} bounds must be numbers", label));
            }
            if min < 0.0 {
                return Err(format!("{} minimum cannot be negative", label));
            }
            if min > max {
                return Err(format!("{} minimum {:.2} is above maximum {:.2}", label, min, max));
            }
        }
        if self.sell_max >= 100.0 {
            return Err("sell maximum must stay below 100%".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ranges() {
        let bounds = RateBounds::defaults("Amazon");
        assert_eq!(bounds.range(TransactionKind::Sell), (5.0, 25.0));
        assert_eq!(bounds.range(TransactionKind::Buy), (10.0, 30.0));
        assert!(bounds.validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut bounds = RateBounds::defaults("Steam");
        bounds.buy_min = 40.0;
        assert!(bounds.validate().unwrap_err().contains("buy"));

        let mut bounds = RateBounds::defaults("Steam");
        bounds.sell_max = 100.0;
        assert!(bounds.validate().is_err());
    }
}
