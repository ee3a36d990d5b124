//! Inventory models

use serde::Serialize;
use sqlx::FromRow;

/// A redeemable code held in stock for buy orders
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryCode {
    pub id: i64,
    pub listing_name: String,
    pub denomination: f64,
    pub code: String,
    pub available: bool,
}
