//! Market-data event records.
//!
//! Field names follow the hub's camelCase payloads. Every field has a
//! default so partially populated pushes still decode.

use chrono::{DateTime, Utc};
use px_core::json_util::optional_timestamp;
use serde::{Deserialize, Serialize};

/// Top-of-book quote for one contract (`GatewayQuote`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
    pub symbol: String,
    pub best_bid: f64,
    pub best_ask: f64,
    pub last_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: f64,
    #[serde(deserialize_with = "optional_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One print from a `GatewayTrade` batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketTrade {
    pub symbol_id: String,
    pub price: f64,
    pub volume: f64,
    /// Aggressor code, see [`MarketTrade::aggressor`].
    #[serde(rename = "type")]
    pub trade_type: i32,
    #[serde(deserialize_with = "optional_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Which side initiated a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggressor {
    Buy,
    Sell,
    Unknown(i32),
}

impl MarketTrade {
    /// 1 = buyer lifted the offer, 2 = seller hit the bid.
    pub fn aggressor(&self) -> Aggressor {
        match self.trade_type {
            1 => Aggressor::Buy,
            2 => Aggressor::Sell,
            other => Aggressor::Unknown(other),
        }
    }
}

/// One level from a `GatewayDepth` batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepthEntry {
    pub price: f64,
    pub volume: f64,
    pub current_volume: f64,
    /// Side code, see [`DepthEntry::side`].
    #[serde(rename = "type")]
    pub entry_type: i32,
    #[serde(deserialize_with = "optional_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookSide {
    Bid,
    Ask,
    /// Any other code (resets, best-level markers, ...).
    Other(i32),
}

impl DepthEntry {
    /// 3 = ask level, 4 = bid level.
    pub fn side(&self) -> BookSide {
        match self.entry_type {
            3 => BookSide::Ask,
            4 => BookSide::Bid,
            other => BookSide::Other(other),
        }
    }
}
