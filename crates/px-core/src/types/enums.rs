//! Enumerations used throughout the gateway SDK.
//!
//! The discriminants are the integer codes used on the wire. Each enum
//! round-trips through `i32` via `#[serde(from, into)]`, with codes the SDK
//! does not know about preserved in `Unknown`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Order status
// ---------------------------------------------------------------------------

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum OrderStatus {
    #[default]
    None,
    Open,
    Filled,
    Cancelled,
    Expired,
    Rejected,
    Pending,
    Unknown(i32),
}

impl From<i32> for OrderStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Open,
            2 => Self::Filled,
            3 => Self::Cancelled,
            4 => Self::Expired,
            5 => Self::Rejected,
            6 => Self::Pending,
            other => Self::Unknown(other),
        }
    }
}

impl From<OrderStatus> for i32 {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::None => 0,
            OrderStatus::Open => 1,
            OrderStatus::Filled => 2,
            OrderStatus::Cancelled => 3,
            OrderStatus::Expired => 4,
            OrderStatus::Rejected => 5,
            OrderStatus::Pending => 6,
            OrderStatus::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Open => write!(f, "OPEN"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Pending => write!(f, "PENDING"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Order type
// ---------------------------------------------------------------------------

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum OrderType {
    #[default]
    Unspecified,
    Limit,
    Market,
    StopLimit,
    Stop,
    TrailingStop,
    JoinBid,
    JoinAsk,
    Unknown(i32),
}

impl From<i32> for OrderType {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Unspecified,
            1 => Self::Limit,
            2 => Self::Market,
            3 => Self::StopLimit,
            4 => Self::Stop,
            5 => Self::TrailingStop,
            6 => Self::JoinBid,
            7 => Self::JoinAsk,
            other => Self::Unknown(other),
        }
    }
}

impl From<OrderType> for i32 {
    fn from(kind: OrderType) -> Self {
        match kind {
            OrderType::Unspecified => 0,
            OrderType::Limit => 1,
            OrderType::Market => 2,
            OrderType::StopLimit => 3,
            OrderType::Stop => 4,
            OrderType::TrailingStop => 5,
            OrderType::JoinBid => 6,
            OrderType::JoinAsk => 7,
            OrderType::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unspecified => write!(f, "UNKNOWN"),
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
            Self::StopLimit => write!(f, "STOP_LIMIT"),
            Self::Stop => write!(f, "STOP"),
            Self::TrailingStop => write!(f, "TRAILING_STOP"),
            Self::JoinBid => write!(f, "JOIN_BID"),
            Self::JoinAsk => write!(f, "JOIN_ASK"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Order side
// ---------------------------------------------------------------------------

/// Side of an order or fill. The gateway calls buys "bid" (0) and sells "ask" (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum OrderSide {
    #[default]
    Bid,
    Ask,
    Unknown(i32),
}

impl From<i32> for OrderSide {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Bid,
            1 => Self::Ask,
            other => Self::Unknown(other),
        }
    }
}

impl From<OrderSide> for i32 {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Bid => 0,
            OrderSide::Ask => 1,
            OrderSide::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bid => write!(f, "BUY"),
            Self::Ask => write!(f, "SELL"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Position type
// ---------------------------------------------------------------------------

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PositionType {
    #[default]
    Flat,
    Long,
    Short,
    Unknown(i32),
}

impl From<i32> for PositionType {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Flat,
            1 => Self::Long,
            2 => Self::Short,
            other => Self::Unknown(other),
        }
    }
}

impl From<PositionType> for i32 {
    fn from(kind: PositionType) -> Self {
        match kind {
            PositionType::Flat => 0,
            PositionType::Long => 1,
            PositionType::Short => 2,
            PositionType::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for PositionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "FLAT"),
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_are_preserved() {
        let status: OrderStatus = serde_json::from_str("42").unwrap();
        assert_eq!(status, OrderStatus::Unknown(42));
        assert_eq!(serde_json::to_string(&status).unwrap(), "42");
    }

    #[test]
    fn side_display_matches_gateway_naming() {
        assert_eq!(OrderSide::from(0).to_string(), "BUY");
        assert_eq!(OrderSide::from(1).to_string(), "SELL");
        assert_eq!(PositionType::from(2).to_string(), "SHORT");
        assert_eq!(OrderType::from(5), OrderType::TrailingStop);
    }
}
