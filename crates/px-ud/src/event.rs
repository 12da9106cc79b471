//! Event types delivered by the user hub.
//!
//! Every push is an [`ActionEnvelope`]: an integer `action` plus the entity
//! payload. What the action code means depends on the stream:
//!
//! - orders use [`OrderAction`] (1 = update)
//! - accounts, positions and trades use [`EntityAction`] (1 = created,
//!   2 = updated, 3 = deleted)
//!
//! The raw code is always kept in [`ActionEnvelope::action`].

use std::fmt;

use chrono::{DateTime, Utc};
use px_core::json_util::{lenient_i64, optional_timestamp};
use px_core::{AccountId, OrderSide, OrderStatus, OrderType, PositionType};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope and action codes
// ---------------------------------------------------------------------------

/// `{ "action": <int>, "data": { .. } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope<T> {
    #[serde(default)]
    pub action: i32,
    pub data: T,
}

/// Ties a payload type to the meaning of its stream's action codes.
pub trait ActionCode {
    type Action: From<i32>;
}

impl<T: ActionCode> ActionEnvelope<T> {
    /// The action code interpreted for this stream.
    pub fn action_kind(&self) -> T::Action {
        T::Action::from(self.action)
    }
}

/// Action codes of the order stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderAction {
    Update,
    Unknown(i32),
}

impl From<i32> for OrderAction {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Update,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => write!(f, "UPDATE"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// Action codes of the account, position and trade streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityAction {
    Created,
    Updated,
    Deleted,
    Unknown(i32),
}

impl From<i32> for EntityAction {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Created,
            2 => Self::Updated,
            3 => Self::Deleted,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for EntityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Updated => write!(f, "UPDATED"),
            Self::Deleted => write!(f, "DELETED"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Trading account snapshot (`GatewayUserAccount`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountUpdate {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: AccountId,
    pub name: String,
    pub balance: f64,
    pub can_trade: bool,
    pub is_visible: bool,
    pub simulated: bool,
}

/// Order state change (`GatewayUserOrder`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderUpdate {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub account_id: AccountId,
    pub contract_id: String,
    pub status: OrderStatus,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub size: i32,
    pub fill_volume: i32,
    /// Absent for market orders.
    pub limit_price: Option<f64>,
    #[serde(deserialize_with = "optional_timestamp")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    pub update_timestamp: Option<DateTime<Utc>>,
}

/// Open position change (`GatewayUserPosition`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionUpdate {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub account_id: AccountId,
    pub contract_id: String,
    #[serde(rename = "type")]
    pub position_type: PositionType,
    pub size: i32,
    pub average_price: f64,
    #[serde(deserialize_with = "optional_timestamp")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Execution on the account (`GatewayUserTrade`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeUpdate {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub account_id: AccountId,
    pub contract_id: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub order_id: i64,
    pub side: OrderSide,
    pub size: i32,
    pub price: f64,
    pub fees: f64,
    /// `None` for the opening half of a round trip.
    pub profit_and_loss: Option<f64>,
    pub voided: bool,
    #[serde(deserialize_with = "optional_timestamp")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ActionCode for AccountUpdate {
    type Action = EntityAction;
}

impl ActionCode for OrderUpdate {
    type Action = OrderAction;
}

impl ActionCode for PositionUpdate {
    type Action = EntityAction;
}

impl ActionCode for TradeUpdate {
    type Action = EntityAction;
}

pub type AccountEvent = ActionEnvelope<AccountUpdate>;
pub type OrderEvent = ActionEnvelope<OrderUpdate>;
pub type PositionEvent = ActionEnvelope<PositionUpdate>;
pub type TradeEvent = ActionEnvelope<TradeUpdate>;

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn order_envelope_tolerates_float_ids_and_empty_timestamps() {
        let ev: OrderEvent = serde_json::from_str(
            r#"{"action":1,"data":{"id":9056.0,"accountId":465.0,"contractId":"CON.F.US.EP.M25",
                "status":1,"type":1,"side":0,"size":2,"fillVolume":0,"limitPrice":5000.25,
                "creationTimestamp":"2025-03-03T15:04:05.123456789Z","updateTimestamp":""}}"#,
        )
        .unwrap();
        assert_eq!(ev.action_kind(), OrderAction::Update);
        assert_eq!(ev.data.id, 9056);
        assert_eq!(ev.data.account_id, 465);
        assert_eq!(ev.data.status, OrderStatus::Open);
        assert_eq!(ev.data.order_type, OrderType::Limit);
        assert_eq!(ev.data.side, OrderSide::Bid);
        assert_eq!(ev.data.limit_price, Some(5000.25));
        assert_eq!(ev.data.creation_timestamp.unwrap().nanosecond(), 123_456_789);
        assert!(ev.data.update_timestamp.is_none());
    }

    #[test]
    fn order_and_entity_actions_are_mapped_separately() {
        let order = OrderEvent { action: 2, data: OrderUpdate::default() };
        let position = PositionEvent { action: 2, data: PositionUpdate::default() };
        assert_eq!(order.action_kind(), OrderAction::Unknown(2));
        assert_eq!(position.action_kind(), EntityAction::Updated);
        assert_eq!(EntityAction::from(3).to_string(), "DELETED");
        assert_eq!(OrderAction::from(1).to_string(), "UPDATE");
    }

    #[test]
    fn trade_and_position_payloads() {
        let trade: TradeEvent = serde_json::from_str(
            r#"{"action":1,"data":{"id":8604,"accountId":203,"contractId":"CON.F.US.EP.M25",
                "orderId":14328,"side":1,"size":1,"price":5012.5,"fees":1.4,"voided":false,
                "profitAndLoss":null,"creationTimestamp":"2025-03-03T15:04:05+00:00"}}"#,
        )
        .unwrap();
        assert_eq!(trade.action_kind(), EntityAction::Created);
        assert_eq!(trade.data.side, OrderSide::Ask);
        assert!(trade.data.profit_and_loss.is_none());

        let raw = r#"{"action":3,"data":{"id":1,"accountId":203,"type":2,"size":1,"averagePrice":5010}}"#;
        let position: PositionEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(position.action_kind(), EntityAction::Deleted);
        assert_eq!(position.data.position_type, PositionType::Short);
    }

    #[test]
    fn envelope_without_data_is_rejected() {
        assert!(serde_json::from_str::<AccountEvent>(r#"{"action":1}"#).is_err());
        assert!(serde_json::from_str::<AccountEvent>(r#"{"action":1,"data":{"balance":"lots"}}"#).is_err());
    }
}
