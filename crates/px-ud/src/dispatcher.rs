//! Decodes user-hub push events and routes them to typed handlers.
//!
//! Each user event carries a single argument, the [`ActionEnvelope`]:
//!
//! - `GatewayUserAccount` → account handler
//! - `GatewayUserOrder` → order handler
//! - `GatewayUserPosition` → position handler
//! - `GatewayUserTrade` → trade handler

use std::sync::{Arc, PoisonError, RwLock};

use px_core::channel::Dispatch;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::event::{AccountEvent, ActionEnvelope, OrderEvent, PositionEvent, TradeEvent};

pub const ACCOUNT_EVENT: &str = "GatewayUserAccount";
pub const ORDER_EVENT: &str = "GatewayUserOrder";
pub const POSITION_EVENT: &str = "GatewayUserPosition";
pub const TRADE_EVENT: &str = "GatewayUserTrade";

type Slot<T> = Option<Arc<dyn Fn(T) + Send + Sync>>;

#[derive(Default)]
struct Handlers {
    account: Slot<AccountEvent>,
    order: Slot<OrderEvent>,
    position: Slot<PositionEvent>,
    trade: Slot<TradeEvent>,
}

#[derive(Default)]
pub struct UserDispatcher {
    handlers: RwLock<Handlers>,
}

impl UserDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account_handler(&self, handler: impl Fn(AccountEvent) + Send + Sync + 'static) {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).account = Some(Arc::new(handler));
    }

    pub fn set_order_handler(&self, handler: impl Fn(OrderEvent) + Send + Sync + 'static) {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).order = Some(Arc::new(handler));
    }

    pub fn set_position_handler(&self, handler: impl Fn(PositionEvent) + Send + Sync + 'static) {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).position = Some(Arc::new(handler));
    }

    pub fn set_trade_handler(&self, handler: impl Fn(TradeEvent) + Send + Sync + 'static) {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).trade = Some(Arc::new(handler));
    }

    /// Decode the envelope only when a handler is installed; the handler runs
    /// without the lock held.
    fn deliver<T, F>(&self, target: &str, args: Vec<Value>, pick: F)
    where
        T: DeserializeOwned,
        F: FnOnce(&Handlers) -> Slot<ActionEnvelope<T>>,
    {
        let Some(handler) = pick(&*self.handlers.read().unwrap_or_else(PoisonError::into_inner)) else {
            return;
        };
        let Some(payload) = args.into_iter().next() else {
            debug!("[user-data] {target} without payload");
            return;
        };
        match serde_json::from_value::<ActionEnvelope<T>>(payload) {
            Ok(event) => handler(event),
            Err(e) => debug!("[user-data] dropping malformed {target}: {e}"),
        }
    }
}

impl Dispatch for UserDispatcher {
    fn dispatch(&self, target: &str, args: Vec<Value>) {
        match target {
            ACCOUNT_EVENT => self.deliver(target, args, |h| h.account.clone()),
            ORDER_EVENT => self.deliver(target, args, |h| h.order.clone()),
            POSITION_EVENT => self.deliver(target, args, |h| h.position.clone()),
            TRADE_EVENT => self.deliver(target, args, |h| h.trade.clone()),
            _ => debug!("[user-data] unhandled event {target}"),
        }
    }
}
