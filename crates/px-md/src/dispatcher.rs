//! Decodes market-hub push events and routes them to typed handlers.
//!
//! Routes by event name:
//!
//! - `GatewayQuote(contractId, quote)` → quote handler
//! - `GatewayTrade(contractId, [trade, ..])` → trade handler
//! - `GatewayDepth(contractId, [level, ..])` → depth handler
//!
//! Payloads that do not decode are dropped with a debug log.

use std::sync::{Arc, PoisonError, RwLock};

use px_core::channel::Dispatch;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::records::{DepthEntry, MarketTrade, Quote};

pub const QUOTE_EVENT: &str = "GatewayQuote";
pub const TRADE_EVENT: &str = "GatewayTrade";
pub const DEPTH_EVENT: &str = "GatewayDepth";

pub type QuoteHandler = Arc<dyn Fn(&str, Quote) + Send + Sync>;
pub type TradeHandler = Arc<dyn Fn(&str, Vec<MarketTrade>) + Send + Sync>;
pub type DepthHandler = Arc<dyn Fn(&str, Vec<DepthEntry>) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    quote: Option<QuoteHandler>,
    trade: Option<TradeHandler>,
    depth: Option<DepthHandler>,
}

/// One handler slot per event kind. Setting a slot replaces the previous
/// handler.
#[derive(Default)]
pub struct MarketDispatcher {
    handlers: RwLock<Handlers>,
}

impl MarketDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quote_handler<F>(&self, handler: F)
    where
        F: Fn(&str, Quote) + Send + Sync + 'static,
    {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).quote = Some(Arc::new(handler));
    }

    pub fn set_trade_handler<F>(&self, handler: F)
    where
        F: Fn(&str, Vec<MarketTrade>) + Send + Sync + 'static,
    {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).trade = Some(Arc::new(handler));
    }

    pub fn set_depth_handler<F>(&self, handler: F)
    where
        F: Fn(&str, Vec<DepthEntry>) + Send + Sync + 'static,
    {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).depth = Some(Arc::new(handler));
    }

    /// Clone a slot out so the handler runs without the lock held.
    fn slot<T: Clone>(&self, pick: impl FnOnce(&Handlers) -> Option<T>) -> Option<T> {
        pick(&*self.handlers.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Dispatch for MarketDispatcher {
    fn dispatch(&self, target: &str, args: Vec<Value>) {
        match target {
            QUOTE_EVENT => {
                if let Some((contract, quote)) = decode::<Quote>(target, args) {
                    if let Some(handler) = self.slot(|h| h.quote.clone()) {
                        handler(&contract, quote);
                    }
                }
            }
            TRADE_EVENT => {
                if let Some((contract, trades)) = decode::<Vec<MarketTrade>>(target, args) {
                    if let Some(handler) = self.slot(|h| h.trade.clone()) {
                        handler(&contract, trades);
                    }
                }
            }
            DEPTH_EVENT => {
                if let Some((contract, levels)) = decode::<Vec<DepthEntry>>(target, args) {
                    if let Some(handler) = self.slot(|h| h.depth.clone()) {
                        handler(&contract, levels);
                    }
                }
            }
            _ => debug!("[market-data] unhandled event {target}"),
        }
    }
}

/// Split `[contractId, payload]` and decode the payload.
fn decode<T: DeserializeOwned>(target: &str, args: Vec<Value>) -> Option<(String, T)> {
    let mut args = args.into_iter();
    let contract = match args.next() {
        Some(Value::String(id)) => id,
        other => {
            debug!("[market-data] {target} without contract id: {other:?}");
            return None;
        }
    };
    let Some(payload) = args.next() else {
        debug!("[market-data] {target} for {contract} without payload");
        return None;
    };
    match serde_json::from_value(payload) {
        Ok(record) => Some((contract, record)),
        Err(e) => {
            debug!("[market-data] dropping malformed {target} for {contract}: {e}");
            None
        }
    }
}
