//! # px-md
//!
//! Market-data channel of the ProjectX gateway SDK.
//!
//! ## Architecture
//!
//! [`MarketData`] plugs the market hub's vocabulary into the generic
//! [`RealtimeChannel`](px_core::channel::RealtimeChannel) engine:
//!
//! | Kind               | Subscribe method               | Push event     |
//! |--------------------|--------------------------------|----------------|
//! | [`DataKind::Quotes`] | `SubscribeContractQuotes`      | `GatewayQuote` |
//! | [`DataKind::Trades`] | `SubscribeContractTrades`      | `GatewayTrade` |
//! | [`DataKind::Depth`]  | `SubscribeContractMarketDepth` | `GatewayDepth` |
//!
//! - [`records`]: `Quote`, `MarketTrade`, `DepthEntry`
//! - [`dispatcher`]: push event decoding and handler slots
//! - [`service`]: `MarketDataService`, the public per-contract API

pub mod dispatcher;
pub mod records;
pub mod service;

use std::fmt;

use px_core::ContractId;
use px_core::channel::ChannelKind;
use serde_json::{Value, json};

pub use dispatcher::MarketDispatcher;
pub use records::{Aggressor, BookSide, DepthEntry, MarketTrade, Quote};
pub use service::MarketDataService;

/// What is subscribed for a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataKind {
    Quotes,
    Trades,
    Depth,
}

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::Quotes, DataKind::Trades, DataKind::Depth];
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quotes => write!(f, "quotes"),
            Self::Trades => write!(f, "trades"),
            Self::Depth => write!(f, "depth"),
        }
    }
}

/// Market hub channel definition.
pub struct MarketData;

impl ChannelKind for MarketData {
    const NAME: &'static str = "market-data";
    type Key = ContractId;
    type Kind = DataKind;
    type Extra = ();
    type Dispatcher = MarketDispatcher;

    fn subscribe_method(kind: DataKind) -> &'static str {
        match kind {
            DataKind::Quotes => "SubscribeContractQuotes",
            DataKind::Trades => "SubscribeContractTrades",
            DataKind::Depth => "SubscribeContractMarketDepth",
        }
    }

    fn unsubscribe_method(kind: DataKind) -> &'static str {
        match kind {
            DataKind::Quotes => "UnsubscribeContractQuotes",
            DataKind::Trades => "UnsubscribeContractTrades",
            DataKind::Depth => "UnsubscribeContractMarketDepth",
        }
    }

    fn replay_args(contract: &ContractId, _kind: DataKind, _extra: &()) -> Option<Vec<Value>> {
        Some(vec![json!(contract)])
    }
}
