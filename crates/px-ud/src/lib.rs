//! # px-ud
//!
//! User-data channel of the ProjectX gateway SDK: account, order, position
//! and trade updates for the authenticated user.
//!
//! The user hub has a single implicit subscription slot. Accounts are
//! subscribed without arguments; orders, positions and trades take an
//! account id, which the channel remembers so it can replay them after a
//! reconnect.
//!
//! - [`event`]: action envelopes, payloads and the two action-code mappings
//! - [`dispatcher`]: push event decoding and handler slots
//! - [`service`]: `UserDataService`, the public API

pub mod dispatcher;
pub mod event;
pub mod service;

use std::fmt;

use px_core::AccountId;
use px_core::channel::ChannelKind;
use serde_json::{Value, json};

pub use dispatcher::UserDispatcher;
pub use event::*;
pub use service::UserDataService;

/// Which user stream is subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserEventKind {
    Accounts,
    Orders,
    Positions,
    Trades,
}

impl fmt::Display for UserEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accounts => write!(f, "accounts"),
            Self::Orders => write!(f, "orders"),
            Self::Positions => write!(f, "positions"),
            Self::Trades => write!(f, "trades"),
        }
    }
}

/// User hub channel definition. The extra state is the remembered account id.
pub struct UserData;

impl ChannelKind for UserData {
    const NAME: &'static str = "user-data";
    type Key = ();
    type Kind = UserEventKind;
    type Extra = Option<AccountId>;
    type Dispatcher = UserDispatcher;

    fn subscribe_method(kind: UserEventKind) -> &'static str {
        match kind {
            UserEventKind::Accounts => "SubscribeAccounts",
            UserEventKind::Orders => "SubscribeOrders",
            UserEventKind::Positions => "SubscribePositions",
            UserEventKind::Trades => "SubscribeTrades",
        }
    }

    fn unsubscribe_method(kind: UserEventKind) -> &'static str {
        match kind {
            UserEventKind::Accounts => "UnsubscribeAccounts",
            UserEventKind::Orders => "UnsubscribeOrders",
            UserEventKind::Positions => "UnsubscribePositions",
            UserEventKind::Trades => "UnsubscribeTrades",
        }
    }

    /// Per-account streams are only replayed while a positive account id is
    /// remembered.
    fn replay_args(_slot: &(), kind: UserEventKind, account: &Option<AccountId>) -> Option<Vec<Value>> {
        match kind {
            UserEventKind::Accounts => Some(Vec::new()),
            _ => account.filter(|id| *id > 0).map(|id| vec![json!(id)]),
        }
    }
}
