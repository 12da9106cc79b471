//! Generic realtime channel engine.
//!
//! Both push channels (market data and user data) run on the same engine,
//! [`RealtimeChannel`], parameterised by a [`ChannelKind`] that supplies the
//! topic vocabulary, remote method names, replay arguments and the
//! dispatcher that turns push events into typed callbacks.
//!
//! ```text
//!  caller ──subscribe/unsubscribe──▶ ┌──────────── Mutex<Shared> ─────────────┐
//!                                    │ state · session · registry · attempts  │
//!                                    └──────────────────▲─────────────────────┘
//!                                                       │
//!  supervisor task: health tick (5s) ── ping fails ──▶ trigger(1) ──▶ reconnect
//!                                                       ▲                │
//!  transport: connection_closed ────────────────────────┘   backoff, probe, replay
//! ```
//!
//! States move Disconnected → Connecting → Connected, then Connected ⇄
//! Reconnecting for as long as the channel lives. Only `disconnect()` returns
//! to Disconnected; the supervisor never gives up.

pub mod backoff;
pub mod engine;
pub mod notify;
pub mod registry;

use std::fmt;

use serde_json::Value;

pub use backoff::ReconnectPolicy;
pub use engine::RealtimeChannel;
pub use notify::ConnectionHandler;
pub use registry::SubscriptionRegistry;

/// Connection state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Topic vocabulary and wiring of one concrete channel.
pub trait ChannelKind: Send + Sync + 'static {
    /// Label used in log lines, e.g. `"market-data"`.
    const NAME: &'static str;

    /// Primary registry key (contract id, or a single slot for user data).
    type Key: Clone + Ord + fmt::Debug + Send + Sync + 'static;

    /// Subscription kind under a key.
    type Kind: Copy + Ord + fmt::Debug + Send + Sync + 'static;

    /// Additional state kept next to the registry and reset on disconnect.
    type Extra: Default + Clone + fmt::Debug + Send + Sync + 'static;

    type Dispatcher: Dispatch;

    fn subscribe_method(kind: Self::Kind) -> &'static str;

    fn unsubscribe_method(kind: Self::Kind) -> &'static str;

    /// Arguments used to re-send a remembered topic after a reconnect.
    /// `None` skips the topic.
    fn replay_args(key: &Self::Key, kind: Self::Kind, extra: &Self::Extra) -> Option<Vec<Value>>;
}

/// Routes named push events of the live session to typed callbacks.
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, target: &str, args: Vec<Value>);
}
