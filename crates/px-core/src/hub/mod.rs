//! Realtime hub transport contract.
//!
//! The realtime channels never speak a wire protocol themselves. They consume
//! a [`HubTransport`] that opens bidirectional sessions to a hub URL and
//! exposes request/response invocation, fire-and-forget sends, named push
//! events and an unsolicited-close notification.
//!
//! ```text
//!   RealtimeChannel ──connect(HubRequest, receiver)──▶ HubTransport
//!          │                                               │
//!          │◀──────────── Arc<dyn HubSession> ─────────────┘
//!          │      start / invoke / send / stop
//!          │
//!          └── HubReceiver ◀── on_event(target, args) / connection_closed()
//! ```
//!
//! An in-memory implementation lives in [`mock`] behind the `test-util`
//! feature.

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::HubError;

/// Method name of the liveness probe understood by both hubs.
pub const PING_METHOD: &str = "ping";

/// Everything a transport needs to open one hub session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubRequest {
    /// Hub URL with the `access_token` query parameter already appended.
    pub url: Url,
    /// Handshake headers (carries `Authorization: Bearer <token>`).
    pub headers: HashMap<String, String>,
}

impl HubRequest {
    /// Build a request for `hub_url`, embedding `token` both as the
    /// `access_token` query parameter and as a bearer header.
    pub fn new(hub_url: &Url, token: &str) -> Self {
        let mut url = hub_url.clone();
        url.query_pairs_mut().append_pair("access_token", token);

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));

        Self { url, headers }
    }
}

/// Opens hub sessions.
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// Construct a session for `request`. Inbound traffic of the session is
    /// delivered to `receiver`. The session is not started yet.
    async fn connect(
        &self,
        request: HubRequest,
        receiver: Arc<dyn HubReceiver>,
    ) -> Result<Arc<dyn HubSession>, HubError>;
}

/// One live hub connection.
#[async_trait]
pub trait HubSession: Send + Sync {
    /// Perform the handshake and begin delivering events.
    async fn start(&self) -> Result<(), HubError>;

    /// Request/response call. Resolves with the hub's completion value.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, HubError>;

    /// Fire-and-forget call. Resolves once the message is handed to the wire.
    async fn send(&self, method: &str, args: Vec<Value>) -> Result<(), HubError>;

    /// Close the session. Idempotent.
    async fn stop(&self);
}

/// Inbound side of a session, implemented by the channel engine.
///
/// Both methods are called from the transport's delivery path and must not
/// block. `connection_closed` is only for closes the caller did not request
/// through [`HubSession::stop`]; transports fail any in-flight invocations
/// before reporting it. Implementations may spawn onto the current tokio
/// runtime.
pub trait HubReceiver: Send + Sync {
    /// A named push event arrived (e.g. `GatewayQuote`).
    fn on_event(&self, target: &str, args: Vec<Value>);

    /// The server or network closed the session.
    fn connection_closed(&self);
}
