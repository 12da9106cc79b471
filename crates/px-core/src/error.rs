//! Typed error definitions for the realtime channels.
//!
//! [`ChannelError`] is what the synchronous channel API (`connect`,
//! `subscribe_*`, ...) hands back to callers. [`HubError`] is produced by hub
//! transport implementations and is wrapped by the channel errors. Failures
//! inside background recovery (probe timeouts, undecodable pushes) are logged
//! and never surface here.

use thiserror::Error;

use crate::channel::ConnectionState;

/// Errors returned by the realtime channel API.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// `connect()` was called without a bearer token in the client context.
    #[error("authentication token not set")]
    AuthTokenMissing,

    /// The hub transport could not construct or start a session.
    #[error("failed to set up hub connection: {0}")]
    ConnectionSetup(#[source] HubError),

    /// A subscription call was made while the channel was not connected.
    #[error("hub not connected (state: {0})")]
    NotConnected(ConnectionState),

    /// The hub answered a request/response invocation with an error.
    #[error("{method} rejected by hub: {source}")]
    RemoteRejected {
        /// Remote method that was invoked.
        method: &'static str,
        #[source]
        source: HubError,
    },
}

/// Errors raised by a hub transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Connection could not be established or the handshake failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The hub returned an error completion for an invocation.
    #[error("invocation failed: {0}")]
    Invocation(String),

    /// The session was stopped or dropped by the server.
    #[error("connection closed")]
    Closed,
}
