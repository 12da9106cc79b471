//! Shared client context.
//!
//! A single [`ClientContext`] is created per SDK instance and shared via
//! `Arc` between the REST services (which write the bearer token after login)
//! and the realtime channels (which read it when opening a hub session).

use std::sync::{PoisonError, RwLock};

/// Holds the bearer token used by REST calls and hub connections.
#[derive(Debug, Default)]
pub struct ClientContext {
    token: RwLock<Option<String>>,
}

impl ClientContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that already carries a token (e.g. one persisted
    /// from a previous session).
    pub fn with_token(token: impl Into<String>) -> Self {
        let ctx = Self::default();
        ctx.set_token(token);
        ctx
    }

    /// Replace the token. An empty string clears it.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *slot = if token.is_empty() { None } else { Some(token) };
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn has_token(&self) -> bool {
        self.token.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
