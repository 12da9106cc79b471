//! # px-core
//!
//! Core crate for the ProjectX gateway SDK, providing:
//!
//! - **Types** (`types`): int-coded trading enums and account/contract ids
//! - **Configuration** (`config`): JSON config deserialization with defaults
//! - **Error types** (`error`): `ChannelError` / `HubError` via thiserror
//! - **Client context** (`context`): the shared bearer token
//! - **Hub transport** (`hub`): the realtime transport contract consumed by channels
//! - **Realtime channel** (`channel`): generic connect / subscribe / reconnect engine
//! - **JSON helpers** (`json_util`): lenient decoders for gateway payloads
//! - **Logging** (`logging`): tracing-based structured logging

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod hub;
pub mod json_util;
pub mod logging;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
