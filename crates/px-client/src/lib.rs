//! # px-client
//!
//! REST access to the ProjectX gateway and the [`ProjectX`] facade that wires
//! the REST services and both realtime channels around one shared
//! [`ClientContext`](px_core::context::ClientContext).
//!
//! | Module    | Contents                                             |
//! |-----------|------------------------------------------------------|
//! | `api`     | `ApiClient`, the response envelope, `ApiError`        |
//! | `auth`    | `AuthApi`: API-key / app login, validate, logout      |
//! | `account` | `AccountApi`: account search                          |
//! | `client`  | `ProjectX` facade                                     |

pub mod account;
pub mod api;
pub mod auth;
pub mod client;

pub use account::{AccountApi, TradingAccount};
pub use api::{ApiClient, ApiError, ApiResponse};
pub use auth::AuthApi;
pub use client::ProjectX;
