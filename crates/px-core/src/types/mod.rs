//! Core data types shared by the REST client and both realtime channels.
//!
//! The gateway encodes every enum as a plain integer. The enums here keep an
//! `Unknown(code)` variant so a new server-side code never fails a decode.

pub mod enums;

pub use enums::*;

/// Gateway trading-account identifier.
pub type AccountId = i64;

/// Gateway contract identifier (e.g. `"CON.F.US.EP.M25"`).
pub type ContractId = String;
