//! Saleor Checkout Core - Shared auth types.
//!
//! This crate provides the types shared by every Saleor checkout component:
//! - `auth` - Authenticated GraphQL client with token refresh coordination
//! - `cli` - Command-line driver for the auth client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. Token expiry decoding lives here so the refresh
//! logic never depends on the token format.
//!
//! # Modules
//!
//! - [`types`] - Auth state, access/refresh tokens, and string-backed Saleor IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
