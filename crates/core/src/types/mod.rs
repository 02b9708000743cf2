//! Core types for the Saleor checkout.
//!
//! This module provides type-safe wrappers for auth and entity concepts.

pub mod auth_state;
pub mod id;
pub mod token;

pub use auth_state::{AuthState, AuthStateError};
pub use id::*;
pub use token::{AccessToken, RefreshToken, decode_expiry, is_expired};

#[cfg(any(test, feature = "test-util"))]
pub use token::testing;
