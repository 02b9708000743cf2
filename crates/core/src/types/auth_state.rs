//! Session auth state shared across storage contexts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`AuthState`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthStateError {
    /// The input is not one of the known state names.
    #[error("unknown auth state: {0}")]
    Unknown(String),
}

/// Whether the customer is signed in.
///
/// Persisted under a well-known storage key as `signedIn` / `signedOut` and
/// broadcast to every context that shares the storage. This is distinct from
/// token validity: a context can be `SignedIn` while its access token is
/// expired and waiting on a refresh.
///
/// ## Examples
///
/// ```
/// use saleor_checkout_core::AuthState;
///
/// assert_eq!("signedIn".parse::<AuthState>().unwrap(), AuthState::SignedIn);
/// assert_eq!(AuthState::SignedOut.as_str(), "signedOut");
/// assert_eq!(AuthState::from_stored(None), AuthState::SignedOut);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthState {
    /// A refresh token is stored and the last auth operation succeeded.
    SignedIn,
    /// No session, or the last sign-in/refresh failed.
    #[default]
    SignedOut,
}

impl AuthState {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignedIn => "signedIn",
            Self::SignedOut => "signedOut",
        }
    }

    /// Returns `true` for [`AuthState::SignedIn`].
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn)
    }

    /// Interpret a raw stored value.
    ///
    /// Missing or unrecognized values read as [`AuthState::SignedOut`].
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthState {
    type Err = AuthStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signedIn" => Ok(Self::SignedIn),
            "signedOut" => Ok(Self::SignedOut),
            other => Err(AuthStateError::Unknown(other.to_string())),
        }
    }
}
