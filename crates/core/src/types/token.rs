//! Access and refresh token types.
//!
//! Saleor issues short-lived JWT access tokens and longer-lived refresh
//! tokens. Access tokens only ever live in process memory; refresh tokens are
//! persisted so every context sharing the storage can mint new access tokens.
//!
//! Expiry is read from the `exp` claim of the JWT payload. The signature is
//! never verified here - the backend does that - so the decoded expiry is only
//! used to decide whether a refresh is needed before sending a request.

use core::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Short-lived bearer credential attached to GraphQL requests.
///
/// `Debug` output is redacted.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Returns the raw token for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Expiry decoded from the token's `exp` claim, if readable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        decode_expiry(self.expose())
    }

    /// Whether the token should be treated as expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        is_expired(self.expose(), now, grace)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Longer-lived credential used solely to mint a new [`AccessToken`].
///
/// `Debug` output is redacted.
#[derive(Clone)]
pub struct RefreshToken(SecretString);

impl RefreshToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Returns the raw token for storage or the refresh mutation.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken([REDACTED])")
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Decode the `exp` claim (seconds since the epoch) of a JWT.
///
/// Returns `None` when the token has no payload segment, the payload is not
/// base64url JSON, or the claim is missing.
#[must_use]
pub fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claim.exp?, 0)
}

/// Whether `token` is expired at `now`, treating anything within `grace` of
/// its expiry as already expired.
///
/// Tokens whose expiry cannot be decoded are expired.
#[must_use]
pub fn is_expired(token: &str, now: DateTime<Utc>, grace: Duration) -> bool {
    let Some(expires_at) = decode_expiry(token) else {
        return true;
    };
    let grace = TimeDelta::from_std(grace).unwrap_or(TimeDelta::MAX);
    expires_at.checked_sub_signed(grace).is_none_or(|deadline| deadline <= now)
}

/// Builders for unsigned JWTs with a chosen expiry.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{DateTime, TimeDelta, Utc};

    /// An unsigned JWT whose `exp` claim is `expires_at`.
    ///
    /// `subject` lands in the `sub` claim so tests can tell tokens apart.
    #[must_use]
    pub fn jwt_expiring_at(subject: &str, expires_at: DateTime<Utc>) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({ "sub": subject, "exp": expires_at.timestamp() }).to_string(),
        );
        format!("{header}.{payload}.")
    }

    /// A token valid for the next hour.
    #[must_use]
    pub fn fresh_jwt(subject: &str) -> String {
        jwt_expiring_at(subject, Utc::now() + TimeDelta::hours(1))
    }

    /// A token that expired a minute ago.
    #[must_use]
    pub fn expired_jwt(subject: &str) -> String {
        jwt_expiring_at(subject, Utc::now() - TimeDelta::minutes(1))
    }
}
