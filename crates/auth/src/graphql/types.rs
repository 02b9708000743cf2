//! Variables and payloads of the auth mutations.

use saleor_checkout_core::CheckoutId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

fn expose_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

// ─────────────────────────────────────────────────────────────────────────────
// Variables
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials for `tokenCreate`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCreateVariables {
    /// Customer email.
    pub email: String,
    /// Customer password.
    #[serde(serialize_with = "expose_secret")]
    pub password: SecretString,
}

impl TokenCreateVariables {
    /// Build sign-in credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// Input for `setPassword`.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetVariables {
    /// Customer email.
    pub email: String,
    /// The new password.
    #[serde(serialize_with = "expose_secret")]
    pub password: SecretString,
    /// Reset token from the password-reset email.
    pub token: String,
}

/// Input for `checkoutCustomerDetach`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetachVariables {
    /// Checkout to detach the customer from.
    pub checkout_id: CheckoutId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRefreshVariables<'a> {
    pub refresh_token: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// A mutation-level error (`AccountError` / `CheckoutError`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationError {
    /// Input field the error refers to.
    #[serde(default)]
    pub field: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable code (e.g., `INVALID_CREDENTIALS`).
    pub code: String,
}

/// Token-bearing payload shared by `tokenCreate`, `setPassword` and
/// `tokenRefresh`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    /// New access token.
    #[serde(default)]
    pub token: Option<String>,
    /// New refresh token. `tokenRefresh` only returns one when the backend
    /// rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Mutation errors.
    #[serde(default)]
    pub errors: Vec<MutationError>,
}

impl TokenPayload {
    /// The access token, if the mutation succeeded.
    ///
    /// Success means no mutation errors and a non-empty token.
    #[must_use]
    pub fn issued_token(&self) -> Option<&str> {
        if !self.errors.is_empty() {
            return None;
        }
        self.token.as_deref().filter(|token| !token.is_empty())
    }

    /// The refresh token, if a non-empty one was returned.
    #[must_use]
    pub fn issued_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|token| !token.is_empty())
    }
}

/// `data` of `tokenCreate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreateData {
    /// Mutation payload.
    pub token_create: Option<TokenPayload>,
}

/// `data` of `setPassword`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetData {
    /// Mutation payload.
    pub set_password: Option<TokenPayload>,
}

/// `data` of `tokenRefresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshData {
    /// Mutation payload.
    pub token_refresh: Option<TokenPayload>,
}

/// `data` of `checkoutCustomerDetach`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetachData {
    /// Mutation payload.
    pub checkout_customer_detach: Option<CustomerDetachPayload>,
}

/// Payload of `checkoutCustomerDetach`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetachPayload {
    /// Mutation errors.
    #[serde(default)]
    pub errors: Vec<MutationError>,
}

/// Response data of a mutation that signs the customer in.
pub trait SignInData {
    /// The token payload, if the backend returned one.
    fn payload(&self) -> Option<&TokenPayload>;
}

impl SignInData for TokenCreateData {
    fn payload(&self) -> Option<&TokenPayload> {
        self.token_create.as_ref()
    }
}

impl SignInData for PasswordResetData {
    fn payload(&self) -> Option<&TokenPayload> {
        self.set_password.as_ref()
    }
}
