//! Integration tests for the Saleor checkout auth client.
//!
//! Every test runs the real [`SaleorAuthClient`] against a [`MockSaleor`]
//! GraphQL endpoint and a shared [`MemoryStorage`] area, so several clients
//! can play the part of browser tabs.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p saleor-checkout-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session` - sign-in, password reset, sign-out
//! - `token_refresh` - single-flight refresh and its failure modes
//! - `cross_context` - auth state propagation between contexts
//! - `checkout_sign_out` - customer detach and the session it leaves

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use saleor_checkout_auth::{AuthClientConfig, MemoryStorage, SaleorAuthClient};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub use saleor_checkout_core::testing::{expired_jwt, fresh_jwt};

/// Path of the mock GraphQL endpoint.
pub const GRAPHQL_PATH: &str = "/graphql/";

/// A mock Saleor GraphQL API.
pub struct MockSaleor {
    /// The underlying server; mount extra mocks here.
    pub server: MockServer,
}

impl MockSaleor {
    /// Start an empty mock API.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// The GraphQL endpoint URL.
    ///
    /// # Panics
    ///
    /// Panics if the mock server URI is not a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("{}{GRAPHQL_PATH}", self.server.uri())).unwrap()
    }

    /// A mock for POSTs to the endpoint whose body mentions `operation`.
    #[must_use]
    pub fn operation(operation: &str) -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .and(body_string_contains(operation))
    }

    /// `tokenCreate` succeeds with `token` / `refresh_token`.
    pub async fn mount_token_create(&self, token: &str, refresh_token: &str) {
        Self::operation("tokenCreate")
            .respond_with(graphql_data(json!({
                "tokenCreate": { "token": token, "refreshToken": refresh_token, "errors": [] }
            })))
            .mount(&self.server)
            .await;
    }

    /// `tokenRefresh` succeeds with `token` after `delay`, exactly `calls` times.
    pub async fn mount_token_refresh(&self, token: &str, delay: Duration, calls: u64) {
        Self::operation("tokenRefresh")
            .respond_with(
                graphql_data(json!({ "tokenRefresh": { "token": token, "errors": [] } }))
                    .set_delay(delay),
            )
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// `tokenRefresh` is rejected as an invalid token.
    pub async fn mount_token_refresh_rejected(&self) {
        Self::operation("tokenRefresh")
            .respond_with(graphql_data(json!({
                "tokenRefresh": {
                    "token": null,
                    "errors": [{
                        "field": "refreshToken",
                        "message": "Invalid token",
                        "code": "JWT_INVALID_TOKEN"
                    }]
                }
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// A `me` query answering with `email`.
    pub async fn mount_me(&self, email: &str) {
        Self::operation("me {")
            .respond_with(graphql_data(json!({ "me": { "email": email } })))
            .mount(&self.server)
            .await;
    }

    /// Requests received whose body mentions `operation`.
    ///
    /// # Panics
    ///
    /// Panics if request recording is disabled.
    #[allow(clippy::unwrap_used)]
    pub async fn requests_for(&self, operation: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| String::from_utf8_lossy(&r.body).contains(operation))
            .collect()
    }

    /// A client for this API on one context of `storage`, listening for
    /// changes made by other contexts.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn client(&self, storage: &MemoryStorage) -> SaleorAuthClient {
        SaleorAuthClient::builder(
            AuthClientConfig::new(self.api_url()),
            Arc::new(storage.clone()),
        )
        .event_source(Arc::new(storage.clone()))
        .build()
        .unwrap()
    }

    /// Like [`client`](Self::client), recording refresh notifications.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn observed_client(&self, storage: &MemoryStorage) -> (SaleorAuthClient, RefreshLog) {
        let log = RefreshLog::default();
        let sink = log.clone();
        let client = SaleorAuthClient::builder(
            AuthClientConfig::new(self.api_url()),
            Arc::new(storage.clone()),
        )
        .event_source(Arc::new(storage.clone()))
        .on_auth_refresh(move |refreshing: bool| sink.record(refreshing))
        .build()
        .unwrap();
        (client, log)
    }
}

/// A 200 response carrying `{"data": data}`.
#[must_use]
pub fn graphql_data(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
}

/// The `Authorization` header of `request`, if any.
#[must_use]
pub fn authorization(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Refresh notifications received by an observer, in order.
#[derive(Debug, Clone, Default)]
pub struct RefreshLog(Arc<Mutex<Vec<bool>>>);

impl RefreshLog {
    fn record(&self, refreshing: bool) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(refreshing);
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<bool> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
