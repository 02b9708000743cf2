//! Authenticated Saleor GraphQL client.
//!
//! [`SaleorAuthClient`] is the single entry point for GraphQL operations. It
//! attaches the bearer token, routes through the
//! [`RefreshCoordinator`](crate::refresh) when the token has expired, and
//! exposes the sign-in, password-reset and sign-out operations that create
//! and destroy the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use saleor_checkout_core::{AccessToken, AuthState, RefreshToken};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::instrument;
use url::Url;

use crate::config::AuthClientConfig;
use crate::error::AuthClientError;
use crate::events::{AuthStateBridge, StorageEventSource};
use crate::graphql::mutations::{CHECKOUT_CUSTOMER_DETACH, PASSWORD_RESET, TOKEN_CREATE};
use crate::graphql::types::{
    CustomerDetachData, CustomerDetachVariables, PasswordResetData, PasswordResetVariables,
    SignInData, TokenCreateData, TokenCreateVariables,
};
use crate::graphql::{GraphQLRequest, GraphQLResponse};
use crate::observer::AuthRefreshObserver;
use crate::refresh::{RefreshCoordinator, RefreshState};
use crate::storage::{AuthStorage, Storage};

/// Authenticated Saleor GraphQL client.
///
/// Cheap to clone; clones share the session (access token, refresh slot,
/// storage and cross-context bridge).
///
/// # Session
///
/// - The access token lives only in memory.
/// - The refresh token and the `signedIn`/`signedOut` state live in the
///   configured [`Storage`], shared with every other context using it.
/// - Authentication failures never surface as errors. A rejected sign-in or
///   refresh leaves the client signed out and requests go out anonymously;
///   callers inspect the returned GraphQL errors.
#[derive(Clone)]
pub struct SaleorAuthClient {
    inner: Arc<SaleorAuthClientInner>,
}

struct SaleorAuthClientInner {
    config: AuthClientConfig,
    http: reqwest::Client,
    storage: Arc<AuthStorage>,
    coordinator: Arc<RefreshCoordinator>,
    bridge: Option<AuthStateBridge>,
    cleaned_up: AtomicBool,
}

/// Builder for [`SaleorAuthClient`].
pub struct SaleorAuthClientBuilder {
    config: AuthClientConfig,
    storage: Arc<dyn Storage>,
    event_source: Option<Arc<dyn StorageEventSource>>,
    observer: Option<Arc<dyn AuthRefreshObserver>>,
    http: Option<reqwest::Client>,
}

impl SaleorAuthClientBuilder {
    /// Listen for auth-state changes made by other contexts sharing the
    /// storage. Usually the same handle passed as the storage.
    #[must_use]
    pub fn event_source(mut self, source: Arc<dyn StorageEventSource>) -> Self {
        self.event_source = Some(source);
        self
    }

    /// Call `observer` when a token refresh starts and settles.
    #[must_use]
    pub fn on_auth_refresh(mut self, observer: impl AuthRefreshObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Use an existing HTTP client instead of building one from the config.
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client and attach the cross-context bridge.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Http` if the HTTP client cannot be built.
    pub fn build(self) -> Result<SaleorAuthClient, AuthClientError> {
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.config.http_timeout)
                .build()?,
        };

        let storage = Arc::new(AuthStorage::new(self.storage, self.config.storage_keys()));
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&storage),
            self.observer,
            http.clone(),
            self.config.api_url.clone(),
            self.config.token_grace_period,
        ));
        let bridge = self
            .event_source
            .map(|source| AuthStateBridge::attach(source, Arc::clone(&storage)));

        tracing::debug!(
            api_url = %self.config.api_url,
            cross_context = bridge.is_some(),
            "auth client created"
        );

        Ok(SaleorAuthClient {
            inner: Arc::new(SaleorAuthClientInner {
                config: self.config,
                http,
                storage,
                coordinator,
                bridge,
                cleaned_up: AtomicBool::new(false),
            }),
        })
    }
}

impl SaleorAuthClient {
    /// Start building a client for `config`, persisting auth data in `storage`.
    #[must_use]
    pub fn builder(config: AuthClientConfig, storage: Arc<dyn Storage>) -> SaleorAuthClientBuilder {
        SaleorAuthClientBuilder {
            config,
            storage,
            event_source: None,
            observer: None,
            http: None,
        }
    }

    // =========================================================================
    // Authenticated Fetch
    // =========================================================================

    /// Send `request` with the session's bearer token.
    ///
    /// Refreshes the access token first if it has expired, sharing the
    /// refresh with any concurrent callers. Without a usable session the
    /// request is sent as is.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Refresh` if the refresh call could not reach
    /// the backend, or `AuthClientError::Http` if the request itself fails.
    pub async fn fetch_with_auth(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AuthClientError> {
        let request = match self.inner.coordinator.authorize().await? {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        };

        Ok(request.send().await?)
    }

    /// Execute a GraphQL operation with the session's credentials.
    ///
    /// GraphQL errors are returned in the response, not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Http` on network failures or an undecodable
    /// body, and `AuthClientError::Refresh` as for [`fetch_with_auth`].
    ///
    /// [`fetch_with_auth`]: SaleorAuthClient::fetch_with_auth
    #[instrument(skip(self, request))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &GraphQLRequest,
    ) -> Result<GraphQLResponse<T>, AuthClientError> {
        let response = self.fetch_with_auth(self.graphql_request(request)).await?;
        Ok(response.json().await?)
    }

    /// A POST of `request` to the API URL, without credentials.
    #[must_use]
    pub fn graphql_request(&self, request: &GraphQLRequest) -> reqwest::RequestBuilder {
        self.inner
            .http
            .post(self.inner.config.api_url.clone())
            .json(request)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// On success the access token is kept in memory, the refresh token is
    /// persisted and the state becomes `signedIn`. On mutation errors or a
    /// missing token the state becomes `signedOut`. The response is returned
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Http` if the request fails or the body
    /// cannot be decoded.
    #[instrument(skip(self, variables), fields(email = %variables.email))]
    pub async fn sign_in(
        &self,
        variables: &TokenCreateVariables,
    ) -> Result<GraphQLResponse<TokenCreateData>, AuthClientError> {
        let response = self.post_anonymous(TOKEN_CREATE, variables).await?;
        self.handle_sign_in(&response);
        Ok(response)
    }

    /// Set a new password from a reset token, signing the customer in.
    ///
    /// Same response handling as [`sign_in`](SaleorAuthClient::sign_in).
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Http` if the request fails or the body
    /// cannot be decoded.
    #[instrument(skip(self, variables), fields(email = %variables.email))]
    pub async fn reset_password(
        &self,
        variables: &PasswordResetVariables,
    ) -> Result<GraphQLResponse<PasswordResetData>, AuthClientError> {
        let response = self.post_anonymous(PASSWORD_RESET, variables).await?;
        self.handle_sign_in(&response);
        Ok(response)
    }

    /// Drop the session locally: the in-memory token, the persisted refresh
    /// token and the auth state.
    pub fn sign_out(&self) {
        self.inner.coordinator.set_access_token(None);
        self.inner.storage.clear_auth_storage();
        tracing::info!("signed out");
    }

    /// The access token requests would carry now, refreshed first if it has
    /// expired.
    ///
    /// A process that starts from a persisted session holds only the refresh
    /// token; call this before [`checkout_sign_out`] there.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Refresh` if the refresh call could not reach
    /// the backend.
    ///
    /// [`checkout_sign_out`]: SaleorAuthClient::checkout_sign_out
    pub async fn ensure_access_token(&self) -> Result<Option<AccessToken>, AuthClientError> {
        self.inner.coordinator.authorize().await
    }

    /// Detach the customer from a checkout, then sign out.
    ///
    /// The mutation is sent with the current access token as is, without a
    /// refresh. The local session is only torn down when the backend
    /// confirms the detach: a payload is present, it carries no errors and
    /// the response has no top-level errors.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Http` if the request fails or the body
    /// cannot be decoded. The session is kept in that case.
    #[instrument(skip(self, variables), fields(checkout_id = %variables.checkout_id))]
    pub async fn checkout_sign_out(
        &self,
        variables: &CustomerDetachVariables,
    ) -> Result<GraphQLResponse<CustomerDetachData>, AuthClientError> {
        let request = GraphQLRequest::with_variables(CHECKOUT_CUSTOMER_DETACH, variables)?;
        let mut builder = self.graphql_request(&request);
        if let Some(token) = self.inner.coordinator.current_access_token() {
            builder = builder.bearer_auth(token.expose());
        }

        let response: GraphQLResponse<CustomerDetachData> = builder.send().await?.json().await?;

        let detached = !response.has_errors()
            && response
                .data
                .as_ref()
                .and_then(|data| data.checkout_customer_detach.as_ref())
                .is_some_and(|payload| payload.errors.is_empty());

        if detached {
            self.sign_out();
        } else {
            tracing::warn!("checkout customer detach not confirmed; keeping session");
        }

        Ok(response)
    }

    /// Detach from cross-context storage events.
    ///
    /// Call once when the client is no longer needed. Further calls log a
    /// warning and do nothing. Dropping the last clone also detaches.
    pub fn cleanup(&self) {
        if self.inner.cleaned_up.swap(true, Ordering::AcqRel) {
            tracing::warn!("auth client cleanup called more than once");
            return;
        }

        if let Some(bridge) = &self.inner.bridge {
            bridge.detach();
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The persisted auth state.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.inner.storage.get_auth_state()
    }

    /// Whether the persisted auth state is `signedIn`.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.auth_state().is_signed_in()
    }

    /// Auth-state changes, from this client and from other contexts.
    #[must_use]
    pub fn subscribe_auth_state(&self) -> broadcast::Receiver<AuthState> {
        self.inner.storage.subscribe()
    }

    /// How the next request would be authorized.
    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.inner.coordinator.state()
    }

    /// The GraphQL endpoint.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.inner.config.api_url
    }

    /// The underlying HTTP client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn post_anonymous<V: Serialize, T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &V,
    ) -> Result<GraphQLResponse<T>, AuthClientError> {
        let request = GraphQLRequest::with_variables(query, variables)?;
        Ok(self.graphql_request(&request).send().await?.json().await?)
    }

    fn handle_sign_in<D: SignInData>(&self, response: &GraphQLResponse<D>) {
        let Some(payload) = response.data.as_ref().and_then(SignInData::payload) else {
            tracing::debug!("sign-in response has no payload; session unchanged");
            return;
        };

        let Some(token) = payload.issued_token() else {
            let codes: Vec<&str> = payload.errors.iter().map(|e| e.code.as_str()).collect();
            tracing::warn!(?codes, "sign-in rejected");
            self.inner.storage.set_auth_state(AuthState::SignedOut);
            return;
        };

        self.inner
            .coordinator
            .set_access_token(Some(AccessToken::new(token)));
        if let Some(refresh_token) = payload.issued_refresh_token() {
            self.inner
                .storage
                .set_refresh_token(&RefreshToken::new(refresh_token));
        }
        self.inner.storage.set_auth_state(AuthState::SignedIn);
        tracing::info!("signed in");
    }
}

impl std::fmt::Debug for SaleorAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaleorAuthClient")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("auth_state", &self.auth_state())
            .field("refresh_state", &self.refresh_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use saleor_checkout_core::CheckoutId;
    use saleor_checkout_core::testing::fresh_jwt;
    use secrecy::SecretString;
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::storage::{MemoryStorage, STORAGE_AUTH_STATE_KEY, STORAGE_REFRESH_TOKEN_KEY};

    fn client(server: &MockServer, storage: &MemoryStorage) -> SaleorAuthClient {
        let config =
            AuthClientConfig::new(Url::parse(&format!("{}/graphql/", server.uri())).unwrap());
        SaleorAuthClient::builder(config, Arc::new(storage.clone()))
            .event_source(Arc::new(storage.clone()))
            .build()
            .unwrap()
    }

    fn credentials() -> TokenCreateVariables {
        TokenCreateVariables::new(
            "user@example.com",
            SecretString::from("hunter2".to_string()),
        )
    }

    fn authorization(request: &wiremock::Request) -> Option<String> {
        request
            .headers
            .get("authorization")
            .map(|value| value.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_sign_in_stores_session() {
        let server = MockServer::start().await;
        let token = fresh_jwt("T1");
        Mock::given(method("POST"))
            .and(path("/graphql/"))
            .and(body_string_contains("tokenCreate"))
            .and(body_string_contains("hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "tokenCreate": { "token": token, "refreshToken": "R1", "errors": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let client = client(&server, &storage);
        let mut rx = client.subscribe_auth_state();

        let response = client.sign_in(&credentials()).await.unwrap();

        assert!(!response.has_errors());
        assert_eq!(client.auth_state(), AuthState::SignedIn);
        assert_eq!(client.refresh_state(), RefreshState::ValidToken);
        assert_eq!(
            storage.get_item(STORAGE_REFRESH_TOKEN_KEY).as_deref(),
            Some("R1")
        );
        assert_eq!(rx.try_recv().unwrap(), AuthState::SignedIn);
        assert_eq!(
            client
                .inner
                .coordinator
                .current_access_token()
                .unwrap()
                .expose(),
            token
        );
    }

    #[tokio::test]
    async fn test_sign_in_with_errors_signs_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "tokenCreate": {
                    "token": null,
                    "refreshToken": null,
                    "errors": [{
                        "field": "email",
                        "message": "Please, enter valid credentials",
                        "code": "INVALID_CREDENTIALS"
                    }]
                } }
            })))
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        storage.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");
        let client = client(&server, &storage);

        let response = client.sign_in(&credentials()).await.unwrap();

        let payload = response.data.unwrap().token_create.unwrap();
        assert_eq!(payload.errors[0].code, "INVALID_CREDENTIALS");
        assert_eq!(client.auth_state(), AuthState::SignedOut);
        assert_eq!(client.refresh_state(), RefreshState::NoToken);
    }

    #[tokio::test]
    async fn test_sign_in_without_payload_leaves_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "Internal server error" }]
            })))
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        storage.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");
        let client = client(&server, &storage);

        let response = client.sign_in(&credentials()).await.unwrap();

        assert!(response.has_errors());
        assert_eq!(client.auth_state(), AuthState::SignedIn);
    }

    #[tokio::test]
    async fn test_reset_password_signs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("setPassword"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "setPassword": {
                    "token": fresh_jwt("T1"),
                    "refreshToken": "R1",
                    "errors": []
                } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let client = client(&server, &storage);

        client
            .reset_password(&PasswordResetVariables {
                email: "user@example.com".to_string(),
                password: SecretString::from("new-password".to_string()),
                token: "reset-token".to_string(),
            })
            .await
            .unwrap();

        assert!(client.is_signed_in());
        assert_eq!(
            storage.get_item(STORAGE_REFRESH_TOKEN_KEY).as_deref(),
            Some("R1")
        );
    }

    #[tokio::test]
    async fn test_execute_attaches_bearer_token() {
        let server = MockServer::start().await;
        let token = fresh_jwt("T1");
        Mock::given(method("POST"))
            .and(body_string_contains("tokenCreate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "tokenCreate": { "token": token, "refreshToken": "R1", "errors": [] } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("me {"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "me": { "email": "user@example.com" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let client = client(&server, &storage);
        client.sign_in(&credentials()).await.unwrap();

        let response: GraphQLResponse<serde_json::Value> = client
            .execute(&GraphQLRequest::new("query { me { email } }"))
            .await
            .unwrap();

        assert_eq!(
            response.into_data().unwrap(),
            json!({ "me": { "email": "user@example.com" } })
        );
        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            authorization(requests.last().unwrap()),
            Some(format!("Bearer {token}"))
        );
    }

    #[tokio::test]
    async fn test_anonymous_request_has_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "shop": { "name": "Demo" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let client = client(&server, &storage);

        let _: GraphQLResponse<serde_json::Value> = client
            .execute(&GraphQLRequest::new("query { shop { name } }"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(authorization(&requests[0]), None);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let server = MockServer::start().await;
        let storage = MemoryStorage::new();
        let client = client(&server, &storage);
        client
            .inner
            .coordinator
            .set_access_token(Some(AccessToken::new(fresh_jwt("T1"))));
        storage.set_item(STORAGE_REFRESH_TOKEN_KEY, "R1");
        storage.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");

        client.sign_out();

        assert!(client.inner.coordinator.current_access_token().is_none());
        assert!(storage.get_item(STORAGE_REFRESH_TOKEN_KEY).is_none());
        assert_eq!(client.auth_state(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_checkout_sign_out_uses_current_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("checkoutCustomerDetach"))
            .and(body_string_contains("Q2hlY2tvdXQ6MQ=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "checkoutCustomerDetach": { "errors": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let client = client(&server, &storage);
        let token = fresh_jwt("T1");
        client
            .inner
            .coordinator
            .set_access_token(Some(AccessToken::new(token.clone())));
        storage.set_item(STORAGE_REFRESH_TOKEN_KEY, "R1");
        storage.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");

        client
            .checkout_sign_out(&CustomerDetachVariables {
                checkout_id: CheckoutId::new("Q2hlY2tvdXQ6MQ=="),
            })
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            authorization(&requests[0]),
            Some(format!("Bearer {token}"))
        );
        assert_eq!(client.auth_state(), AuthState::SignedOut);
        assert!(storage.get_item(STORAGE_REFRESH_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_checkout_sign_out_keeps_session_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "checkoutCustomerDetach": { "errors": [{
                    "field": "id",
                    "message": "Couldn't resolve to a node",
                    "code": "NOT_FOUND"
                }] } }
            })))
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let client = client(&server, &storage);
        let token = fresh_jwt("T1");
        client
            .inner
            .coordinator
            .set_access_token(Some(AccessToken::new(token.clone())));
        storage.set_item(STORAGE_REFRESH_TOKEN_KEY, "R1");
        storage.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");

        client
            .checkout_sign_out(&CustomerDetachVariables {
                checkout_id: CheckoutId::new("missing"),
            })
            .await
            .unwrap();

        assert!(client.is_signed_in());
        assert_eq!(
            client
                .inner
                .coordinator
                .current_access_token()
                .unwrap()
                .expose(),
            token
        );
        assert_eq!(
            storage.get_item(STORAGE_REFRESH_TOKEN_KEY).as_deref(),
            Some("R1")
        );
    }

    #[tokio::test]
    async fn test_ensure_access_token_refreshes_restored_session() {
        let server = MockServer::start().await;
        let token = fresh_jwt("T2");
        Mock::given(method("POST"))
            .and(body_string_contains("tokenRefresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "tokenRefresh": { "token": token, "errors": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        storage.set_item(STORAGE_REFRESH_TOKEN_KEY, "R1");
        storage.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");
        let client = client(&server, &storage);
        assert_eq!(
            client.refresh_state(),
            RefreshState::ExpiredTokenNoRefreshInFlight
        );

        let refreshed = client.ensure_access_token().await.unwrap().unwrap();
        assert_eq!(refreshed.expose(), token);

        // Second call reuses the token.
        client.ensure_access_token().await.unwrap().unwrap();
        assert_eq!(client.refresh_state(), RefreshState::ValidToken);
    }

    #[tokio::test]
    async fn test_cleanup_detaches_once() {
        let server = MockServer::start().await;
        let storage = MemoryStorage::new();
        let other_tab = storage.context();
        let client = client(&server, &storage);
        let mut rx = client.subscribe_auth_state();
        assert_eq!(storage.listener_count(), 1);

        other_tab.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");
        assert_eq!(rx.try_recv().unwrap(), AuthState::SignedIn);

        client.cleanup();
        client.cleanup();
        assert_eq!(storage.listener_count(), 0);

        other_tab.set_item(STORAGE_AUTH_STATE_KEY, "signedOut");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
