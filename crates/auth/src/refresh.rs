//! Single-flight access token refresh.
//!
//! Every authenticated request asks the [`RefreshCoordinator`] for a bearer
//! token first. The coordinator answers from memory while the access token is
//! valid, passes the request through anonymously when there is nothing to
//! refresh with, and otherwise makes sure exactly one `tokenRefresh` call is
//! in flight no matter how many requests hit an expired token at once.
//!
//! # Refresh operation
//!
//! The in-flight slot holds a [`Shared`] future. Only the caller that finds the
//! slot empty (under its lock) may fill it; everyone else awaits the same
//! handle. The network call runs on a spawned task, so it settles and updates
//! the session even if every waiter is cancelled. Settlement happens on that
//! task, exactly once, before the slot is cleared:
//!
//! | outcome | access token | refresh token | auth state | waiters get |
//! |---------|--------------|---------------|------------|-------------|
//! | refreshed | replaced | replaced if rotated | `signedIn` | the new token |
//! | rejected | dropped | removed | `signedOut` | no token (anonymous) |
//! | unreachable | kept | kept | unchanged | `AuthClientError::Refresh` |

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use saleor_checkout_core::{AccessToken, AuthState, RefreshToken};
use serde::Serialize;
use url::Url;

use crate::error::AuthClientError;
use crate::graphql::GraphQLResponse;
use crate::graphql::mutations::TOKEN_REFRESH;
use crate::graphql::types::{TokenPayload, TokenRefreshData, TokenRefreshVariables};
use crate::observer::AuthRefreshObserver;
use crate::storage::AuthStorage;

/// Where the coordinator stands for the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No usable access token and no refresh token: requests go out anonymously.
    NoToken,
    /// A valid access token is held in memory.
    ValidToken,
    /// The access token is missing or expired; the next request starts a refresh.
    ExpiredTokenNoRefreshInFlight,
    /// A refresh is in flight; requests wait for it.
    RefreshInFlight,
}

#[derive(Debug, Clone)]
enum RefreshOutcome {
    Refreshed(AccessToken),
    Rejected,
    Unreachable(Arc<reqwest::Error>),
    Interrupted,
}

type RefreshOperation = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Serialize)]
struct RefreshBody<'a> {
    query: &'static str,
    variables: TokenRefreshVariables<'a>,
}

/// Owns the in-memory access token and the single refresh slot.
pub(crate) struct RefreshCoordinator {
    access_token: RwLock<Option<AccessToken>>,
    in_flight: Mutex<Option<RefreshOperation>>,
    storage: Arc<AuthStorage>,
    observer: Option<Arc<dyn AuthRefreshObserver>>,
    http: reqwest::Client,
    api_url: Url,
    grace: Duration,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        storage: Arc<AuthStorage>,
        observer: Option<Arc<dyn AuthRefreshObserver>>,
        http: reqwest::Client,
        api_url: Url,
        grace: Duration,
    ) -> Self {
        Self {
            access_token: RwLock::new(None),
            in_flight: Mutex::new(None),
            storage,
            observer,
            http,
            api_url,
            grace,
        }
    }

    /// The bearer token for the next request.
    ///
    /// `Ok(None)` means the request should go out without credentials, either
    /// because nothing is stored or because the backend rejected the refresh.
    pub(crate) async fn authorize(self: &Arc<Self>) -> Result<Option<AccessToken>, AuthClientError> {
        let operation = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            // Checked under the slot lock: a refresh that settled while we
            // waited for it has already stored its token.
            if let Some(token) = self.valid_access_token() {
                return Ok(Some(token));
            }

            if let Some(operation) = slot.as_ref() {
                tracing::debug!("joining in-flight token refresh");
                operation.clone()
            } else {
                let Some(refresh_token) = self.storage.get_refresh_token() else {
                    tracing::debug!("no refresh token; sending request anonymously");
                    return Ok(None);
                };
                let operation = self.start_refresh(refresh_token);
                *slot = Some(operation.clone());
                operation
            }
        };

        match operation.await {
            RefreshOutcome::Refreshed(token) => Ok(Some(token)),
            RefreshOutcome::Rejected => Ok(None),
            RefreshOutcome::Unreachable(e) => Err(AuthClientError::Refresh(e)),
            RefreshOutcome::Interrupted => Err(AuthClientError::RefreshInterrupted),
        }
    }

    pub(crate) fn state(&self) -> RefreshState {
        if self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            RefreshState::RefreshInFlight
        } else if self.valid_access_token().is_some() {
            RefreshState::ValidToken
        } else if self.storage.get_refresh_token().is_some() {
            RefreshState::ExpiredTokenNoRefreshInFlight
        } else {
            RefreshState::NoToken
        }
    }

    /// The in-memory token, expired or not.
    pub(crate) fn current_access_token(&self) -> Option<AccessToken> {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The in-memory token if it is outside the grace period of its expiry.
    pub(crate) fn valid_access_token(&self) -> Option<AccessToken> {
        let now = Utc::now();
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| !token.is_expired_at(now, self.grace))
            .cloned()
    }

    pub(crate) fn set_access_token(&self, token: Option<AccessToken>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn start_refresh(self: &Arc<Self>, refresh_token: RefreshToken) -> RefreshOperation {
        let task = tokio::spawn(Arc::clone(self).run_refresh(refresh_token));

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "token refresh task failed");
                RefreshOutcome::Interrupted
            })
        }
        .boxed()
        .shared()
    }

    async fn run_refresh(self: Arc<Self>, refresh_token: RefreshToken) -> RefreshOutcome {
        let _settled = SettleGuard(&self);
        self.notify_observer(true);
        tracing::debug!("refreshing access token");

        match self.request_refresh(&refresh_token).await {
            Ok(payload) => {
                let issued = payload.as_ref().and_then(TokenPayload::issued_token);
                if let Some(token) = issued {
                    let token = AccessToken::new(token);
                    self.set_access_token(Some(token.clone()));
                    if let Some(rotated) = payload.as_ref().and_then(TokenPayload::issued_refresh_token)
                    {
                        self.storage.set_refresh_token(&RefreshToken::new(rotated));
                    }
                    self.storage.set_auth_state(AuthState::SignedIn);
                    tracing::info!("access token refreshed");
                    RefreshOutcome::Refreshed(token)
                } else {
                    let codes: Vec<&str> = payload
                        .iter()
                        .flat_map(|p| p.errors.iter().map(|e| e.code.as_str()))
                        .collect();
                    tracing::warn!(?codes, "token refresh rejected; signing out");
                    self.set_access_token(None);
                    self.storage.clear_auth_storage();
                    RefreshOutcome::Rejected
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh request failed");
                RefreshOutcome::Unreachable(Arc::new(e))
            }
        }
    }

    async fn request_refresh(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<Option<TokenPayload>, reqwest::Error> {
        let body = RefreshBody {
            query: TOKEN_REFRESH,
            variables: TokenRefreshVariables {
                refresh_token: refresh_token.expose(),
            },
        };

        let response: GraphQLResponse<TokenRefreshData> = self
            .http
            .post(self.api_url.clone())
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        Ok(response.data.and_then(|data| data.token_refresh))
    }

    fn notify_observer(&self, is_refreshing: bool) {
        if let Some(observer) = &self.observer {
            observer.on_auth_refresh(is_refreshing);
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("state", &self.state())
            .field("api_url", &self.api_url.as_str())
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight slot and reports the settle, even if the refresh
/// task unwinds.
struct SettleGuard<'a>(&'a RefreshCoordinator);

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        self.0
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.0.notify_observer(false);
    }
}
