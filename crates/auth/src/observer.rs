//! Refresh notifications.

/// Told when a token refresh starts and when it settles.
///
/// For every refresh operation the client calls `on_auth_refresh(true)` once
/// before the refresh request is sent and `on_auth_refresh(false)` once after
/// it settles, whatever the outcome. Requests that join an operation already
/// in flight do not trigger additional calls.
///
/// Calls happen on the refresh task; implementations must not block.
pub trait AuthRefreshObserver: Send + Sync {
    /// `is_refreshing` is `true` at start and `false` at settle.
    fn on_auth_refresh(&self, is_refreshing: bool);
}

impl<F> AuthRefreshObserver for F
where
    F: Fn(bool) + Send + Sync,
{
    fn on_auth_refresh(&self, is_refreshing: bool) {
        self(is_refreshing);
    }
}
