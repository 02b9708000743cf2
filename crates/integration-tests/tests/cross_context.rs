//! Integration tests for auth state propagation between contexts.
//!
//! Each `MemoryStorage::context()` handle stands in for a browser tab
//! sharing one `localStorage`.

use std::time::Duration;

use pretty_assertions::assert_eq;
use saleor_checkout_auth::graphql::types::TokenCreateVariables;
use saleor_checkout_auth::storage::STORAGE_AUTH_STATE_KEY;
use saleor_checkout_auth::{AuthState, MemoryStorage, RefreshState, Storage};
use saleor_checkout_integration_tests::{MockSaleor, fresh_jwt};
use secrecy::SecretString;
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn test_sign_in_in_one_tab_reaches_the_other() {
    let api = MockSaleor::start().await;
    api.mount_token_create(&fresh_jwt("T1"), "R1").await;

    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.context();
    let client_a = api.client(&tab_a);
    let client_b = api.client(&tab_b);
    let mut events_a = client_a.subscribe_auth_state();
    let mut events_b = client_b.subscribe_auth_state();

    client_a
        .sign_in(&TokenCreateVariables::new(
            "customer@example.com",
            SecretString::from("pw".to_string()),
        ))
        .await
        .unwrap();

    // Tab A hears its own write once, tab B hears it through the bridge.
    assert_eq!(events_a.try_recv().unwrap(), AuthState::SignedIn);
    assert!(matches!(events_a.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(events_b.try_recv().unwrap(), AuthState::SignedIn);
    assert!(client_b.is_signed_in());

    // Tab B shares the refresh token but not the access token.
    assert_eq!(
        client_b.refresh_state(),
        RefreshState::ExpiredTokenNoRefreshInFlight
    );
}

#[tokio::test]
async fn test_sign_out_is_delivered_exactly_once() {
    let api = MockSaleor::start().await;
    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.context();
    tab_a.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");

    let client_a = api.client(&tab_a);
    let client_b = api.client(&tab_b);
    let mut events_b = client_b.subscribe_auth_state();

    client_a.sign_out();
    assert_eq!(events_b.try_recv().unwrap(), AuthState::SignedOut);
    assert!(matches!(events_b.try_recv(), Err(TryRecvError::Empty)));

    // Writing the same value again is not a change.
    client_a.sign_out();
    assert!(matches!(events_b.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_unrelated_keys_are_ignored() {
    let api = MockSaleor::start().await;
    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.context();
    let client_b = api.client(&tab_b);
    let mut events_b = client_b.subscribe_auth_state();

    tab_a.set_item("checkout_id", "Q2hlY2tvdXQ6MQ==");
    tab_a.clear();

    assert!(matches!(events_b.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_cleanup_stops_delivery() {
    let api = MockSaleor::start().await;
    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.context();
    let client_b = api.client(&tab_b);
    let mut events_b = client_b.subscribe_auth_state();

    client_b.cleanup();
    client_b.cleanup();

    tab_a.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");
    assert!(matches!(events_b.try_recv(), Err(TryRecvError::Empty)));
    // The shared value is still readable.
    assert!(client_b.is_signed_in());
}

#[tokio::test]
async fn test_dropping_client_detaches() {
    let api = MockSaleor::start().await;
    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.context();

    let client_b = api.client(&tab_b);
    assert_eq!(tab_a.listener_count(), 1);
    drop(client_b);
    assert_eq!(tab_a.listener_count(), 0);
}

#[tokio::test]
async fn test_events_reach_async_subscribers() {
    let api = MockSaleor::start().await;
    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.context();
    let client_b = api.client(&tab_b);
    let mut events_b = client_b.subscribe_auth_state();

    let waiter = tokio::spawn(async move { events_b.recv().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    tab_a.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");

    assert_eq!(waiter.await.unwrap().unwrap(), AuthState::SignedIn);
}
