//! Integration tests for sign-in, password reset and sign-out.

use pretty_assertions::assert_eq;
use saleor_checkout_auth::graphql::types::{PasswordResetVariables, TokenCreateVariables};
use saleor_checkout_auth::storage::{STORAGE_AUTH_STATE_KEY, STORAGE_REFRESH_TOKEN_KEY};
use saleor_checkout_auth::{
    AuthState, GraphQLRequest, GraphQLResponse, MemoryStorage, RefreshState, Storage,
};
use saleor_checkout_integration_tests::{MockSaleor, authorization, fresh_jwt, graphql_data};
use secrecy::SecretString;
use serde_json::json;

fn credentials() -> TokenCreateVariables {
    TokenCreateVariables::new(
        "customer@example.com",
        SecretString::from("correct horse".to_string()),
    )
}

#[tokio::test]
async fn test_sign_in_creates_session() {
    let api = MockSaleor::start().await;
    let token = fresh_jwt("T1");
    api.mount_token_create(&token, "R1").await;
    api.mount_me("customer@example.com").await;

    let storage = MemoryStorage::new();
    let client = api.client(&storage);

    let response = client.sign_in(&credentials()).await.unwrap();
    let payload = response.data.unwrap().token_create.unwrap();
    assert_eq!(payload.token.as_deref(), Some(token.as_str()));

    assert_eq!(
        storage.get_item(STORAGE_REFRESH_TOKEN_KEY).as_deref(),
        Some("R1")
    );
    assert_eq!(
        storage.get_item(STORAGE_AUTH_STATE_KEY).as_deref(),
        Some("signedIn")
    );
    assert_eq!(client.refresh_state(), RefreshState::ValidToken);

    // The in-memory token is attached to the next request.
    let _: GraphQLResponse<serde_json::Value> = client
        .execute(&GraphQLRequest::new("query { me { email } }"))
        .await
        .unwrap();
    let me = api.requests_for("me {").await;
    assert_eq!(authorization(&me[0]), Some(format!("Bearer {token}")));
}

#[tokio::test]
async fn test_sign_in_credentials_are_sent() {
    let api = MockSaleor::start().await;
    api.mount_token_create(&fresh_jwt("T1"), "R1").await;

    let storage = MemoryStorage::new();
    api.client(&storage).sign_in(&credentials()).await.unwrap();

    let requests = api.requests_for("tokenCreate").await;
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["variables"],
        json!({ "email": "customer@example.com", "password": "correct horse" })
    );
    assert_eq!(authorization(&requests[0]), None);
}

#[tokio::test]
async fn test_rejected_sign_in_returns_errors_and_signs_out() {
    let api = MockSaleor::start().await;
    MockSaleor::operation("tokenCreate")
        .respond_with(graphql_data(json!({
            "tokenCreate": {
                "token": null,
                "refreshToken": null,
                "errors": [{
                    "field": "email",
                    "message": "Please, enter valid credentials",
                    "code": "INVALID_CREDENTIALS"
                }]
            }
        })))
        .mount(&api.server)
        .await;

    let storage = MemoryStorage::new();
    storage.set_item(STORAGE_AUTH_STATE_KEY, "signedIn");
    let client = api.client(&storage);

    let response = client.sign_in(&credentials()).await.unwrap();

    let payload = response.data.unwrap().token_create.unwrap();
    assert_eq!(payload.errors.len(), 1);
    assert_eq!(client.auth_state(), AuthState::SignedOut);
    assert!(storage.get_item(STORAGE_REFRESH_TOKEN_KEY).is_none());
}

#[tokio::test]
async fn test_reset_password_signs_in() {
    let api = MockSaleor::start().await;
    MockSaleor::operation("setPassword")
        .respond_with(graphql_data(json!({
            "setPassword": { "token": fresh_jwt("T1"), "refreshToken": "R9", "errors": [] }
        })))
        .expect(1)
        .mount(&api.server)
        .await;

    let storage = MemoryStorage::new();
    let client = api.client(&storage);

    client
        .reset_password(&PasswordResetVariables {
            email: "customer@example.com".to_string(),
            password: SecretString::from("new password".to_string()),
            token: "set-password-token".to_string(),
        })
        .await
        .unwrap();

    assert!(client.is_signed_in());
    assert_eq!(
        storage.get_item(STORAGE_REFRESH_TOKEN_KEY).as_deref(),
        Some("R9")
    );
}

#[tokio::test]
async fn test_sign_out_makes_requests_anonymous() {
    let api = MockSaleor::start().await;
    api.mount_token_create(&fresh_jwt("T1"), "R1").await;
    api.mount_me("customer@example.com").await;

    let storage = MemoryStorage::new();
    let client = api.client(&storage);
    client.sign_in(&credentials()).await.unwrap();

    client.sign_out();

    assert_eq!(client.auth_state(), AuthState::SignedOut);
    assert_eq!(client.refresh_state(), RefreshState::NoToken);
    assert!(storage.get_item(STORAGE_REFRESH_TOKEN_KEY).is_none());

    let _: GraphQLResponse<serde_json::Value> = client
        .execute(&GraphQLRequest::new("query { me { email } }"))
        .await
        .unwrap();
    let me = api.requests_for("me {").await;
    assert_eq!(authorization(&me[0]), None);
}

#[tokio::test]
async fn test_clones_share_the_session() {
    let api = MockSaleor::start().await;
    api.mount_token_create(&fresh_jwt("T1"), "R1").await;

    let storage = MemoryStorage::new();
    let client = api.client(&storage);
    let clone = client.clone();

    client.sign_in(&credentials()).await.unwrap();

    assert_eq!(clone.refresh_state(), RefreshState::ValidToken);
    clone.sign_out();
    assert_eq!(client.refresh_state(), RefreshState::NoToken);
}
