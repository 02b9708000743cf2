//! Session commands: sign in, reset password, sign out, status, detach.

use saleor_checkout_auth::graphql::types::{
    CustomerDetachVariables, PasswordResetVariables, TokenCreateVariables, TokenPayload,
};
use saleor_checkout_auth::{CheckoutId, GraphQLRequest, GraphQLResponse, SaleorAuthClient};
use secrecy::SecretString;
use serde::Deserialize;

use super::{CommandError, rejection_reasons};

/// The signed-in customer.
const ME: &str = r"
    query me {
        me {
            email
            firstName
            lastName
        }
    }
";

#[derive(Debug, Deserialize)]
struct MeData {
    me: Option<Customer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

/// Sign in and persist the session.
///
/// # Errors
///
/// Returns `CommandError::Rejected` if the credentials are refused.
pub async fn sign_in(
    client: &SaleorAuthClient,
    email: String,
    password: SecretString,
) -> Result<(), CommandError> {
    tracing::info!("Signing in as {email}...");
    let response = client
        .sign_in(&TokenCreateVariables::new(email, password))
        .await?;
    let payload = response.data.as_ref().and_then(|d| d.token_create.as_ref());
    ensure_signed_in("Sign-in", payload, &response)?;

    tracing::info!("Signed in");
    Ok(())
}

/// Set a new password and persist the resulting session.
///
/// # Errors
///
/// Returns `CommandError::Rejected` if the reset token or password is refused.
pub async fn reset_password(
    client: &SaleorAuthClient,
    email: String,
    token: String,
    password: SecretString,
) -> Result<(), CommandError> {
    tracing::info!("Resetting password for {email}...");
    let response = client
        .reset_password(&PasswordResetVariables {
            email,
            password,
            token,
        })
        .await?;
    let payload = response.data.as_ref().and_then(|d| d.set_password.as_ref());
    ensure_signed_in("Password reset", payload, &response)?;

    tracing::info!("Password set; signed in");
    Ok(())
}

/// Forget the stored session.
pub fn sign_out(client: &SaleorAuthClient) {
    client.sign_out();
}

/// Print the session state and, when signed in, the customer.
///
/// # Errors
///
/// Returns `CommandError::Client` if the `me` query cannot be sent.
pub async fn status(client: &SaleorAuthClient) -> Result<(), CommandError> {
    #[allow(clippy::print_stdout)]
    {
        println!("API:        {}", client.api_url());
        println!("Auth state: {}", client.auth_state());
    }

    if !client.is_signed_in() {
        return Ok(());
    }

    let response: GraphQLResponse<MeData> = client.execute(&GraphQLRequest::new(ME)).await?;

    #[allow(clippy::print_stdout)]
    {
        match response.data.and_then(|d| d.me) {
            Some(customer) => {
                println!("Customer:   {}", customer.email);
                let name = format!("{} {}", customer.first_name, customer.last_name);
                if !name.trim().is_empty() {
                    println!("Name:       {}", name.trim());
                }
            }
            None => println!("Customer:   (session not accepted by the API)"),
        }
    }

    Ok(())
}

/// Detach the customer from a checkout and sign out.
///
/// # Errors
///
/// Returns `CommandError::Rejected` if there is no session to refresh or the
/// backend does not confirm the detach; the session is kept in that case.
pub async fn detach(client: &SaleorAuthClient, checkout: String) -> Result<(), CommandError> {
    // Only the refresh token survives between runs.
    if client.ensure_access_token().await?.is_none() {
        return Err(CommandError::Rejected {
            operation: "Checkout detach",
            reasons: "not signed in".to_string(),
        });
    }

    let response = client
        .checkout_sign_out(&CustomerDetachVariables {
            checkout_id: CheckoutId::new(checkout),
        })
        .await?;

    let payload = response
        .data
        .as_ref()
        .and_then(|d| d.checkout_customer_detach.as_ref());
    let mutation_errors = payload.map(|p| p.errors.as_slice()).unwrap_or_default();
    let graphql_errors = response.errors.as_deref().unwrap_or_default();

    if payload.is_none() || !mutation_errors.is_empty() || !graphql_errors.is_empty() {
        return Err(CommandError::Rejected {
            operation: "Checkout detach",
            reasons: rejection_reasons(mutation_errors, graphql_errors),
        });
    }

    tracing::info!("Customer detached; signed out");
    Ok(())
}

fn ensure_signed_in<T>(
    operation: &'static str,
    payload: Option<&TokenPayload>,
    response: &GraphQLResponse<T>,
) -> Result<(), CommandError> {
    if payload.and_then(TokenPayload::issued_token).is_some() {
        return Ok(());
    }

    let mutation_errors = payload.map(|p| p.errors.as_slice()).unwrap_or_default();
    let graphql_errors = response.errors.as_deref().unwrap_or_default();
    Err(CommandError::Rejected {
        operation,
        reasons: rejection_reasons(mutation_errors, graphql_errors),
    })
}
