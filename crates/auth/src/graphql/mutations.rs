//! Auth mutations sent to the Saleor API.

/// Exchange email/password for an access and refresh token.
pub const TOKEN_CREATE: &str = r"
    mutation tokenCreate($email: String!, $password: String!) {
        tokenCreate(email: $email, password: $password) {
            token
            refreshToken
            errors {
                field
                message
                code
            }
        }
    }
";

/// Mint a new access token from a refresh token.
pub const TOKEN_REFRESH: &str = r"
    mutation refreshToken($refreshToken: String!) {
        tokenRefresh(refreshToken: $refreshToken) {
            token
            errors {
                field
                message
                code
            }
        }
    }
";

/// Set a new password from a reset token; signs the customer in on success.
pub const PASSWORD_RESET: &str = r"
    mutation passwordReset($email: String!, $password: String!, $token: String!) {
        setPassword(email: $email, password: $password, token: $token) {
            token
            refreshToken
            errors {
                field
                message
                code
            }
        }
    }
";

/// Detach the signed-in customer from a checkout. Requires authorization.
pub const CHECKOUT_CUSTOMER_DETACH: &str = r"
    mutation checkoutCustomerDetach($checkoutId: ID!) {
        checkoutCustomerDetach(id: $checkoutId) {
            errors {
                field
                message
                code
            }
        }
    }
";
