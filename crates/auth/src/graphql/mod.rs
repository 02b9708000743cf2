//! GraphQL request/response envelopes for the Saleor API.
//!
//! Requests are POSTed as `{query, variables}` JSON. Responses keep both the
//! `data` and the top-level `errors` so callers can inspect auth failures,
//! which this client never turns into errors on its own.

pub mod mutations;
pub mod types;

pub use types::*;

use serde::{Deserialize, Serialize};

use crate::error::AuthClientError;

/// A GraphQL operation ready to be POSTed.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    /// The GraphQL document.
    pub query: String,
    /// Operation variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

impl GraphQLRequest {
    /// A request without variables.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
        }
    }

    /// A request whose variables are serialized from `variables`.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::Parse` if the variables cannot be serialized.
    pub fn with_variables<V: Serialize>(
        query: impl Into<String>,
        variables: &V,
    ) -> Result<Self, AuthClientError> {
        Ok(Self {
            query: query.into(),
            variables: Some(serde_json::to_value(variables)?),
        })
    }
}

/// A decoded GraphQL response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLResponse<T> {
    /// Operation result, absent when the whole operation failed.
    pub data: Option<T>,
    /// Top-level GraphQL errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
}

impl<T> GraphQLResponse<T> {
    /// Whether the response carries top-level errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }

    /// Unwrap the data, turning top-level errors into an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthClientError::GraphQL` if the response has errors or no data.
    pub fn into_data(self) -> Result<T, AuthClientError> {
        if let Some(errors) = self.errors
            && !errors.is_empty()
        {
            return Err(AuthClientError::GraphQL(errors));
        }

        self.data.ok_or_else(|| {
            AuthClientError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                locations: vec![],
                path: vec![],
            }])
        })
    }
}

/// A GraphQL error returned by the Saleor API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Source locations in the query.
    #[serde(default)]
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            f.write_str("unknown error")?;
        } else {
            f.write_str(&self.message)?;
        }

        for (i, segment) in self.path.iter().enumerate() {
            f.write_str(if i == 0 { " at " } else { "." })?;
            match segment {
                serde_json::Value::String(field) => f.write_str(field)?,
                index => write!(f, "{index}")?,
            }
        }

        if let Some(location) = self.locations.first() {
            write!(f, " (line {}, column {})", location.line, location.column)?;
        }

        Ok(())
    }
}

/// Errors joined with `; ` for a single-line message.
pub(crate) fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "no details provided".to_string();
    }

    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
