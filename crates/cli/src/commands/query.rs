//! Run an arbitrary GraphQL document with the session's credentials.

use std::io::Read;

use saleor_checkout_auth::{GraphQLRequest, GraphQLResponse, SaleorAuthClient};

use super::CommandError;

/// Execute the document at `source` (`-` for stdin) and print the response.
///
/// GraphQL errors are printed with the response and logged, not returned.
///
/// # Errors
///
/// Returns `CommandError` if the document or variables cannot be read, or
/// the request fails.
pub async fn run(
    client: &SaleorAuthClient,
    source: &str,
    variables: Option<&str>,
) -> Result<(), CommandError> {
    let document = read_document(source)?;
    let request = match variables {
        Some(raw) => GraphQLRequest {
            query: document,
            variables: Some(serde_json::from_str(raw)?),
        },
        None => GraphQLRequest::new(document),
    };

    let response: GraphQLResponse<serde_json::Value> = client.execute(&request).await?;
    if response.has_errors() {
        tracing::warn!("Response contains GraphQL errors");
    }

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    Ok(())
}

fn read_document(source: &str) -> Result<String, CommandError> {
    if source == "-" {
        let mut document = String::new();
        std::io::stdin()
            .read_to_string(&mut document)
            .map_err(|e| CommandError::Read("stdin".to_string(), e))?;
        return Ok(document);
    }

    std::fs::read_to_string(source).map_err(|e| CommandError::Read(source.to_string(), e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_document_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.graphql");
        std::fs::write(&path, "query { me { email } }").unwrap();

        assert_eq!(
            read_document(path.to_str().unwrap()).unwrap(),
            "query { me { email } }"
        );
    }

    #[test]
    fn test_read_document_missing_file() {
        let err = read_document("/nonexistent/query.graphql").unwrap_err();
        assert!(err.to_string().starts_with("Failed to read /nonexistent/query.graphql"));
    }
}
