//! Tool handlers for the MCP server.

use crate::catalog::CatalogError;
use rmcp::{ErrorData as McpError, model::JsonObject};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod directory;
pub mod metrics;
pub mod prompts;
pub mod rules;

/// Parse structured arguments supplied to a tool invocation.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    let value = arguments
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(JsonObject::new()));
    serde_json::from_value(value)
        .map_err(|err| McpError::invalid_params(format!("Invalid arguments: {err}"), None))
}

/// Translate a catalog failure into an MCP error; backend details stay in the log.
pub(crate) fn map_catalog_error(error: CatalogError) -> McpError {
    match error {
        CatalogError::Validation(message) => McpError::invalid_params(message, None),
        CatalogError::NotFound { .. } => McpError::invalid_params(error.to_string(), None),
        CatalogError::Unauthenticated { .. } | CatalogError::InvalidCredentials => {
            McpError::invalid_request(error.to_string(), None)
        }
        CatalogError::Conflict { .. } | CatalogError::Backend(_) => {
            tracing::error!(error = %error, "Catalog request failed");
            McpError::internal_error("The catalog service is unavailable", None)
        }
    }
}

/// Reject blank record identifiers before touching the catalog.
pub(crate) fn require_id(id: &str) -> Result<&str, McpError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(McpError::invalid_params("`id` must not be empty", None));
    }
    Ok(trimmed)
}
