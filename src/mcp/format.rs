//! Formatting helpers shared across MCP handlers and resources.

use crate::catalog::{
    BackendHealth, PROMPT_CATEGORIES, RULE_FRAMEWORKS, RULE_LANGUAGES, Rule, export_rule,
};
use rmcp::{ErrorData as McpError, model::ResourceContents};
use serde::Serialize;
use serde_json::{Map, Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";
pub(crate) const TEXT_MARKDOWN: &str = "text/markdown";

/// Static vocabulary used by the prompt and rule forms.
pub(crate) fn categories_payload(mcp_categories: &[String]) -> String {
    let payload = json!({
        "promptCategories": PROMPT_CATEGORIES,
        "ruleFrameworks": RULE_FRAMEWORKS,
        "ruleLanguages": RULE_LANGUAGES,
        "mcpCategories": mcp_categories,
    });
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

/// Build the health payload summarizing backend reachability.
pub(crate) fn health_payload(health: &BackendHealth, mcp_listings: usize) -> String {
    let mut backend = Map::new();
    backend.insert("reachable".into(), Value::Bool(health.reachable));
    if let Some(error) = health.error.as_ref() {
        backend.insert("error".into(), Value::String(error.clone()));
    }

    let payload = json!({
        "backend": Value::Object(backend),
        "mcpDirectory": { "listings": mcp_listings },
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

/// Convert a catalog record into a structured tool payload.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|err| McpError::internal_error(err.to_string(), None))
}

/// Rule record plus its exported `.mdc` document.
pub(crate) fn rule_with_document(rule: &Rule) -> Result<Value, McpError> {
    let document = export_rule(rule);
    let mut payload = to_payload(rule)?;
    if let Value::Object(map) = &mut payload {
        map.insert("fileName".into(), Value::String(document.file_name));
        map.insert("document".into(), Value::String(document.content));
    }
    Ok(payload)
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Build markdown resource contents for exported documents.
pub(crate) fn markdown_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(TEXT_MARKDOWN.into()),
        text,
        meta: None,
    }
}
