//! Handlers for the rule tools.

use crate::{
    catalog::{ListScope, RuleQuery},
    mcp::{
        SharedCatalog,
        format::{rule_with_document, to_payload},
        handlers::{map_catalog_error, parse_arguments, require_id},
    },
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

/// Request payload for the `list-rules` tool.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListRulesRequest {
    #[serde(default)]
    pub(crate) framework: Option<String>,
    #[serde(default)]
    pub(crate) language: Option<String>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) page: Option<usize>,
}

/// Request payload for the `get-rule` tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GetRuleRequest {
    pub(crate) id: String,
}

/// Handle the `list-rules` tool, returning one page of public rules.
pub(crate) async fn handle_list_rules(
    catalog: &SharedCatalog,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: ListRulesRequest = parse_arguments(arguments)?;
    if args.page == Some(0) {
        return Err(McpError::invalid_params("`page` starts at 1", None));
    }
    let query = RuleQuery {
        scope: ListScope::Public,
        framework: args.framework,
        language: args.language,
        search: args.search,
        page: args.page.unwrap_or(1),
    };
    let page = catalog
        .list_rules(&query, None)
        .await
        .map_err(map_catalog_error)?;
    Ok(CallToolResult::structured(json!({
        "rules": to_payload(&page.rules)?,
        "page": page.page,
        "pageSize": page.page_size,
        "hasMore": page.has_more,
    })))
}

/// Handle the `get-rule` tool, attaching the exported `.mdc` document.
pub(crate) async fn handle_get_rule(
    catalog: &SharedCatalog,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: GetRuleRequest = parse_arguments(arguments)?;
    let id = require_id(&args.id)?;
    let rule = catalog
        .get_rule(id, None)
        .await
        .map_err(map_catalog_error)?;
    Ok(CallToolResult::structured(rule_with_document(&rule)?))
}
