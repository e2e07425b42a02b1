//! Handlers for the prompt tools.

use crate::{
    catalog::{
        ListScope, PromptFilter, TagInput,
        filter::{available_tags, filter_prompts},
        validate::{parse_tag_list, sanitize_tags},
    },
    mcp::{
        SharedCatalog,
        format::to_payload,
        handlers::{map_catalog_error, parse_arguments, require_id},
    },
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

/// Request payload for the `list-prompts` tool.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListPromptsRequest {
    #[serde(default)]
    pub(crate) category: Option<String>,
    /// Array of tags, or a comma-separated string.
    #[serde(default)]
    pub(crate) tags: Option<TagInput>,
}

/// Request payload for the `get-prompt` tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GetPromptRequest {
    pub(crate) id: String,
}

/// Handle the `list-prompts` tool over the public prompt collection.
pub(crate) async fn handle_list_prompts(
    catalog: &SharedCatalog,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: ListPromptsRequest = parse_arguments(arguments)?;
    let filter = PromptFilter {
        category: args.category,
        tags: match args.tags {
            None => Vec::new(),
            Some(TagInput::List(tags)) => sanitize_tags(tags),
            Some(TagInput::Text(raw)) => parse_tag_list(&raw),
        },
    };

    let prompts = catalog
        .list_prompts(ListScope::Public, None)
        .await
        .map_err(map_catalog_error)?;
    let matching: Vec<_> = filter_prompts(&prompts, &filter);
    Ok(CallToolResult::structured(json!({
        "count": matching.len(),
        "prompts": to_payload(&matching)?,
        "availableTags": available_tags(&prompts),
    })))
}

/// Handle the `get-prompt` tool.
pub(crate) async fn handle_get_prompt(
    catalog: &SharedCatalog,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: GetPromptRequest = parse_arguments(arguments)?;
    let id = require_id(&args.id)?;
    let prompt = catalog
        .get_prompt(id, None)
        .await
        .map_err(map_catalog_error)?;
    Ok(CallToolResult::structured(to_payload(&prompt)?))
}
