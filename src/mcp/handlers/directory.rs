//! Handler for the `list-mcp-servers` tool.

use crate::{
    catalog::{McpQuery, McpSort},
    mcp::{SharedCatalog, format::to_payload, handlers::parse_arguments},
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

/// Request payload for the `list-mcp-servers` tool.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListMcpRequest {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) category: Option<String>,
    #[serde(default)]
    pub(crate) sort: Option<String>,
}

/// Handle the `list-mcp-servers` tool by searching the bundled directory.
pub(crate) async fn handle_list_mcp(
    catalog: &SharedCatalog,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: ListMcpRequest = parse_arguments(arguments)?;
    let sort = match args.sort.as_deref() {
        None => McpSort::default(),
        Some(raw) => raw.parse::<McpSort>().map_err(|()| {
            McpError::invalid_params(
                format!("Unknown sort order `{raw}`; expected rating, downloads, or name"),
                None,
            )
        })?,
    };
    let servers = catalog.list_mcp(&McpQuery {
        search: args.search,
        category: args.category,
        sort,
    });
    tracing::debug!(count = servers.len(), "Listed MCP servers");
    Ok(CallToolResult::structured(json!({
        "count": servers.len(),
        "servers": to_payload(&servers)?,
    })))
}
