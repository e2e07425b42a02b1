//! Handler for the metrics tool.

use crate::mcp::{SharedCatalog, format::to_payload};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

/// Structured output of the `metrics` tool.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetricsPayload {
    /// Successful catalog reads.
    pub(crate) reads: u64,
    /// Successful creates, edits, visibility changes, and deletes.
    pub(crate) mutations: u64,
    /// Copy and download counter bumps.
    pub(crate) counter_increments: u64,
    /// Backend calls that failed.
    pub(crate) failures: u64,
}

/// Handle the `metrics` tool, returning the current catalog counters.
pub(crate) async fn handle_metrics(catalog: &SharedCatalog) -> Result<CallToolResult, McpError> {
    let snapshot = catalog.metrics_snapshot();
    let payload = MetricsPayload {
        reads: snapshot.reads,
        mutations: snapshot.mutations,
        counter_increments: snapshot.counter_increments,
        failures: snapshot.failures,
    };
    Ok(CallToolResult::structured(to_payload(&payload)?))
}
