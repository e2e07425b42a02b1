//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes the public Promptshelf catalog over stdio. Logs go to the
//! log file only so stdout stays reserved for the protocol.
use anyhow::{Context, Result};
use promptshelf::{
    catalog::{CatalogService, McpDirectory},
    config, logging,
    mcp::PromptshelfMcpServer,
};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing_file_only();

    let directory = McpDirectory::load(&config::get_config().mcp_directory_path)
        .context("failed to load MCP directory")?;
    let catalog = CatalogService::new(directory).context("failed to build catalog")?;
    let server = PromptshelfMcpServer::new(Arc::new(catalog));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
