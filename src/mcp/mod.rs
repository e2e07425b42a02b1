//! Model Context Protocol (MCP) integration for Promptshelf.
//!
//! This module exposes the public catalog to editors and agent hosts over stdio. The surface is
//! read-only and anonymous:
//!
//! - Tools: `list-prompts`, `get-prompt`, `list-rules`, `get-rule`, `list-mcp-servers`, and
//!   `metrics`.
//! - Resources: `catalog://categories`, `catalog://health`, and a templated
//!   `catalog://rules/{id}` serving the rule's `.mdc` document.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::PromptshelfMcpServer;

use crate::catalog::CatalogApi;
use std::sync::Arc;

/// Catalog handle shared by every MCP handler.
pub type SharedCatalog = Arc<dyn CatalogApi>;
