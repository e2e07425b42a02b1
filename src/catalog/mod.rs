//! Prompt, rule, and MCP listing catalog.

pub mod directory;
pub mod export;
pub mod filter;
pub mod listing;
pub mod service;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod fake;

pub use directory::{DirectoryError, McpDirectory};
pub use export::{ExportedDocument, export_prompt, export_rule, rule_document};
pub use filter::PromptFilter;
pub use listing::{Keyed, ListView, PageWindow};
pub use service::{CatalogApi, CatalogService};
pub use types::*;
