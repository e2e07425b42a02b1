#![deny(missing_docs)]

//! Core library for Promptshelf: a shared catalog of AI prompts, editor rules, and MCP servers.

/// HTTP routing and REST handlers.
pub mod api;
/// Hosted data/auth service client.
pub mod backend;
/// List-state controllers shared by the CLI and tests.
pub mod browser;
/// Catalog records, validation, filtering, and the service layer.
pub mod catalog;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Catalog traffic counters.
pub mod metrics;
