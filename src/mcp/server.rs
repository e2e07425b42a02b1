//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    catalog::export_rule,
    mcp::{
        SharedCatalog,
        format::{
            categories_payload, health_payload, json_resource_contents,
            markdown_resource_contents,
        },
        handlers::{
            directory::handle_list_mcp,
            map_catalog_error,
            metrics::handle_metrics,
            prompts::{handle_get_prompt, handle_list_prompts},
            rules::{handle_get_rule, handle_list_rules},
        },
        registry, schemas,
    },
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, JsonObject,
        ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, RawResource,
        RawResourceTemplate, ReadResourceRequestParam, ReadResourceResult, Resource,
        ResourceTemplate, ServerCapabilities, ServerInfo, Tool, ToolAnnotations,
    },
};

const CATEGORIES_URI: &str = "catalog://categories";
const HEALTH_URI: &str = "catalog://health";
const RULE_TEMPLATE_URI: &str = "catalog://rules/{id}";
const RULE_PREFIX: &str = "catalog://rules/";

/// MCP server exposing the public Promptshelf catalog.
#[derive(Clone)]
pub struct PromptshelfMcpServer {
    catalog: SharedCatalog,
    registry: Arc<registry::Registry>,
}

impl PromptshelfMcpServer {
    /// Create a new MCP server over the supplied catalog.
    pub fn new(catalog: SharedCatalog) -> Self {
        let mut registry = registry::Registry::default();
        registry.register_resource(CATEGORIES_URI, resource_categories);
        registry.register_resource(HEALTH_URI, resource_health);

        registry.register_tool("list-prompts", tool_list_prompts);
        registry.register_tool("get-prompt", tool_get_prompt);
        registry.register_tool("list-rules", tool_list_rules);
        registry.register_tool("get-rule", tool_get_rule);
        registry.register_tool("list-mcp-servers", tool_list_mcp);
        registry.register_tool("metrics", tool_metrics);

        Self {
            catalog,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            read_only_tool(
                "list-prompts",
                "List Prompts",
                "Browse public prompts, optionally narrowed to a category and any of a set of tags.",
                schemas::list_prompts_input_schema(),
            ),
            read_only_tool(
                "get-prompt",
                "Get Prompt",
                "Fetch the full text of one public prompt by id.",
                schemas::id_input_schema("Prompt id"),
            ),
            read_only_tool(
                "list-rules",
                "List Rules",
                "Page through public editor rules filtered by framework, language, or search text.",
                schemas::list_rules_input_schema(),
            ),
            read_only_tool(
                "get-rule",
                "Get Rule",
                "Fetch one rule together with the .mdc document an editor can save directly.",
                schemas::id_input_schema("Rule id"),
            ),
            read_only_tool(
                "list-mcp-servers",
                "List MCP Servers",
                "Search the MCP server directory by text and category, sorted by rating, downloads, or name.",
                schemas::list_mcp_input_schema(),
            ),
            Tool {
                output_schema: Some(Arc::new(schemas::metrics_output_schema())),
                ..read_only_tool(
                    "metrics",
                    "Metrics Snapshot",
                    "Check catalog reads, mutations, counter increments, and failures at a glance.",
                    schemas::empty_object_schema(),
                )
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut categories = RawResource::new(CATEGORIES_URI, "categories");
        categories.description = Some(
            "Prompt categories, suggested rule frameworks and languages, and MCP categories"
                .into(),
        );

        let mut health = RawResource::new(HEALTH_URI, "health");
        health.description = Some("Hosted backend reachability".into());

        vec![categories.no_annotation(), health.no_annotation()]
    }

    fn describe_resource_templates(&self) -> Vec<ResourceTemplate> {
        let rule_template = RawResourceTemplate {
            uri_template: RULE_TEMPLATE_URI.into(),
            name: "rule-document".into(),
            title: Some("Rule Document".into()),
            description: Some(
                "The .mdc document for a public rule: replace {id} and call readResource".into(),
            ),
            mime_type: Some(super::format::TEXT_MARKDOWN.into()),
        };

        vec![rule_template.no_annotation()]
    }
}

fn read_only_tool(
    name: &'static str,
    title: &'static str,
    description: &'static str,
    schema: JsonObject,
) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: Some(title.to_string()),
        description: Some(Cow::Borrowed(description)),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: Some(
            ToolAnnotations::with_title(title)
                .read_only(true)
                .idempotent(true)
                .open_world(false),
        ),
        icons: None,
    }
}

fn resource_categories(
    server: &PromptshelfMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let categories = server.catalog.mcp_categories();
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                CATEGORIES_URI,
                categories_payload(&categories),
            )],
        })
    })
}

fn resource_health(
    server: &PromptshelfMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let catalog = server.catalog.clone();
    Box::pin(async move {
        let health = catalog.health().await;
        let listings = catalog.list_mcp(&Default::default()).len();
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                HEALTH_URI,
                health_payload(&health, listings),
            )],
        })
    })
}

fn tool_list_prompts(
    server: &PromptshelfMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let catalog = server.catalog.clone();
    Box::pin(async move { handle_list_prompts(&catalog, request.arguments).await })
}

fn tool_get_prompt(
    server: &PromptshelfMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let catalog = server.catalog.clone();
    Box::pin(async move { handle_get_prompt(&catalog, request.arguments).await })
}

fn tool_list_rules(
    server: &PromptshelfMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let catalog = server.catalog.clone();
    Box::pin(async move { handle_list_rules(&catalog, request.arguments).await })
}

fn tool_get_rule(
    server: &PromptshelfMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let catalog = server.catalog.clone();
    Box::pin(async move { handle_get_rule(&catalog, request.arguments).await })
}

fn tool_list_mcp(
    server: &PromptshelfMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let catalog = server.catalog.clone();
    Box::pin(async move { handle_list_mcp(&catalog, request.arguments).await })
}

fn tool_metrics(
    server: &PromptshelfMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let catalog = server.catalog.clone();
    Box::pin(async move { handle_metrics(&catalog).await })
}

impl ServerHandler for PromptshelfMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "promptshelf".to_string();
        implementation.title = Some("Promptshelf MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to find shared AI prompts, editor rules, and MCP servers. List with filters first, then fetch a single prompt or rule by id; get-rule returns a ready-to-save .mdc document.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_resource_templates(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourceTemplatesResult, McpError>> + Send + '_
    {
        let templates = self.describe_resource_templates();
        std::future::ready(Ok(ListResourceTemplatesResult::with_all_items(templates)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        let catalog = self.catalog.clone();
        async move {
            let uri = request.uri.clone();
            if let Some(rule_id) = uri.strip_prefix(RULE_PREFIX) {
                let rule_id = rule_id.trim();
                if rule_id.is_empty() {
                    return Err(McpError::invalid_params(
                        "Rule identifier missing in resource URI",
                        None,
                    ));
                }
                let rule = catalog
                    .get_rule(rule_id, None)
                    .await
                    .map_err(map_catalog_error)?;
                let document = export_rule(&rule);
                return Ok(ReadResourceResult {
                    contents: vec![markdown_resource_contents(&uri, document.content)],
                });
            }

            if let Some(handler) = self.registry.resources.get(uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {uri}"),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
