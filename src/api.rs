//! HTTP surface for Promptshelf.
//!
//! This module exposes an Axum router over the catalog:
//!
//! - `/prompts` – List (with category/tag selection), read, create, edit, delete, change
//!   visibility, and count copies of prompts. `GET /prompts/categories` returns the fixed
//!   category list.
//! - `/rules` – Paged listing with framework/language/search filters, filter dropdown values,
//!   `.mdc` export, create, edit, delete, visibility, copy and download counters.
//! - `/mcp` – Search, category, and sort over the MCP server directory plus detail lookups.
//! - `/auth` – Password sign-in, sign-out, and session lookup.
//! - `GET /metrics` – Catalog traffic counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Callers identify themselves with `Authorization: Bearer <access token>`. The same
//! [`CatalogApi`] backs the CLI and the MCP server, so behavior is identical across interfaces.

use crate::backend::AuthUser;
use crate::catalog::{
    CatalogApi, CatalogError, ListScope, McpQuery, McpSort, NewPrompt, NewRule, PROMPT_CATEGORIES,
    PromptFilter, PromptUpdate, RULE_FRAMEWORKS, RULE_LANGUAGES, RuleQuery, RuleUpdate, Session,
    export_rule,
    filter::{available_tags, filter_prompts},
    validate::parse_tag_list,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the HTTP router exposing the catalog API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: CatalogApi + 'static,
{
    Router::new()
        .route(
            "/prompts",
            get(list_prompts::<S>).post(create_prompt::<S>),
        )
        .route("/prompts/categories", get(prompt_categories))
        .route(
            "/prompts/:id",
            get(get_prompt::<S>)
                .patch(update_prompt::<S>)
                .delete(delete_prompt::<S>),
        )
        .route("/prompts/:id/visibility", post(set_prompt_visibility::<S>))
        .route("/prompts/:id/copy", post(copy_prompt::<S>))
        .route("/rules", get(list_rules::<S>).post(create_rule::<S>))
        .route("/rules/filters", get(rule_filters::<S>))
        .route(
            "/rules/:id",
            get(get_rule::<S>)
                .patch(update_rule::<S>)
                .delete(delete_rule::<S>),
        )
        .route("/rules/:id/export", get(export_rule_document::<S>))
        .route("/rules/:id/visibility", post(set_rule_visibility::<S>))
        .route("/rules/:id/copy", post(copy_rule::<S>))
        .route("/rules/:id/download", post(download_rule::<S>))
        .route("/mcp", get(list_mcp::<S>))
        .route("/mcp/categories", get(mcp_categories::<S>))
        .route("/mcp/:id", get(get_mcp::<S>))
        .route("/auth/sign-in", post(sign_in::<S>))
        .route("/auth/sign-out", post(sign_out::<S>))
        .route("/auth/session", get(current_session::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Router with request tracing and CORS for browser front ends at `cors_origins`.
pub fn create_app<S>(service: Arc<S>, cors_origins: &[String]) -> Router
where
    S: CatalogApi + 'static,
{
    create_router(service)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(cors_origins))
}

/// CORS policy admitting the configured origins.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured; cross-origin requests will be refused");
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller's session; a supplied but rejected token is an error.
async fn resolve_session<S>(service: &S, headers: &HeaderMap) -> Result<Option<Session>, AppError>
where
    S: CatalogApi,
{
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    match service.current_user(token).await? {
        Some(session) => Ok(Some(session)),
        None => Err(AppError::InvalidSession),
    }
}

fn scope_for(mine: Option<bool>) -> ListScope {
    if mine.unwrap_or(false) {
        ListScope::Mine
    } else {
        ListScope::Public
    }
}

/// Query string for `GET /prompts`.
#[derive(Deserialize)]
struct PromptListParams {
    /// Category selection (`All` disables).
    #[serde(default)]
    category: Option<String>,
    /// Comma-separated tag selection.
    #[serde(default)]
    tags: Option<String>,
    /// Only the caller's prompts.
    #[serde(default)]
    mine: Option<bool>,
}

/// Response body for `GET /prompts`.
#[derive(Serialize)]
struct PromptListResponse {
    prompts: Vec<crate::catalog::Prompt>,
    available_tags: Vec<String>,
    total: usize,
}

/// List prompts in scope, narrowed by category and tag selection.
async fn list_prompts<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Query(params): Query<PromptListParams>,
) -> Result<Json<PromptListResponse>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let all = service
        .list_prompts(scope_for(params.mine), session.as_ref())
        .await?;
    let filter = PromptFilter {
        category: params.category,
        tags: params
            .tags
            .as_deref()
            .map(parse_tag_list)
            .unwrap_or_default(),
    };
    let prompts: Vec<_> = filter_prompts(&all, &filter).into_iter().cloned().collect();
    Ok(Json(PromptListResponse {
        available_tags: available_tags(&all),
        total: all.len(),
        prompts,
    }))
}

async fn prompt_categories() -> Json<serde_json::Value> {
    Json(json!({ "categories": PROMPT_CATEGORIES }))
}

async fn get_prompt<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<crate::catalog::Prompt>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    Ok(Json(service.get_prompt(&id, session.as_ref()).await?))
}

async fn create_prompt<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Json(input): Json<NewPrompt>,
) -> Result<(StatusCode, Json<crate::catalog::Prompt>), AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let prompt = service.create_prompt(session.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

async fn update_prompt<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<PromptUpdate>,
) -> Result<Json<crate::catalog::Prompt>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    Ok(Json(
        service.update_prompt(session.as_ref(), &id, update).await?,
    ))
}

async fn delete_prompt<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    service.delete_prompt(session.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for the visibility endpoints.
#[derive(Deserialize)]
struct VisibilityRequest {
    is_public: bool,
}

async fn set_prompt_visibility<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<VisibilityRequest>,
) -> Result<Json<crate::catalog::Prompt>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    Ok(Json(
        service
            .set_prompt_visibility(session.as_ref(), &id, request.is_public)
            .await?,
    ))
}

async fn copy_prompt<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let copies = service.record_prompt_copy(&id, session.as_ref()).await?;
    Ok(Json(json!({ "id": id, "copies": copies })))
}

/// Query string for `GET /rules`.
#[derive(Deserialize)]
struct RuleListParams {
    #[serde(default)]
    framework: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    mine: Option<bool>,
}

/// List one page of rules.
async fn list_rules<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Query(params): Query<RuleListParams>,
) -> Result<Json<crate::catalog::RulePage>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let query = RuleQuery {
        scope: scope_for(params.mine),
        framework: params.framework,
        language: params.language,
        search: params.search,
        page: params.page.unwrap_or(1),
    };
    Ok(Json(service.list_rules(&query, session.as_ref()).await?))
}

/// Query string carrying only the scope flag.
#[derive(Deserialize)]
struct ScopeParams {
    #[serde(default)]
    mine: Option<bool>,
}

async fn rule_filters<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Query(params): Query<ScopeParams>,
) -> Result<Json<crate::catalog::RuleFilterOptions>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    Ok(Json(
        service
            .rule_filter_options(scope_for(params.mine), session.as_ref())
            .await?,
    ))
}

async fn get_rule<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<crate::catalog::Rule>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    Ok(Json(service.get_rule(&id, session.as_ref()).await?))
}

/// Serve the rule as an `.mdc` attachment.
async fn export_rule_document<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let rule = service.get_rule(&id, session.as_ref()).await?;
    let document = export_rule(&rule);
    let disposition = attachment_disposition(&document.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.content,
    )
        .into_response())
}

/// `Content-Disposition` for a download: an ASCII `filename` plus the exact UTF-8 name in
/// `filename*`.
fn attachment_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' ' => c,
            _ if c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

async fn create_rule<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Json(input): Json<NewRule>,
) -> Result<(StatusCode, Json<crate::catalog::Rule>), AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let rule = service.create_rule(session.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn update_rule<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<RuleUpdate>,
) -> Result<Json<crate::catalog::Rule>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    Ok(Json(service.update_rule(session.as_ref(), &id, update).await?))
}

async fn delete_rule<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    service.delete_rule(session.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_rule_visibility<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<VisibilityRequest>,
) -> Result<Json<crate::catalog::Rule>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    Ok(Json(
        service
            .set_rule_visibility(session.as_ref(), &id, request.is_public)
            .await?,
    ))
}

async fn copy_rule<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let copies = service.record_rule_copy(&id, session.as_ref()).await?;
    Ok(Json(json!({ "id": id, "copies": copies })))
}

/// Count a download and hand back the document to save.
async fn download_rule<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers).await?;
    let rule = service.get_rule(&id, session.as_ref()).await?;
    let downloads = service.record_rule_download(&id, session.as_ref()).await?;
    let document = export_rule(&rule);
    Ok(Json(json!({
        "id": id,
        "downloads": downloads,
        "file_name": document.file_name,
        "content": document.content,
    })))
}

/// Query string for `GET /mcp`.
#[derive(Deserialize)]
struct McpListParams {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    sort: Option<String>,
}

async fn list_mcp<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<McpListParams>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: CatalogApi,
{
    let sort = match params.sort.as_deref() {
        None => McpSort::default(),
        Some(raw) => raw.parse::<McpSort>().map_err(|()| {
            CatalogError::Validation(format!("Unknown sort order: {raw}"))
        })?,
    };
    let servers = service.list_mcp(&McpQuery {
        search: params.search,
        category: params.category,
        sort,
    });
    Ok(Json(json!({ "servers": servers })))
}

async fn mcp_categories<S>(State(service): State<Arc<S>>) -> Json<serde_json::Value>
where
    S: CatalogApi,
{
    Json(json!({ "categories": service.mcp_categories() }))
}

async fn get_mcp<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<crate::catalog::McpListing>, AppError>
where
    S: CatalogApi,
{
    Ok(Json(service.get_mcp(&id)?))
}

/// Request body for `POST /auth/sign-in`.
#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

async fn sign_in<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<crate::backend::AuthSession>, AppError>
where
    S: CatalogApi,
{
    Ok(Json(
        service.sign_in(&request.email, &request.password).await?,
    ))
}

async fn sign_out<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError>
where
    S: CatalogApi,
{
    let session = resolve_session(service.as_ref(), &headers)
        .await?
        .ok_or(CatalogError::Unauthenticated { action: "sign out" })?;
    service.sign_out(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response body for `GET /auth/session`.
#[derive(Serialize)]
struct SessionResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<AuthUser>,
}

async fn current_session<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError>
where
    S: CatalogApi,
{
    let user = match bearer_token(&headers) {
        Some(token) => service.current_user(token).await?.map(|session| session.user),
        None => None,
    };
    Ok(Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: CatalogApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

fn command(
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        method,
        path,
        description,
        request_example: None,
    }
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    let mut create_prompt = command(
        "create_prompt",
        "POST",
        "/prompts",
        "Create a prompt owned by the caller. Requires a bearer token.",
    );
    create_prompt.request_example = Some(json!({
        "title": "Code reviewer",
        "description": "Reviews a diff",
        "category": PROMPT_CATEGORIES[2],
        "content": "Review the following diff for bugs...",
        "tags": ["review", "rust"],
        "is_public": true
    }));
    let mut create_rule = command(
        "create_rule",
        "POST",
        "/rules",
        "Create a rule owned by the caller. Requires a bearer token.",
    );
    create_rule.request_example = Some(json!({
        "title": "React hooks",
        "framework": RULE_FRAMEWORKS[0],
        "language": RULE_LANGUAGES[1],
        "content": "Prefer function components and hooks.",
        "glob": "src/**/*.tsx",
        "always_apply": false,
        "tags": "react, hooks"
    }));
    let mut sign_in = command(
        "sign_in",
        "POST",
        "/auth/sign-in",
        "Exchange email and password for an access token.",
    );
    sign_in.request_example = Some(json!({ "email": "you@example.org", "password": "..." }));

    Json(CommandsResponse {
        commands: vec![
            command(
                "list_prompts",
                "GET",
                "/prompts",
                "List prompts. Query: category, tags (comma separated), mine=true.",
            ),
            command("get_prompt", "GET", "/prompts/{id}", "Fetch one prompt."),
            create_prompt,
            command("update_prompt", "PATCH", "/prompts/{id}", "Edit one of your prompts."),
            command("delete_prompt", "DELETE", "/prompts/{id}", "Delete one of your prompts."),
            command(
                "set_prompt_visibility",
                "POST",
                "/prompts/{id}/visibility",
                "Make one of your prompts public or private. Body: { \"is_public\": bool }.",
            ),
            command("copy_prompt", "POST", "/prompts/{id}/copy", "Count a prompt copy."),
            command(
                "list_rules",
                "GET",
                "/rules",
                "List a page of rules. Query: framework, language, search, page, mine=true.",
            ),
            command(
                "rule_filters",
                "GET",
                "/rules/filters",
                "Distinct frameworks and languages for the rule filters.",
            ),
            command("get_rule", "GET", "/rules/{id}", "Fetch one rule."),
            command(
                "export_rule",
                "GET",
                "/rules/{id}/export",
                "Download the rule as an .mdc document.",
            ),
            create_rule,
            command("update_rule", "PATCH", "/rules/{id}", "Edit one of your rules."),
            command("delete_rule", "DELETE", "/rules/{id}", "Delete one of your rules."),
            command(
                "set_rule_visibility",
                "POST",
                "/rules/{id}/visibility",
                "Make one of your rules public or private. Body: { \"is_public\": bool }.",
            ),
            command("copy_rule", "POST", "/rules/{id}/copy", "Count a rule copy."),
            command(
                "download_rule",
                "POST",
                "/rules/{id}/download",
                "Count a rule download and return the .mdc document.",
            ),
            command(
                "list_mcp",
                "GET",
                "/mcp",
                "Search MCP servers. Query: search, category, sort=rating|downloads|name.",
            ),
            command("get_mcp", "GET", "/mcp/{id}", "Fetch one MCP server listing."),
            sign_in,
            command("sign_out", "POST", "/auth/sign-out", "End the current session."),
            command(
                "session",
                "GET",
                "/auth/session",
                "Report whether the bearer token belongs to a signed-in user.",
            ),
            command(
                "metrics",
                "GET",
                "/metrics",
                "Return catalog counters useful for observability dashboards.",
            ),
        ],
    })
}

enum AppError {
    Catalog(CatalogError),
    InvalidSession,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidSession => (
                StatusCode::UNAUTHORIZED,
                "Session expired or invalid; please sign in again".to_string(),
            ),
            AppError::Catalog(error) => match error {
                CatalogError::Validation(message) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
                }
                CatalogError::Unauthenticated { .. } | CatalogError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, error.to_string())
                }
                CatalogError::NotFound { kind, .. } => {
                    (StatusCode::NOT_FOUND, format!("{kind} not found"))
                }
                CatalogError::Conflict { .. } => (
                    StatusCode::CONFLICT,
                    "The record is busy; please try again".to_string(),
                ),
                CatalogError::Backend(inner) => {
                    tracing::error!(error = %inner, "Backend request failed");
                    (
                        StatusCode::BAD_GATEWAY,
                        "The catalog service is unavailable".to_string(),
                    )
                }
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(inner: CatalogError) -> Self {
        Self::Catalog(inner)
    }
}
