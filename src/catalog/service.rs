//! Catalog service forwarding list, detail, and mutation calls to the hosted service.

use crate::{
    backend::{AuthSession, BackendClient, Direction, Filter, TableQuery},
    catalog::{
        directory::McpDirectory,
        filter::{is_restrictive, rule_filter_options},
        listing::{PAGE_OUT_OF_RANGE, PageWindow},
        types::{
            BackendHealth, CatalogError, ListScope, McpListing, McpQuery, NewPrompt, NewRule,
            Prompt, PromptUpdate, Rule, RuleFilterOptions, RulePage, RuleQuery, RuleUpdate,
            Session,
        },
        validate::{
            validate_new_prompt, validate_new_rule, validate_prompt_update, validate_rule_update,
        },
    },
    config::get_config,
    metrics::{CatalogMetrics, MetricsSnapshot},
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Table holding prompts.
pub const PROMPTS_TABLE: &str = "prompts";
/// Table holding rules.
pub const RULES_TABLE: &str = "rules";

const MAX_INCREMENT_ATTEMPTS: usize = 3;
const SEARCH_COLUMNS: [&str; 2] = ["title", "description"];

/// Abstraction over catalog operations used by external surfaces (HTTP, CLI, MCP).
///
/// Reads accept an optional session so private rows owned by the caller stay visible.
/// Mutations require a session and fail with [`CatalogError::Unauthenticated`] before any
/// network call when it is missing.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Prompts in `scope`, newest first.
    async fn list_prompts(
        &self,
        scope: ListScope,
        session: Option<&Session>,
    ) -> Result<Vec<Prompt>, CatalogError>;

    /// Single prompt by id.
    async fn get_prompt(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<Prompt, CatalogError>;

    /// Validate and store a new prompt owned by the caller.
    async fn create_prompt(
        &self,
        session: Option<&Session>,
        input: NewPrompt,
    ) -> Result<Prompt, CatalogError>;

    /// Apply an edit to a prompt owned by the caller.
    async fn update_prompt(
        &self,
        session: Option<&Session>,
        id: &str,
        update: PromptUpdate,
    ) -> Result<Prompt, CatalogError>;

    /// Delete a prompt owned by the caller.
    async fn delete_prompt(
        &self,
        session: Option<&Session>,
        id: &str,
    ) -> Result<(), CatalogError>;

    /// Set the public flag on a prompt owned by the caller.
    async fn set_prompt_visibility(
        &self,
        session: Option<&Session>,
        id: &str,
        is_public: bool,
    ) -> Result<Prompt, CatalogError>;

    /// Count one copy of a prompt; returns the new copy count.
    async fn record_prompt_copy(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<u64, CatalogError>;

    /// One page of rules matching `query`.
    async fn list_rules(
        &self,
        query: &RuleQuery,
        session: Option<&Session>,
    ) -> Result<RulePage, CatalogError>;

    /// Distinct framework and language values across rules in `scope`.
    async fn rule_filter_options(
        &self,
        scope: ListScope,
        session: Option<&Session>,
    ) -> Result<RuleFilterOptions, CatalogError>;

    /// Single rule by id.
    async fn get_rule(&self, id: &str, session: Option<&Session>) -> Result<Rule, CatalogError>;

    /// Validate and store a new rule owned by the caller.
    async fn create_rule(
        &self,
        session: Option<&Session>,
        input: NewRule,
    ) -> Result<Rule, CatalogError>;

    /// Apply an edit to a rule owned by the caller.
    async fn update_rule(
        &self,
        session: Option<&Session>,
        id: &str,
        update: RuleUpdate,
    ) -> Result<Rule, CatalogError>;

    /// Delete a rule owned by the caller.
    async fn delete_rule(&self, session: Option<&Session>, id: &str) -> Result<(), CatalogError>;

    /// Set the public flag on a rule owned by the caller.
    async fn set_rule_visibility(
        &self,
        session: Option<&Session>,
        id: &str,
        is_public: bool,
    ) -> Result<Rule, CatalogError>;

    /// Count one copy of a rule; returns the new copy count.
    async fn record_rule_copy(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<u64, CatalogError>;

    /// Count one download of a rule; returns the new download count.
    async fn record_rule_download(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<u64, CatalogError>;

    /// MCP listings matching `query`.
    fn list_mcp(&self, query: &McpQuery) -> Vec<McpListing>;

    /// Single MCP listing by id.
    fn get_mcp(&self, id: &str) -> Result<McpListing, CatalogError>;

    /// `All` followed by distinct MCP categories.
    fn mcp_categories(&self) -> Vec<String>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, CatalogError>;

    /// End the caller's session.
    async fn sign_out(&self, session: &Session) -> Result<(), CatalogError>;

    /// Resolve an access token into a session; `None` when the token is not accepted.
    async fn current_user(&self, token: &str) -> Result<Option<Session>, CatalogError>;

    /// Probe the hosted service.
    async fn health(&self) -> BackendHealth;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Catalog operations over the hosted service and the local MCP directory.
///
/// Construct once near process start and share through an `Arc`; every call is an
/// independent request with no local caching.
pub struct CatalogService {
    backend: BackendClient,
    directory: McpDirectory,
    page_size: usize,
    metrics: Arc<CatalogMetrics>,
}

#[derive(Deserialize)]
struct FacetRow {
    framework: String,
    language: String,
}

impl CatalogService {
    /// Build a service from environment configuration.
    pub fn new(directory: McpDirectory) -> Result<Self, CatalogError> {
        let config = get_config();
        let backend = BackendClient::new()?;
        Ok(Self::from_parts(backend, directory, config.rules_page_size))
    }

    /// Build a service from explicit parts.
    pub fn from_parts(backend: BackendClient, directory: McpDirectory, page_size: usize) -> Self {
        tracing::debug!(
            backend = backend.base_url(),
            listings = directory.len(),
            page_size,
            "Catalog service initialized"
        );
        Self {
            backend,
            directory,
            page_size: page_size.max(1),
            metrics: Arc::new(CatalogMetrics::new()),
        }
    }

    /// Rules per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Shared metrics registry.
    pub fn metrics(&self) -> Arc<CatalogMetrics> {
        Arc::clone(&self.metrics)
    }

    fn track<T>(&self, result: Result<T, CatalogError>) -> Result<T, CatalogError> {
        if let Err(CatalogError::Backend(_)) = &result {
            self.metrics.record_failure();
        }
        result
    }

    async fn fetch_row<T>(
        &self,
        table: &str,
        kind: &'static str,
        id: &str,
        session: Option<&Session>,
    ) -> Result<T, CatalogError>
    where
        T: serde::de::DeserializeOwned,
    {
        let row = self
            .backend
            .select_by_id::<T>(table, id, access_token(session))
            .await?;
        self.metrics.record_read();
        row.ok_or_else(|| CatalogError::NotFound {
            kind,
            id: id.to_string(),
        })
    }

    async fn update_owned<B, T>(
        &self,
        table: &str,
        kind: &'static str,
        session: &Session,
        id: &str,
        patch: &B,
    ) -> Result<T, CatalogError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let updated = self
            .backend
            .update_where::<B, T>(
                table,
                &owner_filters(id, session),
                patch,
                Some(&session.access_token),
            )
            .await?;
        match updated {
            Some(row) => {
                self.metrics.record_mutation();
                tracing::info!(table, id, user_id = session.user_id(), "Row updated");
                Ok(row)
            }
            None => {
                tracing::warn!(table, id, user_id = session.user_id(), "Update matched no owned row");
                Err(CatalogError::NotFound {
                    kind,
                    id: id.to_string(),
                })
            }
        }
    }

    async fn delete_owned(
        &self,
        table: &str,
        kind: &'static str,
        session: &Session,
        id: &str,
    ) -> Result<(), CatalogError> {
        let deleted = self
            .backend
            .delete_where(table, &owner_filters(id, session), Some(&session.access_token))
            .await?;
        if deleted {
            self.metrics.record_mutation();
            tracing::info!(table, id, user_id = session.user_id(), "Row deleted");
            Ok(())
        } else {
            tracing::warn!(table, id, user_id = session.user_id(), "Delete matched no owned row");
            Err(CatalogError::NotFound {
                kind,
                id: id.to_string(),
            })
        }
    }

    /// Bump `column` by one using a compare-and-set write.
    ///
    /// The update only applies when the column still holds the value that was read; when
    /// another writer got there first the read is repeated, up to a fixed number of attempts.
    async fn increment_counter(
        &self,
        table: &str,
        kind: &'static str,
        id: &str,
        column: &'static str,
        session: Option<&Session>,
    ) -> Result<u64, CatalogError> {
        let token = access_token(session);
        let query = TableQuery::new()
            .columns(&format!("id,{column}"))
            .eq("id", id)
            .range(0, 0);

        for attempt in 1..=MAX_INCREMENT_ATTEMPTS {
            let rows: Vec<Map<String, Value>> = self.backend.select(table, &query, token).await?;
            let Some(row) = rows.into_iter().next() else {
                return Err(CatalogError::NotFound {
                    kind,
                    id: id.to_string(),
                });
            };
            let current = row.get(column).and_then(Value::as_u64);
            let next = current.unwrap_or(0) + 1;

            let filters = [Filter::eq("id", id), Filter::eq_or_null(column, current)];
            let mut patch = Map::new();
            patch.insert(column.to_string(), Value::from(next));
            let updated: Option<Value> = self
                .backend
                .update_where(table, &filters, &patch, token)
                .await?;
            if updated.is_some() {
                self.metrics.record_increment();
                tracing::debug!(table, id, column, value = next, attempt, "Counter incremented");
                return Ok(next);
            }
            tracing::debug!(table, id, column, attempt, "Counter changed concurrently; retrying");
        }

        tracing::warn!(table, id, column, "Counter increment gave up after repeated conflicts");
        Err(CatalogError::Conflict {
            kind,
            id: id.to_string(),
        })
    }

    fn scope_query(
        &self,
        scope: ListScope,
        session: Option<&Session>,
        action: &'static str,
    ) -> Result<TableQuery, CatalogError> {
        Ok(match scope {
            ListScope::Public => TableQuery::new().eq("is_public", true),
            ListScope::Mine => {
                let session = require_session(session, action)?;
                TableQuery::new().eq("user_id", session.user_id())
            }
        })
    }
}

#[async_trait]
impl CatalogApi for CatalogService {
    async fn list_prompts(
        &self,
        scope: ListScope,
        session: Option<&Session>,
    ) -> Result<Vec<Prompt>, CatalogError> {
        let query = self
            .scope_query(scope, session, "view your prompts")?
            .order("created_at", Direction::Descending);
        let prompts = self.track(
            self.backend
                .select(PROMPTS_TABLE, &query, access_token(session))
                .await
                .map_err(CatalogError::from),
        )?;
        self.metrics.record_read();
        tracing::debug!(?scope, count = prompts.len(), "Prompts listed");
        Ok(prompts)
    }

    async fn get_prompt(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<Prompt, CatalogError> {
        self.track(self.fetch_row(PROMPTS_TABLE, "prompt", id, session).await)
    }

    async fn create_prompt(
        &self,
        session: Option<&Session>,
        input: NewPrompt,
    ) -> Result<Prompt, CatalogError> {
        let session = require_session(session, "create prompts")?;
        let row = validate_new_prompt(input, session.user_id())?;
        let prompt: Prompt = self.track(
            self.backend
                .insert(PROMPTS_TABLE, &row, Some(&session.access_token))
                .await
                .map_err(CatalogError::from),
        )?;
        self.metrics.record_mutation();
        tracing::info!(id = %prompt.id, user_id = session.user_id(), "Prompt created");
        Ok(prompt)
    }

    async fn update_prompt(
        &self,
        session: Option<&Session>,
        id: &str,
        update: PromptUpdate,
    ) -> Result<Prompt, CatalogError> {
        let session = require_session(session, "edit prompts")?;
        let patch = validate_prompt_update(update)?.touched_at(now_rfc3339());
        self.track(
            self.update_owned(PROMPTS_TABLE, "prompt", session, id, &patch)
                .await,
        )
    }

    async fn delete_prompt(
        &self,
        session: Option<&Session>,
        id: &str,
    ) -> Result<(), CatalogError> {
        let session = require_session(session, "delete prompts")?;
        self.track(self.delete_owned(PROMPTS_TABLE, "prompt", session, id).await)
    }

    async fn set_prompt_visibility(
        &self,
        session: Option<&Session>,
        id: &str,
        is_public: bool,
    ) -> Result<Prompt, CatalogError> {
        let session = require_session(session, "change prompt visibility")?;
        let patch = json!({ "is_public": is_public, "updated_at": now_rfc3339() });
        self.track(
            self.update_owned(PROMPTS_TABLE, "prompt", session, id, &patch)
                .await,
        )
    }

    async fn record_prompt_copy(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<u64, CatalogError> {
        self.track(
            self.increment_counter(PROMPTS_TABLE, "prompt", id, "copies", session)
                .await,
        )
    }

    async fn list_rules(
        &self,
        query: &RuleQuery,
        session: Option<&Session>,
    ) -> Result<RulePage, CatalogError> {
        let window = PageWindow::checked(query.page, self.page_size)
            .ok_or_else(|| CatalogError::Validation(PAGE_OUT_OF_RANGE.to_string()))?;
        let mut table_query = self.scope_query(query.scope, session, "view your rules")?;
        if let Some(framework) = is_restrictive(query.framework.as_deref()) {
            table_query = table_query.eq("framework", framework);
        }
        if let Some(language) = is_restrictive(query.language.as_deref()) {
            table_query = table_query.eq("language", language);
        }
        if let Some(term) = query.search.as_deref() {
            table_query = table_query.search(&SEARCH_COLUMNS, term);
        }
        let table_query = table_query
            .order("created_at", Direction::Descending)
            .range(window.from(), window.to());

        let rules: Vec<Rule> = self.track(
            self.backend
                .select(RULES_TABLE, &table_query, access_token(session))
                .await
                .map_err(CatalogError::from),
        )?;
        self.metrics.record_read();
        let has_more = window.has_more(rules.len());
        tracing::debug!(
            page = window.page,
            count = rules.len(),
            has_more,
            "Rules page fetched"
        );
        Ok(RulePage {
            rules,
            page: window.page,
            page_size: window.size,
            has_more,
        })
    }

    async fn rule_filter_options(
        &self,
        scope: ListScope,
        session: Option<&Session>,
    ) -> Result<RuleFilterOptions, CatalogError> {
        let query = self
            .scope_query(scope, session, "view your rules")?
            .columns("framework,language");
        let rows: Vec<FacetRow> = self.track(
            self.backend
                .select(RULES_TABLE, &query, access_token(session))
                .await
                .map_err(CatalogError::from),
        )?;
        self.metrics.record_read();
        Ok(rule_filter_options(
            rows.into_iter().map(|row| (row.framework, row.language)),
        ))
    }

    async fn get_rule(&self, id: &str, session: Option<&Session>) -> Result<Rule, CatalogError> {
        self.track(self.fetch_row(RULES_TABLE, "rule", id, session).await)
    }

    async fn create_rule(
        &self,
        session: Option<&Session>,
        input: NewRule,
    ) -> Result<Rule, CatalogError> {
        let session = require_session(session, "create rules")?;
        let row = validate_new_rule(input, session.user_id())?;
        let rule: Rule = self.track(
            self.backend
                .insert(RULES_TABLE, &row, Some(&session.access_token))
                .await
                .map_err(CatalogError::from),
        )?;
        self.metrics.record_mutation();
        tracing::info!(id = %rule.id, user_id = session.user_id(), "Rule created");
        Ok(rule)
    }

    async fn update_rule(
        &self,
        session: Option<&Session>,
        id: &str,
        update: RuleUpdate,
    ) -> Result<Rule, CatalogError> {
        let session = require_session(session, "edit rules")?;
        let patch = validate_rule_update(update)?.touched_at(now_rfc3339());
        self.track(self.update_owned(RULES_TABLE, "rule", session, id, &patch).await)
    }

    async fn delete_rule(&self, session: Option<&Session>, id: &str) -> Result<(), CatalogError> {
        let session = require_session(session, "delete rules")?;
        self.track(self.delete_owned(RULES_TABLE, "rule", session, id).await)
    }

    async fn set_rule_visibility(
        &self,
        session: Option<&Session>,
        id: &str,
        is_public: bool,
    ) -> Result<Rule, CatalogError> {
        let session = require_session(session, "change rule visibility")?;
        let patch = json!({ "is_public": is_public, "updated_at": now_rfc3339() });
        self.track(self.update_owned(RULES_TABLE, "rule", session, id, &patch).await)
    }

    async fn record_rule_copy(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<u64, CatalogError> {
        self.track(
            self.increment_counter(RULES_TABLE, "rule", id, "copies", session)
                .await,
        )
    }

    async fn record_rule_download(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<u64, CatalogError> {
        self.track(
            self.increment_counter(RULES_TABLE, "rule", id, "downloads", session)
                .await,
        )
    }

    fn list_mcp(&self, query: &McpQuery) -> Vec<McpListing> {
        self.directory.search(query)
    }

    fn get_mcp(&self, id: &str) -> Result<McpListing, CatalogError> {
        self.directory
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                kind: "mcp server",
                id: id.to_string(),
            })
    }

    fn mcp_categories(&self) -> Vec<String> {
        self.directory.categories()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, CatalogError> {
        match self.backend.sign_in_with_password(email.trim(), password).await {
            Ok(session) => Ok(session),
            Err(error) if error.is_auth_failure() => {
                tracing::warn!("Sign-in rejected");
                Err(CatalogError::InvalidCredentials)
            }
            Err(error) => self.track(Err(error.into())),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), CatalogError> {
        self.track(
            self.backend
                .sign_out(&session.access_token)
                .await
                .map_err(CatalogError::from),
        )
    }

    async fn current_user(&self, token: &str) -> Result<Option<Session>, CatalogError> {
        let user = self.track(
            self.backend
                .get_user(token)
                .await
                .map_err(CatalogError::from),
        )?;
        Ok(user.map(|user| Session {
            access_token: token.to_string(),
            user,
        }))
    }

    async fn health(&self) -> BackendHealth {
        match self.backend.health().await {
            Ok(()) => BackendHealth {
                reachable: true,
                error: None,
            },
            Err(error) => {
                tracing::warn!(error = %error, "Backend health probe failed");
                BackendHealth {
                    reachable: false,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Session required for `action`, or [`CatalogError::Unauthenticated`].
pub fn require_session<'a>(
    session: Option<&'a Session>,
    action: &'static str,
) -> Result<&'a Session, CatalogError> {
    session.ok_or_else(|| {
        tracing::debug!(action, "Rejected unauthenticated request");
        CatalogError::Unauthenticated { action }
    })
}

fn access_token(session: Option<&Session>) -> Option<&str> {
    session.map(|session| session.access_token.as_str())
}

fn owner_filters(id: &str, session: &Session) -> [Filter; 2] {
    [Filter::eq("id", id), Filter::eq("user_id", session.user_id())]
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AuthUser;
    use crate::catalog::types::TagInput;
    use httpmock::{
        Method::{DELETE, GET, PATCH, POST},
        MockServer,
        prelude::HttpMockRequest,
    };

    fn service_for(server: &MockServer) -> CatalogService {
        let backend = BackendClient::from_parts(&server.base_url(), "anon-key").expect("client");
        CatalogService::from_parts(backend, McpDirectory::default(), 2)
    }

    fn session() -> Session {
        Session {
            access_token: "user-token".into(),
            user: AuthUser {
                id: "user-1".into(),
                email: Some("ada@example.org".into()),
            },
        }
    }

    fn rule_json(id: &str) -> Value {
        json!({
            "id": id,
            "title": "Rule",
            "framework": "React",
            "language": "TypeScript",
            "content": "Use hooks everywhere.",
            "user_id": "user-1"
        })
    }

    #[tokio::test]
    async fn mutations_without_session_never_reach_the_backend() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.path_contains("/rest/v1/");
                then.status(200).json_body(json!([]));
            })
            .await;
        let service = service_for(&server);

        let err = service
            .delete_rule(None, "r1")
            .await
            .expect_err("delete requires session");
        assert_eq!(err.to_string(), "You must be logged in to delete rules");
        assert!(matches!(
            service.set_prompt_visibility(None, "p1", false).await,
            Err(CatalogError::Unauthenticated { .. })
        ));
        assert!(matches!(
            service.list_prompts(ListScope::Mine, None).await,
            Err(CatalogError::Unauthenticated { .. })
        ));
        any.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn list_rules_applies_filters_search_and_window() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/rules")
                    .query_param("is_public", "eq.true")
                    .query_param("framework", "eq.React")
                    .query_param("or", "(title.ilike.*hooks*,description.ilike.*hooks*)")
                    .query_param("order", "created_at.desc")
                    .query_param("offset", "2")
                    .query_param("limit", "2");
                then.status(200)
                    .json_body(json!([rule_json("r3"), rule_json("r4")]));
            })
            .await;

        let page = service_for(&server)
            .list_rules(
                &RuleQuery {
                    framework: Some("React".into()),
                    language: Some("All".into()),
                    search: Some("hooks".into()),
                    page: 2,
                    ..Default::default()
                },
                None,
            )
            .await
            .expect("page");

        mock.assert_async().await;
        assert_eq!(page.page, 2);
        assert!(page.has_more);
        assert_eq!(page.rules.len(), 2);
    }

    #[tokio::test]
    async fn my_prompts_filter_by_owner_with_user_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/prompts")
                    .query_param("user_id", "eq.user-1")
                    .header("authorization", "Bearer user-token");
                then.status(200).json_body(json!([]));
            })
            .await;

        let prompts = service_for(&server)
            .list_prompts(ListScope::Mine, Some(&session()))
            .await
            .expect("prompts");
        mock.assert_async().await;
        assert!(prompts.is_empty());
    }

    #[tokio::test]
    async fn create_prompt_inserts_validated_row() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/prompts")
                    .json_body_partial(r#"{"user_id":"user-1","title":"Reviewer","tags":["rust"]}"#);
                then.status(201).json_body(json!([{
                    "id": "p1",
                    "title": "Reviewer",
                    "content": "Review the following diff.",
                    "category": "Backend",
                    "tags": ["rust"],
                    "user_id": "user-1"
                }]));
            })
            .await;

        let prompt = service_for(&server)
            .create_prompt(
                Some(&session()),
                NewPrompt {
                    title: " Reviewer ".into(),
                    description: None,
                    category: "Backend".into(),
                    content: "Review the following diff.".into(),
                    tags: TagInput::Text("rust, rust".into()),
                    is_public: true,
                },
            )
            .await
            .expect("created");
        mock.assert_async().await;
        assert_eq!(prompt.id, "p1");
    }

    fn patch_columns(request: &HttpMockRequest) -> Option<Map<String, Value>> {
        match serde_json::from_slice(request.body.as_deref()?) {
            Ok(Value::Object(columns)) => Some(columns),
            _ => None,
        }
    }

    fn stamped_now(columns: &Map<String, Value>) -> bool {
        columns
            .get("updated_at")
            .and_then(Value::as_str)
            .is_some_and(|stamp| OffsetDateTime::parse(stamp, &Rfc3339).is_ok())
    }

    fn rule_patch_is_title_and_tags(request: &HttpMockRequest) -> bool {
        patch_columns(request).is_some_and(|columns| {
            columns.len() == 3
                && columns.get("title") == Some(&json!("Hooks Guide"))
                && columns.get("tags") == Some(&json!([]))
                && stamped_now(&columns)
        })
    }

    fn prompt_patch_is_content_only(request: &HttpMockRequest) -> bool {
        patch_columns(request).is_some_and(|columns| {
            columns.len() == 2
                && columns.get("content") == Some(&json!("Review for soundness."))
                && stamped_now(&columns)
        })
    }

    #[tokio::test]
    async fn rule_edit_patches_touched_columns_on_owned_row() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/rules")
                    .query_param("id", "eq.r1")
                    .query_param("user_id", "eq.user-1")
                    .header("authorization", "Bearer user-token")
                    .matches(rule_patch_is_title_and_tags);
                then.status(200).json_body(json!([{
                    "id": "r1",
                    "title": "Hooks Guide",
                    "framework": "React",
                    "language": "TypeScript",
                    "content": "Use hooks everywhere.",
                    "tags": [],
                    "user_id": "user-1"
                }]));
            })
            .await;

        let service = service_for(&server);
        let rule = service
            .update_rule(
                Some(&session()),
                "r1",
                RuleUpdate {
                    title: Some(" Hooks Guide ".into()),
                    tags: Some(TagInput::Text(String::new())),
                    ..Default::default()
                },
            )
            .await
            .expect("updated");
        mock.assert_async().await;
        assert_eq!(rule.title, "Hooks Guide");
        assert_eq!(service.metrics_snapshot().mutations, 1);
    }

    #[tokio::test]
    async fn prompt_edit_patches_touched_columns_and_reports_missing_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/prompts")
                    .query_param("id", "eq.p1")
                    .query_param("user_id", "eq.user-1")
                    .matches(prompt_patch_is_content_only);
                then.status(200).json_body(json!([]));
            })
            .await;

        let err = service_for(&server)
            .update_prompt(
                Some(&session()),
                "p1",
                PromptUpdate {
                    content: Some("Review for soundness.".into()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("no owned row");
        mock.assert_async().await;
        assert!(matches!(err, CatalogError::NotFound { kind: "prompt", .. }));
    }

    #[tokio::test]
    async fn invalid_edit_never_reaches_the_backend() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH);
                then.status(200).json_body(json!([]));
            })
            .await;

        let err = service_for(&server)
            .update_rule(
                Some(&session()),
                "r1",
                RuleUpdate {
                    language: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("blank language");
        assert_eq!(err.to_string(), "Language is required");
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn non_owner_update_is_not_found() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/rules")
                    .query_param("id", "eq.r1")
                    .query_param("user_id", "eq.user-1");
                then.status(200).json_body(json!([]));
            })
            .await;

        let err = service_for(&server)
            .set_rule_visibility(Some(&session()), "r1", false)
            .await
            .expect_err("not owned");
        mock.assert_async().await;
        assert!(matches!(err, CatalogError::NotFound { kind: "rule", .. }));
    }

    #[tokio::test]
    async fn delete_prompt_confirms_removal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/rest/v1/prompts")
                    .query_param("id", "eq.p1")
                    .query_param("user_id", "eq.user-1");
                then.status(200).json_body(json!([{ "id": "p1" }]));
            })
            .await;

        let service = service_for(&server);
        service
            .delete_prompt(Some(&session()), "p1")
            .await
            .expect("deleted");
        assert_eq!(service.metrics_snapshot().mutations, 1);
    }

    #[tokio::test]
    async fn increment_writes_conditionally_on_the_value_read() {
        let server = MockServer::start_async().await;
        let read = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/rules")
                    .query_param("select", "id,downloads")
                    .query_param("id", "eq.r1");
                then.status(200)
                    .json_body(json!([{ "id": "r1", "downloads": 41 }]));
            })
            .await;
        let write = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/rules")
                    .query_param("id", "eq.r1")
                    .query_param("downloads", "eq.41")
                    .json_body(json!({ "downloads": 42 }));
                then.status(200)
                    .json_body(json!([{ "id": "r1", "downloads": 42 }]));
            })
            .await;

        let service = service_for(&server);
        let count = service
            .record_rule_download("r1", None)
            .await
            .expect("incremented");
        read.assert_async().await;
        write.assert_async().await;
        assert_eq!(count, 42);
        assert_eq!(service.metrics_snapshot().counter_increments, 1);
    }

    #[tokio::test]
    async fn increment_gives_up_after_repeated_conflicts() {
        let server = MockServer::start_async().await;
        let read = server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/prompts");
                then.status(200).json_body(json!([{ "id": "p1", "copies": null }]));
            })
            .await;
        let write = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/prompts")
                    .query_param("copies", "is.null");
                then.status(200).json_body(json!([]));
            })
            .await;

        let err = service_for(&server)
            .record_prompt_copy("p1", None)
            .await
            .expect_err("conflict");
        assert!(matches!(err, CatalogError::Conflict { .. }));
        read.assert_hits_async(MAX_INCREMENT_ATTEMPTS).await;
        write.assert_hits_async(MAX_INCREMENT_ATTEMPTS).await;
    }

    #[tokio::test]
    async fn increment_on_missing_row_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/prompts");
                then.status(200).json_body(json!([]));
            })
            .await;

        assert!(matches!(
            service_for(&server).record_prompt_copy("gone", None).await,
            Err(CatalogError::NotFound { kind: "prompt", .. })
        ));
    }

    #[tokio::test]
    async fn rejected_sign_in_maps_to_invalid_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token");
                then.status(400).json_body(json!({ "error": "invalid_grant" }));
            })
            .await;

        let service = service_for(&server);
        assert!(matches!(
            service.sign_in("ada@example.org", "nope").await,
            Err(CatalogError::InvalidCredentials)
        ));
        assert_eq!(service.metrics_snapshot().failures, 0);
    }

    #[tokio::test]
    async fn backend_failures_are_counted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/rules");
                then.status(500).body("boom");
            })
            .await;

        let service = service_for(&server);
        assert!(matches!(
            service.get_rule("r1", None).await,
            Err(CatalogError::Backend(_))
        ));
        assert_eq!(service.metrics_snapshot().failures, 1);
    }

    #[tokio::test]
    async fn health_reports_unreachable_backend() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/v1/health");
                then.status(503);
            })
            .await;

        let health = service_for(&server).health().await;
        assert!(!health.reachable);
        assert!(health.error.is_some());
    }
}
