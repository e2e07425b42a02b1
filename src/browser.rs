//! List-state controllers behind each catalog view.
//!
//! Each browser owns the items a view shows plus its filter selection and forwards every
//! action to a [`CatalogApi`]. Local state only changes after the service confirms an action;
//! failures are logged and reported as an error [`Notice`] with the state left untouched.

use crate::catalog::{
    CatalogApi, CatalogError, ExportedDocument, ListScope, ListView, McpListing, McpQuery,
    McpSort, NewPrompt, NewRule, Prompt, PromptFilter, PromptUpdate, Rule, RuleFilterOptions,
    RuleQuery, RuleUpdate, Session, export_prompt, export_rule,
    filter::{available_tags, filter_prompts},
    visibility_label,
};
use serde::Serialize;
use std::sync::Arc;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The action completed.
    Success,
    /// The action failed; state was left unchanged.
    Error,
}

/// User-facing notification produced by a controller action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message shown to the user.
    pub message: String,
}

impl Notice {
    /// Success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Whether the notice reports a failure.
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Log `error` and turn it into a notice.
///
/// Validation and sign-in problems are shown as-is; everything else collapses into `generic`.
pub fn failure_notice(error: &CatalogError, generic: &str) -> Notice {
    tracing::error!(error = %error, "{generic}");
    match error {
        CatalogError::Validation(_)
        | CatalogError::Unauthenticated { .. }
        | CatalogError::InvalidCredentials => Notice::error(error.to_string()),
        _ => Notice::error(generic),
    }
}

fn owns(session: Option<&Session>, owner: &str) -> bool {
    session.is_some_and(|session| session.user_id() == owner)
}

/// Prompt list: fetches everything in scope, then filters locally by category and tags.
pub struct PromptBrowser<S: CatalogApi> {
    service: Arc<S>,
    session: Option<Session>,
    scope: ListScope,
    prompts: ListView<Prompt>,
    filter: PromptFilter,
}

impl<S: CatalogApi> PromptBrowser<S> {
    /// Browser over `scope` acting as `session`.
    pub fn new(service: Arc<S>, session: Option<Session>, scope: ListScope) -> Self {
        Self {
            service,
            session,
            scope,
            prompts: ListView::new(),
            filter: PromptFilter::default(),
        }
    }

    /// Reload every prompt in scope.
    pub async fn refresh(&mut self) -> Result<(), Notice> {
        let prompts = self
            .service
            .list_prompts(self.scope, self.session.as_ref())
            .await
            .map_err(|error| failure_notice(&error, "Failed to fetch prompts"))?;
        tracing::debug!(count = prompts.len(), "Prompt list refreshed");
        self.prompts.replace(prompts);
        Ok(())
    }

    /// Restrict to `category`; `None` or `All` shows every category.
    pub fn select_category(&mut self, category: Option<String>) {
        self.filter.category = category;
    }

    /// Add or remove `tag` from the tag selection.
    pub fn toggle_tag(&mut self, tag: &str) {
        self.filter.toggle_tag(tag);
    }

    /// Clear category and tag selection.
    pub fn clear_filters(&mut self) {
        self.filter = PromptFilter::default();
    }

    /// Current filter selection.
    pub fn filter(&self) -> &PromptFilter {
        &self.filter
    }

    /// Prompts passing the current selection.
    pub fn visible(&self) -> Vec<&Prompt> {
        filter_prompts(self.prompts.items(), &self.filter)
    }

    /// Every loaded prompt, ignoring the selection.
    pub fn prompts(&self) -> &[Prompt] {
        self.prompts.items()
    }

    /// Tags offered as filter chips.
    pub fn available_tags(&self) -> Vec<String> {
        available_tags(self.prompts.items())
    }

    /// Whether the signed-in user may edit, delete, or change visibility of `prompt`.
    pub fn can_manage(&self, prompt: &Prompt) -> bool {
        owns(self.session.as_ref(), &prompt.user_id)
    }

    /// Create a prompt and show it at the top of the list.
    pub async fn create(&mut self, input: NewPrompt) -> Notice {
        match self.service.create_prompt(self.session.as_ref(), input).await {
            Ok(prompt) => {
                self.prompts.upsert(prompt);
                Notice::success("Prompt created successfully!")
            }
            Err(error) => failure_notice(&error, "Failed to create prompt"),
        }
    }

    /// Apply an edit to one of the caller's prompts.
    pub async fn update(&mut self, id: &str, update: PromptUpdate) -> Notice {
        match self
            .service
            .update_prompt(self.session.as_ref(), id, update)
            .await
        {
            Ok(prompt) => {
                self.prompts.upsert(prompt);
                Notice::success("Prompt updated successfully!")
            }
            Err(error) => failure_notice(&error, "Failed to update prompt"),
        }
    }

    /// Flip the public flag; the badge only changes once the service confirms.
    pub async fn toggle_visibility(&mut self, id: &str) -> Notice {
        let Some(current) = self.prompts.get(id).map(|prompt| prompt.is_public) else {
            return Notice::error("Prompt not found");
        };
        match self
            .service
            .set_prompt_visibility(self.session.as_ref(), id, !current)
            .await
        {
            Ok(updated) => {
                let is_public = updated.is_public;
                self.prompts.upsert(updated);
                Notice::success(format!("Prompt is now {}", visibility_label(is_public)))
            }
            Err(error) => failure_notice(&error, "Failed to update visibility"),
        }
    }

    /// Delete a prompt; it leaves the list only once the service confirms.
    pub async fn delete(&mut self, id: &str) -> Notice {
        match self.service.delete_prompt(self.session.as_ref(), id).await {
            Ok(()) => {
                self.prompts.remove(id);
                Notice::success("Prompt deleted successfully")
            }
            Err(error) => failure_notice(&error, "Failed to delete prompt"),
        }
    }

    /// Count a copy and update the local counter.
    pub async fn record_copy(&mut self, id: &str) -> Notice {
        match self
            .service
            .record_prompt_copy(id, self.session.as_ref())
            .await
        {
            Ok(copies) => {
                self.prompts.update(id, |prompt| prompt.copies = copies);
                Notice::success("Prompt copied to clipboard!")
            }
            Err(error) => failure_notice(&error, "Failed to copy prompt"),
        }
    }

    /// Document for a loaded prompt.
    pub fn document(&self, id: &str) -> Option<ExportedDocument> {
        self.prompts.get(id).map(export_prompt)
    }
}

/// Rule list: filters and pages on the service, appending on "load more".
pub struct RuleBrowser<S: CatalogApi> {
    service: Arc<S>,
    session: Option<Session>,
    scope: ListScope,
    framework: Option<String>,
    language: Option<String>,
    search: Option<String>,
    rules: ListView<Rule>,
    options: RuleFilterOptions,
}

impl<S: CatalogApi> RuleBrowser<S> {
    /// Browser over `scope` acting as `session`.
    pub fn new(service: Arc<S>, session: Option<Session>, scope: ListScope) -> Self {
        Self {
            service,
            session,
            scope,
            framework: None,
            language: None,
            search: None,
            rules: ListView::new(),
            options: RuleFilterOptions {
                frameworks: vec![crate::catalog::ALL.to_string()],
                languages: vec![crate::catalog::ALL.to_string()],
            },
        }
    }

    fn query(&self, page: usize) -> RuleQuery {
        RuleQuery {
            scope: self.scope,
            framework: self.framework.clone(),
            language: self.language.clone(),
            search: self.search.clone(),
            page,
        }
    }

    async fn fetch(&mut self, page: usize) -> Result<(), Notice> {
        let result = self
            .service
            .list_rules(&self.query(page), self.session.as_ref())
            .await
            .map_err(|error| failure_notice(&error, "Failed to fetch rules"))?;
        tracing::debug!(
            page = result.page,
            count = result.rules.len(),
            has_more = result.has_more,
            "Rule page merged"
        );
        self.rules
            .apply_page(result.page, result.rules, result.has_more);
        Ok(())
    }

    /// Reload page 1 with the current filters, replacing the list.
    pub async fn refresh(&mut self) -> Result<(), Notice> {
        self.fetch(1).await
    }

    /// Fetch the next page and append it.
    pub async fn load_more(&mut self) -> Result<(), Notice> {
        let next = self.rules.page() + 1;
        self.fetch(next).await
    }

    /// Filter by framework and reload from page 1.
    pub async fn set_framework(&mut self, framework: Option<String>) -> Result<(), Notice> {
        self.framework = framework;
        self.refresh().await
    }

    /// Filter by language and reload from page 1.
    pub async fn set_language(&mut self, language: Option<String>) -> Result<(), Notice> {
        self.language = language;
        self.refresh().await
    }

    /// Search titles and descriptions and reload from page 1.
    pub async fn set_search(&mut self, search: Option<String>) -> Result<(), Notice> {
        self.search = search;
        self.refresh().await
    }

    /// Replace framework, language, and search together, then reload page 1 once.
    pub async fn set_filters(
        &mut self,
        framework: Option<String>,
        language: Option<String>,
        search: Option<String>,
    ) -> Result<(), Notice> {
        self.framework = framework;
        self.language = language;
        self.search = search;
        self.refresh().await
    }

    /// Reload the framework and language dropdown values.
    pub async fn load_filter_options(&mut self) -> Result<(), Notice> {
        self.options = self
            .service
            .rule_filter_options(self.scope, self.session.as_ref())
            .await
            .map_err(|error| failure_notice(&error, "Failed to fetch filter options"))?;
        Ok(())
    }

    /// Dropdown values from the last [`RuleBrowser::load_filter_options`].
    pub fn filter_options(&self) -> &RuleFilterOptions {
        &self.options
    }

    /// Rules loaded so far, newest first.
    pub fn rules(&self) -> &[Rule] {
        self.rules.items()
    }

    /// Last page merged into the list.
    pub fn page(&self) -> usize {
        self.rules.page()
    }

    /// Whether another page is likely available.
    pub fn has_more(&self) -> bool {
        self.rules.has_more()
    }

    /// Whether the signed-in user may edit, delete, or change visibility of `rule`.
    pub fn can_manage(&self, rule: &Rule) -> bool {
        owns(self.session.as_ref(), &rule.user_id)
    }

    /// Create a rule, then reload page 1 and the dropdown values.
    pub async fn create(&mut self, input: NewRule) -> Notice {
        match self.service.create_rule(self.session.as_ref(), input).await {
            Ok(_) => {
                if let Err(notice) = self.refresh().await {
                    return notice;
                }
                if let Err(notice) = self.load_filter_options().await {
                    return notice;
                }
                Notice::success("Rule created successfully!")
            }
            Err(error) => failure_notice(&error, "Failed to create rule"),
        }
    }

    /// Apply an edit to one of the caller's rules.
    pub async fn update(&mut self, id: &str, update: RuleUpdate) -> Notice {
        match self
            .service
            .update_rule(self.session.as_ref(), id, update)
            .await
        {
            Ok(rule) => {
                self.rules.upsert(rule);
                Notice::success("Rule updated successfully!")
            }
            Err(error) => failure_notice(&error, "Failed to update rule"),
        }
    }

    /// Flip the public flag; the badge only changes once the service confirms.
    pub async fn toggle_visibility(&mut self, id: &str) -> Notice {
        let Some(current) = self.rules.get(id).map(Rule::is_public) else {
            return Notice::error("Rule not found");
        };
        match self
            .service
            .set_rule_visibility(self.session.as_ref(), id, !current)
            .await
        {
            Ok(updated) => {
                let is_public = updated.is_public();
                self.rules.upsert(updated);
                Notice::success(format!("Rule is now {}", visibility_label(is_public)))
            }
            Err(error) => failure_notice(&error, "Failed to update visibility"),
        }
    }

    /// Delete a rule; it leaves the list only once the service confirms.
    pub async fn delete(&mut self, id: &str) -> Notice {
        match self.service.delete_rule(self.session.as_ref(), id).await {
            Ok(()) => {
                self.rules.remove(id);
                Notice::success("Rule deleted successfully")
            }
            Err(error) => failure_notice(&error, "Failed to delete rule"),
        }
    }

    /// Count a copy and update the local counter.
    pub async fn record_copy(&mut self, id: &str) -> Notice {
        match self
            .service
            .record_rule_copy(id, self.session.as_ref())
            .await
        {
            Ok(copies) => {
                self.rules.update(id, |rule| rule.copies = Some(copies));
                Notice::success("Rule copied to clipboard!")
            }
            Err(error) => failure_notice(&error, "Failed to copy rule"),
        }
    }

    /// Count a download and update the local counter.
    pub async fn record_download(&mut self, id: &str) -> Notice {
        match self
            .service
            .record_rule_download(id, self.session.as_ref())
            .await
        {
            Ok(downloads) => {
                self.rules.update(id, |rule| rule.downloads = Some(downloads));
                Notice::success("Rule downloaded!")
            }
            Err(error) => failure_notice(&error, "Failed to download rule"),
        }
    }

    /// `.mdc` document for a loaded rule.
    pub fn document(&self, id: &str) -> Option<ExportedDocument> {
        self.rules.get(id).map(export_rule)
    }
}

/// MCP directory view: search, category, and sort over the static listings.
pub struct McpBrowser<S: CatalogApi> {
    service: Arc<S>,
    query: McpQuery,
}

impl<S: CatalogApi> McpBrowser<S> {
    /// Browser with no search, every category, sorted by rating.
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            query: McpQuery::default(),
        }
    }

    /// Free-text search over name, description, and tags.
    pub fn set_search(&mut self, search: Option<String>) {
        self.query.search = search;
    }

    /// Category filter; `all` shows everything.
    pub fn set_category(&mut self, category: Option<String>) {
        self.query.category = category;
    }

    /// Sort order.
    pub fn set_sort(&mut self, sort: McpSort) {
        self.query.sort = sort;
    }

    /// Listings matching the current selection.
    pub fn visible(&self) -> Vec<McpListing> {
        self.service.list_mcp(&self.query)
    }

    /// Category dropdown values.
    pub fn categories(&self) -> Vec<String> {
        self.service.mcp_categories()
    }

    /// Detail view for a listing.
    pub fn detail(&self, id: &str) -> Result<McpListing, Notice> {
        self.service
            .get_mcp(id)
            .map_err(|error| failure_notice(&error, "MCP server not found"))
    }
}
