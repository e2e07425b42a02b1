//! In-memory `CatalogApi` used by controller and route tests.

use crate::{
    backend::{AuthSession, AuthUser, BackendError},
    catalog::{
        filter::{filter_mcp, is_restrictive, mcp_categories, rule_filter_options_for},
        listing::{PAGE_OUT_OF_RANGE, PageWindow},
        service::{CatalogApi, require_session},
        types::*,
        validate::{
            validate_new_prompt, validate_new_rule, validate_prompt_update, validate_rule_update,
        },
    },
    metrics::MetricsSnapshot,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) const PASSWORD: &str = "secret";

#[derive(Default)]
struct FakeState {
    prompts: Vec<Prompt>,
    rules: Vec<Rule>,
    failing: bool,
    mutations: Vec<String>,
    rule_page_reads: usize,
    next_id: usize,
}

#[derive(Clone)]
pub(crate) struct FakeCatalog {
    state: Arc<Mutex<FakeState>>,
    listings: Vec<McpListing>,
    users: Vec<(String, AuthUser)>,
    page_size: usize,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            listings: Vec::new(),
            users: Vec::new(),
            page_size: 2,
        }
    }

    pub(crate) fn with_user(mut self, token: &str, user_id: &str) -> Self {
        self.users.push((
            token.to_string(),
            AuthUser {
                id: user_id.to_string(),
                email: Some(format!("{user_id}@example.org")),
            },
        ));
        self
    }

    pub(crate) fn with_listings(mut self, listings: Vec<McpListing>) -> Self {
        self.listings = listings;
        self
    }

    pub(crate) async fn seed_prompts(&self, prompts: Vec<Prompt>) {
        self.state.lock().await.prompts = prompts;
    }

    pub(crate) async fn seed_rules(&self, rules: Vec<Rule>) {
        self.state.lock().await.rules = rules;
    }

    pub(crate) async fn set_failing(&self, failing: bool) {
        self.state.lock().await.failing = failing;
    }

    pub(crate) async fn mutations(&self) -> Vec<String> {
        self.state.lock().await.mutations.clone()
    }

    pub(crate) async fn rule_page_reads(&self) -> usize {
        self.state.lock().await.rule_page_reads
    }

    pub(crate) fn session(&self, token: &str) -> Session {
        let user = self
            .users
            .iter()
            .find(|(known, _)| known == token)
            .map(|(_, user)| user.clone())
            .expect("seeded user");
        Session {
            access_token: token.to_string(),
            user,
        }
    }

    fn check(state: &FakeState) -> Result<(), CatalogError> {
        if state.failing {
            Err(CatalogError::Backend(BackendError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "injected failure".into(),
            }))
        } else {
            Ok(())
        }
    }

    fn not_found(kind: &'static str, id: &str) -> CatalogError {
        CatalogError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub(crate) fn prompt(id: &str, owner: &str, category: &str, tags: &[&str]) -> Prompt {
    Prompt {
        id: id.into(),
        title: format!("Prompt {id}"),
        description: Some(format!("About {id}")),
        content: format!("Body of prompt {id}"),
        category: category.into(),
        tags: if tags.is_empty() {
            None
        } else {
            Some(tags.iter().map(|tag| tag.to_string()).collect())
        },
        is_public: true,
        views: 0,
        copies: 0,
        likes: 0,
        user_id: owner.into(),
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn rule(id: &str, owner: &str, framework: &str, language: &str) -> Rule {
    Rule {
        id: id.into(),
        title: format!("Rule {id}"),
        description: None,
        framework: framework.into(),
        language: language.into(),
        content: format!("Content of rule {id}"),
        glob: None,
        always_apply: None,
        tags: None,
        downloads: None,
        copies: None,
        is_public: Some(true),
        user_id: owner.into(),
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn listing(id: &str, category: &str, rating: f32, downloads: u64) -> McpListing {
    McpListing {
        id: id.into(),
        name: id.to_uppercase(),
        description: format!("{id} server"),
        author: "someone".into(),
        version: "1.0.0".into(),
        downloads,
        rating,
        tags: vec![id.to_string()],
        category: category.into(),
        full_description: None,
        language: None,
        stars: None,
        release_date: None,
        install_command: None,
        github_url: None,
        features: Vec::new(),
    }
}

fn visible_to(is_public: bool, owner: &str, session: Option<&Session>) -> bool {
    is_public || session.is_some_and(|session| session.user_id() == owner)
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn list_prompts(
        &self,
        scope: ListScope,
        session: Option<&Session>,
    ) -> Result<Vec<Prompt>, CatalogError> {
        let owner = match scope {
            ListScope::Public => None,
            ListScope::Mine => Some(require_session(session, "view your prompts")?.user_id()),
        };
        let state = self.state.lock().await;
        Self::check(&state)?;
        Ok(state
            .prompts
            .iter()
            .filter(|prompt| match owner {
                Some(owner) => prompt.user_id == owner,
                None => prompt.is_public,
            })
            .cloned()
            .collect())
    }

    async fn get_prompt(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> Result<Prompt, CatalogError> {
        let state = self.state.lock().await;
        Self::check(&state)?;
        state
            .prompts
            .iter()
            .find(|prompt| prompt.id == id && visible_to(prompt.is_public, &prompt.user_id, session))
            .cloned()
            .ok_or_else(|| Self::not_found("prompt", id))
    }

    async fn create_prompt(
        &self,
        session: Option<&Session>,
        input: NewPrompt,
    ) -> Result<Prompt, CatalogError> {
        let session = require_session(session, "create prompts")?;
        let row = validate_new_prompt(input, session.user_id())?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        state.next_id += 1;
        let prompt = Prompt {
            id: format!("new-{}", state.next_id),
            title: row.title,
            description: row.description,
            content: row.content,
            category: row.category,
            tags: row.tags,
            is_public: row.is_public,
            views: 0,
            copies: 0,
            likes: 0,
            user_id: row.user_id,
            created_at: None,
            updated_at: None,
        };
        state.prompts.insert(0, prompt.clone());
        state.mutations.push(format!("create_prompt:{}", prompt.id));
        Ok(prompt)
    }

    async fn update_prompt(
        &self,
        session: Option<&Session>,
        id: &str,
        update: PromptUpdate,
    ) -> Result<Prompt, CatalogError> {
        let session = require_session(session, "edit prompts")?;
        validate_prompt_update(update.clone())?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let prompt = state
            .prompts
            .iter_mut()
            .find(|prompt| prompt.id == id && prompt.user_id == session.user_id())
            .ok_or_else(|| Self::not_found("prompt", id))?;
        if let Some(title) = update.title {
            prompt.title = title.trim().to_string();
        }
        if let Some(content) = update.content {
            prompt.content = content.trim().to_string();
        }
        if let Some(is_public) = update.is_public {
            prompt.is_public = is_public;
        }
        let updated = prompt.clone();
        state.mutations.push(format!("update_prompt:{id}"));
        Ok(updated)
    }

    async fn delete_prompt(
        &self,
        session: Option<&Session>,
        id: &str,
    ) -> Result<(), CatalogError> {
        let session = require_session(session, "delete prompts")?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let before = state.prompts.len();
        state
            .prompts
            .retain(|prompt| !(prompt.id == id && prompt.user_id == session.user_id()));
        if state.prompts.len() == before {
            return Err(Self::not_found("prompt", id));
        }
        state.mutations.push(format!("delete_prompt:{id}"));
        Ok(())
    }

    async fn set_prompt_visibility(
        &self,
        session: Option<&Session>,
        id: &str,
        is_public: bool,
    ) -> Result<Prompt, CatalogError> {
        let session = require_session(session, "change prompt visibility")?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let prompt = state
            .prompts
            .iter_mut()
            .find(|prompt| prompt.id == id && prompt.user_id == session.user_id())
            .ok_or_else(|| Self::not_found("prompt", id))?;
        prompt.is_public = is_public;
        let updated = prompt.clone();
        state.mutations.push(format!("prompt_visibility:{id}"));
        Ok(updated)
    }

    async fn record_prompt_copy(
        &self,
        id: &str,
        _session: Option<&Session>,
    ) -> Result<u64, CatalogError> {
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let prompt = state
            .prompts
            .iter_mut()
            .find(|prompt| prompt.id == id)
            .ok_or_else(|| Self::not_found("prompt", id))?;
        prompt.copies += 1;
        Ok(prompt.copies)
    }

    async fn list_rules(
        &self,
        query: &RuleQuery,
        session: Option<&Session>,
    ) -> Result<RulePage, CatalogError> {
        let owner = match query.scope {
            ListScope::Public => None,
            ListScope::Mine => Some(require_session(session, "view your rules")?.user_id()),
        };
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        state.rule_page_reads += 1;
        let framework = is_restrictive(query.framework.as_deref());
        let language = is_restrictive(query.language.as_deref());
        let search = query
            .search
            .as_deref()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty());
        let window = PageWindow::checked(query.page, self.page_size)
            .ok_or_else(|| CatalogError::Validation(PAGE_OUT_OF_RANGE.to_string()))?;

        let rules: Vec<Rule> = state
            .rules
            .iter()
            .filter(|rule| match owner {
                Some(owner) => rule.user_id == owner,
                None => rule.is_public(),
            })
            .filter(|rule| framework.is_none_or(|value| rule.framework == value))
            .filter(|rule| language.is_none_or(|value| rule.language == value))
            .filter(|rule| {
                search.as_deref().is_none_or(|term| {
                    rule.title.to_lowercase().contains(term)
                        || rule
                            .description
                            .as_deref()
                            .is_some_and(|description| description.to_lowercase().contains(term))
                })
            })
            .skip(window.from())
            .take(window.size)
            .cloned()
            .collect();
        let has_more = window.has_more(rules.len());
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
        let owner = match scope {
            ListScope::Public => None,
            ListScope::Mine => Some(require_session(session, "view your rules")?.user_id()),
        };
        let state = self.state.lock().await;
        Self::check(&state)?;
        let rules: Vec<Rule> = state
            .rules
            .iter()
            .filter(|rule| match owner {
                Some(owner) => rule.user_id == owner,
                None => rule.is_public(),
            })
            .cloned()
            .collect();
        Ok(rule_filter_options_for(&rules))
    }

    async fn get_rule(&self, id: &str, session: Option<&Session>) -> Result<Rule, CatalogError> {
        let state = self.state.lock().await;
        Self::check(&state)?;
        state
            .rules
            .iter()
            .find(|rule| rule.id == id && visible_to(rule.is_public(), &rule.user_id, session))
            .cloned()
            .ok_or_else(|| Self::not_found("rule", id))
    }

    async fn create_rule(
        &self,
        session: Option<&Session>,
        input: NewRule,
    ) -> Result<Rule, CatalogError> {
        let session = require_session(session, "create rules")?;
        let row = validate_new_rule(input, session.user_id())?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        state.next_id += 1;
        let rule = Rule {
            id: format!("new-{}", state.next_id),
            title: row.title,
            description: row.description,
            framework: row.framework,
            language: row.language,
            content: row.content,
            glob: Some(row.glob),
            always_apply: Some(row.always_apply),
            tags: row.tags,
            downloads: Some(0),
            copies: Some(0),
            is_public: Some(row.is_public),
            user_id: row.user_id,
            created_at: None,
            updated_at: None,
        };
        state.rules.insert(0, rule.clone());
        state.mutations.push(format!("create_rule:{}", rule.id));
        Ok(rule)
    }

    async fn update_rule(
        &self,
        session: Option<&Session>,
        id: &str,
        update: RuleUpdate,
    ) -> Result<Rule, CatalogError> {
        let session = require_session(session, "edit rules")?;
        validate_rule_update(update.clone())?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let rule = state
            .rules
            .iter_mut()
            .find(|rule| rule.id == id && rule.user_id == session.user_id())
            .ok_or_else(|| Self::not_found("rule", id))?;
        if let Some(title) = update.title {
            rule.title = title.trim().to_string();
        }
        if let Some(content) = update.content {
            rule.content = content.trim().to_string();
        }
        if let Some(is_public) = update.is_public {
            rule.is_public = Some(is_public);
        }
        let updated = rule.clone();
        state.mutations.push(format!("update_rule:{id}"));
        Ok(updated)
    }

    async fn delete_rule(&self, session: Option<&Session>, id: &str) -> Result<(), CatalogError> {
        let session = require_session(session, "delete rules")?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let before = state.rules.len();
        state
            .rules
            .retain(|rule| !(rule.id == id && rule.user_id == session.user_id()));
        if state.rules.len() == before {
            return Err(Self::not_found("rule", id));
        }
        state.mutations.push(format!("delete_rule:{id}"));
        Ok(())
    }

    async fn set_rule_visibility(
        &self,
        session: Option<&Session>,
        id: &str,
        is_public: bool,
    ) -> Result<Rule, CatalogError> {
        let session = require_session(session, "change rule visibility")?;
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let rule = state
            .rules
            .iter_mut()
            .find(|rule| rule.id == id && rule.user_id == session.user_id())
            .ok_or_else(|| Self::not_found("rule", id))?;
        rule.is_public = Some(is_public);
        let updated = rule.clone();
        state.mutations.push(format!("rule_visibility:{id}"));
        Ok(updated)
    }

    async fn record_rule_copy(
        &self,
        id: &str,
        _session: Option<&Session>,
    ) -> Result<u64, CatalogError> {
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let rule = state
            .rules
            .iter_mut()
            .find(|rule| rule.id == id)
            .ok_or_else(|| Self::not_found("rule", id))?;
        let next = rule.copy_count() + 1;
        rule.copies = Some(next);
        Ok(next)
    }

    async fn record_rule_download(
        &self,
        id: &str,
        _session: Option<&Session>,
    ) -> Result<u64, CatalogError> {
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let rule = state
            .rules
            .iter_mut()
            .find(|rule| rule.id == id)
            .ok_or_else(|| Self::not_found("rule", id))?;
        let next = rule.download_count() + 1;
        rule.downloads = Some(next);
        Ok(next)
    }

    fn list_mcp(&self, query: &McpQuery) -> Vec<McpListing> {
        filter_mcp(&self.listings, query)
    }

    fn get_mcp(&self, id: &str) -> Result<McpListing, CatalogError> {
        self.listings
            .iter()
            .find(|listing| listing.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found("mcp server", id))
    }

    fn mcp_categories(&self) -> Vec<String> {
        mcp_categories(&self.listings)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, CatalogError> {
        self.users
            .iter()
            .find(|(_, user)| user.email.as_deref() == Some(email) && password == PASSWORD)
            .map(|(token, user)| AuthSession {
                access_token: token.clone(),
                refresh_token: None,
                expires_in: Some(3600),
                user: user.clone(),
            })
            .ok_or(CatalogError::InvalidCredentials)
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), CatalogError> {
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<Option<Session>, CatalogError> {
        Ok(self
            .users
            .iter()
            .find(|(known, _)| known == token)
            .map(|(token, user)| Session {
                access_token: token.clone(),
                user: user.clone(),
            }))
    }

    async fn health(&self) -> BackendHealth {
        let failing = self.state.lock().await.failing;
        BackendHealth {
            reachable: !failing,
            error: failing.then(|| "injected failure".to_string()),
        }
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: 7,
            ..MetricsSnapshot::default()
        }
    }
}
