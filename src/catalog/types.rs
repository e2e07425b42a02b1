//! Catalog records, form inputs, and error definitions.

use crate::backend::{AuthUser, BackendError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed prompt categories offered by the catalog.
pub const PROMPT_CATEGORIES: [&str; 10] = [
    "Fullstack",
    "Frontend",
    "Backend",
    "Database",
    "DevOps",
    "Mobile",
    "AI/ML",
    "Testing",
    "Design",
    "Other",
];

/// Frameworks suggested when authoring a rule.
pub const RULE_FRAMEWORKS: [&str; 12] = [
    "React", "Next.js", "Vue.js", "Angular", "Svelte", "Node.js", "Express", "FastAPI", "Django",
    "Laravel", "Rails", "Other",
];

/// Languages suggested when authoring a rule.
pub const RULE_LANGUAGES: [&str; 12] = [
    "JavaScript",
    "TypeScript",
    "Python",
    "PHP",
    "Ruby",
    "Go",
    "Java",
    "C#",
    "Rust",
    "Swift",
    "Kotlin",
    "Other",
];

/// Glob applied to rules that do not specify one.
pub const DEFAULT_GLOB: &str = "**/*";

/// Filter value meaning "no restriction".
pub const ALL: &str = "All";

/// Errors surfaced by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Form input failed validation.
    #[error("{0}")]
    Validation(String),
    /// A mutation or personal view was requested without a signed-in user.
    #[error("You must be logged in to {action}")]
    Unauthenticated {
        /// Human-readable action that was refused.
        action: &'static str,
    },
    /// Sign-in was rejected by the auth service.
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// The record does not exist or is not owned by the caller.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind (`prompt`, `rule`, `mcp server`).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// A counter kept changing underneath repeated increment attempts.
    #[error("Concurrent updates kept conflicting on {kind} {id}")]
    Conflict {
        /// Record kind.
        kind: &'static str,
        /// Identifier of the contended record.
        id: String,
    },
    /// The hosted service failed the request.
    #[error("Backend request failed: {0}")]
    Backend(#[from] BackendError),
}

/// Authenticated caller: access token plus the user it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token forwarded to the hosted service.
    pub access_token: String,
    /// User the token belongs to.
    pub user: AuthUser,
}

impl Session {
    /// Identifier of the signed-in user.
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Which records a list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    /// Public records from every author.
    #[default]
    Public,
    /// Every record owned by the signed-in user, public or private.
    Mine,
}

/// A shareable AI prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Row identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Optional summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Prompt body.
    pub content: String,
    /// One of [`PROMPT_CATEGORIES`].
    pub category: String,
    /// Optional tag list.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Whether other users can see the prompt.
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// View counter.
    #[serde(default)]
    pub views: u64,
    /// Copy counter.
    #[serde(default)]
    pub copies: u64,
    /// Like counter.
    #[serde(default)]
    pub likes: u64,
    /// Owner reference.
    pub user_id: String,
    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp (RFC 3339).
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Prompt {
    /// Tags as a slice, empty when unset.
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// An editor rule document with glob/apply metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Row identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Optional summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Target framework.
    pub framework: String,
    /// Target language.
    pub language: String,
    /// Rule body.
    pub content: String,
    /// Optional file glob; see [`Rule::glob_or_default`].
    #[serde(default)]
    pub glob: Option<String>,
    /// Whether the assistant applies the rule to every request.
    #[serde(default)]
    pub always_apply: Option<bool>,
    /// Optional tag list.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Download counter.
    #[serde(default)]
    pub downloads: Option<u64>,
    /// Copy counter.
    #[serde(default)]
    pub copies: Option<u64>,
    /// Public flag; unset rows count as public.
    #[serde(default)]
    pub is_public: Option<bool>,
    /// Owner reference.
    pub user_id: String,
    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp (RFC 3339).
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Rule {
    /// Glob pattern, falling back to match-all.
    pub fn glob_or_default(&self) -> &str {
        self.glob
            .as_deref()
            .filter(|glob| !glob.trim().is_empty())
            .unwrap_or(DEFAULT_GLOB)
    }

    /// `always_apply`, treating unset as false.
    pub fn always_apply(&self) -> bool {
        self.always_apply.unwrap_or(false)
    }

    /// Visibility, treating unset as public.
    pub fn is_public(&self) -> bool {
        self.is_public.unwrap_or(true)
    }

    /// Download count, treating unset as zero.
    pub fn download_count(&self) -> u64 {
        self.downloads.unwrap_or(0)
    }

    /// Copy count, treating unset as zero.
    pub fn copy_count(&self) -> u64 {
        self.copies.unwrap_or(0)
    }

    /// Tags as a slice, empty when unset.
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// Directory entry describing an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpListing {
    /// Slug identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Publisher.
    pub author: String,
    /// Semantic version string.
    pub version: String,
    /// Download count.
    #[serde(default)]
    pub downloads: u64,
    /// Average rating (0-5).
    #[serde(default)]
    pub rating: f32,
    /// Tag list.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category label.
    pub category: String,
    /// Long-form description shown on the detail view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    /// Implementation language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Repository stars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u32>,
    /// Human-readable release date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Install command shown on the detail view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
    /// Source repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// Feature bullet points.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// Tags supplied either as a list or as a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    /// Explicit tag list.
    List(Vec<String>),
    /// Comma-separated tags as typed into an edit form.
    Text(String),
}

impl Default for TagInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// Form input for creating a prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPrompt {
    /// Title (at least 3 characters).
    pub title: String,
    /// Optional summary.
    #[serde(default)]
    pub description: Option<String>,
    /// One of [`PROMPT_CATEGORIES`].
    pub category: String,
    /// Prompt body (at least 10 characters).
    pub content: String,
    /// Tags to attach.
    #[serde(default)]
    pub tags: TagInput,
    /// Visibility; defaults to public.
    #[serde(default = "default_true")]
    pub is_public: bool,
}

/// Partial edit of a prompt; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptUpdate {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New summary; an empty string clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New body.
    #[serde(default)]
    pub content: Option<String>,
    /// Replacement tags.
    #[serde(default)]
    pub tags: Option<TagInput>,
    /// New visibility.
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// Form input for creating a rule.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    /// Title (at least 3 characters).
    pub title: String,
    /// Optional summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Target framework.
    pub framework: String,
    /// Target language.
    pub language: String,
    /// Rule body (at least 10 characters).
    pub content: String,
    /// File glob; defaults to [`DEFAULT_GLOB`].
    #[serde(default)]
    pub glob: Option<String>,
    /// Apply to every request.
    #[serde(default)]
    pub always_apply: bool,
    /// Visibility; defaults to public.
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Tags to attach.
    #[serde(default)]
    pub tags: TagInput,
}

/// Partial edit of a rule; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleUpdate {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New summary; an empty string clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// New framework.
    #[serde(default)]
    pub framework: Option<String>,
    /// New language.
    #[serde(default)]
    pub language: Option<String>,
    /// New body.
    #[serde(default)]
    pub content: Option<String>,
    /// New glob; an empty string resets to [`DEFAULT_GLOB`].
    #[serde(default)]
    pub glob: Option<String>,
    /// New apply flag.
    #[serde(default)]
    pub always_apply: Option<bool>,
    /// Replacement tags.
    #[serde(default)]
    pub tags: Option<TagInput>,
    /// New visibility.
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// Server-side filters and page selection for rule listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleQuery {
    /// Public catalog or the caller's own rules.
    pub scope: ListScope,
    /// Exact framework match; `None` or `All` disables.
    pub framework: Option<String>,
    /// Exact language match; `None` or `All` disables.
    pub language: Option<String>,
    /// Substring search over title and description.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: usize,
}

impl Default for RuleQuery {
    fn default() -> Self {
        Self {
            scope: ListScope::Public,
            framework: None,
            language: None,
            search: None,
            page: 1,
        }
    }
}

/// One page of rules plus the "has more" heuristic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulePage {
    /// Rules on this page, newest first.
    pub rules: Vec<Rule>,
    /// 1-based page number.
    pub page: usize,
    /// Page size used for the read.
    pub page_size: usize,
    /// Whether another page is likely available.
    pub has_more: bool,
}

/// Distinct framework and language values for the rule filter dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleFilterOptions {
    /// `All` followed by distinct frameworks.
    pub frameworks: Vec<String>,
    /// `All` followed by distinct languages.
    pub languages: Vec<String>,
}

/// Sort order for MCP listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpSort {
    /// Highest rating first.
    #[default]
    Rating,
    /// Most downloads first.
    Downloads,
    /// Alphabetical by name.
    Name,
}

impl std::str::FromStr for McpSort {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rating" => Ok(Self::Rating),
            "downloads" => Ok(Self::Downloads),
            "name" => Ok(Self::Name),
            _ => Err(()),
        }
    }
}

/// Search, category, and sort applied to the MCP directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McpQuery {
    /// Case-insensitive substring over name, description, and tags.
    pub search: Option<String>,
    /// Case-insensitive category; `all` disables.
    pub category: Option<String>,
    /// Sort order.
    pub sort: McpSort,
}

/// Reachability snapshot for the hosted service.
#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    /// Whether the service answered the health probe.
    pub reachable: bool,
    /// Diagnostic captured when the probe failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Label used in notices for a visibility flag.
pub fn visibility_label(is_public: bool) -> &'static str {
    if is_public { "public" } else { "private" }
}

fn default_true() -> bool {
    true
}
