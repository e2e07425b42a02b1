//! Form validation and normalization into table payloads.

use serde::Serialize;
use std::collections::HashSet;

use super::types::{
    CatalogError, DEFAULT_GLOB, NewPrompt, NewRule, PROMPT_CATEGORIES, PromptUpdate, RuleUpdate,
    TagInput,
};

const MIN_TITLE_CHARS: usize = 3;
const MIN_CONTENT_CHARS: usize = 10;

/// Row written when a prompt is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptInsert {
    /// Owner reference.
    pub user_id: String,
    /// Trimmed title.
    pub title: String,
    /// Trimmed summary or null.
    pub description: Option<String>,
    /// Validated category.
    pub category: String,
    /// Prompt body.
    pub content: String,
    /// Visibility.
    pub is_public: bool,
    /// Tags or null when none.
    pub tags: Option<Vec<String>>,
}

/// Column patch applied when a prompt is edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl PromptPatch {
    /// Stamp the patch with an update time.
    pub fn touched_at(mut self, timestamp: String) -> Self {
        self.updated_at = Some(timestamp);
        self
    }
}

/// Row written when a rule is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInsert {
    /// Owner reference.
    pub user_id: String,
    /// Trimmed title.
    pub title: String,
    /// Trimmed summary or null.
    pub description: Option<String>,
    /// Target framework.
    pub framework: String,
    /// Target language.
    pub language: String,
    /// Rule body.
    pub content: String,
    /// Glob, defaulted to match-all.
    pub glob: String,
    /// Apply flag.
    pub always_apply: bool,
    /// Visibility.
    pub is_public: bool,
    /// Tags or null when none.
    pub tags: Option<Vec<String>>,
}

/// Column patch applied when a rule is edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RulePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    glob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    always_apply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl RulePatch {
    /// Stamp the patch with an update time.
    pub fn touched_at(mut self, timestamp: String) -> Self {
        self.updated_at = Some(timestamp);
        self
    }
}

/// Validate a new prompt and shape it into an insert row for `user_id`.
pub fn validate_new_prompt(input: NewPrompt, user_id: &str) -> Result<PromptInsert, CatalogError> {
    let title = require_min(&input.title, MIN_TITLE_CHARS, "Title")?;
    let category = validate_category(&input.category)?;
    let content = require_min(&input.content, MIN_CONTENT_CHARS, "Content")?;
    let tags = sanitize_tags(tag_input_values(input.tags));

    Ok(PromptInsert {
        user_id: user_id.to_string(),
        title,
        description: sanitize_string(input.description),
        category,
        content,
        is_public: input.is_public,
        tags: non_empty_tags(tags),
    })
}

/// Validate a prompt edit. Edited fields only need to be non-empty.
pub fn validate_prompt_update(update: PromptUpdate) -> Result<PromptPatch, CatalogError> {
    let patch = PromptPatch {
        title: update
            .title
            .map(|title| require_present(&title, "Title"))
            .transpose()?,
        description: update.description.map(|value| sanitize_string(Some(value))),
        category: update
            .category
            .map(|category| validate_category(&category))
            .transpose()?,
        content: update
            .content
            .map(|content| require_present(&content, "Content"))
            .transpose()?,
        tags: update.tags.map(edited_tags),
        is_public: update.is_public,
        updated_at: None,
    };

    if patch == PromptPatch::default() {
        return Err(CatalogError::Validation("Nothing to update".into()));
    }
    Ok(patch)
}

/// Validate a new rule and shape it into an insert row for `user_id`.
pub fn validate_new_rule(input: NewRule, user_id: &str) -> Result<RuleInsert, CatalogError> {
    let title = require_min(&input.title, MIN_TITLE_CHARS, "Title")?;
    let framework = require_present(&input.framework, "Framework")?;
    let language = require_present(&input.language, "Language")?;
    let content = require_min(&input.content, MIN_CONTENT_CHARS, "Content")?;
    let tags = sanitize_tags(tag_input_values(input.tags));

    Ok(RuleInsert {
        user_id: user_id.to_string(),
        title,
        description: sanitize_string(input.description),
        framework,
        language,
        content,
        glob: sanitize_string(input.glob).unwrap_or_else(|| DEFAULT_GLOB.to_string()),
        always_apply: input.always_apply,
        is_public: input.is_public,
        tags: non_empty_tags(tags),
    })
}

/// Validate a rule edit. Edited fields only need to be non-empty.
pub fn validate_rule_update(update: RuleUpdate) -> Result<RulePatch, CatalogError> {
    let patch = RulePatch {
        title: update
            .title
            .map(|title| require_present(&title, "Title"))
            .transpose()?,
        description: update.description.map(|value| sanitize_string(Some(value))),
        framework: update
            .framework
            .map(|framework| require_present(&framework, "Framework"))
            .transpose()?,
        language: update
            .language
            .map(|language| require_present(&language, "Language"))
            .transpose()?,
        content: update
            .content
            .map(|content| require_present(&content, "Rule content"))
            .transpose()?,
        glob: update
            .glob
            .map(|glob| sanitize_string(Some(glob)).unwrap_or_else(|| DEFAULT_GLOB.to_string())),
        always_apply: update.always_apply,
        tags: update.tags.map(edited_tags),
        is_public: update.is_public,
        updated_at: None,
    };

    if patch == RulePatch::default() {
        return Err(CatalogError::Validation("Nothing to update".into()));
    }
    Ok(patch)
}

/// Check `category` against the fixed category list.
pub fn validate_category(category: &str) -> Result<String, CatalogError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation("Category is required".into()));
    }
    PROMPT_CATEGORIES
        .iter()
        .find(|known| **known == trimmed)
        .map(|known| known.to_string())
        .ok_or_else(|| CatalogError::Validation(format!("Unknown category: {trimmed}")))
}

/// Trim tags, drop empties, and dedupe keeping the first occurrence.
pub fn sanitize_tags<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut sanitized = Vec::new();
    for tag in values {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            sanitized.push(trimmed.to_string());
        }
    }
    sanitized
}

/// Split a comma-separated tag string.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    sanitize_tags(raw.split(',').map(str::to_string))
}

fn tag_input_values(input: TagInput) -> Vec<String> {
    match input {
        TagInput::List(tags) => tags,
        TagInput::Text(raw) => parse_tag_list(&raw),
    }
}

/// Edits store cleared tags as an empty array; only inserts use null.
fn edited_tags(input: TagInput) -> Vec<String> {
    sanitize_tags(tag_input_values(input))
}

fn non_empty_tags(tags: Vec<String>) -> Option<Vec<String>> {
    if tags.is_empty() { None } else { Some(tags) }
}

fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn require_present(value: &str, field: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CatalogError::Validation(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn require_min(value: &str, min_chars: usize, field: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min_chars {
        Err(CatalogError::Validation(format!(
            "{field} must be at least {min_chars} characters"
        )))
    } else {
        Ok(trimmed.to_string())
    }
}
