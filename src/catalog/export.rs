//! Downloadable documents for rules and prompts.

use serde::Serialize;

use super::types::{Prompt, Rule};

/// Extension used for rule documents.
pub const RULE_EXTENSION: &str = "mdc";
/// Extension used for prompt documents.
pub const PROMPT_EXTENSION: &str = "md";

/// A named text document ready to be saved by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedDocument {
    /// Suggested file name.
    pub file_name: String,
    /// Document body.
    pub content: String,
}

/// Render `rule` as a front-matter document.
pub fn rule_document(rule: &Rule) -> String {
    format!(
        "---\ndescription: {}\nglobs: {}\nalwaysApply: {}\n---\n\n{}",
        rule.description.as_deref().unwrap_or_default(),
        rule.glob_or_default(),
        rule.always_apply(),
        rule.content
    )
}

/// Lowercase `title` and collapse each whitespace run into a hyphen.
///
/// Control characters, quotes, and path separators are dropped so the name can be written
/// to disk and quoted in a `Content-Disposition` header.
pub fn file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .filter(|c| !matches!(c, '"' | '\\' | '/'))
        .collect();
    cleaned
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Rule document plus its `.mdc` file name.
pub fn export_rule(rule: &Rule) -> ExportedDocument {
    ExportedDocument {
        file_name: format!("{}.{RULE_EXTENSION}", file_stem(&rule.title)),
        content: rule_document(rule),
    }
}

/// Prompt body plus its `.md` file name.
pub fn export_prompt(prompt: &Prompt) -> ExportedDocument {
    ExportedDocument {
        file_name: format!("{}.{PROMPT_EXTENSION}", file_stem(&prompt.title)),
        content: prompt.content.clone(),
    }
}
