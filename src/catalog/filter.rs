//! In-memory filtering and sorting over already-fetched result sets.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::types::{ALL, McpListing, McpQuery, McpSort, Prompt, Rule, RuleFilterOptions};

/// Category and tag selection for prompt lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFilter {
    /// Selected category; `None` or `All` matches everything.
    pub category: Option<String>,
    /// Selected tags; a prompt matches when it carries any of them.
    pub tags: Vec<String>,
}

impl PromptFilter {
    /// Whether `prompt` passes the category and tag selection.
    pub fn matches(&self, prompt: &Prompt) -> bool {
        let category_match = match self.category.as_deref() {
            None | Some(ALL) => true,
            Some(category) => prompt.category == category,
        };
        let tag_match = self.tags.is_empty()
            || self
                .tags
                .iter()
                .any(|selected| prompt.tag_list().contains(selected));
        category_match && tag_match
    }

    /// Add `tag` to the selection, or remove it when already selected.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(position) = self.tags.iter().position(|selected| selected == tag) {
            self.tags.remove(position);
        } else {
            self.tags.push(tag.to_string());
        }
    }
}

/// Prompts passing `filter`, in their original order.
pub fn filter_prompts<'a>(prompts: &'a [Prompt], filter: &PromptFilter) -> Vec<&'a Prompt> {
    prompts.iter().filter(|prompt| filter.matches(prompt)).collect()
}

/// Distinct tags across `prompts`, in first-seen order.
pub fn available_tags(prompts: &[Prompt]) -> Vec<String> {
    distinct(prompts.iter().flat_map(|prompt| prompt.tag_list().iter().cloned()))
}

/// Framework and language dropdown values from `(framework, language)` pairs.
pub fn rule_filter_options<I>(pairs: I) -> RuleFilterOptions
where
    I: IntoIterator<Item = (String, String)>,
{
    let (frameworks, languages): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
    let with_all = |values: Vec<String>| {
        let mut options = vec![ALL.to_string()];
        options.extend(distinct(values).into_iter().filter(|value| value != ALL));
        options
    };
    RuleFilterOptions {
        frameworks: with_all(frameworks),
        languages: with_all(languages),
    }
}

/// Dropdown values for the rules already held by a view.
pub fn rule_filter_options_for(rules: &[Rule]) -> RuleFilterOptions {
    rule_filter_options(
        rules
            .iter()
            .map(|rule| (rule.framework.clone(), rule.language.clone())),
    )
}

/// Whether an optional dropdown value actually restricts results.
pub fn is_restrictive(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case(ALL))
}

/// Whether `listing` matches the free-text search term.
pub fn mcp_matches_search(listing: &McpListing, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    listing.name.to_lowercase().contains(&needle)
        || listing.description.to_lowercase().contains(&needle)
        || listing
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Apply search, category, and sort to the MCP directory.
pub fn filter_mcp(listings: &[McpListing], query: &McpQuery) -> Vec<McpListing> {
    let category = is_restrictive(query.category.as_deref()).map(str::to_lowercase);
    let mut matches: Vec<McpListing> = listings
        .iter()
        .filter(|listing| {
            query
                .search
                .as_deref()
                .is_none_or(|term| mcp_matches_search(listing, term))
        })
        .filter(|listing| {
            category
                .as_deref()
                .is_none_or(|category| listing.category.to_lowercase() == category)
        })
        .cloned()
        .collect();

    match query.sort {
        McpSort::Rating => matches.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
        }),
        McpSort::Downloads => matches.sort_by(|a, b| b.downloads.cmp(&a.downloads)),
        McpSort::Name => matches.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
    }
    matches
}

/// `All` followed by the distinct listing categories in first-seen order.
///
/// Categories are compared case-insensitively, like the category filter itself; the first
/// spelling seen is the one offered.
pub fn mcp_categories(listings: &[McpListing]) -> Vec<String> {
    let mut seen = HashSet::from([ALL.to_lowercase()]);
    let mut categories = vec![ALL.to_string()];
    for listing in listings {
        let category = listing.category.trim();
        if !category.is_empty() && seen.insert(category.to_lowercase()) {
            categories.push(category.to_string());
        }
    }
    categories
}

fn distinct<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
