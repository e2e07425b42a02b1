//! JSON schema builders for MCP tools.

use crate::{
    catalog::{PROMPT_CATEGORIES, RULE_FRAMEWORKS, RULE_LANGUAGES},
    mcp::handlers::metrics::MetricsPayload,
};
use schemars::schema_for;
use serde_json::{Map, Value};

/// Build the schema describing the `list-prompts` tool input.
pub(crate) fn list_prompts_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "category".into(),
        enum_schema(
            "Only prompts in this category; omit or pass 'All' for every category",
            PROMPT_CATEGORIES.iter().copied(),
        ),
    );

    let mut tag_item_schema = Map::new();
    tag_item_schema.insert("type".into(), Value::String("string".into()));
    let mut tags_schema = Map::new();
    tags_schema.insert("type".into(), Value::String("array".into()));
    tags_schema.insert(
        "description".into(),
        Value::String("Prompts carrying any of these tags".into()),
    );
    tags_schema.insert("items".into(), Value::Object(tag_item_schema));
    properties.insert("tags".into(), Value::Object(tags_schema));

    finalize_object_schema(properties, &[])
}

/// Build the schema for tools addressing one record by id.
pub(crate) fn id_input_schema(description: &str) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("id".into(), string_schema(description));
    finalize_object_schema(properties, &["id"])
}

/// Build the schema describing the `list-rules` tool input.
pub(crate) fn list_rules_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "framework".into(),
        enum_schema(
            "Only rules for this framework; 'All' disables the filter",
            RULE_FRAMEWORKS.iter().copied(),
        ),
    );
    properties.insert(
        "language".into(),
        enum_schema(
            "Only rules for this language; 'All' disables the filter",
            RULE_LANGUAGES.iter().copied(),
        ),
    );
    properties.insert(
        "search".into(),
        string_schema("Case-insensitive match against title and description"),
    );

    let mut page_schema = Map::new();
    page_schema.insert("type".into(), Value::String("integer".into()));
    page_schema.insert(
        "description".into(),
        Value::String("1-based page number; pages hold RULES_PAGE_SIZE rules".into()),
    );
    page_schema.insert("minimum".into(), Value::Number(1.into()));
    page_schema.insert("default".into(), Value::Number(1.into()));
    properties.insert("page".into(), Value::Object(page_schema));

    finalize_object_schema(properties, &[])
}

/// Build the schema describing the `list-mcp-servers` tool input.
pub(crate) fn list_mcp_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "search".into(),
        string_schema("Case-insensitive match against name, description, and tags"),
    );
    properties.insert(
        "category".into(),
        string_schema("Only servers in this category; 'All' disables the filter"),
    );

    let mut sort_schema = Map::new();
    sort_schema.insert("type".into(), Value::String("string".into()));
    sort_schema.insert(
        "enum".into(),
        Value::Array(
            ["rating", "downloads", "name"]
                .into_iter()
                .map(|variant| Value::String(variant.into()))
                .collect(),
        ),
    );
    sort_schema.insert("default".into(), Value::String("rating".into()));
    properties.insert("sort".into(), Value::Object(sort_schema));

    finalize_object_schema(properties, &[])
}

/// Output schema for the `metrics` tool, derived from its payload type.
pub(crate) fn metrics_output_schema() -> Map<String, Value> {
    match serde_json::to_value(schema_for!(MetricsPayload)) {
        Ok(Value::Object(schema)) => schema,
        _ => finalize_object_schema(Map::new(), &[]),
    }
}

/// Build the schema for tools that take no arguments.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn enum_schema<'a>(description: &str, values: impl Iterator<Item = &'a str>) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    schema.insert(
        "examples".into(),
        Value::Array(values.map(|value| Value::String(value.into())).collect()),
    );
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
