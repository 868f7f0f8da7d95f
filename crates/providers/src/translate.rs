//! Declaration translation from the neutral dialect to JSON Schema.
//!
//! Neutral declarations use upper-case type tokens (`OBJECT`, `STRING`, ...).
//! JSON-Schema dialects such as Anthropic's `input_schema` want lower-case
//! tokens. Translation is structural and total: every node, name,
//! description, `required` list and `enum` list is carried over, nested
//! `properties` and `items` are translated recursively, and nothing absent in
//! the source is invented.

use std::collections::BTreeMap;

use contentcrew_core::schema::{FunctionDeclaration, Schema};
use serde::{Deserialize, Serialize};

/// A JSON-Schema node with lower-case type tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, JsonSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// Tool declaration in the Anthropic Messages API shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: JsonSchema,
}

/// Translate one schema node and everything below it.
pub fn to_json_schema(schema: &Schema) -> JsonSchema {
    JsonSchema {
        kind: schema.kind.json_schema_name().to_string(),
        description: schema.description.clone(),
        properties: schema.properties.as_ref().map(|props| {
            props
                .iter()
                .map(|(name, prop)| (name.clone(), to_json_schema(prop)))
                .collect()
        }),
        items: schema.items.as_deref().map(|items| Box::new(to_json_schema(items))),
        required: schema.required.clone(),
        enum_values: schema.enum_values.clone(),
    }
}

/// Translate a declaration. The top-level input schema is always an object.
pub fn to_anthropic_tool(decl: &FunctionDeclaration) -> AnthropicTool {
    let mut input_schema = to_json_schema(&decl.parameters);
    input_schema.kind = "object".into();
    AnthropicTool {
        name: decl.name.clone(),
        description: decl.description.clone(),
        input_schema,
    }
}

pub fn to_anthropic_tools(decls: &[FunctionDeclaration]) -> Vec<AnthropicTool> {
    decls.iter().map(to_anthropic_tool).collect()
}
