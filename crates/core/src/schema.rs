//! Provider-neutral tool declarations.
//!
//! Declarations use upper-case primitive names (`STRING`, `OBJECT`, ...) with
//! nested `properties`/`items`/`required`, which is also what Gemini accepts
//! natively. Other providers translate from this form in their adapter.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive type tokens of the neutral dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    #[serde(alias = "string")]
    String,
    #[serde(alias = "number")]
    Number,
    #[serde(alias = "integer")]
    Integer,
    #[serde(alias = "boolean")]
    Boolean,
    #[serde(alias = "array")]
    Array,
    #[serde(alias = "object")]
    Object,
}

impl SchemaType {
    /// The JSON-Schema spelling (`string`, `object`, ...).
    pub fn json_schema_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.json_schema_name().to_ascii_uppercase())
    }
}

/// A parameter schema node. Fields absent in the source stay absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl Schema {
    fn of(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            properties: None,
            items: None,
            required: None,
            enum_values: None,
        }
    }

    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::of(SchemaType::String).describe(description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::of(SchemaType::Integer).describe(description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::of(SchemaType::Number).describe(description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::of(SchemaType::Boolean).describe(description)
    }

    pub fn array(items: Schema, description: impl Into<String>) -> Self {
        let mut schema = Self::of(SchemaType::Array).describe(description);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), schema);
        self
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.get_or_insert_with(Vec::new).push(name.into());
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Deepest nesting level below and including this node.
    pub fn depth(&self) -> usize {
        let props = self
            .properties
            .iter()
            .flat_map(|p| p.values())
            .map(Schema::depth)
            .max()
            .unwrap_or(0);
        let items = self.items.as_deref().map(Schema::depth).unwrap_or(0);
        1 + props.max(items)
    }
}

/// A callable function as announced to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Schema,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Schema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
