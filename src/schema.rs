//! Schema Contract Layer
//!
//! Structural contracts for every flow boundary. A [`Schema`] is a named, ordered list of
//! fields; [`validate`] checks a JSON value against it. Validation is structural: unknown
//! extra fields pass, missing required fields and wrong primitive types fail with the
//! offending field path. Values are never coerced.

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Declared type of a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Number,
    Array(Box<FieldType>),
    Object(Schema),
    /// Present but allowed to be `null`
    Nullable(Box<FieldType>),
}

impl FieldType {
    pub fn array(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    pub fn nullable(inner: FieldType) -> Self {
        FieldType::Nullable(Box::new(inner))
    }

    fn matches_primitive(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Array(_) => value.is_array(),
            FieldType::Object(_) => value.is_object(),
            FieldType::Nullable(inner) => value.is_null() || inner.matches_primitive(value),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Number => write!(f, "number"),
            FieldType::Array(item) => write!(f, "array<{}>", item),
            FieldType::Object(schema) => write!(f, "object {}", schema.name),
            FieldType::Nullable(inner) => write!(f, "{} or null", inner),
        }
    }
}

/// One named field of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub optional: bool,
    /// Human-readable intent; forwarded to the backend as the field description
    pub description: &'static str,
}

/// Named structural contract
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Add a required field
    pub fn field(mut self, name: &'static str, ty: FieldType, description: &'static str) -> Self {
        self.fields.push(Field {
            name,
            ty,
            optional: false,
            description,
        });
        self
    }

    /// Add an optional field (may be absent or `null`)
    pub fn optional(
        mut self,
        name: &'static str,
        ty: FieldType,
        description: &'static str,
    ) -> Self {
        self.fields.push(Field {
            name,
            ty,
            optional: true,
            description,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render as the OpenAPI-style schema object accepted by the backend's `responseSchema`.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        let mut ordering = Vec::new();
        for field in &self.fields {
            let mut prop = type_to_json_schema(&field.ty);
            if let Value::Object(ref mut obj) = prop {
                obj.insert("description".to_string(), json!(field.description));
            }
            properties.insert(field.name.to_string(), prop);
            if !field.optional {
                required.push(json!(field.name));
            }
            ordering.push(json!(field.name));
        }
        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
            "propertyOrdering": ordering,
        })
    }
}

fn type_to_json_schema(ty: &FieldType) -> Value {
    match ty {
        FieldType::String => json!({ "type": "STRING" }),
        FieldType::Boolean => json!({ "type": "BOOLEAN" }),
        FieldType::Integer => json!({ "type": "INTEGER" }),
        FieldType::Number => json!({ "type": "NUMBER" }),
        FieldType::Array(item) => json!({ "type": "ARRAY", "items": type_to_json_schema(item) }),
        FieldType::Object(schema) => schema.to_json_schema(),
        FieldType::Nullable(inner) => {
            let mut value = type_to_json_schema(inner);
            if let Value::Object(ref mut obj) = value {
                obj.insert("nullable".to_string(), json!(true));
            }
            value
        }
    }
}

/// A value failed its schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{schema}: field `{path}` expected {expected}, found {found}")]
pub struct ValidationError {
    pub schema: String,
    /// Dotted/indexed path to the offending field; empty for the root value
    pub path: String,
    pub expected: String,
    pub found: String,
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Validate `value` against `schema`.
pub fn validate(schema: &Schema, value: &Value) -> Result<(), ValidationError> {
    validate_object(schema, schema.name, "", value)
}

fn validate_object(
    schema: &Schema,
    root: &str,
    path: &str,
    value: &Value,
) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or_else(|| ValidationError {
        schema: root.to_string(),
        path: path.to_string(),
        expected: format!("object {}", schema.name),
        found: describe(value).to_string(),
    })?;

    for field in &schema.fields {
        let field_path = join_path(path, field.name);
        match obj.get(field.name) {
            None | Some(Value::Null) if field.optional => continue,
            None => {
                return Err(ValidationError {
                    schema: root.to_string(),
                    path: field_path,
                    expected: field.ty.to_string(),
                    found: "missing".to_string(),
                })
            }
            Some(v) => validate_type(&field.ty, root, &field_path, v)?,
        }
    }
    Ok(())
}

fn validate_type(ty: &FieldType, root: &str, path: &str, value: &Value) -> Result<(), ValidationError> {
    if !ty.matches_primitive(value) {
        return Err(ValidationError {
            schema: root.to_string(),
            path: path.to_string(),
            expected: ty.to_string(),
            found: describe(value).to_string(),
        });
    }
    match (ty, value) {
        (FieldType::Array(item), Value::Array(items)) => {
            for (i, element) in items.iter().enumerate() {
                validate_type(item, root, &format!("{}[{}]", path, i), element)?;
            }
            Ok(())
        }
        (FieldType::Object(schema), _) => validate_object(schema, root, path, value),
        (FieldType::Nullable(_), Value::Null) => Ok(()),
        (FieldType::Nullable(inner), _) => validate_type(inner, root, path, value),
        _ => Ok(()),
    }
}

/// A typed flow boundary: a serde type paired with its declared schema.
pub trait Contract: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn schema() -> Schema;

    /// Name of the primary user-facing field when it is empty.
    ///
    /// The check is the plain falsy test on one field: an empty string counts as
    /// empty, whitespace does not.
    fn empty_primary_field(&self) -> Option<&'static str> {
        None
    }
}

/// Validate a raw value against `T`'s schema, then deserialize it.
pub fn decode<T: Contract>(value: Value) -> Result<T, ApiError> {
    let schema = T::schema();
    validate(&schema, &value)?;
    serde_json::from_value(value).map_err(|e| {
        ApiError::Validation(ValidationError {
            schema: schema.name.to_string(),
            path: String::new(),
            expected: format!("object {}", schema.name),
            found: e.to_string(),
        })
    })
}

/// Serialize a typed value and check it against its own schema.
pub fn encode<T: Contract>(value: &T) -> Result<Value, ApiError> {
    let schema = T::schema();
    let raw = serde_json::to_value(value).map_err(|e| {
        ApiError::Validation(ValidationError {
            schema: schema.name.to_string(),
            path: String::new(),
            expected: format!("object {}", schema.name),
            found: e.to_string(),
        })
    })?;
    validate(&schema, &raw)?;
    Ok(raw)
}
