//! Input value model.
//!
//! The engine walks [`Value`] trees. Scalars, lists and keyed maps are plain
//! data; everything else is an [`ObjectRef`], a shared handle to a type
//! implementing [`Resource`]. Objects are compared by handle identity, never by
//! content, which is what lets the cycle guard tell "the same object" apart
//! from "an equal object".
//!
//! [`Record`] is a dynamically typed resource used for data that arrives as
//! JSON (e.g. the CLI input) rather than as Rust structs.

use serde_json::Value as JsonValue;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::RECORD_TYPE_KEY;

/// Output mapping produced by the transformer.
pub type Mapping = serde_json::Map<String, JsonValue>;

/// Shared handle to a transformable object.
pub type ObjectRef = Arc<dyn Resource>;

/// A domain object the transformer can walk.
///
/// `type_name` is the registry key for the object's [`TypeSpec`]; objects of
/// unregistered types are transformed as generic objects with no attributes.
///
/// [`TypeSpec`]: crate::types::TypeSpec
pub trait Resource: Any + Send + Sync {
    /// Registry name of the object's type.
    fn type_name(&self) -> &str;

    /// Upcast used by typed getters to recover the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A value the transformer can walk.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered sequence
    List(Vec<Value>),
    /// Keyed container; keys are preserved in the output
    Map(BTreeMap<String, Value>),
    /// Shared domain object
    Object(ObjectRef),
}

impl Value {
    /// Wrap a resource in a fresh shared handle.
    pub fn object<R: Resource>(resource: R) -> Self {
        Value::Object(Arc::new(resource))
    }

    /// Wrap an existing shared handle, keeping its identity.
    pub fn shared<R: Resource>(resource: &Arc<R>) -> Self {
        Value::Object(resource.clone())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Short label used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(object) => object.type_name(),
        }
    }

    /// Convert JSON into a value tree, turning objects tagged with `"$type"`
    /// into [`Record`]s.
    pub fn from_tagged_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Object(map) => {
                let type_name =
                    map.get(RECORD_TYPE_KEY).and_then(JsonValue::as_str).map(str::to_string);
                let fields: BTreeMap<String, Value> = map
                    .into_iter()
                    .filter(|(key, _)| key != RECORD_TYPE_KEY)
                    .map(|(key, value)| (key, Value::from_tagged_json(value)))
                    .collect();
                match type_name {
                    Some(type_name) => Value::object(Record::with_fields(type_name, fields)),
                    None => Value::Map(fields),
                }
            }
            JsonValue::Array(items) => {
                Value::List(items.into_iter().map(Value::from_tagged_json).collect())
            }
            other => Value::from(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(entries) => f.debug_map().entries(entries).finish(),
            Value::Object(object) => {
                write!(f, "Object({} @ {:p})", object.type_name(), Arc::as_ptr(object))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => {
                Value::Map(map.into_iter().map(|(key, value)| (key, Value::from(value))).collect())
            }
        }
    }
}

/// A dynamically typed resource with named fields.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_fields(type_name: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Field value, or `Null` when absent.
    pub fn get(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

impl Resource for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
