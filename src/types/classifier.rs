//! Runtime classification of values.

use super::config_cache::TypeConfig;
use crate::model::Value;

/// Mutually exclusive value classes driving the transformer's dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Null,
    Scalar,
    /// Lists, keyed maps and registered collection objects
    ArrayLike,
    SelfDescribing,
    SpecialType,
    /// Has an id getter and at least one includable relation
    Entity,
    /// Structured object with flat attributes only, or an unregistered type
    Generic,
}

/// Classify `value`. `config` is the resolved config of the value's type when
/// it is a registered object; it is ignored for non-objects.
pub fn classify(value: &Value, config: Option<&TypeConfig>) -> Classification {
    match value {
        Value::Null => Classification::Null,
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
            Classification::Scalar
        }
        Value::List(_) | Value::Map(_) => Classification::ArrayLike,
        Value::Object(_) => classify_object(config),
    }
}

pub(crate) fn classify_object(config: Option<&TypeConfig>) -> Classification {
    let Some(config) = config else {
        return Classification::Generic;
    };

    if config.is_special() {
        Classification::SpecialType
    } else if config.is_self_describing() {
        Classification::SelfDescribing
    } else if config.is_collection() {
        Classification::ArrayLike
    } else if config.is_entity() {
        Classification::Entity
    } else {
        Classification::Generic
    }
}
