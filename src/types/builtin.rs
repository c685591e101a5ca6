//! Built-in special types.
//!
//! Date and time values bypass the structured path and render as strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use std::any::Any;

use super::spec::{TypeDeclaration, TypeSpec};
use crate::model::{Mapping, Resource};

pub const DATETIME_TYPE: &str = "datetime";
pub const DATE_TYPE: &str = "date";

impl Resource for DateTime<Utc> {
    fn type_name(&self) -> &str {
        DATETIME_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Resource for NaiveDate {
    fn type_name(&self) -> &str {
        DATE_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn single_value(value: JsonValue) -> Mapping {
    let mut mapping = Mapping::new();
    mapping.insert("value".to_string(), value);
    mapping
}

pub(crate) fn declarations() -> Vec<TypeDeclaration> {
    vec![
        TypeSpec::<DateTime<Utc>>::new(DATETIME_TYPE)
            .special(|moment| {
                single_value(JsonValue::String(moment.to_rfc3339_opts(SecondsFormat::Secs, true)))
            })
            .into_declaration(),
        TypeSpec::<NaiveDate>::new(DATE_TYPE)
            .special(|date| single_value(JsonValue::String(date.format("%Y-%m-%d").to_string())))
            .into_declaration(),
    ]
}
