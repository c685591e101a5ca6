//! Record types declared in configuration.
//!
//! A record type maps the named fields of a [`Record`] onto an id, attributes
//! and relations, so JSON input tagged with `"$type"` can be transformed
//! without a compiled-in [`TypeSpec`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Record, Value};
use crate::types::{Relation, TypeSpec};

fn default_id_field() -> String {
    "id".to_string()
}

fn is_default_id_field(field: &str) -> bool {
    field == "id"
}

/// Declaration of one dynamic record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDeclaration {
    /// Field holding the record id.
    #[serde(default = "default_id_field", skip_serializing_if = "is_default_id_field")]
    pub id_field: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, RelationDeclaration>,
}

impl Default for RecordDeclaration {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            attributes: Vec::new(),
            relations: BTreeMap::new(),
        }
    }
}

/// A relation field of a record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationDeclaration {
    /// To-many when true.
    #[serde(default)]
    pub collection: bool,

    /// Registered type the relation points to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RecordDeclaration {
    /// Build the [`TypeSpec`] for records named `type_name`.
    pub fn to_spec(&self, type_name: &str) -> TypeSpec<Record> {
        let id_field = self.id_field.clone();
        let mut spec = TypeSpec::<Record>::new(type_name).id(move |record| record.get(&id_field));

        for attribute in &self.attributes {
            let field = attribute.clone();
            spec = spec.attribute(attribute.as_str(), move |record: &Record| record.get(&field));
        }

        for (name, declaration) in &self.relations {
            let field = name.clone();
            let relation = if declaration.collection {
                Relation::many(name.as_str(), move |record: &Record| match record.get(&field) {
                    Value::List(items) => items,
                    Value::Null => Vec::new(),
                    single => vec![single],
                })
            } else {
                Relation::one(name.as_str(), move |record: &Record| record.get(&field))
            };
            spec = spec.relation(match &declaration.target {
                Some(target) => relation.targeting(target.as_str()),
                None => relation,
            });
        }

        spec
    }
}
