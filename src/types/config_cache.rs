//! Memoized per-type transformation configs.
//!
//! A [`TypeConfig`] is the resolved, immutable form of a registered
//! [`TypeDeclaration`]: the property filter (declared or overridden from the
//! configuration file) has been applied and relation targets have been
//! checked. Configs are built at most once per type and then shared
//! read-only across concurrent transforms.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::registry::Registry;
use super::spec::{Getter, PostProcessor, PropertyFilter, Relation, Representation, TypeDeclaration};
use crate::core::ConfigurationError;
use crate::model::{Resource, Value};
use crate::transform::Transformer;

/// Resolved transformation descriptor of one type.
pub struct TypeConfig {
    pub(crate) type_name: String,
    pub(crate) id_getter: Option<Getter>,
    pub(crate) attributes: Vec<(String, Getter)>,
    pub(crate) includes: Vec<Relation>,
    pub(crate) post_processors: Vec<PostProcessor>,
    pub(crate) representation: Representation,
    pub(crate) transformer: Option<Arc<dyn Transformer>>,
}

impl TypeConfig {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn include_names(&self) -> Vec<&str> {
        self.includes.iter().map(|relation| relation.name.as_str()).collect()
    }

    pub fn has_id(&self) -> bool {
        self.id_getter.is_some()
    }

    pub fn is_special(&self) -> bool {
        matches!(self.representation, Representation::Special(_))
    }

    pub fn is_self_describing(&self) -> bool {
        matches!(
            self.representation,
            Representation::SelfDescribing(_) | Representation::Hybrid(_)
        )
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.representation, Representation::Collection(_))
    }

    /// Entities carry an id and at least one includable relation.
    pub fn is_entity(&self) -> bool {
        self.has_id() && !self.includes.is_empty()
    }

    pub fn has_custom_transformer(&self) -> bool {
        self.transformer.is_some()
    }

    /// Whether objects of this type go through the generic transformer.
    pub fn uses_generic_transformer(&self) -> bool {
        matches!(self.representation, Representation::Structured) && self.transformer.is_none()
    }

    pub fn id_of(&self, object: &dyn Resource) -> Value {
        self.id_getter.as_ref().map_or(Value::Null, |getter| getter(object))
    }
}

impl std::fmt::Debug for TypeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeConfig")
            .field("type_name", &self.type_name)
            .field("attributes", &self.attribute_names())
            .field("includes", &self.include_names())
            .field("representation", &self.representation.label())
            .finish_non_exhaustive()
    }
}

/// Lazily built, process-lifetime cache of [`TypeConfig`]s.
///
/// Uses DashMap's entry API: the first caller for a type builds the config
/// while holding the shard lock, so concurrent first access yields exactly one
/// build and every caller observes the same `Arc`.
pub struct ConfigCache {
    registry: Registry,
    overrides: HashMap<String, PropertyFilter>,
    configs: DashMap<String, Arc<TypeConfig>>,
    builds: AtomicUsize,
}

impl ConfigCache {
    /// Create a cache over `registry`, with per-type filters that replace the
    /// declared ones.
    ///
    /// # Errors
    ///
    /// Fails if an override names an unregistered type.
    pub fn new(
        registry: Registry,
        overrides: HashMap<String, PropertyFilter>,
    ) -> Result<Self, ConfigurationError> {
        if let Some(type_name) = overrides.keys().find(|name| !registry.contains(name)) {
            return Err(ConfigurationError::UnknownType {
                type_name: type_name.clone(),
            });
        }

        Ok(Self {
            registry,
            overrides,
            configs: DashMap::new(),
            builds: AtomicUsize::new(0),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Config for `type_name`, building it on first access.
    ///
    /// Returns `Ok(None)` for unregistered types; callers treat those as
    /// generic objects.
    pub fn config_for(&self, type_name: &str) -> Result<Option<Arc<TypeConfig>>, ConfigurationError> {
        if let Some(config) = self.configs.get(type_name) {
            return Ok(Some(config.clone()));
        }

        let Some(declaration) = self.registry.declaration(type_name) else {
            return Ok(None);
        };

        match self.configs.entry(type_name.to_string()) {
            Entry::Occupied(entry) => Ok(Some(entry.get().clone())),
            Entry::Vacant(entry) => {
                let config = Arc::new(self.build(declaration)?);
                self.builds.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(target: "transform", "Built type config {:?}", config);
                entry.insert(config.clone());
                Ok(Some(config))
            }
        }
    }

    /// Build every registered config up front so setup errors surface at startup.
    pub fn warm_all(&self) -> Result<(), ConfigurationError> {
        for type_name in self.registry.type_names() {
            self.config_for(type_name)?;
        }
        Ok(())
    }

    /// Number of configs built so far.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    fn build(&self, declaration: &TypeDeclaration) -> Result<TypeConfig, ConfigurationError> {
        let filter = self.overrides.get(&declaration.type_name).unwrap_or(&declaration.filter);

        for property in filter.names() {
            if !declaration.has_property(property) {
                return Err(ConfigurationError::UnknownProperty {
                    type_name: declaration.type_name.clone(),
                    property: property.clone(),
                });
            }
        }

        for relation in &declaration.relations {
            if let Some(target) = &relation.target
                && !self.registry.contains(target)
            {
                return Err(ConfigurationError::UnknownRelationTarget {
                    type_name: declaration.type_name.clone(),
                    relation: relation.name.clone(),
                    target: target.clone(),
                });
            }
        }

        Ok(TypeConfig {
            type_name: declaration.type_name.clone(),
            id_getter: declaration.id_getter.clone(),
            attributes: declaration
                .attributes
                .iter()
                .filter(|(name, _)| filter.permits(name))
                .cloned()
                .collect(),
            includes: declaration
                .relations
                .iter()
                .filter(|relation| filter.permits(&relation.name))
                .cloned()
                .collect(),
            post_processors: declaration.post_processors.clone(),
            representation: declaration.representation.clone(),
            transformer: declaration.transformer.clone(),
        })
    }
}
