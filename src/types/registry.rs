//! Registry of declared types, keyed by type name.

use std::collections::HashMap;
use std::collections::HashSet;

use super::builtin;
use super::spec::{TypeDeclaration, TypeSpec};
use crate::core::ConfigurationError;
use crate::model::Resource;

/// Startup-time collection of [`TypeDeclaration`]s.
///
/// Registration validates each declaration immediately: duplicate names and
/// filters that reference undeclared properties fail fast with a
/// [`ConfigurationError`] instead of surfacing per request.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    types: HashMap<String, TypeDeclaration>,
}

impl Registry {
    /// An empty registry without the built-in special types.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in special types (date/time).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for declaration in builtin::declarations() {
            // Built-ins are distinct and unfiltered, so registration cannot fail.
            if let Err(error) = registry.register_declaration(declaration) {
                tracing::warn!(target: "transform", "Skipping built-in type: {error}");
            }
        }
        registry
    }

    pub fn register<T: Resource>(&mut self, spec: TypeSpec<T>) -> Result<&mut Self, ConfigurationError> {
        self.register_declaration(spec.into_declaration())?;
        Ok(self)
    }

    pub fn register_declaration(
        &mut self,
        declaration: TypeDeclaration,
    ) -> Result<(), ConfigurationError> {
        validate_declaration(&declaration)?;
        if self.types.contains_key(&declaration.type_name) {
            return Err(ConfigurationError::DuplicateType {
                type_name: declaration.type_name,
            });
        }
        tracing::debug!(target: "transform", "Registered type {:?}", declaration);
        self.types.insert(declaration.type_name.clone(), declaration);
        Ok(())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn declaration(&self, type_name: &str) -> Option<&TypeDeclaration> {
        self.types.get(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn validate_declaration(declaration: &TypeDeclaration) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for name in declaration.property_names() {
        if !seen.insert(name) {
            return Err(ConfigurationError::DuplicateProperty {
                type_name: declaration.type_name.clone(),
                property: name.to_string(),
            });
        }
    }

    for property in declaration.filter.names() {
        if !declaration.has_property(property) {
            return Err(ConfigurationError::UnknownProperty {
                type_name: declaration.type_name.clone(),
                property: property.clone(),
            });
        }
    }

    Ok(())
}
