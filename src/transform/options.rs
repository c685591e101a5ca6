//! Per-call transformation options.

use serde::{Deserialize, Serialize};

/// Options controlling how deep and how wide a transform goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Fully transform nested generic objects; when false they are rendered as
    /// resource identifiers `{id, type}`.
    pub call_nested_transformer: bool,
    /// Embed every declared relation.
    pub all_includes: bool,
    /// Dotted relation paths to embed, e.g. `children` or `children.author`.
    pub include: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            call_nested_transformer: true,
            all_includes: false,
            include: Vec::new(),
        }
    }
}

impl TransformOptions {
    #[must_use]
    pub fn with_all_includes(mut self) -> Self {
        self.all_includes = true;
        self
    }

    #[must_use]
    pub fn without_nested_transformer(mut self) -> Self {
        self.call_nested_transformer = false;
        self
    }

    #[must_use]
    pub fn with_include(mut self, path: impl Into<String>) -> Self {
        self.include.push(path.into());
        self
    }

    /// Parse a JSON:API style comma separated include list.
    #[must_use]
    pub fn with_include_list(mut self, list: &str) -> Self {
        self.include.extend(
            list.split(',').map(str::trim).filter(|path| !path.is_empty()).map(str::to_string),
        );
        self
    }

    /// Whether the relation `name` is embedded at this level.
    pub fn includes_relation(&self, name: &str) -> bool {
        self.all_includes || self.include.iter().any(|path| first_segment(path) == name)
    }

    /// Options for values below the property `name`: include paths are
    /// narrowed to the ones that continue through `name`.
    pub fn nested_for(&self, name: &str) -> Self {
        Self {
            call_nested_transformer: self.call_nested_transformer,
            all_includes: self.all_includes,
            include: self
                .include
                .iter()
                .filter_map(|path| path.split_once('.'))
                .filter(|(head, _)| *head == name)
                .map(|(_, rest)| rest.to_string())
                .collect(),
        }
    }
}

fn first_segment(path: &str) -> &str {
    path.split_once('.').map_or(path, |(head, _)| head)
}
