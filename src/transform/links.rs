//! Internal link resolution inside string values.
//!
//! Strings containing the link marker (default `t3://`) are scanned for link
//! tokens; each token is handed to a [`LinkResolver`] and replaced by the URL
//! it returns. Unresolvable links are left untouched.

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::ConfigurationError;

/// Extension point turning internal link tokens into public URLs.
pub trait LinkResolver: Send + Sync {
    /// Resolve `link`; `None` keeps the token unchanged.
    fn resolve(&self, link: &str) -> Option<String>;
}

/// Resolver that never rewrites anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResolver;

impl LinkResolver for PassthroughResolver {
    fn resolve(&self, _link: &str) -> Option<String> {
        None
    }
}

/// Resolver backed by a fixed link table.
#[derive(Debug, Default, Clone)]
pub struct StaticLinkResolver {
    links: HashMap<String, String>,
}

impl StaticLinkResolver {
    pub fn new(links: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            links: links.into_iter().collect(),
        }
    }
}

impl LinkResolver for StaticLinkResolver {
    fn resolve(&self, link: &str) -> Option<String> {
        self.links.get(link).cloned()
    }
}

/// Finds and rewrites link tokens in strings.
#[derive(Clone)]
pub struct LinkRewriter {
    marker: String,
    pattern: Regex,
    resolver: Arc<dyn LinkResolver>,
}

impl LinkRewriter {
    pub fn new(marker: &str, resolver: Arc<dyn LinkResolver>) -> Result<Self, ConfigurationError> {
        if marker.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                key: "link_marker".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        // A link token runs until whitespace, a quote or a tag delimiter.
        let pattern = Regex::new(&format!(r#"{}[^\s"'<>]*"#, regex::escape(marker))).map_err(
            |error| ConfigurationError::InvalidValue {
                key: "link_marker".to_string(),
                reason: error.to_string(),
            },
        )?;

        Ok(Self {
            marker: marker.to_string(),
            pattern,
            resolver,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn contains_link(&self, text: &str) -> bool {
        text.contains(&self.marker)
    }

    /// Replace every resolvable link token in `text`.
    pub fn rewrite(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |captures: &regex::Captures<'_>| {
                let link = &captures[0];
                match self.resolver.resolve(link) {
                    Some(url) => url,
                    None => {
                        tracing::debug!(target: "transform", "Unresolved internal link {link}");
                        link.to_string()
                    }
                }
            })
            .into_owned()
    }
}

impl std::fmt::Debug for LinkRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkRewriter").field("marker", &self.marker).finish_non_exhaustive()
    }
}
