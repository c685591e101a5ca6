//! The `EngineConfig` file model and its loading rules.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use super::records::RecordDeclaration;
use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_PATH_ENV, DEFAULT_LINK_MARKER, DEFAULT_MAX_DEPTH, MAX_CACHE_TTL,
    MAX_DEPTH_LIMIT, PENDING_STATE_TIMEOUT,
};
use crate::core::ConfigurationError;
use crate::types::PropertyFilter;

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_link_marker() -> String {
    DEFAULT_LINK_MARKER.to_string()
}

fn default_pending_timeout_secs() -> u64 {
    PENDING_STATE_TIMEOUT.as_secs()
}

/// Top-level engine configuration.
///
/// # Examples
///
/// ```rust
/// use jsonapi_transformer::config::EngineConfig;
///
/// let config: EngineConfig = toml::from_str("max_depth = 10").unwrap();
/// assert_eq!(config.max_depth, 10);
/// assert_eq!(config.link_marker, "t3://");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum nesting depth of a single transformation.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Prefix identifying internal links inside string values.
    #[serde(default = "default_link_marker")]
    pub link_marker: String,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-type property filter overrides, keyed by registered type name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, TypeOverride>,

    /// Dynamic record types, keyed by type name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub records: BTreeMap<String, RecordDeclaration>,

    /// Internal link targets used by the static link resolver.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            link_marker: DEFAULT_LINK_MARKER.to_string(),
            cache: CacheConfig::default(),
            types: BTreeMap::new(),
            records: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }
}

/// Resource cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// TTL for entries stored without an explicit one; unset means no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl_secs: Option<u64>,

    /// Seconds a caller waits on another caller's production before
    /// producing the value itself.
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: None,
            pending_timeout_secs: default_pending_timeout_secs(),
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }

    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }
}

/// Property filter override for one registered type.
///
/// At most one of the two lists may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_properties: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_properties: Option<Vec<String>>,
}

impl TypeOverride {
    /// Convert to a [`PropertyFilter`].
    ///
    /// # Errors
    ///
    /// Fails when both an allow list and a deny list are given.
    pub fn to_filter(&self, type_name: &str) -> Result<PropertyFilter, ConfigurationError> {
        match (&self.allowed_properties, &self.denied_properties) {
            (Some(_), Some(_)) => Err(ConfigurationError::InvalidValue {
                key: format!("types.{type_name}"),
                reason: "allowed_properties and denied_properties are mutually exclusive"
                    .to_string(),
            }),
            (Some(allowed), None) => Ok(PropertyFilter::allow(allowed)),
            (None, Some(denied)) => Ok(PropertyFilter::deny(denied)),
            (None, None) => Ok(PropertyFilter::All),
        }
    }
}

impl EngineConfig {
    /// Load the configuration from the first location that applies: `path`,
    /// then the environment variable, then the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::resolve_path(),
        };

        match path {
            Some(path) if path.exists() => Self::load_from(&path).await,
            Some(path) => {
                tracing::debug!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Load and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`EngineConfig::validate`].
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Path from the environment variable, or the platform default.
    pub fn resolve_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
        Self::default_path()
    }

    /// `<config dir>/jsonapi-transformer/config.toml`, if the platform has a
    /// configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Check values that parse but are unusable.
    ///
    /// Type names in `types` and record relation targets are checked later,
    /// against the registry, when the engine is built.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_depth == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "max_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigurationError::InvalidValue {
                key: "max_depth".to_string(),
                reason: format!("must be at most {MAX_DEPTH_LIMIT}"),
            });
        }
        if self.link_marker.is_empty() {
            return Err(ConfigurationError::InvalidValue {
                key: "link_marker".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.cache.default_ttl_secs.is_some_and(|secs| secs > MAX_CACHE_TTL.as_secs()) {
            return Err(ConfigurationError::InvalidValue {
                key: "cache.default_ttl_secs".to_string(),
                reason: format!("must be at most {} (one year)", MAX_CACHE_TTL.as_secs()),
            });
        }
        if self.cache.pending_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "cache.pending_timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for (type_name, type_override) in &self.types {
            type_override.to_filter(type_name)?;
        }
        Ok(())
    }

    /// Property filter overrides in the shape the config cache expects.
    ///
    /// # Errors
    ///
    /// Fails on an override that sets both lists.
    pub fn filter_overrides(&self) -> Result<HashMap<String, PropertyFilter>, ConfigurationError> {
        self.types
            .iter()
            .map(|(type_name, type_override)| {
                Ok((type_name.clone(), type_override.to_filter(type_name)?))
            })
            .collect()
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
