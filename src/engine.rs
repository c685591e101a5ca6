//! Engine facade wiring the registry, transformer and resource cache together.
//!
//! An [`Engine`] is built once at startup from an [`EngineConfig`] and the
//! application's [`TypeSpec`]s, then shared (it is `Send + Sync`) by every
//! request. Setup problems surface from [`EngineBuilder::build`]: every type
//! config is built eagerly there, so a bad filter or relation target never
//! reaches a request.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheBackend, Fingerprint, MemoryBackend, ResourceCache};
use crate::config::EngineConfig;
use crate::core::{ConfigurationError, TransformError};
use crate::model::{Mapping, Resource, Value};
use crate::transform::{
    AutoTransformer, LinkResolver, LinkRewriter, StaticLinkResolver, TransformOptions,
};
use crate::types::{ConfigCache, Registry, TypeSpec};

/// Builder for [`Engine`].
pub struct EngineBuilder {
    registry: Registry,
    config: EngineConfig,
    link_resolver: Option<Arc<dyn LinkResolver>>,
    cache_backend: Option<Arc<dyn CacheBackend>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// A builder with the built-in special types registered and the default
    /// configuration.
    pub fn new() -> Self {
        Self {
            registry: Registry::with_builtins(),
            config: EngineConfig::default(),
            link_resolver: None,
            cache_backend: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a statically declared type.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate type, a duplicate property or a filter naming an
    /// undeclared property.
    pub fn register<T: Resource>(mut self, spec: TypeSpec<T>) -> Result<Self, ConfigurationError> {
        self.registry.register(spec)?;
        Ok(self)
    }

    /// Resolve internal links with `resolver` instead of the config's link table.
    pub fn link_resolver(mut self, resolver: Arc<dyn LinkResolver>) -> Self {
        self.link_resolver = Some(resolver);
        self
    }

    /// Store cache entries in `backend` instead of process memory.
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Validate the configuration, register configured record types and build
    /// every type config.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn build(self) -> Result<Engine, ConfigurationError> {
        let Self {
            mut registry,
            config,
            link_resolver,
            cache_backend,
        } = self;

        config.validate()?;
        for (type_name, record) in &config.records {
            registry.register(record.to_spec(type_name))?;
        }

        let configs = Arc::new(ConfigCache::new(registry, config.filter_overrides()?)?);
        configs.warm_all()?;

        let resolver = link_resolver.unwrap_or_else(|| {
            Arc::new(StaticLinkResolver::new(
                config.links.iter().map(|(link, target)| (link.clone(), target.clone())),
            ))
        });
        let links = LinkRewriter::new(&config.link_marker, resolver)?;

        let backend = cache_backend.unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        let cache = ResourceCache::new(backend)
            .with_default_ttl(config.cache.default_ttl())
            .with_pending_timeout(config.cache.pending_timeout());

        tracing::debug!(
            target: "transform",
            "Engine ready: {} types, max_depth={}",
            configs.registry().len(),
            config.max_depth
        );

        Ok(Engine {
            transformer: AutoTransformer::new(configs, links, config.max_depth),
            cache,
            config,
        })
    }
}

/// Transformation engine: an [`AutoTransformer`] plus a [`ResourceCache`].
#[derive(Debug)]
pub struct Engine {
    transformer: AutoTransformer,
    cache: ResourceCache,
    config: EngineConfig,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Transform `value` into a resource mapping.
    ///
    /// # Errors
    ///
    /// Fails on a circular reference, when the depth bound is exceeded, or
    /// when a custom transformer fails.
    pub fn transform(
        &self,
        value: &Value,
        options: &TransformOptions,
    ) -> Result<Mapping, TransformError> {
        self.transformer.transform(value, options)
    }

    /// Like [`Engine::transform`], aborting with [`TransformError::Cancelled`]
    /// once `cancel` fires.
    pub fn transform_with_cancellation(
        &self,
        value: &Value,
        options: &TransformOptions,
        cancel: CancellationToken,
    ) -> Result<Mapping, TransformError> {
        self.transformer.transform_with_cancellation(value, options, cancel)
    }

    /// Transform `value` through the resource cache.
    ///
    /// The fingerprint must cover everything the output depends on, including
    /// the options; [`Engine::resource_fingerprint`] builds one for the usual
    /// case. Concurrent calls with the same fingerprint share one transform.
    pub async fn transform_cached<I>(
        &self,
        value: &Value,
        fingerprint: &Fingerprint,
        tags: I,
        ttl: Option<Duration>,
        options: &TransformOptions,
        cancel: &CancellationToken,
    ) -> Result<Mapping, TransformError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let transformer = &self.transformer;
        self.cache
            .remember(fingerprint, tags, ttl, cancel, move || async move {
                transformer.transform_with_cancellation(value, options, cancel.clone())
            })
            .await
    }

    /// Fingerprint of a resource rendered with `options`.
    pub fn resource_fingerprint(
        type_name: &str,
        id: impl Display,
        options: &TransformOptions,
    ) -> Fingerprint {
        let mut fingerprint = Fingerprint::new()
            .part(type_name)
            .part(id.to_string())
            .part(options.call_nested_transformer)
            .part(options.all_includes);
        for path in &options.include {
            fingerprint.push(path.as_str());
        }
        fingerprint
    }

    /// Conventional invalidation tag for one resource, e.g. `page_42`.
    pub fn resource_tag(type_name: &str, id: impl Display) -> String {
        format!("{type_name}_{id}")
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn configs(&self) -> &ConfigCache {
        self.transformer.configs()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transformer(&self) -> &AutoTransformer {
        &self.transformer
    }
}
