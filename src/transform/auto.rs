//! The recursive auto-transformer.
//!
//! Walks a [`Value`] and produces JSON:
//! 1. strings containing the link marker are rewritten through the [`LinkRewriter`]
//! 2. scalars and null pass through
//! 3. lists and maps recurse element-wise, preserving keys
//! 4. objects dispatch on their [`Classification`]: special converters,
//!    self-describing renderers, collection unwrapping, custom transformers or
//!    the generic id + attributes + includes transform
//!
//! Every composite value is entered and exited through the
//! [`TransformContext`], which enforces the cycle policy and depth bound.

use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::context::{Dispatch, Identity, TransformContext};
use super::links::LinkRewriter;
use super::options::TransformOptions;
use crate::constants::GENERATED_ID_LEN;
use crate::core::TransformError;
use crate::model::{Mapping, ObjectRef, Value};
use crate::types::{Classification, ConfigCache, Representation, TypeConfig, classify_object};

/// Custom transformer registered for a type in place of the generic one.
///
/// Implementations recurse through the [`TransformScope`]. Asking the scope to
/// transform the very object being handled re-dispatches it through the
/// generic transformer, which is how a custom transformer obtains the raw
/// attribute mapping of its own object.
pub trait Transformer: Send + Sync {
    fn transform(
        &self,
        object: &ObjectRef,
        scope: &mut TransformScope<'_>,
    ) -> Result<Mapping, TransformError>;
}

/// Recursion handle given to custom transformers.
pub struct TransformScope<'a> {
    transformer: &'a AutoTransformer,
    options: &'a TransformOptions,
    cx: &'a mut TransformContext,
}

impl TransformScope<'_> {
    /// Transform a value with the current options.
    pub fn transform(&mut self, value: &Value) -> Result<JsonValue, TransformError> {
        self.transformer.transform_value(value, self.options, self.cx)
    }

    /// Transform a value below the property `name`, narrowing include paths.
    pub fn transform_property(&mut self, name: &str, value: &Value) -> Result<JsonValue, TransformError> {
        let nested = self.options.nested_for(name);
        self.transformer.transform_value(value, &nested, self.cx)
    }

    pub fn options(&self) -> &TransformOptions {
        self.options
    }

    pub fn depth(&self) -> usize {
        self.cx.depth()
    }
}

/// Recursive value → JSON transformer.
#[derive(Clone)]
pub struct AutoTransformer {
    configs: Arc<ConfigCache>,
    links: LinkRewriter,
    max_depth: usize,
}

impl AutoTransformer {
    pub fn new(configs: Arc<ConfigCache>, links: LinkRewriter, max_depth: usize) -> Self {
        Self {
            configs,
            links,
            max_depth,
        }
    }

    pub fn configs(&self) -> &ConfigCache {
        &self.configs
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Transform a top-level value into a resource mapping.
    ///
    /// Objects yield their mapping, `null` yields `{id: null}`, and any other
    /// value is wrapped as `{id: <generated>, value: ...}`. Generated ids are
    /// derived from the content, so transforming the same value twice yields
    /// identical output.
    pub fn transform(&self, value: &Value, options: &TransformOptions) -> Result<Mapping, TransformError> {
        self.transform_with_cancellation(value, options, CancellationToken::new())
    }

    pub fn transform_with_cancellation(
        &self,
        value: &Value,
        options: &TransformOptions,
        cancel: CancellationToken,
    ) -> Result<Mapping, TransformError> {
        let mut cx = TransformContext::with_cancellation(self.max_depth, cancel);
        let json = self.transform_value(value, options, &mut cx)?;
        debug_assert_eq!(cx.depth(), 0, "transform must leave an empty path");
        Ok(into_resource(json))
    }

    /// Transform any value within an existing context.
    pub fn transform_value(
        &self,
        value: &Value,
        options: &TransformOptions,
        cx: &mut TransformContext,
    ) -> Result<JsonValue, TransformError> {
        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Int(i) => Ok(JsonValue::from(*i)),
            Value::Float(x) => Ok(JsonValue::from(*x)),
            Value::String(text) if self.links.contains_link(text) => {
                Ok(JsonValue::String(self.links.rewrite(text)))
            }
            Value::String(text) => Ok(JsonValue::String(text.clone())),
            Value::List(items) => {
                let token = cx.enter_container(Identity::List(std::ptr::from_ref(items) as usize), "list")?;
                let result = self.transform_items(items, options, cx);
                cx.exit(token);
                result
            }
            Value::Map(entries) => {
                let token = cx.enter_container(Identity::Map(std::ptr::from_ref(entries) as usize), "map")?;
                let result = entries
                    .iter()
                    .map(|(key, item)| {
                        let nested = options.nested_for(key);
                        Ok((key.clone(), self.transform_value(item, &nested, cx)?))
                    })
                    .collect::<Result<Mapping, TransformError>>()
                    .map(JsonValue::Object);
                cx.exit(token);
                result
            }
            Value::Object(object) => self.transform_object(object, options, cx),
        }
    }

    fn transform_items(
        &self,
        items: &[Value],
        options: &TransformOptions,
        cx: &mut TransformContext,
    ) -> Result<JsonValue, TransformError> {
        items
            .iter()
            .map(|item| self.transform_value(item, options, cx))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array)
    }

    fn transform_object(
        &self,
        object: &ObjectRef,
        options: &TransformOptions,
        cx: &mut TransformContext,
    ) -> Result<JsonValue, TransformError> {
        let config = self.configs.config_for(object.type_name())?;
        let classification = classify_object(config.as_deref());
        let configured_generic = config.as_deref().is_none_or(TypeConfig::uses_generic_transformer);

        let (token, dispatch) =
            cx.enter_object(Identity::of_object(object), object.type_name(), configured_generic)?;
        let result = self.dispatch_object(object, config.as_deref(), classification, dispatch, options, cx);
        cx.exit(token);
        result
    }

    fn dispatch_object(
        &self,
        object: &ObjectRef,
        config: Option<&TypeConfig>,
        classification: Classification,
        dispatch: Dispatch,
        options: &TransformOptions,
        cx: &mut TransformContext,
    ) -> Result<JsonValue, TransformError> {
        if dispatch == Dispatch::GenericFallback {
            tracing::debug!(
                target: "transform",
                "Self-recursion on '{}', falling back to the generic transformer",
                object.type_name()
            );
            return self.generic(object, config, options, cx).map(JsonValue::Object);
        }

        let representation = config.map(|config| &config.representation);
        match (classification, representation) {
            (Classification::SpecialType, Some(Representation::Special(convert))) => {
                let mut mapping = convert(object.as_ref());
                Ok(mapping.remove("value").unwrap_or(JsonValue::Object(mapping)))
            }
            (Classification::SelfDescribing, Some(Representation::SelfDescribing(render))) => {
                Ok(render(object.as_ref()))
            }
            (Classification::SelfDescribing, Some(Representation::Hybrid(render))) => {
                let described = render(object.as_ref());
                self.transform_value(&described, options, cx)
            }
            (Classification::ArrayLike, Some(Representation::Collection(items))) => {
                let items = items(object.as_ref());
                self.transform_items(&items, options, cx)
            }
            _ => {
                // The root object is always transformed; nested ones may be
                // reduced to identifiers.
                if !options.call_nested_transformer && cx.depth() > 1 {
                    return Ok(JsonValue::Object(self.identifier(object, config, options, cx)?));
                }
                match config.and_then(|config| config.transformer.as_ref()) {
                    Some(custom) => {
                        let mut scope = TransformScope {
                            transformer: self,
                            options,
                            cx,
                        };
                        custom.transform(object, &mut scope).map(JsonValue::Object)
                    }
                    None => self.generic(object, config, options, cx).map(JsonValue::Object),
                }
            }
        }
    }

    /// The generic transformer: id, filtered attributes, requested includes,
    /// then post-processors in declaration order.
    fn generic(
        &self,
        object: &ObjectRef,
        config: Option<&TypeConfig>,
        options: &TransformOptions,
        cx: &mut TransformContext,
    ) -> Result<Mapping, TransformError> {
        let mut mapping = Mapping::new();
        let id = config.map_or(Value::Null, |config| config.id_of(object.as_ref()));
        mapping.insert("id".to_string(), self.transform_value(&id, options, cx)?);

        let Some(config) = config else {
            return Ok(mapping);
        };

        for (name, getter) in &config.attributes {
            cx.check_cancelled()?;
            let value = getter(object.as_ref());
            let nested = options.nested_for(name);
            mapping.insert(name.clone(), self.transform_value(&value, &nested, cx)?);
        }

        for relation in &config.includes {
            if !options.includes_relation(&relation.name) {
                continue;
            }
            cx.check_cancelled()?;
            let related = relation.resolve(object.as_ref());
            let nested = options.nested_for(&relation.name);
            let json = match (relation.is_collection, related) {
                (true, Value::Null) => JsonValue::Array(Vec::new()),
                (_, related) => self.transform_value(&related, &nested, cx)?,
            };
            mapping.insert(relation.name.clone(), json);
        }

        for processor in &config.post_processors {
            processor(&mut mapping);
        }

        Ok(mapping)
    }

    /// JSON:API resource identifier of a nested object.
    fn identifier(
        &self,
        object: &ObjectRef,
        config: Option<&TypeConfig>,
        options: &TransformOptions,
        cx: &mut TransformContext,
    ) -> Result<Mapping, TransformError> {
        let id = config.map_or(Value::Null, |config| config.id_of(object.as_ref()));
        let mut mapping = Mapping::new();
        mapping.insert("id".to_string(), self.transform_value(&id, options, cx)?);
        mapping.insert("type".to_string(), JsonValue::String(object.type_name().to_string()));
        Ok(mapping)
    }
}

impl std::fmt::Debug for AutoTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoTransformer")
            .field("links", &self.links)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Shape a transformed top-level value as a resource with an `id`.
fn into_resource(json: JsonValue) -> Mapping {
    match json {
        JsonValue::Null => {
            let mut mapping = Mapping::new();
            mapping.insert("id".to_string(), JsonValue::Null);
            mapping
        }
        JsonValue::Object(mut mapping) => {
            if !mapping.contains_key("id") {
                let id = generated_id(&JsonValue::Object(mapping.clone()));
                mapping.insert("id".to_string(), JsonValue::String(id));
            }
            mapping
        }
        other => {
            let mut mapping = Mapping::new();
            mapping.insert("id".to_string(), JsonValue::String(generated_id(&other)));
            mapping.insert("value".to_string(), other);
            mapping
        }
    }
}

/// Content-derived id: truncated SHA-256 of the canonical JSON text.
pub fn generated_id(json: &JsonValue) -> String {
    let digest = Sha256::digest(json.to_string().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(GENERATED_ID_LEN);
    id
}
