//! Typed fixture resources.

use std::sync::{Arc, PoisonError, RwLock};

use crate::cache::{CacheBackend, CacheEntry, CacheKey};
use crate::core::{CacheError, ConfigurationError, TransformError};
use crate::engine::{Engine, EngineBuilder};
use crate::model::{Mapping, ObjectRef, Resource, Value};
use crate::transform::{TransformScope, Transformer};
use crate::types::{Relation, TypeSpec};

/// A CMS-style page with mutable children, so tests can build cycles.
#[derive(Debug)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    children: RwLock<Vec<Arc<Page>>>,
}

impl Page {
    pub fn new(id: i64, title: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            title: title.to_string(),
            slug: format!("/{}", title.to_lowercase().replace(' ', "-")),
            children: RwLock::new(Vec::new()),
        })
    }

    pub fn add_child(&self, child: Arc<Page>) {
        self.children.write().unwrap_or_else(PoisonError::into_inner).push(child);
    }

    pub fn children(&self) -> Vec<Arc<Page>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Resource for Page {
    fn type_name(&self) -> &str {
        "page"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub fn page_spec() -> TypeSpec<Page> {
    TypeSpec::new("page")
        .id(|page: &Page| Value::from(page.id))
        .attribute("title", |page: &Page| Value::from(&page.title))
        .attribute("slug", |page: &Page| Value::from(&page.slug))
        .relation(
            Relation::many("children", |page: &Page| {
                page.children().iter().map(Value::shared).collect()
            })
            .targeting("page"),
        )
}

/// Two pages that are each other's only child.
pub fn cyclic_pages() -> (Arc<Page>, Arc<Page>) {
    let a = Page::new(1, "A");
    let b = Page::new(2, "B");
    a.add_child(b.clone());
    b.add_child(a.clone());
    (a, b)
}

/// Linked-list node; each level of a chain adds exactly one path frame.
#[derive(Debug)]
pub struct Node {
    pub id: i64,
    pub next: Option<Arc<Node>>,
}

impl Resource for Node {
    fn type_name(&self) -> &str {
        "node"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub fn node_spec() -> TypeSpec<Node> {
    TypeSpec::new("node")
        .id(|node: &Node| Value::from(node.id))
        .relation(
            Relation::one("next", |node: &Node| node.next.as_ref().map_or(Value::Null, Value::shared))
                .targeting("node"),
        )
}

/// Head of a chain of `len` nodes with ids `1..=len`; `chain(0)` is a
/// single node with id 0.
pub fn chain(len: usize) -> Arc<Node> {
    let mut next = None;
    for id in (1..=len as i64).rev() {
        next = Some(Arc::new(Node {
            id,
            next,
        }));
    }
    next.unwrap_or_else(|| {
        Arc::new(Node {
            id: 0,
            next: None,
        })
    })
}

/// Resource rendered by a custom transformer.
#[derive(Debug)]
pub struct Envelope {
    pub id: i64,
    pub label: String,
}

impl Resource for Envelope {
    fn type_name(&self) -> &str {
        "envelope"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Wraps the generic mapping of its own object as
/// `{id, type, attributes: {...}}`.
pub struct EnvelopeTransformer;

impl Transformer for EnvelopeTransformer {
    fn transform(
        &self,
        object: &ObjectRef,
        scope: &mut TransformScope<'_>,
    ) -> Result<Mapping, TransformError> {
        // Our own object comes back through the generic transformer.
        let serde_json::Value::Object(mut attributes) =
            scope.transform(&Value::Object(object.clone()))?
        else {
            return Err(TransformError::Transformer {
                type_name: object.type_name().to_string(),
                message: "generic transform did not produce a mapping".to_string(),
            });
        };

        let mut mapping = Mapping::new();
        mapping.insert("id".to_string(), attributes.remove("id").unwrap_or_default());
        mapping.insert("type".to_string(), object.type_name().into());
        mapping.insert("attributes".to_string(), serde_json::Value::Object(attributes));
        Ok(mapping)
    }
}

pub fn envelope_spec() -> TypeSpec<Envelope> {
    TypeSpec::new("envelope")
        .id(|envelope: &Envelope| Value::from(envelope.id))
        .attribute("label", |envelope: &Envelope| Value::from(&envelope.label))
        .transformer(EnvelopeTransformer)
}

/// Engine builder with every fixture type registered.
pub fn fixture_engine() -> Result<EngineBuilder, ConfigurationError> {
    Engine::builder().register(page_spec())?.register(node_spec())?.register(envelope_spec())
}

/// Cache backend whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingBackend;

impl CacheBackend for FailingBackend {
    fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Err(CacheError::Unavailable("backend offline".to_string()))
    }

    fn set(&self, _entry: CacheEntry) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("backend offline".to_string()))
    }

    fn invalidate_by_tag(&self, _tag: &str) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("backend offline".to_string()))
    }

    fn clear(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("backend offline".to_string()))
    }
}
