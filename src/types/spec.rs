//! Static capability declarations for transformable types.
//!
//! Each type is described once, at startup, with a [`TypeSpec`] builder: how
//! to read its id, which attributes it exposes, which relations can be
//! included, and whether it bypasses the structured path entirely (special
//! types, self-describing values, collection objects). Typed closures are
//! erased into [`TypeDeclaration`] so the registry can hold heterogeneous
//! types keyed by name.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::model::{Mapping, Resource, Value};
use crate::transform::Transformer;

/// Type-erased accessor reading a value from an object.
pub type Getter = Arc<dyn Fn(&dyn Resource) -> Value + Send + Sync>;

/// Ordered result-mutating hook applied after a generic transform.
pub type PostProcessor = Arc<dyn Fn(&mut Mapping) + Send + Sync>;

fn erase<T, F, R>(f: F) -> Arc<dyn Fn(&dyn Resource) -> R + Send + Sync>
where
    T: Resource,
    F: Fn(&T) -> R + Send + Sync + 'static,
    R: Default,
{
    Arc::new(move |object: &dyn Resource| match object.as_any().downcast_ref::<T>() {
        Some(typed) => f(typed),
        None => {
            tracing::warn!(
                target: "transform",
                "Object of type '{}' does not match its registered Rust type",
                object.type_name()
            );
            R::default()
        }
    })
}

/// Allow/deny policy applied to a type's attributes and relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyFilter {
    /// Every declared property is exposed
    #[default]
    All,
    /// Only the listed properties are exposed
    Allow(BTreeSet<String>),
    /// Every property except the listed ones is exposed
    Deny(BTreeSet<String>),
}

impl PropertyFilter {
    pub fn allow<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyFilter::Allow(names.into_iter().map(Into::into).collect())
    }

    pub fn deny<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyFilter::Deny(names.into_iter().map(Into::into).collect())
    }

    pub fn permits(&self, name: &str) -> bool {
        match self {
            PropertyFilter::All => true,
            PropertyFilter::Allow(names) => names.contains(name),
            PropertyFilter::Deny(names) => !names.contains(name),
        }
    }

    /// Property names the filter refers to.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        let names = match self {
            PropertyFilter::All => None,
            PropertyFilter::Allow(names) | PropertyFilter::Deny(names) => Some(names),
        };
        names.into_iter().flatten()
    }
}

/// An includable relation of a type.
#[derive(Clone)]
pub struct Relation {
    pub name: String,
    pub is_collection: bool,
    /// Registered type the relation points to, validated when configs are built
    pub target: Option<String>,
    resolver: Getter,
}

impl Relation {
    /// A to-one relation; the resolver returns the related object or `Null`.
    pub fn one<T, F>(name: impl Into<String>, resolver: F) -> Self
    where
        T: Resource,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            is_collection: false,
            target: None,
            resolver: erase(resolver),
        }
    }

    /// A to-many relation.
    pub fn many<T, F>(name: impl Into<String>, resolver: F) -> Self
    where
        T: Resource,
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        let resolver = erase(resolver);
        Self {
            name: name.into(),
            is_collection: true,
            target: None,
            resolver: Arc::new(move |object: &dyn Resource| Value::List(resolver(object))),
        }
    }

    #[must_use]
    pub fn targeting(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn resolve(&self, object: &dyn Resource) -> Value {
        (self.resolver)(object)
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("is_collection", &self.is_collection)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// How objects of a type are turned into output.
#[derive(Clone, Default)]
pub(crate) enum Representation {
    /// id + attributes + includes through the generic transformer
    #[default]
    Structured,
    /// Registered converter; its `value` key is unwrapped
    Special(Arc<dyn Fn(&dyn Resource) -> Mapping + Send + Sync>),
    /// The object renders itself; output is used verbatim
    SelfDescribing(Arc<dyn Fn(&dyn Resource) -> JsonValue + Send + Sync>),
    /// The object renders itself into a value tree that is transformed again
    Hybrid(Getter),
    /// Container-like object unwrapped to a list
    Collection(Arc<dyn Fn(&dyn Resource) -> Vec<Value> + Send + Sync>),
}

impl Representation {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Representation::Structured => "structured",
            Representation::Special(_) => "special",
            Representation::SelfDescribing(_) => "self-describing",
            Representation::Hybrid(_) => "hybrid",
            Representation::Collection(_) => "collection",
        }
    }
}

/// Type-erased declaration held by the registry.
#[derive(Clone)]
pub struct TypeDeclaration {
    pub(crate) type_name: String,
    pub(crate) id_getter: Option<Getter>,
    pub(crate) attributes: Vec<(String, Getter)>,
    pub(crate) relations: Vec<Relation>,
    pub(crate) post_processors: Vec<PostProcessor>,
    pub(crate) filter: PropertyFilter,
    pub(crate) representation: Representation,
    pub(crate) transformer: Option<Arc<dyn Transformer>>,
}

impl TypeDeclaration {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Names of all declared attributes and relations, in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.relations.iter().map(|relation| relation.name.as_str()))
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property_names().any(|property| property == name)
    }
}

impl fmt::Debug for TypeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDeclaration")
            .field("type_name", &self.type_name)
            .field("attributes", &self.attributes.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("relations", &self.relations)
            .field("filter", &self.filter)
            .field("representation", &self.representation.label())
            .field("custom_transformer", &self.transformer.is_some())
            .finish()
    }
}

/// Builder declaring the capabilities of type `T`.
///
/// ```rust,no_run
/// use jsonapi_transformer::model::{Resource, Value};
/// use jsonapi_transformer::types::{Relation, TypeSpec};
/// # use std::any::Any;
/// # struct Page { id: i64, title: String }
/// # impl Resource for Page {
/// #     fn type_name(&self) -> &str { "page" }
/// #     fn as_any(&self) -> &dyn Any { self }
/// # }
///
/// let spec = TypeSpec::<Page>::new("page")
///     .id(|page| Value::from(page.id))
///     .attribute("title", |page| Value::from(&page.title));
/// ```
pub struct TypeSpec<T> {
    declaration: TypeDeclaration,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Resource> TypeSpec<T> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            declaration: TypeDeclaration {
                type_name: type_name.into(),
                id_getter: None,
                attributes: Vec::new(),
                relations: Vec::new(),
                post_processors: Vec::new(),
                filter: PropertyFilter::All,
                representation: Representation::Structured,
                transformer: None,
            },
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn id<F>(mut self, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.declaration.id_getter = Some(erase(getter));
        self
    }

    #[must_use]
    pub fn attribute<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.declaration.attributes.push((name.into(), erase(getter)));
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.declaration.relations.push(relation);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: PropertyFilter) -> Self {
        self.declaration.filter = filter;
        self
    }

    #[must_use]
    pub fn post_process<F>(mut self, processor: F) -> Self
    where
        F: Fn(&mut Mapping) + Send + Sync + 'static,
    {
        self.declaration.post_processors.push(Arc::new(processor));
        self
    }

    /// Route objects to a converter whose `value` key becomes the output.
    #[must_use]
    pub fn special<F>(mut self, converter: F) -> Self
    where
        F: Fn(&T) -> Mapping + Send + Sync + 'static,
    {
        self.declaration.representation = Representation::Special(erase(converter));
        self
    }

    /// Objects produce their final output themselves.
    #[must_use]
    pub fn self_describing<F>(mut self, render: F) -> Self
    where
        F: Fn(&T) -> JsonValue + Send + Sync + 'static,
    {
        self.declaration.representation = Representation::SelfDescribing(erase(render));
        self
    }

    /// Objects describe themselves as a value tree that is transformed again.
    #[must_use]
    pub fn hybrid<F>(mut self, render: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.declaration.representation = Representation::Hybrid(erase(render));
        self
    }

    /// Objects are containers; their items are transformed as a list.
    #[must_use]
    pub fn collection<F>(mut self, items: F) -> Self
    where
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        self.declaration.representation = Representation::Collection(erase(items));
        self
    }

    /// Replace the generic transformer for this type.
    #[must_use]
    pub fn transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.declaration.transformer = Some(Arc::new(transformer));
        self
    }

    pub fn into_declaration(self) -> TypeDeclaration {
        self.declaration
    }
}
