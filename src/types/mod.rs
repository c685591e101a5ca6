//! Type declarations, resolved configs and value classification.
//!
//! - [`TypeSpec`] / [`Registry`] - statically declared capabilities per type
//! - [`ConfigCache`] / [`TypeConfig`] - memoized, filter-applied configs
//! - [`classify`] - maps a value to its [`Classification`]

pub mod builtin;
mod classifier;
mod config_cache;
mod registry;
mod spec;

pub use classifier::{Classification, classify};
pub(crate) use classifier::classify_object;
pub use config_cache::{ConfigCache, TypeConfig};
pub use registry::Registry;
pub(crate) use spec::Representation;
pub use spec::{Getter, PostProcessor, PropertyFilter, Relation, TypeDeclaration, TypeSpec};
