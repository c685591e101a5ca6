//! jsonapi-transformer - cycle-safe object graph to JSON:API transformation
//!
//! Turns a graph of application objects into plain JSON:API resource mappings
//! (`{id, <attributes>, <relations>}`) with configurable includes, property
//! filters, special-type hooks and internal link rewriting, and memoizes the
//! result in a tag-invalidated, single-flight resource cache.
//!
//! # Architecture Overview
//!
//! Components, leaf to root:
//!
//! - **Type classification** ([`types::classify`]) sorts a runtime value into
//!   null, scalar, array-like, self-describing, special, entity or generic.
//! - **Config cache** ([`types::ConfigCache`]) builds the per-type
//!   [`types::TypeConfig`] (id getter, attribute getters, includable
//!   relations, post-processors) once from the statically declared
//!   [`types::TypeSpec`] and shares it across requests.
//! - **Cycle guard** ([`transform::TransformContext`]) tracks the active
//!   path, detects re-entered objects and bounds the depth.
//! - **Auto-transformer** ([`transform::AutoTransformer`]) walks the value
//!   and produces the mapping.
//! - **Resource cache** ([`cache::ResourceCache`]) memoizes mappings under a
//!   deterministic fingerprint with at most one production per key.
//!
//! [`engine::Engine`] wires them together.
//!
//! # Example
//!
//! ```rust
//! use jsonapi_transformer::engine::Engine;
//! use jsonapi_transformer::model::{Record, Value};
//! use jsonapi_transformer::transform::TransformOptions;
//! use jsonapi_transformer::types::TypeSpec;
//!
//! # fn example() -> anyhow::Result<()> {
//! let engine = Engine::builder()
//!     .register(
//!         TypeSpec::<Record>::new("tag")
//!             .id(|record| record.get("id"))
//!             .attribute("label", |record| record.get("label")),
//!     )?
//!     .build()?;
//!
//! let tag = Value::object(Record::new("tag").field("id", 1).field("label", "rust"));
//! let mapping = engine.transform(&tag, &TransformOptions::default())?;
//! assert_eq!(mapping["label"], "rust");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Transform a typed JSON document, embedding the children relation
//! jsonapi-transformer transform page.json --include children --pretty
//!
//! # Show the effective configuration
//! jsonapi-transformer config
//! ```

// Engine
pub mod cache;
pub mod engine;
pub mod transform;
pub mod types;

// Data model and errors
pub mod core;
pub mod model;

// Application layer
pub mod cli;
pub mod config;
pub mod constants;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
