//! Engine configuration.
//!
//! The engine reads a single TOML file that tunes the transformer and the
//! resource cache, overrides the property filters of registered types, and
//! declares dynamic record types.
//!
//! # Location
//!
//! The file is resolved in this order:
//!
//! 1. An explicit path (the CLI's `--config`)
//! 2. The `JSONAPI_TRANSFORMER_CONFIG` environment variable
//! 3. `<config dir>/jsonapi-transformer/config.toml`, where `<config dir>` is
//!    the platform configuration directory (`~/.config` on Linux)
//!
//! A missing file is not an error: the defaults are used.
//!
//! # File Format
//!
//! ```toml
//! max_depth = 50
//! link_marker = "t3://"
//!
//! [cache]
//! default_ttl_secs = 3600
//! pending_timeout_secs = 10
//!
//! # Replace the declared property filter of a registered type
//! [types.page]
//! allowed_properties = ["title", "children"]
//!
//! # Declare a dynamic record type
//! [records.author]
//! attributes = ["name", "email"]
//!
//! [records.article]
//! attributes = ["title"]
//! relations = { author = { target = "author" }, tags = { collection = true } }
//!
//! # Internal link targets
//! [links]
//! "t3://page?uid=1" = "/"
//! ```

mod engine_config;
mod records;

pub use engine_config::{CacheConfig, EngineConfig, TypeOverride};
pub use records::{RecordDeclaration, RelationDeclaration};
