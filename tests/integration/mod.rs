//! Integration test suite for jsonapi-transformer
//!
//! End-to-end tests of the engine through its public API and the CLI
//! command types. They run quickly and are executed on every commit.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **caching**: Resource cache hits, misses, invalidation and degradation
//! - **cli**: `transform` and `config` commands against files on disk
//! - **configuration**: Loading configuration files and applying overrides
//! - **cycles**: Circular reference detection and generic fallback
//! - **depth**: The recursion depth bound
//! - **end_to_end**: Page trees with includes, filters and link rewriting

mod caching;
mod cli;
mod configuration;
mod cycles;
mod depth;
mod end_to_end;
