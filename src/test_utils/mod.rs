//! Test utilities for jsonapi-transformer.
//!
//! Shared fixtures for unit and integration tests: typed resources with their
//! [`TypeSpec`](crate::types::TypeSpec)s, graph builders for cycles and deep
//! chains, and a cache backend that always fails.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration and stress suites.

pub mod fixtures;

pub use fixtures::{
    Envelope, EnvelopeTransformer, FailingBackend, Node, Page, chain, cyclic_pages, envelope_spec,
    fixture_engine, node_spec, page_spec,
};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=cache=debug cargo test --test stress
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
