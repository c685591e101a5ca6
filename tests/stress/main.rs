//! Stress test suite for jsonapi-transformer
//!
//! Concurrency tests for the resource cache and the engine. They spawn many
//! tasks on a multi-threaded runtime to surface races in single-flight
//! coordination, and take longer than the integration suite.
//!
//! # Running Stress Tests
//!
//! ```bash
//! cargo test --test stress
//! RUST_LOG=cache=debug cargo test --test stress -- --nocapture
//! ```
//!
//! Timings are printed rather than asserted; hangs are caught by the test
//! runner's timeout.

mod single_flight;
