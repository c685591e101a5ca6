//! Core error types shared by every layer of the transformer.
//!
//! The library reports failures through strongly-typed [`thiserror`] enums
//! ([`TransformError`], [`ConfigurationError`], [`CacheError`]); the binary
//! wraps them in [`anyhow`] and renders them with [`ErrorContext`].

pub mod error;

pub use error::{
    CacheError, ConfigurationError, ErrorContext, TransformError, user_friendly_error,
};
