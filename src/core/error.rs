//! Error handling for the transformer.
//!
//! Three families of errors exist:
//! - [`ConfigurationError`] - invalid type declarations, filters or config values.
//!   Detected while registering types or building type configs; never retried.
//! - [`TransformError`] - request-fatal failures while walking a value graph
//!   (cycles, depth overruns, cancellation). There is no partial-result mode.
//! - [`CacheError`] - storage backend failures. These never fail a request; the
//!   cache logs them and degrades to "always miss, always recompute".
//!
//! Use [`user_friendly_error`] to turn any [`anyhow::Error`] into an
//! [`ErrorContext`] with a suggestion for CLI display.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::transform::PathEntry;

/// Invalid type declaration, property filter or configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// An allow/deny filter names a property the type does not declare.
    #[error("Type '{type_name}' filters unknown property '{property}'")]
    UnknownProperty {
        /// Type whose filter is invalid
        type_name: String,
        /// The property name that does not exist
        property: String,
    },

    /// A relation declares a target type that was never registered.
    #[error("Relation '{relation}' of type '{type_name}' targets unregistered type '{target}'")]
    UnknownRelationTarget {
        type_name: String,
        relation: String,
        target: String,
    },

    /// A configuration override or lookup references an unregistered type.
    #[error("Type '{type_name}' is not registered")]
    UnknownType {
        type_name: String,
    },

    /// The same type name was registered twice.
    #[error("Type '{type_name}' is already registered")]
    DuplicateType {
        type_name: String,
    },

    /// A type declares the same attribute or relation name twice.
    #[error("Type '{type_name}' declares property '{property}' more than once")]
    DuplicateProperty {
        type_name: String,
        property: String,
    },

    /// A configuration value is out of range or malformed.
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue {
        key: String,
        reason: String,
    },
}

/// Request-fatal transformation failures.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// A value re-entered the active path with no generic fallback available.
    #[error("Circular reference detected: {}", format_path(path))]
    CircularReference {
        /// Active path at the point of detection, ending with the repeated value
        path: Vec<PathEntry>,
    },

    /// The active path grew beyond the configured ceiling.
    #[error("Maximum transformation depth of {max_depth} exceeded: {}", format_path(path))]
    DepthExceeded {
        max_depth: usize,
        path: Vec<PathEntry>,
    },

    /// The caller's cancellation token fired.
    #[error("Transformation was cancelled")]
    Cancelled,

    /// A type config could not be built while transforming.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A custom transformer reported a failure of its own.
    #[error("Transformer for '{type_name}' failed: {message}")]
    Transformer {
        type_name: String,
        message: String,
    },
}

impl TransformError {
    /// The path carried by cycle and depth errors, if any.
    pub fn path(&self) -> Option<&[PathEntry]> {
        match self {
            TransformError::CircularReference {
                path,
            }
            | TransformError::DepthExceeded {
                path,
                ..
            } => Some(path),
            _ => None,
        }
    }

    /// Whether the error is one of the graph-shape failures (cycle or depth).
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            TransformError::CircularReference { .. } | TransformError::DepthExceeded { .. }
        )
    }
}

fn format_path(path: &[PathEntry]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ")
}

/// Storage backend failures. Logged and degraded, never surfaced to callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// User-facing error wrapper with optional details and suggestion.
///
/// Displayed by the CLI with color coding:
/// - Error message: Red and bold
/// - Details: Yellow
/// - Suggestion: Green
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Known error types get a tailored suggestion; everything else is reported
/// with its full `anyhow` context chain as details.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(transform_error) = error.downcast_ref::<TransformError>() {
        return match transform_error {
            TransformError::CircularReference {
                ..
            } => ErrorContext::new(transform_error.to_string())
                .with_details("The input graph references an object that is still being transformed")
                .with_suggestion(
                    "Break the cycle in the input or register a custom transformer for the type",
                ),
            TransformError::DepthExceeded {
                max_depth,
                ..
            } => ErrorContext::new(transform_error.to_string())
                .with_details(format!("The transformation path is limited to {max_depth} levels"))
                .with_suggestion("Raise 'max_depth' in the configuration or request fewer includes"),
            TransformError::Configuration(config_error) => configuration_context(config_error),
            _ => ErrorContext::new(transform_error.to_string()),
        };
    }

    if let Some(config_error) = error.downcast_ref::<ConfigurationError>() {
        return configuration_context(config_error);
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(format!("Invalid configuration file: {toml_error}"))
            .with_suggestion("Check the TOML syntax of the configuration file");
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(format!("Invalid JSON input: {json_error}"))
            .with_suggestion("Validate the input document with a JSON linter");
    }

    let mut context = ErrorContext::new(error.to_string());
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        context = context.with_details(chain.join(": "));
    }
    context
}

fn configuration_context(error: &ConfigurationError) -> ErrorContext {
    let context = ErrorContext::new(error.to_string());
    match error {
        ConfigurationError::UnknownProperty {
            type_name,
            ..
        } => context.with_suggestion(format!(
            "Only list attributes or relations declared by '{type_name}' in its property filter"
        )),
        ConfigurationError::UnknownRelationTarget {
            target,
            ..
        }
        | ConfigurationError::UnknownType {
            type_name: target,
        } => context.with_suggestion(format!("Register type '{target}' before building the engine")),
        _ => context,
    }
}
