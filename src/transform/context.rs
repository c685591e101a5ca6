//! Per-call transformation state and cycle guard.
//!
//! [`TransformContext`] is created at the start of every top-level transform
//! and threaded through the recursion. It owns the active path: one
//! [`PathEntry`] per composite value currently being transformed. Objects are
//! identified by their shared-handle address, lists and maps by the address of
//! the borrowed container, so "the same container" and "an equal container"
//! never collide.
//!
//! # Cycle policy
//!
//! When an object that is already on the path is entered again:
//! - if it is the **last-entered** frame and that frame is not using the
//!   generic transformer, the inner occurrence is re-dispatched through the
//!   generic transformer (a custom transformer asking for the raw data of its
//!   own object);
//! - any other repetition is a [`TransformError::CircularReference`].
//!
//! Containers have no transformer, so any repetition of a container is a cycle.

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::TransformError;
use crate::model::{ObjectRef, Value};

/// Identity of a composite value on the active path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    Object(usize),
    List(usize),
    Map(usize),
}

impl Identity {
    pub fn of_object(object: &ObjectRef) -> Self {
        Identity::Object(Arc::as_ptr(object).cast::<()>() as usize)
    }

    /// Identity of a composite value, `None` for scalars.
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(object) => Some(Self::of_object(object)),
            Value::List(items) => Some(Identity::List(std::ptr::from_ref(items) as usize)),
            Value::Map(entries) => Some(Identity::Map(std::ptr::from_ref(entries) as usize)),
            _ => None,
        }
    }
}

/// One frame of the active path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub identity: Identity,
    /// Type name for objects, `list`/`map` for containers
    pub label: String,
    /// Whether this frame is handled by the generic transformer
    pub generic: bool,
}

impl PathEntry {
    pub fn new(identity: Identity, label: impl Into<String>, generic: bool) -> Self {
        Self {
            identity,
            label: label.into(),
            generic,
        }
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Proof of a successful [`TransformContext::enter_object`] or
/// [`TransformContext::enter_container`]; hand it back to
/// [`TransformContext::exit`].
#[derive(Debug)]
#[must_use = "every entered frame must be exited"]
pub struct Token {
    depth: usize,
}

/// How an entered object must be transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Use the type's configured transformer
    Configured,
    /// Self-recursion of a non-generic frame; use the generic transformer
    GenericFallback,
}

/// Mutable state of a single top-level transform call.
#[derive(Debug)]
pub struct TransformContext {
    path: Vec<PathEntry>,
    max_depth: usize,
    cancel: CancellationToken,
}

impl TransformContext {
    pub fn new(max_depth: usize) -> Self {
        Self::with_cancellation(max_depth, CancellationToken::new())
    }

    pub fn with_cancellation(max_depth: usize, cancel: CancellationToken) -> Self {
        Self {
            path: Vec::new(),
            max_depth,
            cancel,
        }
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    /// Enter an object frame.
    ///
    /// `configured_generic` tells whether the object's configured transformer
    /// is the generic one; it decides whether a self-recursion may fall back.
    pub fn enter_object(
        &mut self,
        identity: Identity,
        label: &str,
        configured_generic: bool,
    ) -> Result<(Token, Dispatch), TransformError> {
        self.check_cancelled()?;

        let dispatch = match self.path.iter().position(|entry| entry.identity == identity) {
            None => Dispatch::Configured,
            Some(index) if index + 1 == self.path.len() && !self.path[index].generic => {
                Dispatch::GenericFallback
            }
            Some(_) => return Err(self.circular(identity, label)),
        };

        let generic = configured_generic || dispatch == Dispatch::GenericFallback;
        let token = self.push(PathEntry::new(identity, label, generic))?;
        Ok((token, dispatch))
    }

    /// Enter a list or map frame. Any repetition is a cycle.
    pub fn enter_container(&mut self, identity: Identity, label: &str) -> Result<Token, TransformError> {
        self.check_cancelled()?;

        if self.path.iter().any(|entry| entry.identity == identity) {
            return Err(self.circular(identity, label));
        }

        self.push(PathEntry::new(identity, label, false))
    }

    /// Leave the most recently entered frame.
    pub fn exit(&mut self, token: Token) {
        debug_assert_eq!(token.depth, self.path.len(), "frames must be exited in LIFO order");
        self.path.pop();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), TransformError> {
        if self.cancel.is_cancelled() {
            Err(TransformError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn push(&mut self, entry: PathEntry) -> Result<Token, TransformError> {
        if self.path.len() >= self.max_depth {
            let mut path = self.path.clone();
            path.push(entry);
            return Err(TransformError::DepthExceeded {
                max_depth: self.max_depth,
                path,
            });
        }

        self.path.push(entry);
        Ok(Token {
            depth: self.path.len(),
        })
    }

    fn circular(&self, identity: Identity, label: &str) -> TransformError {
        let mut path = self.path.clone();
        path.push(PathEntry::new(identity, label, false));
        tracing::debug!(target: "transform", "Circular reference at depth {}", path.len());
        TransformError::CircularReference {
            path,
        }
    }
}
