//! Value graph → JSON:API transformation.
//!
//! - [`AutoTransformer`] - the recursive walker
//! - [`TransformContext`] - per-call path, cycle guard and depth bound
//! - [`TransformOptions`] - nested/include controls
//! - [`Transformer`] - custom per-type transformer hook
//! - [`LinkRewriter`] / [`LinkResolver`] - internal link resolution in strings

mod auto;
mod context;
mod links;
mod options;

pub use auto::{AutoTransformer, TransformScope, Transformer, generated_id};
pub use context::{Dispatch, Identity, PathEntry, Token, TransformContext};
pub use links::{LinkResolver, LinkRewriter, PassthroughResolver, StaticLinkResolver};
pub use options::TransformOptions;
