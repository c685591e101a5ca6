//! Global constants used throughout the transformer.
//!
//! Defaults for recursion limits, link detection, cache coordination and
//! configuration discovery live here so the numbers are discoverable in one
//! place instead of being scattered across modules.

use std::time::Duration;

/// Default ceiling for the transformation path length.
///
/// A value graph deeper than this almost always indicates a cycle the guard
/// could not see through (e.g. freshly allocated objects on every access).
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Largest accepted `max_depth`.
///
/// Every path frame costs several native stack frames; beyond this the
/// transform can exhaust a default 2 MiB thread stack before the depth guard
/// fires.
pub const MAX_DEPTH_LIMIT: usize = 128;

/// Marker that identifies internal links embedded in string values.
pub const DEFAULT_LINK_MARKER: &str = "t3://";

/// Timeout for waiting on another task's in-flight production (10 seconds).
///
/// After this delay a waiting caller stops coalescing and produces the value
/// itself rather than hanging behind a stuck producer.
pub const PENDING_STATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted cache TTL (one year).
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Number of hex characters kept from the SHA-256 digest for generated ids.
pub const GENERATED_ID_LEN: usize = 16;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "JSONAPI_TRANSFORMER_CONFIG";

/// Directory name used below the platform config directory.
pub const CONFIG_DIR_NAME: &str = "jsonapi-transformer";

/// Key that marks a JSON object as a typed record in CLI input.
pub const RECORD_TYPE_KEY: &str = "$type";
