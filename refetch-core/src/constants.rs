//! Defaults and environment keys for refetch.

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live of a cached value in milliseconds (one minute).
pub const DEFAULT_EXPIRY_MS: u64 = 60_000;

/// Default cache name used in log fields.
pub const DEFAULT_CACHE_NAME: &str = "refetch";

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Environment variable overriding the expiry, in milliseconds.
pub const ENV_EXPIRY_MS: &str = "REFETCH_EXPIRY_MS";

/// Environment variable overriding the cache name.
pub const ENV_CACHE_NAME: &str = "REFETCH_NAME";
