//! Constants used throughout the dirstore core crate.

/// Default repository root when no explicit directory is configured.
pub const DEFAULT_ROOT_DIR: &str = "data";

/// Default upper bound for a payload held in memory: the largest addressable buffer.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = isize::MAX as u64;

/// Environment variable naming the repository root.
pub const ROOT_ENV: &str = "DIRSTORE_ROOT";

/// Environment variable enabling recursive scans.
pub const RECURSIVE_ENV: &str = "DIRSTORE_RECURSIVE";

/// Environment variable selecting the default load tier.
pub const DEFAULT_TIER_ENV: &str = "DIRSTORE_DEFAULT_TIER";

/// Environment variable selecting the default payload encoding.
pub const ENCODING_ENV: &str = "DIRSTORE_ENCODING";

/// Environment variable capping payload size in bytes.
pub const MAX_PAYLOAD_BYTES_ENV: &str = "DIRSTORE_MAX_PAYLOAD_BYTES";

/// Environment variable toggling the same-length update shortcut.
pub const SKIP_SAME_LENGTH_REWRITE_ENV: &str = "DIRSTORE_SKIP_SAME_LENGTH_REWRITE";
