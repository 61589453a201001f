//! Repository configuration.
//!
//! Configuration is resolved once at process startup and handed to
//! [`FileRepository::new`](crate::FileRepository::new). Nothing in this crate reads process
//! environment variables on its own; callers pass the raw values in through
//! [`RepositoryConfig::from_env_values`] so tests and multi-threaded runtimes see a consistent
//! view.

use crate::constants::{DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_ROOT_DIR};
use crate::encoding::PayloadEncoding;
use crate::loader::LoadTier;
use crate::{RepositoryError, RepositoryResult};
use std::path::{Path, PathBuf};

/// Settings for one repository instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryConfig {
    root: PathBuf,
    recursive: bool,
    default_tier: LoadTier,
    default_encoding: PayloadEncoding,
    max_payload_bytes: u64,
    skip_rewrite_if_same_length: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_DIR)
    }
}

impl RepositoryConfig {
    /// Creates a flat, metadata-only configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            default_tier: LoadTier::InfoOnly,
            default_encoding: PayloadEncoding::RawBytes,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            skip_rewrite_if_same_length: true,
        }
    }

    /// Builds a configuration from raw environment values.
    ///
    /// Each value is optional; `None` and blank strings fall back to the defaults.
    pub fn from_env_values(
        root: Option<String>,
        recursive: Option<String>,
        default_tier: Option<String>,
        default_encoding: Option<String>,
        max_payload_bytes: Option<String>,
        skip_rewrite_if_same_length: Option<String>,
    ) -> RepositoryResult<Self> {
        Ok(Self {
            root: root_from_env_value(root),
            recursive: bool_from_env_value(recursive)?.unwrap_or(false),
            default_tier: tier_from_env_value(default_tier)?,
            default_encoding: encoding_from_env_value(default_encoding)?,
            max_payload_bytes: max_payload_bytes_from_env_value(max_payload_bytes)?,
            skip_rewrite_if_same_length: bool_from_env_value(skip_rewrite_if_same_length)?
                .unwrap_or(true),
        })
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_default_tier(mut self, tier: LoadTier) -> Self {
        self.default_tier = tier;
        self
    }

    pub fn with_default_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    pub fn with_max_payload_bytes(mut self, max: u64) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// Controls whether an update whose payload has the same length as the file on disk is
    /// skipped without writing.
    pub fn with_skip_rewrite_if_same_length(mut self, skip: bool) -> Self {
        self.skip_rewrite_if_same_length = skip;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn default_tier(&self) -> LoadTier {
        self.default_tier
    }

    pub fn default_encoding(&self) -> PayloadEncoding {
        self.default_encoding
    }

    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    pub fn skip_rewrite_if_same_length(&self) -> bool {
        self.skip_rewrite_if_same_length
    }

    pub(crate) fn set_root(&mut self, root: PathBuf) {
        self.root = root;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the repository root from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_ROOT_DIR`].
pub fn root_from_env_value(value: Option<String>) -> PathBuf {
    non_blank(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR))
}

/// Parse a boolean flag. Accepts `1/0`, `true/false`, `yes/no` and `on/off`.
pub fn bool_from_env_value(value: Option<String>) -> RepositoryResult<Option<bool>> {
    non_blank(value)
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(RepositoryError::InvalidArgument(format!(
                "expected a boolean flag, got {other:?}"
            ))),
        })
        .transpose()
}

/// Parse the default load tier, falling back to [`LoadTier::InfoOnly`].
pub fn tier_from_env_value(value: Option<String>) -> RepositoryResult<LoadTier> {
    let parsed = non_blank(value).map(|v| v.parse::<LoadTier>()).transpose()?;
    Ok(parsed.unwrap_or(LoadTier::InfoOnly))
}

/// Parse the default payload encoding, falling back to [`PayloadEncoding::RawBytes`].
pub fn encoding_from_env_value(value: Option<String>) -> RepositoryResult<PayloadEncoding> {
    let parsed = non_blank(value)
        .map(|v| v.parse::<PayloadEncoding>())
        .transpose()?;
    Ok(parsed.unwrap_or_default())
}

/// Parse the payload size cap, falling back to [`DEFAULT_MAX_PAYLOAD_BYTES`].
pub fn max_payload_bytes_from_env_value(value: Option<String>) -> RepositoryResult<u64> {
    let parsed = non_blank(value)
        .map(|v| {
            v.parse::<u64>().map_err(|e| {
                RepositoryError::InvalidArgument(format!("invalid payload size {v:?}: {e}"))
            })
        })
        .transpose()?;
    Ok(parsed.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RepositoryConfig::default();
        assert_eq!(cfg.root(), Path::new("data"));
        assert!(!cfg.recursive());
        assert_eq!(cfg.default_tier(), LoadTier::InfoOnly);
        assert_eq!(cfg.default_encoding(), PayloadEncoding::RawBytes);
        assert_eq!(cfg.max_payload_bytes(), isize::MAX as u64);
        assert!(cfg.skip_rewrite_if_same_length());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let cfg = RepositoryConfig::from_env_values(
            Some("   ".into()),
            Some("".into()),
            None,
            Some(" ".into()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(cfg, RepositoryConfig::default());
    }

    #[test]
    fn test_from_env_values_parses_everything() {
        let cfg = RepositoryConfig::from_env_values(
            Some("/srv/store".into()),
            Some("yes".into()),
            Some("with_mime".into()),
            Some("base64".into()),
            Some("1024".into()),
            Some("off".into()),
        )
        .unwrap();

        assert_eq!(cfg.root(), Path::new("/srv/store"));
        assert!(cfg.recursive());
        assert_eq!(cfg.default_tier(), LoadTier::WithContentType);
        assert_eq!(cfg.default_encoding(), PayloadEncoding::Base64);
        assert_eq!(cfg.max_payload_bytes(), 1024);
        assert!(!cfg.skip_rewrite_if_same_length());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(bool_from_env_value(Some("maybe".into())).is_err());
        assert!(max_payload_bytes_from_env_value(Some("-1".into())).is_err());
        assert!(tier_from_env_value(Some("everything".into())).is_err());
    }
}
