//! Constants used by the file handle layer.

/// Number of leading bytes read when sniffing a content type.
///
/// Every signature known to `infer` lives within the first 8 KiB of a file.
pub const SNIFF_PREFIX_LEN: usize = 8192;

/// Permission bits applied to files created through a handle on unix.
#[cfg(unix)]
pub(crate) const CREATED_FILE_MODE: u32 = 0o644;
