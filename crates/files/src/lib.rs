//! dirstore File Handles
//!
//! This crate provides the low-level file access used by the dirstore entity
//! repository: resolving a `(directory, name)` pair into a [`FileHandle`],
//! reading file contents with an upper bound, creating files with create-new
//! semantics, and removing them.
//!
//! ## Design Principles
//!
//! - One file per entity, addressed by a validated [`EntityName`] inside a directory
//! - No sidecar metadata: name, existence, length, read-only flag and modification
//!   time all come from the filesystem
//! - Content types are sniffed from the byte signature, never from the extension
//! - Handles are snapshots: they describe the file as of the last resolve or refresh
//!
//! ## Example Usage
//!
//! ```no_run
//! use dirstore_files::{EntityName, FileHandle, InferSniffer};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let name = EntityName::new("photo.png")?;
//! let handle = FileHandle::resolve(Path::new("/srv/files"), &name).await?;
//!
//! if handle.exists() {
//!     let mime = handle.sniff_content_type(&InferSniffer).await?;
//!     println!("{} is {}", handle.path().display(), mime);
//! }
//! # Ok(())
//! # }
//! ```

mod constants;
mod handle;
mod sniff;

pub use constants::SNIFF_PREFIX_LEN;
pub use dirstore_types::EntityName;
pub use handle::FileHandle;
pub use sniff::{ContentSniffer, InferSniffer};

use std::path::PathBuf;

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Path cannot address a file (no file name component, or not valid UTF-8)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The file the operation requires does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Create-new semantics collided with an existing entry
    #[error("File already exists: {}", .0.display())]
    FileAlreadyExists(PathBuf),

    /// The file is marked read-only and cannot be removed or replaced
    #[error("File is read-only: {}", .0.display())]
    ReadOnly(PathBuf),

    /// The file is larger than the caller's in-memory buffer limit
    #[error("File {} is {len} bytes, exceeding the {max} byte limit", path.display())]
    TooLarge { path: PathBuf, len: u64, max: u64 },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FilesResult<T> = std::result::Result<T, FilesError>;
