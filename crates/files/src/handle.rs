//! Backing file handles.
//!
//! A [`FileHandle`] binds an entity to one path on disk and carries a snapshot of
//! the file's metadata (existence, length, read-only flag, modification time) as
//! of the last resolve, write or [`refresh`](FileHandle::refresh).
//!
//! # Snapshot Semantics
//!
//! Handles never hold an open file descriptor between calls. Every read or write
//! opens the file, does its work and closes it again, so a handle can be stored on
//! an entity and cloned freely. The price is that the snapshot can go stale when
//! another process touches the file; operations that depend on the current state
//! (reads, create-new, delete) consult the filesystem rather than trusting the
//! snapshot, and report `NotFound`/`FileAlreadyExists` from the OS result.
//!
//! # Create-new Semantics
//!
//! [`FileHandle::create_new`] opens with `create_new(true)`, so two concurrent
//! creators for the same path produce exactly one winner; the loser receives
//! [`FilesError::FileAlreadyExists`].
//!
//! # Replace Semantics
//!
//! [`FileHandle::replace`] writes the new contents to a hidden sibling and renames
//! it over the original, so readers observe either the old or the new bytes and a
//! failed write leaves the original in place.

use crate::sniff::ContentSniffer;
use crate::{EntityName, FilesError, FilesResult, SNIFF_PREFIX_LEN};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Snapshot {
    is_file: bool,
    len: u64,
    read_only: bool,
    modified_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            is_file: metadata.is_file(),
            len: metadata.len(),
            read_only: metadata.permissions().readonly(),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

/// Handle binding an entity to a file path.
#[derive(Debug, Clone)]
pub struct FileHandle {
    path: PathBuf,
    snapshot: Snapshot,
}

impl FileHandle {
    /// Resolves `name` inside `directory` and snapshots whatever is there.
    ///
    /// A missing file is not an error: the handle is returned with
    /// [`exists`](Self::exists) set to `false`, ready for [`create_new`](Self::create_new).
    ///
    /// # Errors
    ///
    /// Returns `FilesError::Io` if the metadata lookup fails for any reason other
    /// than the file being absent.
    pub async fn resolve(directory: &Path, name: &EntityName) -> FilesResult<Self> {
        Self::at(directory.join(name.as_str())).await
    }

    /// Snapshots the file at an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidPath` if the path has no UTF-8 file name
    /// component, or `FilesError::Io` if the metadata lookup fails.
    pub async fn at(path: PathBuf) -> FilesResult<Self> {
        if path.file_name().and_then(|n| n.to_str()).is_none() {
            return Err(FilesError::InvalidPath(format!(
                "{} has no usable file name",
                path.display()
            )));
        }

        let snapshot = snapshot_path(&path).await?;
        Ok(Self { path, snapshot })
    }

    /// Builds a handle from metadata that the caller already holds, e.g. from a
    /// directory listing. Performs no I/O.
    pub fn from_metadata(path: PathBuf, metadata: &std::fs::Metadata) -> Self {
        Self {
            path,
            snapshot: Snapshot::from_metadata(metadata),
        }
    }

    /// Re-reads the metadata snapshot from disk.
    pub async fn refresh(&mut self) -> FilesResult<()> {
        self.snapshot = snapshot_path(&self.path).await?;
        Ok(())
    }

    /// Full path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component of the path.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Directory that contains the file.
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// Whether a regular file existed at the path when last observed.
    ///
    /// Directories and other non-file entries report `false`.
    pub fn exists(&self) -> bool {
        self.snapshot.is_file
    }

    /// Length in bytes when last observed; zero for missing files.
    pub fn len(&self) -> u64 {
        self.snapshot.len
    }

    /// Whether the file was empty (or missing) when last observed.
    pub fn is_empty(&self) -> bool {
        self.snapshot.len == 0
    }

    /// Whether the file carried the read-only permission when last observed.
    pub fn is_read_only(&self) -> bool {
        self.snapshot.read_only
    }

    /// Last modification time when last observed.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.modified_at
    }

    /// Reads at most `limit` leading bytes of the file.
    pub async fn read_prefix(&self, limit: usize) -> FilesResult<Vec<u8>> {
        let file = fs::File::open(&self.path)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;

        let mut buffer = Vec::with_capacity(limit.min(self.snapshot.len as usize));
        file.take(limit as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;
        Ok(buffer)
    }

    /// Reads the whole file, refusing files longer than `max_len` bytes.
    ///
    /// The limit is checked against the snapshot before opening and again while
    /// reading, so a file that grows after it was observed is still rejected.
    ///
    /// # Errors
    ///
    /// - `FilesError::NotFound` if the file no longer exists
    /// - `FilesError::TooLarge` if the file exceeds `max_len`
    /// - `FilesError::Io` for any other read failure
    pub async fn read_all(&self, max_len: u64) -> FilesResult<Vec<u8>> {
        if self.snapshot.len > max_len {
            return Err(self.too_large(self.snapshot.len, max_len));
        }

        let file = fs::File::open(&self.path)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;

        let mut buffer = Vec::with_capacity(self.snapshot.len as usize);
        file.take(max_len.saturating_add(1))
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;

        if buffer.len() as u64 > max_len {
            return Err(self.too_large(buffer.len() as u64, max_len));
        }
        Ok(buffer)
    }

    /// Sniffs the content type from the file's leading bytes.
    pub async fn sniff_content_type(&self, sniffer: &dyn ContentSniffer) -> FilesResult<String> {
        let prefix = self.read_prefix(SNIFF_PREFIX_LEN).await?;
        Ok(sniffer.sniff(&prefix))
    }

    /// Creates the file with create-new semantics and writes `bytes` to it.
    ///
    /// On success the snapshot reflects the new file.
    ///
    /// # Errors
    ///
    /// - `FilesError::FileAlreadyExists` if any entry already occupies the path
    /// - `FilesError::NotFound` if the parent directory does not exist
    /// - `FilesError::Io` if writing or flushing fails
    pub async fn create_new(&mut self, bytes: &[u8]) -> FilesResult<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(crate::constants::CREATED_FILE_MODE);

        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;

        file.write_all(bytes).await?;
        file.flush().await?;

        let metadata = file.metadata().await?;
        self.snapshot = Snapshot::from_metadata(&metadata);
        Ok(())
    }

    /// Truncates the existing file and writes `bytes` in its place.
    ///
    /// # Errors
    ///
    /// - `FilesError::ReadOnly` if the snapshot marks the file read-only
    /// - `FilesError::NotFound` if the file no longer exists
    /// - `FilesError::Io` if writing or flushing fails
    pub async fn overwrite(&mut self, bytes: &[u8]) -> FilesResult<()> {
        if self.snapshot.read_only {
            return Err(FilesError::ReadOnly(self.path.clone()));
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;

        file.write_all(bytes).await?;
        file.flush().await?;

        let metadata = file.metadata().await?;
        self.snapshot = Snapshot::from_metadata(&metadata);
        Ok(())
    }

    /// Replaces the file's contents with `bytes` through a staged write and rename.
    ///
    /// The original's permissions carry over to the replacement. On failure the
    /// staged file is removed and the original is untouched.
    ///
    /// # Errors
    ///
    /// - `FilesError::ReadOnly` if the snapshot marks the file read-only
    /// - `FilesError::NotFound` if the file no longer exists
    /// - `FilesError::Io` if staging or renaming fails
    pub async fn replace(&mut self, bytes: &[u8]) -> FilesResult<()> {
        if self.snapshot.read_only {
            return Err(FilesError::ReadOnly(self.path.clone()));
        }

        let permissions = match fs::metadata(&self.path).await {
            Ok(metadata) if metadata.is_file() => metadata.permissions(),
            Ok(_) => return Err(FilesError::NotFound(self.path.clone())),
            Err(e) => return Err(map_io_error(&self.path, e)),
        };

        let staging = self.staging_path();
        let staged = match write_staged(&staging, bytes, permissions).await {
            Ok(()) => fs::rename(&staging, &self.path)
                .await
                .map_err(|e| map_io_error(&self.path, e)),
            Err(e) => Err(e),
        };
        if let Err(e) = staged {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }

        self.snapshot = snapshot_path(&self.path).await?;
        Ok(())
    }

    /// Removes the file.
    ///
    /// The read-only flag is honoured even on platforms where the OS would allow
    /// unlinking a read-only file.
    ///
    /// # Errors
    ///
    /// - `FilesError::ReadOnly` if the snapshot marks the file read-only
    /// - `FilesError::NotFound` if the file does not exist
    /// - `FilesError::Io` for any other failure
    pub async fn delete(&mut self) -> FilesResult<()> {
        if self.snapshot.read_only {
            return Err(FilesError::ReadOnly(self.path.clone()));
        }

        fs::remove_file(&self.path)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;
        self.snapshot = Snapshot::default();
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = format!(".{}.{}-{n}.tmp", self.name(), std::process::id());
        self.path.with_file_name(file_name)
    }

    fn too_large(&self, len: u64, max: u64) -> FilesError {
        FilesError::TooLarge {
            path: self.path.clone(),
            len,
            max,
        }
    }
}

async fn snapshot_path(path: &Path) -> FilesResult<Snapshot> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(Snapshot::from_metadata(&metadata)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::default()),
        Err(e) => Err(FilesError::Io(e)),
    }
}

async fn write_staged(
    path: &Path,
    bytes: &[u8],
    permissions: std::fs::Permissions,
) -> FilesResult<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| map_io_error(path, e))?;

    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::set_permissions(path, permissions).await?;
    Ok(())
}

fn map_io_error(path: &Path, e: std::io::Error) -> FilesError {
    match e.kind() {
        ErrorKind::NotFound => FilesError::NotFound(path.to_path_buf()),
        ErrorKind::AlreadyExists => FilesError::FileAlreadyExists(path.to_path_buf()),
        _ => FilesError::Io(e),
    }
}
