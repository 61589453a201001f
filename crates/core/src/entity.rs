//! The file entity.
//!
//! A [`FileEntity`] is either **file-backed** (it carries a [`FileHandle`] resolved against a
//! real file; `data` is optional) or **data-backed** (no handle; `data` holds the payload that
//! arrived over the wire). Initialization through the loader is the only way a data-backed
//! entity becomes file-backed.

use crate::encoding::{Payload, PayloadEncoding};
use crate::loader::LoadTier;
use crate::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use dirstore_files::FileHandle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntity {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    encoding: PayloadEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Payload>,
    #[serde(skip)]
    handle: Option<FileHandle>,
    #[serde(skip)]
    loaded_tier: Option<LoadTier>,
}

impl FileEntity {
    /// Builds a data-backed entity from an already encoded payload.
    pub fn new(name: impl Into<String>, data: Payload, encoding: PayloadEncoding) -> Self {
        Self {
            name: name.into(),
            path: None,
            content_type: String::new(),
            encoding,
            data: Some(data),
            handle: None,
            loaded_tier: None,
        }
    }

    /// Builds a data-backed entity by encoding raw file bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, encoding: PayloadEncoding) -> Self {
        Self::new(name, encoding.encode(bytes), encoding)
    }

    /// Builds an entity that only names a file, e.g. for deletes.
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            content_type: String::new(),
            encoding: PayloadEncoding::default(),
            data: None,
            handle: None,
            loaded_tier: None,
        }
    }

    pub(crate) fn from_handle(handle: FileHandle, encoding: PayloadEncoding) -> Self {
        Self {
            name: handle.name().to_owned(),
            path: handle.directory().map(Path::to_path_buf),
            content_type: String::new(),
            encoding,
            data: None,
            handle: Some(handle),
            loaded_tier: Some(LoadTier::InfoOnly),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames an entity that has not been committed to disk yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` once the entity is file-backed.
    pub fn set_name(&mut self, name: impl Into<String>) -> RepositoryResult<()> {
        if self.handle.is_some() {
            return Err(RepositoryError::InvalidArgument(format!(
                "cannot rename file-backed entity {}",
                self.name
            )));
        }
        self.name = name.into();
        Ok(())
    }

    /// Directory that contains (or will contain) the file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Places a not-yet-resolved entity in an explicit directory.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn handle(&self) -> Option<&FileHandle> {
        self.handle.as_ref()
    }

    pub fn is_file_backed(&self) -> bool {
        self.handle.is_some()
    }

    /// Highest load tier applied so far; `None` for data-backed entities.
    pub fn loaded_tier(&self) -> Option<LoadTier> {
        self.loaded_tier
    }

    /// File length from the handle snapshot.
    pub fn size(&self) -> Option<u64> {
        self.handle.as_ref().map(FileHandle::len)
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.handle.as_ref().and_then(FileHandle::modified_at)
    }

    /// Decodes `data` into raw file bytes.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::InvalidArgument` if no data is present or it fails to decode
    pub fn decoded_data(&self) -> RepositoryResult<Vec<u8>> {
        let data = self.data.as_ref().ok_or_else(|| {
            RepositoryError::InvalidArgument(format!("entity {} carries no data", self.name))
        })?;
        self.encoding.decode(data)
    }

    /// Re-encodes any loaded data under another encoding.
    pub fn transcode(mut self, encoding: PayloadEncoding) -> RepositoryResult<Self> {
        if encoding == self.encoding {
            return Ok(self);
        }
        if self.data.is_some() {
            let raw = self.decoded_data()?;
            self.data = Some(encoding.encode(raw));
        }
        self.encoding = encoding;
        Ok(self)
    }

    pub(crate) fn handle_mut(&mut self) -> Option<&mut FileHandle> {
        self.handle.as_mut()
    }

    pub(crate) fn attach_handle(&mut self, handle: FileHandle) {
        self.name = handle.name().to_owned();
        self.path = handle.directory().map(Path::to_path_buf);
        self.handle = Some(handle);
        self.raise_tier(LoadTier::InfoOnly);
    }

    pub(crate) fn set_content_type(&mut self, content_type: String) {
        self.content_type = content_type;
        self.raise_tier(LoadTier::WithContentType);
    }

    pub(crate) fn set_loaded_data(&mut self, data: Payload) {
        self.data = Some(data);
        self.raise_tier(LoadTier::WithData);
    }

    fn raise_tier(&mut self, tier: LoadTier) {
        if self.loaded_tier.map_or(true, |current| current < tier) {
            self.loaded_tier = Some(tier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entity_is_data_backed() {
        let entity = FileEntity::from_bytes("a.txt", b"abc".to_vec(), PayloadEncoding::Base64);

        assert!(!entity.is_file_backed());
        assert!(entity.has_data());
        assert_eq!(entity.data(), Some(&Payload::Text("YWJj".into())));
        assert_eq!(entity.decoded_data().unwrap(), b"abc");
        assert_eq!(entity.loaded_tier(), None);
        assert_eq!(entity.size(), None);
    }

    #[test]
    fn test_reference_has_no_data() {
        let entity = FileEntity::reference("gone.txt");
        assert!(!entity.has_data());
        assert!(matches!(
            entity.decoded_data(),
            Err(RepositoryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_transcode_reencodes_payload() {
        let entity = FileEntity::from_bytes("a.bin", vec![0, 1, 2], PayloadEncoding::RawBytes)
            .transcode(PayloadEncoding::Base64AsciiBytes)
            .unwrap();

        assert_eq!(entity.encoding(), PayloadEncoding::Base64AsciiBytes);
        assert_eq!(entity.data(), Some(&Payload::Bytes(b"AAEC".to_vec())));
        assert_eq!(entity.decoded_data().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rename_before_commit() {
        let mut entity = FileEntity::reference("draft.txt");
        entity.set_name("final.txt").unwrap();
        assert_eq!(entity.name(), "final.txt");
    }

    #[test]
    fn test_serialized_entity_never_carries_handle() {
        let entity = FileEntity::from_bytes("a.txt", b"hi".to_vec(), PayloadEncoding::Base64);
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "a.txt",
                "content_type": "",
                "encoding": "base64",
                "data": "aGk="
            })
        );

        let back: FileEntity = serde_json::from_value(json).unwrap();
        assert!(!back.is_file_backed());
        assert_eq!(back.decoded_data().unwrap(), b"hi");
    }
}
