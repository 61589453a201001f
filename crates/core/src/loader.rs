//! Tiered loading of file entities.
//!
//! Loading is split into three cumulative tiers so scans only pay for what a query needs:
//!
//! 1. [`LoadTier::InfoOnly`] resolves the entity's directory and name into a [`FileHandle`].
//! 2. [`LoadTier::WithContentType`] sniffs the MIME type from the file's byte signature.
//! 3. [`LoadTier::WithData`] reads the whole file and encodes it per the entity's encoding.
//!
//! Each tier runs the ones below it first and skips work already done, so initializing an
//! entity twice at the same tier is a no-op.

use crate::entity::FileEntity;
use crate::{RepositoryError, RepositoryResult};
use dirstore_files::{ContentSniffer, EntityName, FileHandle, SNIFF_PREFIX_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadTier {
    InfoOnly = 1,
    #[serde(alias = "with_mime")]
    WithContentType = 2,
    WithData = 3,
}

impl LoadTier {
    /// Alias kept for callers that speak of MIME types.
    pub const WITH_MIME: LoadTier = LoadTier::WithContentType;

    pub fn as_str(self) -> &'static str {
        match self {
            LoadTier::InfoOnly => "info_only",
            LoadTier::WithContentType => "with_content_type",
            LoadTier::WithData => "with_data",
        }
    }
}

impl fmt::Display for LoadTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadTier {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "1" | "info" | "info_only" => Ok(LoadTier::InfoOnly),
            "2" | "mime" | "with_mime" | "content_type" | "with_content_type" => {
                Ok(LoadTier::WithContentType)
            }
            "3" | "data" | "with_data" => Ok(LoadTier::WithData),
            other => Err(RepositoryError::InvalidArgument(format!(
                "unknown load tier: {other}"
            ))),
        }
    }
}

/// Brings entities up to a requested [`LoadTier`].
#[derive(Debug, Clone)]
pub struct TieredLoader {
    fallback_root: Option<PathBuf>,
    max_payload_bytes: u64,
    sniffer: Arc<dyn ContentSniffer>,
}

impl TieredLoader {
    pub fn new(
        fallback_root: Option<PathBuf>,
        max_payload_bytes: u64,
        sniffer: Arc<dyn ContentSniffer>,
    ) -> Self {
        Self {
            fallback_root,
            max_payload_bytes,
            sniffer,
        }
    }

    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    /// Initializes `entity` up to `tier`.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::InvalidPath` if there is no directory to resolve against or the name
    ///   cannot address a file
    /// - `RepositoryError::NotFound` at tier 2 and above if no regular file exists
    /// - `RepositoryError::IoTooLarge` at tier 3 if the file exceeds the payload limit
    pub async fn initialize(
        &self,
        mut entity: FileEntity,
        tier: LoadTier,
    ) -> RepositoryResult<FileEntity> {
        self.resolve_handle(&mut entity).await?;
        if tier >= LoadTier::WithContentType {
            self.load_content_type(&mut entity).await?;
        }
        if tier >= LoadTier::WithData {
            self.load_data(&mut entity).await?;
        }
        Ok(entity)
    }

    async fn resolve_handle(&self, entity: &mut FileEntity) -> RepositoryResult<()> {
        if entity.is_file_backed() {
            return Ok(());
        }

        let directory = entity
            .path()
            .map(|p| p.to_path_buf())
            .or_else(|| self.fallback_root.clone())
            .ok_or_else(|| {
                RepositoryError::InvalidPath(format!(
                    "no directory to resolve {} against",
                    entity.name()
                ))
            })?;
        let name = EntityName::new(entity.name())
            .map_err(|e| RepositoryError::InvalidPath(e.to_string()))?;
        // Validation trims; resolving the trimmed form would address a different file.
        if name.as_str() != entity.name() {
            return Err(RepositoryError::InvalidPath(format!(
                "{:?} has leading or trailing whitespace",
                entity.name()
            )));
        }

        let handle = FileHandle::resolve(&directory, &name).await?;
        entity.attach_handle(handle);
        Ok(())
    }

    async fn load_content_type(&self, entity: &mut FileEntity) -> RepositoryResult<()> {
        if reached(entity, LoadTier::WithContentType) {
            return Ok(());
        }
        let handle = existing_handle(entity)?;
        let content_type = handle.sniff_content_type(self.sniffer.as_ref()).await?;
        entity.set_content_type(content_type);
        Ok(())
    }

    async fn load_data(&self, entity: &mut FileEntity) -> RepositoryResult<()> {
        if reached(entity, LoadTier::WithData) {
            return Ok(());
        }
        let handle = existing_handle(entity)?;
        let bytes = handle.read_all(self.max_payload_bytes).await?;

        if !reached(entity, LoadTier::WithContentType) {
            let prefix = &bytes[..bytes.len().min(SNIFF_PREFIX_LEN)];
            entity.set_content_type(self.sniffer.sniff(prefix));
        }
        let payload = entity.encoding().encode(bytes);
        entity.set_loaded_data(payload);
        Ok(())
    }
}

fn reached(entity: &FileEntity, tier: LoadTier) -> bool {
    entity.loaded_tier().is_some_and(|t| t >= tier)
}

fn existing_handle(entity: &FileEntity) -> RepositoryResult<&FileHandle> {
    match entity.handle() {
        Some(handle) if handle.exists() => Ok(handle),
        Some(handle) => Err(RepositoryError::NotFound(
            handle.path().display().to_string(),
        )),
        None => Err(RepositoryError::NotFound(entity.name().to_owned())),
    }
}
