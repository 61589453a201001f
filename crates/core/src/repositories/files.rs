//! Filesystem-backed repository.
//!
//! Every regular file under the configured root is one [`FileEntity`]. Queries are answered by
//! a direct name lookup when the predicate allows it and by a lazy [`EntityScan`] otherwise.
//! Writes go straight to the filesystem; there is no cache and no locking, so concurrent
//! creators of the same name are arbitrated by create-new opens.

use super::batch::BatchCollector;
use super::EntityRepository;
use crate::config::RepositoryConfig;
use crate::entity::FileEntity;
use crate::loader::{LoadTier, TieredLoader};
use crate::predicate::{CompiledPredicate, NameShortcut, Predicate};
use crate::scan::{find_by_name, EntityScan};
use crate::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use dirstore_files::{ContentSniffer, EntityName, FileHandle, InferSniffer};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, Clone)]
pub struct FileRepository {
    cfg: Arc<RepositoryConfig>,
    loader: Arc<TieredLoader>,
}

impl FileRepository {
    /// Opens a repository over `config.root()` using signature-based content sniffing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the root does not exist, is not a
    /// directory or cannot be canonicalized.
    pub fn new(config: RepositoryConfig) -> RepositoryResult<Self> {
        Self::with_sniffer(config, Arc::new(InferSniffer))
    }

    /// Opens a repository with a custom content sniffer.
    pub fn with_sniffer(
        mut config: RepositoryConfig,
        sniffer: Arc<dyn ContentSniffer>,
    ) -> RepositoryResult<Self> {
        let root = config.root();
        if !root.exists() {
            return Err(RepositoryError::InvalidArgument(format!(
                "Directory does not exist: {}",
                root.display()
            )));
        }

        if !root.is_dir() {
            return Err(RepositoryError::InvalidArgument(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            RepositoryError::InvalidArgument(format!(
                "Cannot canonicalize path {}: {}",
                root.display(),
                e
            ))
        })?;
        config.set_root(root.clone());

        let loader = TieredLoader::new(Some(root), config.max_payload_bytes(), sniffer);
        tracing::info!(
            "file repository ready at {} (recursive: {}, default tier: {})",
            config.root().display(),
            config.recursive(),
            config.default_tier()
        );

        Ok(Self {
            cfg: Arc::new(config),
            loader: Arc::new(loader),
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.cfg
    }

    /// Canonical repository root.
    pub fn root(&self) -> &Path {
        self.cfg.root()
    }

    /// Starts a lazy scan of the repository, loading each entity to `tier`.
    pub fn scan(&self, tier: LoadTier) -> EntityScan {
        EntityScan::new(
            self.cfg.root().to_path_buf(),
            self.cfg.recursive(),
            self.loader.clone(),
            tier,
            self.cfg.default_encoding(),
        )
    }

    /// Removes the file behind `entity`, returning the entity on success.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if no such file exists
    /// - `RepositoryError::ReadOnly` if the file is marked read-only
    /// - `RepositoryError::InvalidPath` if the entity cannot address a file in this repository
    pub async fn try_delete(&self, entity: FileEntity) -> RepositoryResult<FileEntity> {
        let mut entity = self.resolve_for_write(entity).await?;
        writable_handle(&mut entity)?.delete().await?;
        tracing::debug!("deleted {}", entity.name());
        Ok(entity)
    }

    fn tier_for(&self, with_nested_data: bool) -> LoadTier {
        if with_nested_data {
            LoadTier::WithData
        } else {
            self.cfg.default_tier()
        }
    }

    /// Answers a `name == literal` query without scanning.
    async fn lookup_by_name(
        &self,
        name: &EntityName,
        tier: LoadTier,
    ) -> RepositoryResult<Option<FileEntity>> {
        let Some(handle) = find_by_name(self.cfg.root(), self.cfg.recursive(), name).await?
        else {
            return Ok(None);
        };

        let entity = FileEntity::from_handle(handle, self.cfg.default_encoding());
        match self.loader.initialize(entity, tier).await {
            Ok(entity) => Ok(Some(entity)),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_first(
        &self,
        predicate: &Predicate,
        tier: LoadTier,
    ) -> RepositoryResult<Option<FileEntity>> {
        if let Some(name) = addressable_name(predicate)? {
            tracing::debug!("answering name == {:?} by direct lookup", name.as_str());
            return self.lookup_by_name(&name, tier).await;
        }

        let compiled = CompiledPredicate::compile(predicate)?;
        self.scan(tier).take_first_match(&compiled).await
    }

    /// Makes sure `entity` carries a fresh handle in a directory this repository scans.
    async fn resolve_for_write(&self, entity: FileEntity) -> RepositoryResult<FileEntity> {
        let explicit_dir = if entity.is_file_backed() {
            None
        } else {
            entity.path().map(Path::to_path_buf)
        };
        let mut entity = match explicit_dir {
            Some(dir) => {
                let dir = self.contained_dir(&dir).await?;
                entity.with_path(dir)
            }
            None => entity,
        };

        if let Some(handle) = entity.handle_mut() {
            let inside = handle.directory().is_some_and(|dir| self.in_scope(dir));
            if !inside {
                return Err(RepositoryError::InvalidPath(format!(
                    "{} is outside the directories this repository scans",
                    handle.path().display()
                )));
            }
            handle.refresh().await?;
            return Ok(entity);
        }

        self.loader.initialize(entity, LoadTier::InfoOnly).await
    }

    async fn contained_dir(&self, dir: &Path) -> RepositoryResult<std::path::PathBuf> {
        let canonical = fs::canonicalize(dir).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                RepositoryError::InvalidPath(format!("directory does not exist: {}", dir.display()))
            }
            _ => RepositoryError::Io(e),
        })?;

        if !self.in_scope(&canonical) {
            return Err(RepositoryError::InvalidPath(format!(
                "{} is outside the directories this repository scans",
                dir.display()
            )));
        }
        Ok(canonical)
    }

    /// Whether files in `dir` are visible to queries: the root itself, or any directory below
    /// it when the repository is recursive.
    fn in_scope(&self, dir: &Path) -> bool {
        if self.cfg.recursive() {
            dir.starts_with(self.cfg.root())
        } else {
            dir == self.cfg.root()
        }
    }
}

/// The name a `name == literal` predicate can be answered with directly.
///
/// Literals that do not survive name validation unchanged (padded with whitespace, for
/// example) still go through a scan, since files with such names can exist on disk.
fn addressable_name(predicate: &Predicate) -> RepositoryResult<Option<EntityName>> {
    let shortcut = NameShortcut::analyze(predicate)?;
    Ok(shortcut.literal().and_then(|literal| {
        EntityName::new(literal)
            .ok()
            .filter(|name| name.as_str() == literal)
    }))
}

fn writable_handle(entity: &mut FileEntity) -> RepositoryResult<&mut FileHandle> {
    let name = entity.name().to_owned();
    entity
        .handle_mut()
        .ok_or_else(|| RepositoryError::InvalidPath(format!("{name} is not resolved to a file")))
}

#[async_trait]
impl EntityRepository<FileEntity> for FileRepository {
    async fn any(&self, predicate: &Predicate) -> RepositoryResult<bool> {
        if let Some(name) = addressable_name(predicate)? {
            tracing::debug!("checking existence of {:?} by direct lookup", name.as_str());
            return Ok(find_by_name(self.cfg.root(), self.cfg.recursive(), &name)
                .await?
                .is_some());
        }

        let compiled = CompiledPredicate::compile(predicate)?;
        Ok(self
            .scan(self.cfg.default_tier())
            .take_first_match(&compiled)
            .await?
            .is_some())
    }

    async fn get_with(
        &self,
        predicate: &Predicate,
        with_nested_data: bool,
    ) -> RepositoryResult<Option<FileEntity>> {
        let Some(hit) = self.find_first(predicate, self.cfg.default_tier()).await? else {
            return Ok(None);
        };
        let tier = self.tier_for(with_nested_data);
        Ok(Some(self.loader.initialize(hit, tier).await?))
    }

    async fn get_all(&self) -> RepositoryResult<Vec<FileEntity>> {
        self.scan(self.cfg.default_tier()).collect_all().await
    }

    async fn get_many_with(
        &self,
        predicate: &Predicate,
        with_nested_data: bool,
    ) -> RepositoryResult<Vec<FileEntity>> {
        let compiled = CompiledPredicate::compile(predicate)?;
        let matches = self
            .scan(self.cfg.default_tier())
            .collect_matches(&compiled)
            .await?;

        let tier = self.tier_for(with_nested_data);
        if tier <= self.cfg.default_tier() {
            return Ok(matches);
        }

        let mut loaded = Vec::with_capacity(matches.len());
        for entity in matches {
            loaded.push(self.loader.initialize(entity, tier).await?);
        }
        Ok(loaded)
    }

    async fn create(&self, entity: FileEntity) -> RepositoryResult<FileEntity> {
        let bytes = entity.decoded_data()?;
        let mut entity = self.resolve_for_write(entity).await?;

        let handle = writable_handle(&mut entity)?;
        if handle.exists() {
            return Err(RepositoryError::AlreadyExists(
                handle.path().display().to_string(),
            ));
        }
        handle.create_new(&bytes).await?;

        tracing::debug!("created {} ({} bytes)", entity.name(), bytes.len());
        Ok(entity)
    }

    async fn create_range(&self, entities: Vec<FileEntity>) -> RepositoryResult<Vec<FileEntity>> {
        let mut batch = BatchCollector::new("create", entities.len());
        for entity in entities {
            let name = entity.name().to_owned();
            batch.record(name, self.create(entity).await);
        }
        batch.finish()
    }

    async fn update(&self, entity: FileEntity) -> RepositoryResult<FileEntity> {
        let bytes = entity.decoded_data()?;
        let mut entity = self.resolve_for_write(entity).await?;
        let skip_same_length = self.cfg.skip_rewrite_if_same_length();

        let handle = writable_handle(&mut entity)?;
        if !handle.exists() {
            return Err(RepositoryError::NotFound(
                handle.path().display().to_string(),
            ));
        }

        if handle.len() != bytes.len() as u64 {
            handle.replace(&bytes).await?;
        } else if skip_same_length {
            tracing::debug!(
                "{} already holds {} bytes; leaving it untouched",
                handle.path().display(),
                bytes.len()
            );
        } else {
            handle.overwrite(&bytes).await?;
        }

        Ok(entity)
    }

    async fn update_range(&self, entities: Vec<FileEntity>) -> RepositoryResult<Vec<FileEntity>> {
        let mut batch = BatchCollector::new("update", entities.len());
        for entity in entities {
            let name = entity.name().to_owned();
            batch.record(name, self.update(entity).await);
        }
        batch.finish()
    }

    async fn delete(&self, entity: FileEntity) -> bool {
        let name = entity.name().to_owned();
        match self.try_delete(entity).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("failed to delete {name}: {e}");
                false
            }
        }
    }

    async fn delete_range(&self, entities: Vec<FileEntity>) -> RepositoryResult<Vec<FileEntity>> {
        let mut batch = BatchCollector::new("delete", entities.len());
        for entity in entities {
            let name = entity.name().to_owned();
            batch.record(name, self.try_delete(entity).await);
        }
        batch.finish()
    }
}
