//! Lazy directory scans.
//!
//! [`EntityScan`] lists the repository root (and, for recursive repositories, every directory
//! below it) one entry at a time, initializing each regular file to the requested load tier as
//! it is pulled. Nothing is read ahead, so a consumer that stops after the first match never
//! touches the rest of the tree. Dropping the scan closes any open directory handle.
//!
//! Entries that disappear between listing and loading are skipped. Any other error is yielded
//! once and ends the scan.

use crate::encoding::PayloadEncoding;
use crate::entity::FileEntity;
use crate::loader::{LoadTier, TieredLoader};
use crate::predicate::CompiledPredicate;
use crate::{RepositoryError, RepositoryResult};
use dirstore_files::{EntityName, FileHandle};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::fs;

/// A finite, non-restartable stream of entities found under a directory.
pub struct EntityScan {
    inner: BoxStream<'static, RepositoryResult<FileEntity>>,
}

struct ScanState {
    pending: VecDeque<PathBuf>,
    current: Option<fs::ReadDir>,
    recursive: bool,
    loader: Arc<TieredLoader>,
    tier: LoadTier,
    encoding: PayloadEncoding,
}

impl EntityScan {
    pub(crate) fn new(
        root: PathBuf,
        recursive: bool,
        loader: Arc<TieredLoader>,
        tier: LoadTier,
        encoding: PayloadEncoding,
    ) -> Self {
        let state = ScanState {
            pending: VecDeque::from([root]),
            current: None,
            recursive,
            loader,
            tier,
            encoding,
        };
        Self {
            inner: stream::try_unfold(state, next_entity).boxed(),
        }
    }

    /// Pulls entities until one matches, then stops scanning.
    pub async fn take_first_match(
        mut self,
        predicate: &CompiledPredicate,
    ) -> RepositoryResult<Option<FileEntity>> {
        while let Some(entity) = self.try_next().await? {
            if predicate.matches(&entity) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }

    /// Drains the scan, keeping every matching entity.
    pub async fn collect_matches(
        self,
        predicate: &CompiledPredicate,
    ) -> RepositoryResult<Vec<FileEntity>> {
        self.try_filter(|entity| futures::future::ready(predicate.matches(entity)))
            .try_collect()
            .await
    }

    pub async fn collect_all(self) -> RepositoryResult<Vec<FileEntity>> {
        self.try_collect().await
    }
}

impl Stream for EntityScan {
    type Item = RepositoryResult<FileEntity>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for EntityScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityScan").finish_non_exhaustive()
    }
}

async fn next_entity(
    mut state: ScanState,
) -> RepositoryResult<Option<(FileEntity, ScanState)>> {
    loop {
        let Some(dir) = state.current.as_mut() else {
            let Some(next_dir) = state.pending.pop_front() else {
                return Ok(None);
            };
            match fs::read_dir(&next_dir).await {
                Ok(read_dir) => state.current = Some(read_dir),
                Err(e) if e.kind() == ErrorKind::NotFound && state.recursive => {
                    tracing::debug!("directory vanished during scan: {}", next_dir.display());
                }
                Err(e) => return Err(e.into()),
            }
            continue;
        };

        let Some(entry) = dir.next_entry().await? else {
            state.current = None;
            continue;
        };
        let path = entry.path();

        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        if file_type.is_dir() {
            if state.recursive {
                state.pending.push_back(path);
            }
            continue;
        }

        if path.file_name().and_then(|n| n.to_str()).is_none() {
            tracing::debug!("skipping entry with non UTF-8 name: {}", path.display());
            continue;
        }

        // Follows symlinks, so a link to a regular file is listed like the file itself.
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("entry vanished before load: {}", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            continue;
        }

        let handle = FileHandle::from_metadata(path, &metadata);
        let entity = FileEntity::from_handle(handle, state.encoding);
        let name = entity.name().to_owned();
        match state.loader.initialize(entity, state.tier).await {
            Ok(entity) => return Ok(Some((entity, state))),
            Err(RepositoryError::NotFound(_)) => {
                tracing::debug!("entry vanished before load: {name}");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Looks for `name` directly in `root` and, when `recursive`, in every directory below it.
///
/// Only directories are listed; no entity is loaded along the way.
pub(crate) async fn find_by_name(
    root: &Path,
    recursive: bool,
    name: &EntityName,
) -> RepositoryResult<Option<FileHandle>> {
    let mut pending = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = pending.pop_front() {
        let handle = FileHandle::resolve(&dir, name).await?;
        if handle.exists() {
            return Ok(Some(handle));
        }
        if !recursive {
            break;
        }

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                pending.push_back(entry.path());
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use dirstore_files::InferSniffer;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn scan(root: &Path, recursive: bool, tier: LoadTier) -> EntityScan {
        let loader = Arc::new(TieredLoader::new(
            Some(root.to_path_buf()),
            u64::MAX,
            Arc::new(InferSniffer),
        ));
        EntityScan::new(
            root.to_path_buf(),
            recursive,
            loader,
            tier,
            PayloadEncoding::RawBytes,
        )
    }

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        std_fs::write(temp.path().join("a.txt"), b"a").unwrap();
        std_fs::write(temp.path().join("b.txt"), b"bb").unwrap();
        std_fs::create_dir_all(temp.path().join("nested/deeper")).unwrap();
        std_fs::write(temp.path().join("nested/c.txt"), b"ccc").unwrap();
        std_fs::write(temp.path().join("nested/deeper/d.txt"), b"dddd").unwrap();
        temp
    }

    fn sorted_names(entities: &[FileEntity]) -> Vec<&str> {
        let mut names: Vec<&str> = entities.iter().map(FileEntity::name).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_flat_scan_skips_directories() {
        let temp = tree();
        let all = scan(temp.path(), false, LoadTier::InfoOnly)
            .collect_all()
            .await
            .unwrap();

        assert_eq!(sorted_names(&all), ["a.txt", "b.txt"]);
        assert!(all.iter().all(|e| e.is_file_backed() && !e.has_data()));
    }

    #[tokio::test]
    async fn test_recursive_scan_descends() {
        let temp = tree();
        let all = scan(temp.path(), true, LoadTier::InfoOnly)
            .collect_all()
            .await
            .unwrap();

        assert_eq!(sorted_names(&all), ["a.txt", "b.txt", "c.txt", "d.txt"]);
        let d = all.iter().find(|e| e.name() == "d.txt").unwrap();
        assert_eq!(d.path(), Some(temp.path().join("nested/deeper").as_path()));
    }

    #[tokio::test]
    async fn test_scan_loads_requested_tier() {
        let temp = tree();
        let all = scan(temp.path(), false, LoadTier::WithData)
            .collect_all()
            .await
            .unwrap();

        assert!(all
            .iter()
            .all(|e| e.loaded_tier() == Some(LoadTier::WithData) && e.has_data()));
    }

    #[tokio::test]
    async fn test_take_first_match_and_collect_matches() {
        let temp = tree();
        let predicate = CompiledPredicate::compile(&Predicate::name_eq("b.txt")).unwrap();

        let hit = scan(temp.path(), false, LoadTier::InfoOnly)
            .take_first_match(&predicate)
            .await
            .unwrap();
        assert_eq!(hit.map(|e| e.size()), Some(Some(2)));

        let predicate = CompiledPredicate::compile(&Predicate::compare(
            crate::predicate::CompareOp::EndsWith,
            crate::predicate::Field::Name,
            ".txt",
        ))
        .unwrap();
        let matches = scan(temp.path(), true, LoadTier::InfoOnly)
            .collect_matches(&predicate)
            .await
            .unwrap();
        assert_eq!(matches.len(), 4);
    }

    #[tokio::test]
    async fn test_scan_of_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let result = scan(&temp.path().join("nope"), false, LoadTier::InfoOnly)
            .collect_all()
            .await;
        assert!(matches!(result, Err(RepositoryError::Io(_))));
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let temp = tree();
        let name = EntityName::new("d.txt").unwrap();

        assert!(find_by_name(temp.path(), false, &name)
            .await
            .unwrap()
            .is_none());

        let handle = find_by_name(temp.path(), true, &name)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.path(), temp.path().join("nested/deeper/d.txt"));
    }

    #[tokio::test]
    async fn test_find_by_name_ignores_directories() {
        let temp = tree();
        let name = EntityName::new("nested").unwrap();

        assert!(find_by_name(temp.path(), true, &name)
            .await
            .unwrap()
            .is_none());
    }
}
