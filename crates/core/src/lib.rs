//! # dirstore Core
//!
//! A directory tree treated as a queryable store of file entities.
//!
//! This crate contains:
//! - The [`FileEntity`] model and its payload encodings
//! - Predicates over entities, with a name-lookup shortcut analyzer
//! - Tiered loading (metadata, then content type, then bytes)
//! - Lazy directory scans with early exit
//! - [`FileRepository`], the CRUD executor behind the [`EntityRepository`] contract
//!
//! Low-level file access lives in `dirstore_files`; this crate never opens a file directly.
//!
//! ## Example
//!
//! ```no_run
//! use dirstore_core::{EntityRepository, FileRepository, Predicate, RepositoryConfig};
//!
//! # async fn run() -> dirstore_core::RepositoryResult<()> {
//! let repo = FileRepository::new(RepositoryConfig::new("/srv/files"))?;
//! if let Some(entity) = repo.get_with(&Predicate::name_eq("photo.png"), true).await? {
//!     println!("{} is {} bytes", entity.name(), entity.size().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod encoding;
pub mod entity;
pub mod error;
pub mod loader;
pub mod predicate;
pub mod repositories;
pub mod scan;

pub use config::RepositoryConfig;
pub use encoding::{Payload, PayloadEncoding};
pub use entity::FileEntity;
pub use error::{ErrorClass, RepositoryError, RepositoryResult};
pub use loader::{LoadTier, TieredLoader};
pub use predicate::{CompiledPredicate, NameShortcut, Predicate};
pub use repositories::{BatchFailure, EntityRepository, FileRepository, ItemFailure};
pub use scan::EntityScan;
