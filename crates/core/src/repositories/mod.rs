//! Repository contract and implementations.
//!
//! [`EntityRepository`] is the query/CRUD seam shared by every store of entities. The
//! filesystem implementation lives in [`files`].

pub mod batch;
pub mod files;

pub use batch::{BatchFailure, ItemFailure};
pub use files::FileRepository;

use crate::predicate::Predicate;
use crate::RepositoryResult;
use async_trait::async_trait;

#[async_trait]
pub trait EntityRepository<E>: Send + Sync
where
    E: Send + 'static,
{
    /// Whether any entity satisfies `predicate`.
    async fn any(&self, predicate: &Predicate) -> RepositoryResult<bool>;

    /// First entity satisfying `predicate`, loaded to the default tier.
    async fn get(&self, predicate: &Predicate) -> RepositoryResult<Option<E>> {
        self.get_with(predicate, false).await
    }

    /// First entity satisfying `predicate`; `with_nested_data` also loads its payload.
    async fn get_with(
        &self,
        predicate: &Predicate,
        with_nested_data: bool,
    ) -> RepositoryResult<Option<E>>;

    async fn get_all(&self) -> RepositoryResult<Vec<E>>;

    async fn get_many(&self, predicate: &Predicate) -> RepositoryResult<Vec<E>> {
        self.get_many_with(predicate, false).await
    }

    async fn get_many_with(
        &self,
        predicate: &Predicate,
        with_nested_data: bool,
    ) -> RepositoryResult<Vec<E>>;

    async fn create(&self, entity: E) -> RepositoryResult<E>;

    async fn create_range(&self, entities: Vec<E>) -> RepositoryResult<Vec<E>>;

    async fn update(&self, entity: E) -> RepositoryResult<E>;

    async fn update_range(&self, entities: Vec<E>) -> RepositoryResult<Vec<E>>;

    /// Removes the entity, reporting failure as `false`.
    async fn delete(&self, entity: E) -> bool;

    async fn delete_range(&self, entities: Vec<E>) -> RepositoryResult<Vec<E>>;
}
