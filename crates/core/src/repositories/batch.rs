//! Outcomes of range operations.
//!
//! Range operations keep going after an item fails. When anything failed they return a single
//! [`BatchFailure`] listing the entities that did succeed next to the per-item causes, so a
//! caller can tell the two apart without re-querying.

use crate::entity::FileEntity;
use crate::{RepositoryError, RepositoryResult};
use std::fmt;

/// One failed item of a range operation.
#[derive(Debug)]
pub struct ItemFailure {
    pub name: String,
    pub error: RepositoryError,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub operation: &'static str,
    pub succeeded: Vec<FileEntity>,
    pub failures: Vec<ItemFailure>,
}

impl BatchFailure {
    pub fn failed_names(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.name.as_str())
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {} of {} items",
            self.operation,
            self.failures.len(),
            self.failures.len() + self.succeeded.len()
        )?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.name, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchFailure {}

pub(crate) struct BatchCollector {
    operation: &'static str,
    succeeded: Vec<FileEntity>,
    failures: Vec<ItemFailure>,
}

impl BatchCollector {
    pub(crate) fn new(operation: &'static str, capacity: usize) -> Self {
        Self {
            operation,
            succeeded: Vec::with_capacity(capacity),
            failures: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, name: String, result: RepositoryResult<FileEntity>) {
        match result {
            Ok(entity) => self.succeeded.push(entity),
            Err(error) => self.failures.push(ItemFailure { name, error }),
        }
    }

    pub(crate) fn finish(self) -> RepositoryResult<Vec<FileEntity>> {
        if self.failures.is_empty() {
            return Ok(self.succeeded);
        }

        tracing::warn!(
            "{} failed for {} item(s): {}",
            self.operation,
            self.failures.len(),
            self.failures
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Err(BatchFailure {
            operation: self.operation,
            succeeded: self.succeeded,
            failures: self.failures,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_succeeded() {
        let mut batch = BatchCollector::new("create", 2);
        batch.record("a".into(), Ok(FileEntity::reference("a")));
        batch.record("b".into(), Ok(FileEntity::reference("b")));

        let entities = batch.finish().unwrap();
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn test_failures_are_reported_separately() {
        let mut batch = BatchCollector::new("create", 3);
        batch.record("a".into(), Ok(FileEntity::reference("a")));
        batch.record(
            "b".into(),
            Err(RepositoryError::AlreadyExists("b".into())),
        );
        batch.record("c".into(), Ok(FileEntity::reference("c")));

        let Err(RepositoryError::AggregateFailure(failure)) = batch.finish() else {
            panic!("expected aggregate failure");
        };
        assert_eq!(failure.failed_names().collect::<Vec<_>>(), ["b"]);
        assert_eq!(failure.succeeded.len(), 2);
        assert_eq!(
            failure.to_string(),
            "create failed for 1 of 3 items; b: already exists: b"
        );
    }
}
