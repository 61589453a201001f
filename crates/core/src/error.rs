use crate::repositories::BatchFailure;
use dirstore_files::FilesError;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("read-only: {0}")]
    ReadOnly(String),
    #[error(
        "file {} is {len} bytes, exceeding the {max} byte in-memory limit",
        .path.display()
    )]
    IoTooLarge {
        path: std::path::PathBuf,
        len: u64,
        max: u64,
    },
    #[error("{0}")]
    AggregateFailure(Box<BatchFailure>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Coarse classification used by transport layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Conflict,
    BadRequest,
    Internal,
}

impl RepositoryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RepositoryError::NotFound(_) => ErrorClass::NotFound,
            RepositoryError::AlreadyExists(_) => ErrorClass::Conflict,
            RepositoryError::InvalidArgument(_) | RepositoryError::InvalidPath(_) => {
                ErrorClass::BadRequest
            }
            RepositoryError::ReadOnly(_)
            | RepositoryError::IoTooLarge { .. }
            | RepositoryError::AggregateFailure(_)
            | RepositoryError::Io(_) => ErrorClass::Internal,
        }
    }
}

impl From<FilesError> for RepositoryError {
    fn from(e: FilesError) -> Self {
        match e {
            FilesError::InvalidPath(msg) => RepositoryError::InvalidPath(msg),
            FilesError::NotFound(path) => RepositoryError::NotFound(path.display().to_string()),
            FilesError::FileAlreadyExists(path) => {
                RepositoryError::AlreadyExists(path.display().to_string())
            }
            FilesError::ReadOnly(path) => RepositoryError::ReadOnly(path.display().to_string()),
            FilesError::TooLarge { path, len, max } => {
                RepositoryError::IoTooLarge { path, len, max }
            }
            FilesError::Io(e) => RepositoryError::Io(e),
        }
    }
}

impl From<BatchFailure> for RepositoryError {
    fn from(failure: BatchFailure) -> Self {
        RepositoryError::AggregateFailure(Box::new(failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_files_errors_map_onto_repository_taxonomy() {
        let path = PathBuf::from("/srv/files/a.txt");

        assert!(matches!(
            RepositoryError::from(FilesError::NotFound(path.clone())),
            RepositoryError::NotFound(_)
        ));
        assert!(matches!(
            RepositoryError::from(FilesError::FileAlreadyExists(path.clone())),
            RepositoryError::AlreadyExists(_)
        ));
        assert!(matches!(
            RepositoryError::from(FilesError::ReadOnly(path.clone())),
            RepositoryError::ReadOnly(_)
        ));
        assert!(matches!(
            RepositoryError::from(FilesError::TooLarge {
                path,
                len: 10,
                max: 5
            }),
            RepositoryError::IoTooLarge { len: 10, max: 5, .. }
        ));
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(
            RepositoryError::NotFound("x".into()).class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            RepositoryError::AlreadyExists("x".into()).class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            RepositoryError::InvalidPath("x".into()).class(),
            ErrorClass::BadRequest
        );
        assert_eq!(
            RepositoryError::InvalidArgument("x".into()).class(),
            ErrorClass::BadRequest
        );
        assert_eq!(
            RepositoryError::ReadOnly("x".into()).class(),
            ErrorClass::Internal
        );
    }
}
