use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::submission::{Submission, SubmissionId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("submission `{0}` already exists")]
    AlreadyExists(String),
    #[error("submission `{0}` was not found")]
    NotFound(String),
    #[error("submission `{id}` is at version {actual}, expected {expected}")]
    VersionConflict { id: String, expected: u64, actual: u64 },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Submission persistence. `update` is a compare-and-swap on `version`: the
/// stored record must still be at `expected_version`, and the caller passes
/// the record with its version already advanced.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn find_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError>;
    async fn insert(&self, submission: Submission) -> Result<(), RepositoryError>;
    async fn update(
        &self,
        submission: Submission,
        expected_version: u64,
    ) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Submission>, RepositoryError>;
}

#[async_trait]
impl<R: SubmissionRepository + ?Sized> SubmissionRepository for Arc<R> {
    async fn find_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn insert(&self, submission: Submission) -> Result<(), RepositoryError> {
        (**self).insert(submission).await
    }

    async fn update(
        &self,
        submission: Submission,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        (**self).update(submission, expected_version).await
    }

    async fn list(&self) -> Result<Vec<Submission>, RepositoryError> {
        (**self).list().await
    }
}
