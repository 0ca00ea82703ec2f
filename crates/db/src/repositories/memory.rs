use std::collections::HashMap;

use tokio::sync::RwLock;

use rackrate_core::domain::submission::{Submission, SubmissionId};

use super::{check_version, RepositoryError, SubmissionRepository};

#[derive(Default)]
pub struct InMemorySubmissionRepository {
    submissions: RwLock<HashMap<String, Submission>>,
}

#[async_trait::async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn find_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(&id.0).cloned())
    }

    async fn insert(&self, submission: Submission) -> Result<(), RepositoryError> {
        let mut submissions = self.submissions.write().await;
        if submissions.contains_key(&submission.id.0) {
            return Err(RepositoryError::AlreadyExists(submission.id.0));
        }
        submissions.insert(submission.id.0.clone(), submission);
        Ok(())
    }

    async fn update(
        &self,
        submission: Submission,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let mut submissions = self.submissions.write().await;
        let current = submissions
            .get(&submission.id.0)
            .ok_or_else(|| RepositoryError::NotFound(submission.id.0.clone()))?;
        check_version(current, expected_version)?;
        submissions.insert(submission.id.0.clone(), submission);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Submission>, RepositoryError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.values().cloned().collect())
    }
}
