use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use rackrate_core::domain::submission::{Submission, SubmissionId};

use super::{check_version, RepositoryError, SubmissionRepository};

/// Stores each submission as `<id>.json` under one directory. Writes go
/// through a temporary file and a rename so a reader never sees half a record.
///
/// The version check on `update` is serialised by an in-process lock only.
/// Two processes holding their own repository over the same directory can
/// both pass the check, and the later rename wins. Share one instance when
/// writers must be coordinated.
pub struct JsonFileSubmissionRepository {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSubmissionRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), write_lock: Mutex::new(()) }
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        valid.then(|| self.data_dir.join(format!("{id}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Option<Submission>, RepositoryError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(RepositoryError::Storage(format!(
                    "reading `{}`: {error}",
                    path.display()
                )))
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|error| RepositoryError::Decode(format!("`{}`: {error}", path.display())))
    }

    async fn write(&self, path: &Path, submission: &Submission) -> Result<(), RepositoryError> {
        fs::create_dir_all(&self.data_dir).await.map_err(|error| {
            RepositoryError::Storage(format!("creating `{}`: {error}", self.data_dir.display()))
        })?;

        let encoded = serde_json::to_vec_pretty(submission)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let staging = path.with_extension("json.tmp");

        fs::write(&staging, encoded).await.map_err(|error| {
            RepositoryError::Storage(format!("writing `{}`: {error}", staging.display()))
        })?;
        fs::rename(&staging, path).await.map_err(|error| {
            RepositoryError::Storage(format!("replacing `{}`: {error}", path.display()))
        })?;

        debug!(
            event_name = "persistence.submission_written",
            submission_id = %submission.id,
            version = submission.version,
            path = %path.display(),
            "submission written"
        );
        Ok(())
    }

    fn writable_path(&self, id: &SubmissionId) -> Result<PathBuf, RepositoryError> {
        self.path_for(id.as_str())
            .ok_or_else(|| RepositoryError::Storage(format!("invalid submission id `{id}`")))
    }
}

#[async_trait::async_trait]
impl SubmissionRepository for JsonFileSubmissionRepository {
    async fn find_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        match self.path_for(id.as_str()) {
            Some(path) => self.read(&path).await,
            None => Ok(None),
        }
    }

    async fn insert(&self, submission: Submission) -> Result<(), RepositoryError> {
        let path = self.writable_path(&submission.id)?;
        let _guard = self.write_lock.lock().await;

        if fs::metadata(&path).await.is_ok() {
            return Err(RepositoryError::AlreadyExists(submission.id.0));
        }
        self.write(&path, &submission).await
    }

    async fn update(
        &self,
        submission: Submission,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let path = self.writable_path(&submission.id)?;
        let _guard = self.write_lock.lock().await;

        let current = self
            .read(&path)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(submission.id.0.clone()))?;
        check_version(&current, expected_version)?;
        self.write(&path, &submission).await
    }

    async fn list(&self) -> Result<Vec<Submission>, RepositoryError> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(RepositoryError::Storage(format!(
                    "listing `{}`: {error}",
                    self.data_dir.display()
                )))
            }
        };

        let mut submissions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| RepositoryError::Storage(error.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(submission) = self.read(&path).await? {
                submissions.push(submission);
            }
        }

        Ok(submissions)
    }
}
