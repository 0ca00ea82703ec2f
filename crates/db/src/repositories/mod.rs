pub mod file;
pub mod memory;

pub use file::JsonFileSubmissionRepository;
pub use memory::InMemorySubmissionRepository;
pub use rackrate_core::submission::store::{RepositoryError, SubmissionRepository};

use rackrate_core::domain::submission::Submission;

pub(crate) fn check_version(
    current: &Submission,
    expected_version: u64,
) -> Result<(), RepositoryError> {
    if current.version == expected_version {
        Ok(())
    } else {
        Err(RepositoryError::VersionConflict {
            id: current.id.to_string(),
            expected: expected_version,
            actual: current.version,
        })
    }
}
