pub mod repositories;

pub use repositories::{InMemorySubmissionRepository, JsonFileSubmissionRepository};
