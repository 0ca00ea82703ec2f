use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::approval::ApprovalState;
use crate::domain::line_item::ProductTables;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored quote. Totals are not stored; they are recomputed from `products`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub version: u64,
    pub customer_name: Option<String>,
    pub submitted_by: String,
    pub submitted_on: DateTime<Utc>,
    pub last_updated_by: Option<String>,
    pub last_updated_on: Option<DateTime<Utc>>,
    pub products: ProductTables,
    pub approval: ApprovalState,
}

impl Submission {
    /// Product edits are only accepted until an approver has acted.
    pub fn accepts_product_edits(&self) -> bool {
        !self.approval.has_decisions()
    }
}
