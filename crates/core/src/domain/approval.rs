use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproverStage {
    Approver1,
    Approver2,
}

impl fmt::Display for ApproverStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approver1 => f.write_str("approver1"),
            Self::Approver2 => f.write_str("approver2"),
        }
    }
}

impl FromStr for ApproverStage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approver1" => Ok(Self::Approver1),
            "approver2" => Ok(Self::Approver2),
            other => Err(format!("unknown approver `{other}` (expected approver1|approver2)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => f.write_str("APPROVE"),
            Self::Reject => f.write_str("REJECT"),
        }
    }
}

impl FromStr for ApprovalDecision {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            other => Err(format!("invalid action `{other}` (expected APPROVE|REJECT)")),
        }
    }
}

/// Status of a single approver stage.
///
/// `Waiting` marks a required second stage that is not actionable until the
/// first stage approves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotRequired,
    Waiting,
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotRequired => "not_required",
            Self::Waiting => "waiting",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    Pending,
    PendingApprover2,
    ApprovedFinal,
    Rejected,
}

impl FinalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ApprovedFinal | Self::Rejected)
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::PendingApprover2 => "PENDING_APPROVER2",
            Self::ApprovedFinal => "APPROVED_FINAL",
            Self::Rejected => "REJECTED",
        };
        f.write_str(label)
    }
}

impl FromStr for FinalStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PENDING_APPROVER2" => Ok(Self::PendingApprover2),
            "APPROVED_FINAL" => Ok(Self::ApprovedFinal),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!(
                "unknown status `{other}` (expected PENDING|PENDING_APPROVER2|APPROVED_FINAL|REJECTED)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub approver_name: String,
    pub decision: ApprovalDecision,
    pub decision_date: NaiveDate,
    pub comments: String,
    pub actioned_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalState {
    pub approver1_required: bool,
    pub approver2_required: bool,
    pub approver1_status: StageStatus,
    pub approver2_status: StageStatus,
    pub final_status: FinalStatus,
    #[serde(default)]
    pub approver1_decision: Option<DecisionRecord>,
    #[serde(default)]
    pub approver2_decision: Option<DecisionRecord>,
}

/// Presentation hint: how many approver columns a review screen shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverLayout {
    NoApprover,
    SingleApprover,
    DualApprover,
}

impl ApprovalState {
    /// Initial state for a freshly routed quote. A quote that needs no
    /// approver is final as soon as it is routed.
    pub fn routed(approver1_required: bool, approver2_required: bool) -> Self {
        let approver1_required = approver1_required || approver2_required;
        if !approver1_required {
            return Self {
                approver1_required: false,
                approver2_required: false,
                approver1_status: StageStatus::NotRequired,
                approver2_status: StageStatus::NotRequired,
                final_status: FinalStatus::ApprovedFinal,
                approver1_decision: None,
                approver2_decision: None,
            };
        }

        Self {
            approver1_required,
            approver2_required,
            approver1_status: StageStatus::Pending,
            approver2_status: if approver2_required {
                StageStatus::Waiting
            } else {
                StageStatus::NotRequired
            },
            final_status: FinalStatus::Pending,
            approver1_decision: None,
            approver2_decision: None,
        }
    }

    pub fn layout(&self) -> ApproverLayout {
        match (self.approver1_required, self.approver2_required) {
            (_, true) => ApproverLayout::DualApprover,
            (true, false) => ApproverLayout::SingleApprover,
            (false, false) => ApproverLayout::NoApprover,
        }
    }

    pub fn stage_status(&self, stage: ApproverStage) -> StageStatus {
        match stage {
            ApproverStage::Approver1 => self.approver1_status,
            ApproverStage::Approver2 => self.approver2_status,
        }
    }

    pub fn decision(&self, stage: ApproverStage) -> Option<&DecisionRecord> {
        match stage {
            ApproverStage::Approver1 => self.approver1_decision.as_ref(),
            ApproverStage::Approver2 => self.approver2_decision.as_ref(),
        }
    }

    pub fn has_decisions(&self) -> bool {
        self.approver1_decision.is_some() || self.approver2_decision.is_some()
    }
}
