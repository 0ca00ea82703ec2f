use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::approvals::{ApprovalFollowUp, ApprovalTransition};
use crate::domain::approval::ApproverStage;
use crate::domain::submission::Submission;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NoticeRecipient {
    Initiator(String),
    Approver(ApproverStage),
}

/// Message produced by an approval transition, addressed to the quote's
/// initiator or to the approver whose turn it now is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalNotice {
    pub submission_id: String,
    pub recipient: NoticeRecipient,
    pub subject: String,
    pub body: String,
}

impl ApprovalNotice {
    pub fn from_follow_up(submission: &Submission, follow_up: &ApprovalFollowUp) -> Self {
        let customer = submission.customer_name.as_deref().unwrap_or("unnamed customer");
        let id = submission.id.as_str();
        let initiator = NoticeRecipient::Initiator(submission.submitted_by.clone());

        let (recipient, subject, body) = match follow_up {
            ApprovalFollowUp::NotifyInitiatorAdvanced => (
                initiator,
                format!("Quote {id} approved by approver 1"),
                format!(
                    "Your discount request for {customer} was approved by approver 1 and is now \
                     waiting on approver 2."
                ),
            ),
            ApprovalFollowUp::NotifyApprover2ActionRequired => (
                NoticeRecipient::Approver(ApproverStage::Approver2),
                format!("Quote {id} needs your approval"),
                format!(
                    "A discount request for {customer} submitted by {} passed approver 1 and \
                     needs your decision.",
                    submission.submitted_by
                ),
            ),
            ApprovalFollowUp::NotifyInitiatorRejected { stage } => (
                initiator,
                format!("Quote {id} rejected"),
                format!("Your discount request for {customer} was rejected by {stage}."),
            ),
            ApprovalFollowUp::NotifyInitiatorApproved => (
                initiator,
                format!("Quote {id} approved"),
                format!("Your discount request for {customer} received final approval."),
            ),
        };

        Self { submission_id: id.to_owned(), recipient, subject, body }
    }

    pub fn for_transition(submission: &Submission, transition: &ApprovalTransition) -> Vec<Self> {
        transition
            .follow_ups
            .iter()
            .map(|follow_up| Self::from_follow_up(submission, follow_up))
            .collect()
    }
}

pub trait Notifier: Send + Sync {
    fn deliver(&self, notice: ApprovalNotice);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn deliver(&self, notice: ApprovalNotice) {
        (**self).deliver(notice);
    }
}

/// Discards every notice.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn deliver(&self, _notice: ApprovalNotice) {}
}

#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    notices: Arc<Mutex<Vec<ApprovalNotice>>>,
}

impl InMemoryNotifier {
    pub fn notices(&self) -> Vec<ApprovalNotice> {
        match self.notices.lock() {
            Ok(notices) => notices.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for InMemoryNotifier {
    fn deliver(&self, notice: ApprovalNotice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}
