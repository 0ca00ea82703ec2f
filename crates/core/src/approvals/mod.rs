use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::approval::{
    ApprovalDecision, ApprovalState, ApproverStage, DecisionRecord, FinalStatus, StageStatus,
};

/// One approver's decision, guarded by the status the caller last observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    pub stage: ApproverStage,
    pub decision: ApprovalDecision,
    pub expected_status: FinalStatus,
    pub approver_name: String,
    pub decision_date: Option<NaiveDate>,
    pub comments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalFollowUp {
    NotifyInitiatorAdvanced,
    NotifyApprover2ActionRequired,
    NotifyInitiatorRejected { stage: ApproverStage },
    NotifyInitiatorApproved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTransition {
    pub stage: ApproverStage,
    pub decision: ApprovalDecision,
    pub from: FinalStatus,
    pub to: FinalStatus,
    pub follow_ups: Vec<ApprovalFollowUp>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalTransitionError {
    #[error("invalid transition: expected submission status {expected}, found {actual}")]
    StaleStatus { expected: FinalStatus, actual: FinalStatus },
    #[error("invalid transition: {stage} is {status} while submission is {final_status}")]
    StageNotActionable { stage: ApproverStage, status: StageStatus, final_status: FinalStatus },
    #[error("invalid transition: approver name is required for {stage}")]
    MissingApproverName { stage: ApproverStage },
}

impl ApprovalState {
    pub fn is_actionable(&self, stage: ApproverStage) -> bool {
        match stage {
            ApproverStage::Approver1 => {
                self.final_status == FinalStatus::Pending
                    && self.approver1_status == StageStatus::Pending
            }
            ApproverStage::Approver2 => {
                self.final_status == FinalStatus::PendingApprover2
                    && self.approver2_status == StageStatus::Pending
            }
        }
    }

    /// Applies an approver decision. The state is left untouched on error.
    pub fn apply(
        &mut self,
        action: &ApprovalAction,
        now: DateTime<Utc>,
    ) -> Result<ApprovalTransition, ApprovalTransitionError> {
        if action.expected_status != self.final_status {
            return Err(ApprovalTransitionError::StaleStatus {
                expected: action.expected_status,
                actual: self.final_status,
            });
        }

        if !self.is_actionable(action.stage) {
            return Err(ApprovalTransitionError::StageNotActionable {
                stage: action.stage,
                status: self.stage_status(action.stage),
                final_status: self.final_status,
            });
        }

        let approver_name = action.approver_name.trim();
        if approver_name.is_empty() {
            return Err(ApprovalTransitionError::MissingApproverName { stage: action.stage });
        }

        let record = DecisionRecord {
            approver_name: approver_name.to_owned(),
            decision: action.decision,
            decision_date: action.decision_date.unwrap_or_else(|| now.date_naive()),
            comments: action.comments.clone(),
            actioned_at: now,
        };

        let from = self.final_status;
        let (stage_status, to, follow_ups) = match (action.stage, action.decision) {
            (stage, ApprovalDecision::Reject) => (
                StageStatus::Rejected,
                FinalStatus::Rejected,
                vec![ApprovalFollowUp::NotifyInitiatorRejected { stage }],
            ),
            (ApproverStage::Approver1, ApprovalDecision::Approve) if self.approver2_required => (
                StageStatus::Approved,
                FinalStatus::PendingApprover2,
                vec![
                    ApprovalFollowUp::NotifyInitiatorAdvanced,
                    ApprovalFollowUp::NotifyApprover2ActionRequired,
                ],
            ),
            (_, ApprovalDecision::Approve) => (
                StageStatus::Approved,
                FinalStatus::ApprovedFinal,
                vec![ApprovalFollowUp::NotifyInitiatorApproved],
            ),
        };

        match action.stage {
            ApproverStage::Approver1 => {
                self.approver1_status = stage_status;
                self.approver1_decision = Some(record);
                if to == FinalStatus::PendingApprover2 {
                    self.approver2_status = StageStatus::Pending;
                }
            }
            ApproverStage::Approver2 => {
                self.approver2_status = stage_status;
                self.approver2_decision = Some(record);
            }
        }
        self.final_status = to;

        Ok(ApprovalTransition {
            stage: action.stage,
            decision: action.decision,
            from,
            to,
            follow_ups,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{ApprovalAction, ApprovalFollowUp, ApprovalTransitionError};
    use crate::domain::approval::{
        ApprovalDecision, ApprovalState, ApproverStage, FinalStatus, StageStatus,
    };

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("valid timestamp")
    }

    fn action(
        stage: ApproverStage,
        decision: ApprovalDecision,
        expected_status: FinalStatus,
    ) -> ApprovalAction {
        ApprovalAction {
            stage,
            decision,
            expected_status,
            approver_name: "Dana Reyes".to_owned(),
            decision_date: None,
            comments: "reviewed".to_owned(),
        }
    }

    #[test]
    fn approver1_reject_is_terminal_for_both_routings() {
        for approver2_required in [false, true] {
            let mut state = ApprovalState::routed(true, approver2_required);
            let transition = state
                .apply(
                    &action(ApproverStage::Approver1, ApprovalDecision::Reject, FinalStatus::Pending),
                    now(),
                )
                .expect("reject should apply");

            assert_eq!(transition.to, FinalStatus::Rejected);
            assert_eq!(state.final_status, FinalStatus::Rejected);
            assert_eq!(state.approver1_status, StageStatus::Rejected);
            assert!(!state.is_actionable(ApproverStage::Approver2));
            assert_eq!(
                transition.follow_ups,
                vec![ApprovalFollowUp::NotifyInitiatorRejected { stage: ApproverStage::Approver1 }]
            );
        }
    }

    #[test]
    fn approver1_approve_without_second_stage_is_final() {
        let mut state = ApprovalState::routed(true, false);
        let transition = state
            .apply(
                &action(ApproverStage::Approver1, ApprovalDecision::Approve, FinalStatus::Pending),
                now(),
            )
            .expect("approve should apply");

        assert_eq!(transition.to, FinalStatus::ApprovedFinal);
        assert_eq!(state.approver2_status, StageStatus::NotRequired);
        assert!(!state.is_actionable(ApproverStage::Approver2));
    }

    #[test]
    fn approver1_approve_hands_over_to_approver2() {
        let mut state = ApprovalState::routed(true, true);
        assert!(!state.is_actionable(ApproverStage::Approver2));

        let transition = state
            .apply(
                &action(ApproverStage::Approver1, ApprovalDecision::Approve, FinalStatus::Pending),
                now(),
            )
            .expect("approve should apply");

        assert_eq!(transition.to, FinalStatus::PendingApprover2);
        assert_eq!(state.approver2_status, StageStatus::Pending);
        assert!(state.is_actionable(ApproverStage::Approver2));
        assert!(transition.follow_ups.contains(&ApprovalFollowUp::NotifyApprover2ActionRequired));

        let transition = state
            .apply(
                &action(
                    ApproverStage::Approver2,
                    ApprovalDecision::Approve,
                    FinalStatus::PendingApprover2,
                ),
                now(),
            )
            .expect("second approval should apply");
        assert_eq!(transition.to, FinalStatus::ApprovedFinal);
        assert_eq!(state.approver2_status, StageStatus::Approved);
    }

    #[test]
    fn approver2_reject_is_terminal() {
        let mut state = ApprovalState::routed(true, true);
        state
            .apply(
                &action(ApproverStage::Approver1, ApprovalDecision::Approve, FinalStatus::Pending),
                now(),
            )
            .expect("first approval");

        state
            .apply(
                &action(
                    ApproverStage::Approver2,
                    ApprovalDecision::Reject,
                    FinalStatus::PendingApprover2,
                ),
                now(),
            )
            .expect("second stage reject");

        assert_eq!(state.final_status, FinalStatus::Rejected);
        assert_eq!(state.approver1_status, StageStatus::Approved);
        assert_eq!(state.approver2_status, StageStatus::Rejected);
    }

    #[test]
    fn approver2_cannot_act_before_approver1() {
        let mut state = ApprovalState::routed(true, true);
        let before = state.clone();

        let error = state
            .apply(
                &action(ApproverStage::Approver2, ApprovalDecision::Approve, FinalStatus::Pending),
                now(),
            )
            .expect_err("approver2 is still waiting");

        assert_eq!(
            error,
            ApprovalTransitionError::StageNotActionable {
                stage: ApproverStage::Approver2,
                status: StageStatus::Waiting,
                final_status: FinalStatus::Pending,
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn double_submission_is_rejected_without_overwriting() {
        let mut state = ApprovalState::routed(true, false);
        let approve =
            action(ApproverStage::Approver1, ApprovalDecision::Approve, FinalStatus::Pending);
        state.apply(&approve, now()).expect("first approval");
        let after_first = state.clone();

        let error = state.apply(&approve, now()).expect_err("repeat must fail");

        assert!(matches!(error, ApprovalTransitionError::StaleStatus { .. }));
        assert_eq!(state, after_first);
    }

    #[test]
    fn repeat_with_current_status_still_fails_on_closed_stage() {
        let mut state = ApprovalState::routed(true, true);
        state
            .apply(
                &action(ApproverStage::Approver1, ApprovalDecision::Approve, FinalStatus::Pending),
                now(),
            )
            .expect("first approval");

        let error = state
            .apply(
                &action(
                    ApproverStage::Approver1,
                    ApprovalDecision::Reject,
                    FinalStatus::PendingApprover2,
                ),
                now(),
            )
            .expect_err("approver1 already decided");

        assert!(matches!(error, ApprovalTransitionError::StageNotActionable { .. }));
    }

    #[test]
    fn quotes_without_approvers_accept_no_actions() {
        let mut state = ApprovalState::routed(false, false);
        let error = state
            .apply(
                &action(
                    ApproverStage::Approver1,
                    ApprovalDecision::Approve,
                    FinalStatus::ApprovedFinal,
                ),
                now(),
            )
            .expect_err("nothing to approve");

        assert!(matches!(
            error,
            ApprovalTransitionError::StageNotActionable { status: StageStatus::NotRequired, .. }
        ));
    }

    #[test]
    fn decision_record_defaults_date_and_keeps_details() {
        let mut state = ApprovalState::routed(true, false);
        state
            .apply(
                &action(ApproverStage::Approver1, ApprovalDecision::Approve, FinalStatus::Pending),
                now(),
            )
            .expect("approve");

        let record = state.decision(ApproverStage::Approver1).expect("decision recorded");
        assert_eq!(record.decision_date, NaiveDate::from_ymd_opt(2026, 3, 14).expect("date"));
        assert_eq!(record.approver_name, "Dana Reyes");
        assert_eq!(record.comments, "reviewed");
        assert_eq!(record.actioned_at, now());
    }

    #[test]
    fn explicit_decision_date_is_kept() {
        let mut state = ApprovalState::routed(true, false);
        let mut reject =
            action(ApproverStage::Approver1, ApprovalDecision::Reject, FinalStatus::Pending);
        reject.decision_date = NaiveDate::from_ymd_opt(2026, 3, 1);

        state.apply(&reject, now()).expect("reject");

        let record = state.decision(ApproverStage::Approver1).expect("decision recorded");
        assert_eq!(Some(record.decision_date), NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn blank_approver_name_is_rejected() {
        let mut state = ApprovalState::routed(true, false);
        let mut approve =
            action(ApproverStage::Approver1, ApprovalDecision::Approve, FinalStatus::Pending);
        approve.approver_name = "   ".to_owned();

        let error = state.apply(&approve, now()).expect_err("name required");

        assert_eq!(
            error,
            ApprovalTransitionError::MissingApproverName { stage: ApproverStage::Approver1 }
        );
        assert_eq!(state.final_status, FinalStatus::Pending);
    }
}
