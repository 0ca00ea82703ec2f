use chrono::Utc;
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::discount::{DiscountEngine, QuoteEvaluation};
use crate::domain::line_item::ProductTables;
use crate::domain::submission::{Submission, SubmissionId};
use crate::errors::{ApplicationError, DomainError};
use crate::notifications::{ApprovalNotice, Notifier};

use super::store::{RepositoryError, SubmissionRepository};
use super::{
    ApprovalCommand, ApprovalReceipt, SubmissionReceipt, SubmissionSummary, SubmissionView,
    SubmitRequest,
};

/// Save, read, edit and approve quotes against a [`SubmissionRepository`].
pub struct SubmissionService<R, A, N> {
    repository: R,
    audit: A,
    notifier: N,
    engine: DiscountEngine,
}

impl<R, A, N> SubmissionService<R, A, N>
where
    R: SubmissionRepository,
    A: AuditSink,
    N: Notifier,
{
    pub fn new(repository: R, audit: A, notifier: N, engine: DiscountEngine) -> Self {
        Self { repository, audit, notifier, engine }
    }

    pub async fn submit(
        &self,
        request: SubmitRequest,
        submitted_by: &str,
        context: &AuditContext,
    ) -> Result<SubmissionReceipt, ApplicationError> {
        let submitted_by = required_actor(submitted_by, "submitted_by")?;

        let SubmitRequest { mut products, customer_name, blended_discount } = request;
        let evaluation = self.evaluate(&mut products, context)?;

        if let Some(client_value) = blended_discount {
            let server_value = evaluation.overall.blended_discount_percent;
            if client_value.round_dp(2) != server_value.round_dp(2) {
                warn!(
                    event_name = "discount.client_blended_mismatch",
                    correlation_id = %context.correlation_id,
                    client_blended = %client_value,
                    server_blended = %server_value,
                    "client blended discount differs from recomputed value; using server value"
                );
            }
        }

        let submission = Submission {
            id: SubmissionId::generate(),
            version: 1,
            customer_name: customer_name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
            submitted_by: submitted_by.to_owned(),
            submitted_on: Utc::now(),
            last_updated_by: None,
            last_updated_on: None,
            products,
            approval: evaluation.approval.clone(),
        };
        let context = context.for_submission(&submission.id);

        if let Err(error) = self.repository.insert(submission.clone()).await {
            self.persistence_failed("submission.create_failed", &context, &error);
            return Err(error.into());
        }

        self.audit.emit(
            context
                .event("submission.created", AuditCategory::Ingress, AuditOutcome::Success)
                .with_metadata("status", submission.approval.final_status.to_string())
                .with_metadata(
                    "blended_discount_percent",
                    evaluation.overall.blended_discount_percent.to_string(),
                )
                .with_metadata("corrections", evaluation.corrections.len().to_string()),
        );
        info!(
            event_name = "submission.created",
            correlation_id = %context.correlation_id,
            submission_id = %submission.id,
            status = %submission.approval.final_status,
            "submission stored"
        );

        Ok(receipt(&submission, &evaluation))
    }

    pub async fn fetch(&self, id: &SubmissionId) -> Result<SubmissionView, ApplicationError> {
        let submission = self.load(id).await?;
        Ok(SubmissionView::from_submission(&submission))
    }

    pub async fn list(&self) -> Result<Vec<SubmissionSummary>, ApplicationError> {
        let mut submissions = self.repository.list().await?;
        submissions.sort_by(|left, right| {
            left.submitted_on.cmp(&right.submitted_on).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(submissions.iter().map(SubmissionSummary::from_submission).collect())
    }

    /// Replaces both product tables and re-routes the quote. Rejected once any
    /// approver has recorded a decision.
    pub async fn update_products(
        &self,
        id: &SubmissionId,
        expected_version: u64,
        mut products: ProductTables,
        updated_by: &str,
        context: &AuditContext,
    ) -> Result<SubmissionReceipt, ApplicationError> {
        let updated_by = required_actor(updated_by, "updated_by")?;
        let context = context.for_submission(id);
        let mut submission = self.load(id).await?;
        ensure_version(&submission, expected_version)?;

        if !submission.accepts_product_edits() {
            self.audit.emit(
                context
                    .event(
                        "submission.update_rejected",
                        AuditCategory::Ingress,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("status", submission.approval.final_status.to_string()),
            );
            return Err(DomainError::SubmissionLocked { id: id.to_string() }.into());
        }

        let evaluation = self.evaluate(&mut products, &context)?;
        let previous_status = submission.approval.final_status;

        submission.products = products;
        submission.approval = evaluation.approval.clone();
        submission.last_updated_by = Some(updated_by.to_owned());
        submission.last_updated_on = Some(Utc::now());
        submission.version = expected_version + 1;

        if let Err(error) = self.repository.update(submission.clone(), expected_version).await {
            self.persistence_failed("submission.update_failed", &context, &error);
            return Err(error.into());
        }

        self.audit.emit(
            context
                .event("submission.updated", AuditCategory::Ingress, AuditOutcome::Success)
                .with_metadata("from", previous_status.to_string())
                .with_metadata("to", submission.approval.final_status.to_string())
                .with_metadata("version", submission.version.to_string()),
        );
        info!(
            event_name = "submission.updated",
            correlation_id = %context.correlation_id,
            submission_id = %submission.id,
            version = submission.version,
            status = %submission.approval.final_status,
            "submission products replaced"
        );

        Ok(receipt(&submission, &evaluation))
    }

    /// Applies one approver decision and delivers the resulting notices.
    pub async fn act(
        &self,
        id: &SubmissionId,
        expected_version: u64,
        command: &ApprovalCommand,
        context: &AuditContext,
    ) -> Result<ApprovalReceipt, ApplicationError> {
        let context = context.for_submission(id);
        let mut submission = self.load(id).await?;
        ensure_version(&submission, expected_version)?;

        if let Some(hint) = command.approver2_hint() {
            if hint != submission.approval.approver2_required {
                warn!(
                    event_name = "approval.client_hint_mismatch",
                    correlation_id = %context.correlation_id,
                    submission_id = %id,
                    client_approver2_required = hint,
                    approver2_required = submission.approval.approver2_required,
                    "client approver2 hint ignored"
                );
            }
        }

        let action = command.to_action();
        let transition = match submission.approval.apply(&action, Utc::now()) {
            Ok(transition) => transition,
            Err(error) => {
                self.audit.emit(
                    context
                        .event(
                            "approval.transition_rejected",
                            AuditCategory::Approval,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("stage", action.stage.to_string())
                        .with_metadata("decision", action.decision.to_string())
                        .with_metadata("status", submission.approval.final_status.to_string())
                        .with_metadata("error", error.to_string()),
                );
                warn!(
                    event_name = "approval.transition_rejected",
                    correlation_id = %context.correlation_id,
                    submission_id = %id,
                    error = %error,
                    "approval action rejected"
                );
                return Err(DomainError::from(error).into());
            }
        };

        submission.version = expected_version + 1;
        if let Err(error) = self.repository.update(submission.clone(), expected_version).await {
            self.persistence_failed("approval.persist_failed", &context, &error);
            return Err(error.into());
        }

        self.audit.emit(
            context
                .event(
                    "approval.transition_applied",
                    AuditCategory::Approval,
                    AuditOutcome::Success,
                )
                .with_metadata("stage", transition.stage.to_string())
                .with_metadata("decision", transition.decision.to_string())
                .with_metadata("from", transition.from.to_string())
                .with_metadata("to", transition.to.to_string()),
        );
        info!(
            event_name = "approval.transition_applied",
            correlation_id = %context.correlation_id,
            submission_id = %id,
            stage = %transition.stage,
            from = %transition.from,
            to = %transition.to,
            "approval recorded"
        );

        let notices = ApprovalNotice::for_transition(&submission, &transition);
        for notice in &notices {
            self.notifier.deliver(notice.clone());
        }

        Ok(ApprovalReceipt {
            id: submission.id,
            version: submission.version,
            stage: transition.stage,
            decision: transition.decision,
            previous_status: transition.from,
            final_status: transition.to,
            notices,
        })
    }

    async fn load(&self, id: &SubmissionId) -> Result<Submission, ApplicationError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()).into())
    }

    fn evaluate(
        &self,
        products: &mut ProductTables,
        context: &AuditContext,
    ) -> Result<QuoteEvaluation, ApplicationError> {
        match self.engine.evaluate(products) {
            Ok(evaluation) => {
                for correction in &evaluation.corrections {
                    info!(
                        event_name = "discount.input_corrected",
                        correlation_id = %context.correlation_id,
                        table = %correction.table,
                        row = correction.row,
                        correction = ?correction.correction,
                        "line item value corrected"
                    );
                }
                Ok(evaluation)
            }
            Err(error) => {
                self.audit.emit(
                    context
                        .event(
                            "discount.evaluation_rejected",
                            AuditCategory::Discount,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("error", error.to_string()),
                );
                Err(error.into())
            }
        }
    }

    fn persistence_failed(
        &self,
        event_type: &str,
        context: &AuditContext,
        error: &RepositoryError,
    ) {
        self.audit.emit(
            context
                .event(event_type, AuditCategory::Persistence, AuditOutcome::Failed)
                .with_metadata("error", error.to_string()),
        );
        warn!(
            event_name = event_type,
            correlation_id = %context.correlation_id,
            error = %error,
            "submission store rejected write"
        );
    }
}

fn required_actor<'a>(actor: &'a str, field: &str) -> Result<&'a str, DomainError> {
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(DomainError::InvariantViolation(format!("{field} is required")));
    }
    Ok(actor)
}

fn ensure_version(submission: &Submission, expected_version: u64) -> Result<(), RepositoryError> {
    if submission.version == expected_version {
        Ok(())
    } else {
        Err(RepositoryError::VersionConflict {
            id: submission.id.to_string(),
            expected: expected_version,
            actual: submission.version,
        })
    }
}

fn receipt(submission: &Submission, evaluation: &QuoteEvaluation) -> SubmissionReceipt {
    SubmissionReceipt {
        id: submission.id.clone(),
        version: submission.version,
        status: submission.approval.final_status,
        layout: submission.approval.layout(),
        blended_discount_percent: evaluation.overall.blended_discount_percent,
        corrections: evaluation.corrections.clone(),
    }
}
