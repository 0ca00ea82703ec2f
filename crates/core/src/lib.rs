pub mod approvals;
pub mod audit;
pub mod config;
pub mod discount;
pub mod domain;
pub mod errors;
pub mod notifications;
pub mod submission;

pub use approvals::{ApprovalAction, ApprovalFollowUp, ApprovalTransition, ApprovalTransitionError};
pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use discount::catalog::{CatalogError, ProductCatalog};
pub use discount::pricing::{
    aggregate, clamp_discount, compute_line_item, AggregateResult, LineItemResult,
};
pub use discount::routing::{route_approvals, RoutingThresholds};
pub use discount::{DiscountEngine, QuoteEvaluation, RowCorrection};
pub use domain::approval::{
    ApprovalDecision, ApprovalState, ApproverLayout, ApproverStage, FinalStatus, StageStatus,
};
pub use domain::line_item::{LineItem, LineItemCorrection, ProductTables, TableKind};
pub use domain::product::{Product, ProductLocation, ProductType};
pub use domain::submission::{Submission, SubmissionId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use notifications::{ApprovalNotice, InMemoryNotifier, NoopNotifier, NoticeRecipient, Notifier};
pub use submission::{
    ApprovalCommand, ApprovalReceipt, RepositoryError, SubmissionReceipt, SubmissionRepository,
    SubmissionService, SubmissionSummary, SubmissionView, SubmitRequest,
};
