pub mod service;
pub mod store;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::approvals::ApprovalAction;
use crate::discount::pricing::{aggregate, price_line_item, AggregateResult};
use crate::discount::RowCorrection;
use crate::domain::approval::{
    ApprovalDecision, ApprovalState, ApproverLayout, ApproverStage, FinalStatus,
};
use crate::domain::line_item::{lenient_optional_decimal, LineItem, ProductTables};
use crate::domain::submission::{Submission, SubmissionId};
use crate::notifications::ApprovalNotice;

pub use service::SubmissionService;
pub use store::{RepositoryError, SubmissionRepository};

/// Body of a new quote submission.
///
/// `blended_discount` is whatever the client computed; it is only compared
/// against the recomputed value and never stored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub products: ProductTables,
    #[serde(default, rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    pub blended_discount: Option<Decimal>,
}

/// An approver's form post.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalCommand {
    pub approver: ApproverStage,
    pub action: ApprovalDecision,
    #[serde(default)]
    pub comments: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub decision_date: Option<NaiveDate>,
    #[serde(default)]
    pub approver_name: String,
    /// Client's view of the second stage: `"NA"` or `"Pending"`. Advisory only.
    #[serde(default)]
    pub approver2: Option<String>,
    pub expected_status: FinalStatus,
}

impl ApprovalCommand {
    pub fn to_action(&self) -> ApprovalAction {
        ApprovalAction {
            stage: self.approver,
            decision: self.action,
            expected_status: self.expected_status,
            approver_name: self.approver_name.clone(),
            decision_date: self.decision_date,
            comments: self.comments.clone(),
        }
    }

    /// `Some(true)` when the client believes a second approver is required.
    pub fn approver2_hint(&self) -> Option<bool> {
        match self.approver2.as_deref().map(str::trim) {
            Some(hint) if hint.eq_ignore_ascii_case("na") => Some(false),
            Some(hint) if hint.eq_ignore_ascii_case("pending") => Some(true),
            _ => None,
        }
    }
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricedLineItem {
    #[serde(flatten)]
    pub item: LineItem,
    pub rack_total: Decimal,
    pub total_after_discount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricedTables {
    pub home_products: Vec<PricedLineItem>,
    pub branch_products: Vec<PricedLineItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteTotals {
    pub home: AggregateResult,
    pub branch: AggregateResult,
    pub overall: AggregateResult,
}

/// A stored submission with every derived value recomputed from its lines.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmissionView {
    pub id: SubmissionId,
    pub version: u64,
    pub status: FinalStatus,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    pub submitted_by: String,
    pub submitted_on: DateTime<Utc>,
    pub last_updated_by: Option<String>,
    pub last_updated_on: Option<DateTime<Utc>>,
    pub data: PricedTables,
    pub totals: QuoteTotals,
    pub approval: ApprovalState,
    pub layout: ApproverLayout,
}

impl SubmissionView {
    pub fn from_submission(submission: &Submission) -> Self {
        let home = aggregate(&submission.products.home_products);
        let branch = aggregate(&submission.products.branch_products);
        let overall = home.combine(&branch);

        Self {
            id: submission.id.clone(),
            version: submission.version,
            status: submission.approval.final_status,
            customer_name: submission.customer_name.clone(),
            submitted_by: submission.submitted_by.clone(),
            submitted_on: submission.submitted_on,
            last_updated_by: submission.last_updated_by.clone(),
            last_updated_on: submission.last_updated_on,
            data: PricedTables {
                home_products: price_items(&submission.products.home_products),
                branch_products: price_items(&submission.products.branch_products),
            },
            totals: QuoteTotals { home, branch, overall },
            approval: submission.approval.clone(),
            layout: submission.approval.layout(),
        }
    }
}

fn price_items(items: &[LineItem]) -> Vec<PricedLineItem> {
    items
        .iter()
        .map(|item| {
            let result = price_line_item(item);
            PricedLineItem {
                item: item.clone(),
                rack_total: result.rack_total,
                total_after_discount: result.total_after_discount,
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionSummary {
    pub id: SubmissionId,
    pub version: u64,
    pub status: FinalStatus,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    pub submitted_by: String,
    pub submitted_on: DateTime<Utc>,
    pub blended_discount_percent: Decimal,
}

impl SubmissionSummary {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            id: submission.id.clone(),
            version: submission.version,
            status: submission.approval.final_status,
            customer_name: submission.customer_name.clone(),
            submitted_by: submission.submitted_by.clone(),
            submitted_on: submission.submitted_on,
            blended_discount_percent: aggregate(submission.products.items())
                .blended_discount_percent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub id: SubmissionId,
    pub version: u64,
    pub status: FinalStatus,
    pub layout: ApproverLayout,
    pub blended_discount_percent: Decimal,
    pub corrections: Vec<RowCorrection>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalReceipt {
    pub id: SubmissionId,
    pub version: u64,
    pub stage: ApproverStage,
    pub decision: ApprovalDecision,
    pub previous_status: FinalStatus,
    pub final_status: FinalStatus,
    pub notices: Vec<ApprovalNotice>,
}
