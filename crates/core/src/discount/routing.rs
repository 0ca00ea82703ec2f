use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::discount::pricing::AggregateResult;
use crate::domain::approval::ApprovalState;

/// Discount limits above which a quote needs sign-off. Both comparisons are
/// strict: a blended discount of exactly 60% does not engage approver 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingThresholds {
    pub approver1_item_discount_pct: Decimal,
    pub approver2_blended_discount_pct: Decimal,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            approver1_item_discount_pct: Decimal::from(80),
            approver2_blended_discount_pct: Decimal::from(60),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingReason {
    pub stage: String,
    pub detail: String,
}

impl RoutingThresholds {
    pub fn route(&self, aggregate: &AggregateResult) -> ApprovalState {
        let item_limit_exceeded =
            aggregate.max_discount_percent > self.approver1_item_discount_pct;
        let blended_limit_exceeded =
            aggregate.blended_discount_percent > self.approver2_blended_discount_pct;

        ApprovalState::routed(item_limit_exceeded || blended_limit_exceeded, blended_limit_exceeded)
    }

    /// Human-readable explanation of which limits were crossed.
    pub fn reasons(&self, aggregate: &AggregateResult) -> Vec<RoutingReason> {
        let mut reasons = Vec::new();

        if aggregate.max_discount_percent > self.approver1_item_discount_pct {
            reasons.push(RoutingReason {
                stage: "approver1".to_owned(),
                detail: format!(
                    "individual product discount {}% exceeds {}%",
                    aggregate.max_discount_percent.round_dp(2),
                    self.approver1_item_discount_pct
                ),
            });
        }

        if aggregate.blended_discount_percent > self.approver2_blended_discount_pct {
            reasons.push(RoutingReason {
                stage: "approver2".to_owned(),
                detail: format!(
                    "blended discount {}% exceeds {}%; routing to approver 1, then approver 2",
                    aggregate.blended_discount_percent.round_dp(2),
                    self.approver2_blended_discount_pct
                ),
            });
        }

        reasons
    }
}

pub fn route_approvals(aggregate: &AggregateResult) -> ApprovalState {
    RoutingThresholds::default().route(aggregate)
}
