pub mod catalog;
pub mod pricing;
pub mod routing;

use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalState;
use crate::domain::line_item::{LineItem, LineItemCorrection, ProductTables, TableKind};
use crate::errors::DomainError;

use self::pricing::{aggregate, price_line_item, AggregateResult, LineItemResult};
use self::routing::{RoutingReason, RoutingThresholds};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCorrection {
    pub table: TableKind,
    /// 1-based row number as shown to the user.
    pub row: usize,
    pub correction: LineItemCorrection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEvaluation {
    pub lines: Vec<LineItemResult>,
    pub totals: AggregateResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEvaluation {
    pub home: TableEvaluation,
    pub branch: TableEvaluation,
    pub overall: AggregateResult,
    pub approval: ApprovalState,
    pub reasons: Vec<RoutingReason>,
    pub corrections: Vec<RowCorrection>,
}

#[derive(Clone, Debug, Default)]
pub struct DiscountEngine {
    thresholds: RoutingThresholds,
}

impl DiscountEngine {
    pub fn new(thresholds: RoutingThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RoutingThresholds {
        &self.thresholds
    }

    pub fn aggregate(&self, items: &[LineItem]) -> AggregateResult {
        aggregate(items)
    }

    pub fn route_approvals(&self, aggregate: &AggregateResult) -> ApprovalState {
        self.thresholds.route(aggregate)
    }

    /// Normalizes every line in place, then prices both tables and routes the
    /// quote on the combined totals. Lines without a product block evaluation.
    pub fn evaluate(&self, tables: &mut ProductTables) -> Result<QuoteEvaluation, DomainError> {
        let mut corrections = Vec::new();

        for table in [TableKind::Home, TableKind::Branch] {
            for (index, item) in tables.table_mut(table).iter_mut().enumerate() {
                if !item.has_product() {
                    return Err(DomainError::MissingProductSelection { table, row: index + 1 });
                }
                corrections.extend(
                    item.normalize()
                        .into_iter()
                        .map(|correction| RowCorrection { table, row: index + 1, correction }),
                );
            }
        }

        let home = evaluate_table(&tables.home_products);
        let branch = evaluate_table(&tables.branch_products);
        let overall = home.totals.combine(&branch.totals);

        Ok(QuoteEvaluation {
            approval: self.thresholds.route(&overall),
            reasons: self.thresholds.reasons(&overall),
            home,
            branch,
            overall,
            corrections,
        })
    }
}

fn evaluate_table(items: &[LineItem]) -> TableEvaluation {
    TableEvaluation { lines: items.iter().map(price_line_item).collect(), totals: aggregate(items) }
}
