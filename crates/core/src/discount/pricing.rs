use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::line_item::LineItem;

/// Largest rack rate a line item keeps after normalization.
pub const MAX_RACK_RATE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);
/// Largest quantity a line item keeps after normalization.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemResult {
    pub rack_total: Decimal,
    pub total_after_discount: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub total_rack: Decimal,
    pub total_after_discount: Decimal,
    pub max_discount_percent: Decimal,
    pub blended_discount_percent: Decimal,
}

impl AggregateResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merges two aggregates as if their items had been aggregated together.
    pub fn combine(&self, other: &Self) -> Self {
        Self::from_totals(
            self.total_rack.saturating_add(other.total_rack),
            self.total_after_discount.saturating_add(other.total_after_discount),
            self.max_discount_percent.max(other.max_discount_percent),
        )
    }

    fn from_totals(
        total_rack: Decimal,
        total_after_discount: Decimal,
        max_discount_percent: Decimal,
    ) -> Self {
        Self {
            total_rack,
            total_after_discount,
            max_discount_percent,
            blended_discount_percent: blended_discount(total_rack, total_after_discount),
        }
    }
}

/// Parses user-entered numeric text; anything that is not a number is zero.
pub fn coerce_numeric(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

pub fn clamp_discount(percent: Decimal) -> Decimal {
    percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

/// Saturates at `Decimal::MAX` rather than overflowing; normalized items stay
/// far below that bound.
pub fn compute_line_item(
    rack_rate: Decimal,
    quantity: Decimal,
    discount_percent: Decimal,
) -> LineItemResult {
    let rack_total = rack_rate.saturating_mul(quantity);
    let multiplier = Decimal::ONE - clamp_discount(discount_percent) / Decimal::ONE_HUNDRED;

    LineItemResult { rack_total, total_after_discount: rack_total.saturating_mul(multiplier) }
}

pub fn price_line_item(item: &LineItem) -> LineItemResult {
    compute_line_item(item.rack_rate, item.quantity, item.discount_percent)
}

pub fn aggregate<'a, I>(items: I) -> AggregateResult
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let (total_rack, total_after_discount, max_discount_percent) = items.into_iter().fold(
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        |(rack, after, max), item| {
            let result = price_line_item(item);
            (
                rack.saturating_add(result.rack_total),
                after.saturating_add(result.total_after_discount),
                max.max(clamp_discount(item.discount_percent)),
            )
        },
    );

    AggregateResult::from_totals(total_rack, total_after_discount, max_discount_percent)
}

fn blended_discount(total_rack: Decimal, total_after_discount: Decimal) -> Decimal {
    if total_rack <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    ((total_rack - total_after_discount) / total_rack * Decimal::ONE_HUNDRED).normalize()
}
