use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::discount::pricing::{clamp_discount, coerce_numeric, MAX_QUANTITY, MAX_RACK_RATE};
use crate::domain::product::{lenient_product_type, ProductType};

/// The two product tables a quote is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Home,
    Branch,
}

impl TableKind {
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Home => "home_products",
            Self::Branch => "branch_products",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "home" | "home_products" => Ok(Self::Home),
            "branch" | "branch_products" => Ok(Self::Branch),
            other => Err(format!("unsupported location `{other}` (expected home|branch)")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient_product_type")]
    pub product_type: Option<ProductType>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub quantity: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub rack_rate: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub discount_percent: Decimal,
}

/// A value the engine rewrote in place while normalizing a line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItemCorrection {
    DiscountClamped { from: Decimal, to: Decimal },
    QuantityPinned { from: Decimal },
    NegativeZeroed { field: String, from: Decimal },
    AmountCapped { field: String, from: Decimal, to: Decimal },
}

impl LineItem {
    pub fn new(
        product_name: impl Into<String>,
        product_type: ProductType,
        quantity: Decimal,
        rack_rate: Decimal,
        discount_percent: Decimal,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            product_type: Some(product_type),
            quantity,
            rack_rate,
            discount_percent,
        }
    }

    pub fn has_product(&self) -> bool {
        !self.product_name.trim().is_empty()
    }

    pub fn effective_type(&self) -> ProductType {
        self.product_type.unwrap_or_default()
    }

    /// Rewrites out-of-range inputs so the stored item is the source of truth
    /// for every derived total.
    pub fn normalize(&mut self) -> Vec<LineItemCorrection> {
        let mut corrections = Vec::new();

        if self.rack_rate < Decimal::ZERO {
            corrections.push(LineItemCorrection::NegativeZeroed {
                field: "rack_rate".to_owned(),
                from: self.rack_rate,
            });
            self.rack_rate = Decimal::ZERO;
        } else if self.rack_rate > MAX_RACK_RATE {
            corrections.push(LineItemCorrection::AmountCapped {
                field: "rack_rate".to_owned(),
                from: self.rack_rate,
                to: MAX_RACK_RATE,
            });
            self.rack_rate = MAX_RACK_RATE;
        }

        if !self.effective_type().quantity_editable() {
            if self.quantity != Decimal::ONE {
                corrections.push(LineItemCorrection::QuantityPinned { from: self.quantity });
                self.quantity = Decimal::ONE;
            }
        } else if self.quantity < Decimal::ZERO {
            corrections.push(LineItemCorrection::NegativeZeroed {
                field: "quantity".to_owned(),
                from: self.quantity,
            });
            self.quantity = Decimal::ZERO;
        } else if self.quantity > MAX_QUANTITY {
            corrections.push(LineItemCorrection::AmountCapped {
                field: "quantity".to_owned(),
                from: self.quantity,
                to: MAX_QUANTITY,
            });
            self.quantity = MAX_QUANTITY;
        }

        let clamped = clamp_discount(self.discount_percent);
        if clamped != self.discount_percent {
            corrections.push(LineItemCorrection::DiscountClamped {
                from: self.discount_percent,
                to: clamped,
            });
            self.discount_percent = clamped;
        }

        corrections
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductTables {
    #[serde(default)]
    pub home_products: Vec<LineItem>,
    #[serde(default)]
    pub branch_products: Vec<LineItem>,
}

impl ProductTables {
    pub fn table(&self, kind: TableKind) -> &[LineItem] {
        match kind {
            TableKind::Home => &self.home_products,
            TableKind::Branch => &self.branch_products,
        }
    }

    pub fn table_mut(&mut self, kind: TableKind) -> &mut Vec<LineItem> {
        match kind {
            TableKind::Home => &mut self.home_products,
            TableKind::Branch => &mut self.branch_products,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &LineItem> {
        self.home_products.iter().chain(self.branch_products.iter())
    }
}

/// Accepts numbers, numeric strings, blanks and `null`; anything that does not
/// parse becomes zero.
pub(crate) fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => coerce_numeric(&number.to_string()),
        Some(Value::String(raw)) => coerce_numeric(&raw),
        _ => Decimal::ZERO,
    })
}

pub(crate) fn lenient_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => Some(coerce_numeric(&number.to_string())),
        Some(Value::String(raw)) if !raw.trim().is_empty() => Some(coerce_numeric(&raw)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{LineItem, LineItemCorrection, ProductTables, TableKind};
    use crate::discount::pricing::{MAX_QUANTITY, MAX_RACK_RATE};
    use crate::domain::product::ProductType;

    #[test]
    fn deserializes_original_wire_shape_with_lenient_numbers() {
        let item: LineItem = serde_json::from_value(json!({
            "product_name": "H4",
            "product_type": "VARIABLE",
            "quantity": "3",
            "rack_rate": 120.5,
            "discount_percent": "abc",
            "total_after_discount": 999
        }))
        .expect("line item should deserialize");

        assert_eq!(item.product_name, "H4");
        assert_eq!(item.product_type, Some(ProductType::Variable));
        assert_eq!(item.quantity, Decimal::from(3));
        assert_eq!(item.rack_rate, Decimal::new(1205, 1));
        assert_eq!(item.discount_percent, Decimal::ZERO);
    }

    #[test]
    fn missing_and_null_fields_default_to_zero() {
        let item: LineItem = serde_json::from_value(json!({
            "product_name": "",
            "product_type": "",
            "quantity": null
        }))
        .expect("line item should deserialize");

        assert!(!item.has_product());
        assert_eq!(item.product_type, None);
        assert_eq!(item.quantity, Decimal::ZERO);
        assert_eq!(item.rack_rate, Decimal::ZERO);
    }

    #[test]
    fn normalize_clamps_discount_and_writes_it_back() {
        let mut item = LineItem::new(
            "Branch Kit",
            ProductType::Variable,
            Decimal::from(2),
            Decimal::from(200),
            Decimal::from(150),
        );

        let corrections = item.normalize();

        assert_eq!(item.discount_percent, Decimal::ONE_HUNDRED);
        assert_eq!(
            corrections,
            vec![LineItemCorrection::DiscountClamped {
                from: Decimal::from(150),
                to: Decimal::ONE_HUNDRED,
            }]
        );
    }

    #[test]
    fn normalize_pins_fixed_quantity_to_one() {
        let mut item = LineItem::new(
            "Setup Fee",
            ProductType::Fixed,
            Decimal::from(4),
            Decimal::from(50),
            Decimal::ZERO,
        );

        let corrections = item.normalize();

        assert_eq!(item.quantity, Decimal::ONE);
        assert_eq!(corrections, vec![LineItemCorrection::QuantityPinned { from: Decimal::from(4) }]);
    }

    #[test]
    fn normalize_zeroes_negative_amounts() {
        let mut item = LineItem::new(
            "H4",
            ProductType::Variable,
            Decimal::from(-2),
            Decimal::from(-10),
            Decimal::from(-5),
        );

        let corrections = item.normalize();

        assert_eq!(item.quantity, Decimal::ZERO);
        assert_eq!(item.rack_rate, Decimal::ZERO);
        assert_eq!(item.discount_percent, Decimal::ZERO);
        assert_eq!(corrections.len(), 3);
    }

    #[test]
    fn normalize_caps_oversized_amounts() {
        let mut item = LineItem::new(
            "H4",
            ProductType::Variable,
            Decimal::from(5_000_000_000_i64),
            Decimal::from(2_000_000_000_000_i64),
            Decimal::from(10),
        );

        let corrections = item.normalize();

        assert_eq!(item.rack_rate, MAX_RACK_RATE);
        assert_eq!(item.quantity, MAX_QUANTITY);
        assert_eq!(
            corrections,
            vec![
                LineItemCorrection::AmountCapped {
                    field: "rack_rate".to_owned(),
                    from: Decimal::from(2_000_000_000_000_i64),
                    to: MAX_RACK_RATE,
                },
                LineItemCorrection::AmountCapped {
                    field: "quantity".to_owned(),
                    from: Decimal::from(5_000_000_000_i64),
                    to: MAX_QUANTITY,
                },
            ]
        );
    }

    #[test]
    fn product_tables_chain_home_before_branch() {
        let tables = ProductTables {
            home_products: vec![LineItem { product_name: "H4".to_owned(), ..LineItem::default() }],
            branch_products: vec![LineItem {
                product_name: "Branch Kit".to_owned(),
                ..LineItem::default()
            }],
        };

        let names: Vec<&str> = tables.items().map(|item| item.product_name.as_str()).collect();
        assert_eq!(names, vec!["H4", "Branch Kit"]);
        assert_eq!(tables.table(TableKind::Branch).len(), 1);
    }

    #[test]
    fn table_kind_parses_short_and_wire_names() {
        assert_eq!("HOME".parse::<TableKind>(), Ok(TableKind::Home));
        assert_eq!("branch_products".parse::<TableKind>(), Ok(TableKind::Branch));
        assert!("warehouse".parse::<TableKind>().is_err());
    }
}
