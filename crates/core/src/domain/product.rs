use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::line_item::TableKind;

/// FIXED products are sold as a single unit; their quantity is not editable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Fixed,
    #[default]
    Variable,
}

impl ProductType {
    pub fn quantity_editable(self) -> bool {
        matches!(self, Self::Variable)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("FIXED"),
            Self::Variable => f.write_str("VARIABLE"),
        }
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FIXED" => Ok(Self::Fixed),
            "VARIABLE" => Ok(Self::Variable),
            other => Err(format!("unsupported product type `{other}` (expected FIXED|VARIABLE)")),
        }
    }
}

/// Which product tables a catalog entry may be added to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductLocation {
    Home,
    Branch,
    Both,
}

impl ProductLocation {
    pub fn applies_to(self, table: TableKind) -> bool {
        matches!(
            (self, table),
            (Self::Both, _) | (Self::Home, TableKind::Home) | (Self::Branch, TableKind::Branch)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub rack_rate: Decimal,
    pub product_type: ProductType,
    pub location: ProductLocation,
}

/// Reads an optional product type, treating blanks and unknown labels as absent.
pub(crate) fn lenient_product_type<'de, D>(deserializer: D) -> Result<Option<ProductType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}
