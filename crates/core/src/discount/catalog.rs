use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::line_item::{LineItem, TableKind};
use crate::domain::product::Product;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse product catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("product `{name}` is listed more than once")]
    DuplicateProduct { name: String },
    #[error("product `{name}` has a negative rack rate")]
    NegativeRackRate { name: String },
    #[error("unknown product `{name}`")]
    UnknownProduct { name: String },
    #[error("product `{name}` is not offered for {table}")]
    NotOffered { name: String, table: TableKind },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Clone, Debug, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for product in &products {
            if !seen.insert(normalize_name(&product.name)) {
                return Err(CatalogError::DuplicateProduct { name: product.name.clone() });
            }
            if product.rack_rate < Decimal::ZERO {
                return Err(CatalogError::NegativeRackRate { name: product.name.clone() });
            }
        }

        Ok(Self { products })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;
        Self::new(file.products)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Products offered for a table: its own location plus `BOTH`.
    pub fn products_for(&self, table: TableKind) -> Vec<&Product> {
        self.products.iter().filter(|product| product.location.applies_to(table)).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Product> {
        let key = normalize_name(name);
        self.products.iter().find(|product| normalize_name(&product.name) == key)
    }

    /// A fresh line for `name` at quantity 1 and no discount.
    pub fn line_item(&self, name: &str, table: TableKind) -> Result<LineItem, CatalogError> {
        let product =
            self.find(name).ok_or_else(|| CatalogError::UnknownProduct { name: name.to_owned() })?;
        if !product.location.applies_to(table) {
            return Err(CatalogError::NotOffered { name: product.name.clone(), table });
        }

        Ok(LineItem::new(
            product.name.clone(),
            product.product_type,
            Decimal::ONE,
            product.rack_rate,
            Decimal::ZERO,
        ))
    }
}

fn normalize_name(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
