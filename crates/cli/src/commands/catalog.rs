use rackrate_core::discount::catalog::ProductCatalog;
use rackrate_core::domain::line_item::TableKind;

use crate::commands::{load_config, CommandResult, GlobalOptions, EXIT_CONFIG, EXIT_INPUT};

pub fn run(options: &GlobalOptions, location: Option<TableKind>) -> CommandResult {
    let config = match load_config("catalog", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let Some(path) = config.catalog.path.as_deref() else {
        return CommandResult::failure(
            "catalog",
            "config_validation",
            "catalog.path is not configured (set it in rackrate.toml or RACKRATE_CATALOG_PATH)",
            EXIT_CONFIG,
        );
    };

    let catalog = match ProductCatalog::load(path) {
        Ok(catalog) => catalog,
        Err(error) => {
            return CommandResult::failure("catalog", "invalid_catalog", error.to_string(), EXIT_INPUT)
        }
    };

    let products: Vec<_> = match location {
        Some(table) => catalog.products_for(table),
        None => catalog.products().iter().collect(),
    };
    let message = match location {
        Some(table) => format!("{} products offered for {table}", products.len()),
        None => format!("{} products in catalog", products.len()),
    };

    CommandResult::success_with_data("catalog", message, &products)
}
