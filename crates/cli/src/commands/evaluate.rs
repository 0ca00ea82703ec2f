use std::path::Path;

use serde_json::Value;

use rackrate_core::discount::DiscountEngine;
use rackrate_core::domain::line_item::ProductTables;
use rackrate_core::errors::ApplicationError;

use crate::commands::{load_config, read_json, CommandResult, GlobalOptions, EXIT_INPUT};

/// Prices and routes a quote without storing it. Accepts either a bare
/// `{home_products, branch_products}` object or a full submission body.
pub fn run(options: &GlobalOptions, file: &Path) -> CommandResult {
    let config = match load_config("evaluate", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let body: Value = match read_json("evaluate", file) {
        Ok(body) => body,
        Err(result) => return result,
    };
    let tables = body.get("products").cloned().unwrap_or(body);
    let mut tables: ProductTables = match serde_json::from_value(tables) {
        Ok(tables) => tables,
        Err(error) => {
            return CommandResult::failure(
                "evaluate",
                "invalid_input",
                format!("product tables are malformed: {error}"),
                EXIT_INPUT,
            )
        }
    };

    let engine = DiscountEngine::new(config.routing.thresholds());
    match engine.evaluate(&mut tables) {
        Ok(evaluation) => CommandResult::success_with_data(
            "evaluate",
            format!(
                "blended discount {}%, final status {}",
                evaluation.overall.blended_discount_percent.round_dp(2),
                evaluation.approval.final_status
            ),
            &evaluation,
        ),
        Err(error) => {
            CommandResult::from_application_error("evaluate", ApplicationError::from(error), "local")
        }
    }
}
