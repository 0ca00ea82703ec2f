use std::path::Path;

use serde_json::Value;

use rackrate_core::domain::line_item::ProductTables;
use rackrate_core::domain::submission::SubmissionId;
use rackrate_core::submission::SubmitRequest;

use crate::commands::{
    audit_context, build_runtime, load_config, open_service, read_json, CommandResult,
    GlobalOptions, EXIT_INPUT,
};

pub fn submit(options: &GlobalOptions, file: &Path, submitted_by: &str) -> CommandResult {
    let config = match load_config("submit", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let request: SubmitRequest = match read_json("submit", file) {
        Ok(request) => request,
        Err(result) => return result,
    };
    let runtime = match build_runtime("submit") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let service = open_service(&config);
    let context = audit_context(submitted_by);
    match runtime.block_on(service.submit(request, submitted_by, &context)) {
        Ok(receipt) => CommandResult::success_with_data(
            "submit",
            format!("stored submission {} with status {}", receipt.id, receipt.status),
            &receipt,
        ),
        Err(error) => CommandResult::from_application_error("submit", error, &context.correlation_id),
    }
}

pub fn show(options: &GlobalOptions, id: &str) -> CommandResult {
    let config = match load_config("show", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("show") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let service = open_service(&config);
    let context = audit_context("cli");
    match runtime.block_on(service.fetch(&SubmissionId(id.to_owned()))) {
        Ok(view) => CommandResult::success_with_data(
            "show",
            format!("submission {} is {}", view.id, view.status),
            &view,
        ),
        Err(error) => CommandResult::from_application_error("show", error, &context.correlation_id),
    }
}

pub fn list(options: &GlobalOptions) -> CommandResult {
    let config = match load_config("list", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("list") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let service = open_service(&config);
    let context = audit_context("cli");
    match runtime.block_on(service.list()) {
        Ok(summaries) => CommandResult::success_with_data(
            "list",
            format!("{} submissions", summaries.len()),
            &summaries,
        ),
        Err(error) => CommandResult::from_application_error("list", error, &context.correlation_id),
    }
}

pub fn edit(
    options: &GlobalOptions,
    id: &str,
    file: &Path,
    expected_version: u64,
    updated_by: &str,
) -> CommandResult {
    let config = match load_config("edit", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let body: Value = match read_json("edit", file) {
        Ok(body) => body,
        Err(result) => return result,
    };
    let tables = body.get("products").cloned().unwrap_or(body);
    let products: ProductTables = match serde_json::from_value(tables) {
        Ok(products) => products,
        Err(error) => {
            return CommandResult::failure(
                "edit",
                "invalid_input",
                format!("product tables are malformed: {error}"),
                EXIT_INPUT,
            )
        }
    };
    let runtime = match build_runtime("edit") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let service = open_service(&config);
    let context = audit_context(updated_by);
    let id = SubmissionId(id.to_owned());
    match runtime.block_on(service.update_products(
        &id,
        expected_version,
        products,
        updated_by,
        &context,
    )) {
        Ok(receipt) => CommandResult::success_with_data(
            "edit",
            format!("submission {} is now version {} ({})", receipt.id, receipt.version, receipt.status),
            &receipt,
        ),
        Err(error) => CommandResult::from_application_error("edit", error, &context.correlation_id),
    }
}
