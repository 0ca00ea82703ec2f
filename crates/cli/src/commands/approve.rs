use chrono::NaiveDate;

use rackrate_core::domain::approval::{ApprovalDecision, ApproverStage, FinalStatus};
use rackrate_core::domain::submission::SubmissionId;
use rackrate_core::submission::ApprovalCommand;

use crate::commands::{
    audit_context, build_runtime, load_config, open_service, CommandResult, GlobalOptions,
};

#[derive(Debug, Clone)]
pub struct ApproveArgs {
    pub id: String,
    pub stage: ApproverStage,
    pub decision: ApprovalDecision,
    pub expected_status: FinalStatus,
    pub expected_version: u64,
    pub approver_name: String,
    pub decision_date: Option<NaiveDate>,
    pub comments: String,
}

pub fn run(options: &GlobalOptions, args: ApproveArgs) -> CommandResult {
    let config = match load_config("approve", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("approve") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let command = ApprovalCommand {
        approver: args.stage,
        action: args.decision,
        comments: args.comments,
        decision_date: args.decision_date,
        approver_name: args.approver_name,
        approver2: None,
        expected_status: args.expected_status,
    };

    let service = open_service(&config);
    let context = audit_context(&command.approver_name);
    let id = SubmissionId(args.id);
    match runtime.block_on(service.act(&id, args.expected_version, &command, &context)) {
        Ok(receipt) => CommandResult::success_with_data(
            "approve",
            format!(
                "{} {} submission {}: {} -> {}",
                receipt.stage, receipt.decision, receipt.id, receipt.previous_status, receipt.final_status
            ),
            &receipt,
        ),
        Err(error) => {
            CommandResult::from_application_error("approve", error, &context.correlation_id)
        }
    }
}
