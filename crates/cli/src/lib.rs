pub mod commands;
pub mod logging;
pub mod sinks;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use rackrate_core::domain::approval::{ApprovalDecision, ApproverStage, FinalStatus};
use rackrate_core::domain::line_item::TableKind;

use commands::approve::ApproveArgs;
use commands::GlobalOptions;

#[derive(Debug, Parser)]
#[command(
    name = "rackrate",
    about = "Rackrate discount approval CLI",
    long_about = "Price quotes, route discounts to approvers, and record approval decisions.",
    after_help = "Examples:\n  rackrate evaluate --file quote.json\n  rackrate submit --file quote.json --submitted-by jlee\n  rackrate approve <id> --stage approver1 --decision APPROVE --expected-status PENDING --expected-version 1 --name \"Dana Reyes\""
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to rackrate.toml (required to exist when given)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override storage.data_dir")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price and route product tables without storing them")]
    Evaluate {
        #[arg(long, help = "JSON file with home_products/branch_products")]
        file: PathBuf,
    },
    #[command(about = "Store a new quote and route it for approval")]
    Submit {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        submitted_by: String,
    },
    #[command(about = "Show a stored quote with recomputed totals")]
    Show { id: String },
    #[command(about = "List stored quotes")]
    List,
    #[command(about = "Replace a quote's products before any approver has acted")]
    Edit {
        id: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        expected_version: u64,
        #[arg(long)]
        updated_by: String,
    },
    #[command(about = "Record an approver decision")]
    Approve {
        id: String,
        #[arg(long, help = "approver1 | approver2")]
        stage: ApproverStage,
        #[arg(long, help = "APPROVE | REJECT")]
        decision: ApprovalDecision,
        #[arg(long, help = "Status the quote was in when it was reviewed")]
        expected_status: FinalStatus,
        #[arg(long)]
        expected_version: u64,
        #[arg(long = "name")]
        approver_name: String,
        #[arg(long = "date", help = "Decision date (YYYY-MM-DD); defaults to today")]
        decision_date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        comments: String,
    },
    #[command(about = "List catalog products, optionally for one location")]
    Catalog {
        #[arg(long, help = "home | branch")]
        location: Option<TableKind>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = GlobalOptions { config_path: cli.config, data_dir: cli.data_dir };

    let result = match cli.command {
        Command::Evaluate { file } => commands::evaluate::run(&options, &file),
        Command::Submit { file, submitted_by } => {
            commands::submission::submit(&options, &file, &submitted_by)
        }
        Command::Show { id } => commands::submission::show(&options, &id),
        Command::List => commands::submission::list(&options),
        Command::Edit { id, file, expected_version, updated_by } => {
            commands::submission::edit(&options, &id, &file, expected_version, &updated_by)
        }
        Command::Approve {
            id,
            stage,
            decision,
            expected_status,
            expected_version,
            approver_name,
            decision_date,
            comments,
        } => commands::approve::run(
            &options,
            ApproveArgs {
                id,
                stage,
                decision,
                expected_status,
                expected_version,
                approver_name,
                decision_date,
                comments,
            },
        ),
        Command::Catalog { location } => commands::catalog::run(&options, location),
        Command::Config => commands::config::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
