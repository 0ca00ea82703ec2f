pub mod approve;
pub mod catalog;
pub mod config;
pub mod evaluate;
pub mod submission;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use rackrate_core::audit::AuditContext;
use rackrate_core::config::{AppConfig, ConfigOverrides, LoadOptions, StorageBackend};
use rackrate_core::discount::DiscountEngine;
use rackrate_core::errors::ApplicationError;
use rackrate_core::submission::{SubmissionRepository, SubmissionService};
use rackrate_db::{InMemorySubmissionRepository, JsonFileSubmissionRepository};

use crate::logging;
use crate::sinks::{TracingAuditSink, TracingNotifier};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), EXIT_INTERNAL)
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps a service error onto the envelope, keeping the correlation id so
    /// the failure can be found in the logs.
    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
    ) -> Self {
        let interface = error.into_interface(correlation_id);
        let exit_code = match interface.class() {
            "bad_request" => EXIT_REJECTED,
            "not_found" => EXIT_NOT_FOUND,
            "conflict" => EXIT_CONFLICT,
            _ => EXIT_INTERNAL,
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(interface.class().to_string()),
            message: format!("{} ({})", interface.user_message(), interface.message()),
            correlation_id: Some(correlation_id.to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_INPUT: u8 = 4;
pub const EXIT_REJECTED: u8 = 5;
pub const EXIT_NOT_FOUND: u8 = 6;
pub const EXIT_CONFLICT: u8 = 7;
pub const EXIT_INTERNAL: u8 = 8;

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides {
                data_dir: self.data_dir.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub(crate) fn load_config(
    command: &str,
    options: &GlobalOptions,
) -> Result<AppConfig, CommandResult> {
    let config = AppConfig::load(options.load_options()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })?;
    logging::init(&config);
    Ok(config)
}

pub(crate) fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) fn read_json<T: DeserializeOwned>(
    command: &str,
    path: &Path,
) -> Result<T, CommandResult> {
    parse_json_file(path).map_err(|error| {
        CommandResult::failure(command, "invalid_input", format!("{error:#}"), EXIT_INPUT)
    })
}

fn parse_json_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("could not parse `{}`", path.display()))
}

pub(crate) type CliService =
    SubmissionService<Arc<dyn SubmissionRepository>, TracingAuditSink, TracingNotifier>;

pub(crate) fn open_service(config: &AppConfig) -> CliService {
    let repository: Arc<dyn SubmissionRepository> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(InMemorySubmissionRepository::default()),
        StorageBackend::File => {
            Arc::new(JsonFileSubmissionRepository::new(config.storage.data_dir.clone()))
        }
    };

    SubmissionService::new(
        repository,
        TracingAuditSink,
        TracingNotifier::new(config.notifications.enabled),
        DiscountEngine::new(config.routing.thresholds()),
    )
}

pub(crate) fn audit_context(actor: &str) -> AuditContext {
    AuditContext::new(None, uuid::Uuid::new_v4().to_string(), actor)
}
