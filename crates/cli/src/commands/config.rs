use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use rackrate_core::config::AppConfig;

use crate::commands::{CommandResult, GlobalOptions, EXIT_CONFIG};

struct Field<'a> {
    key_path: &'a str,
    env_keys: &'a [&'a str],
    value: String,
}

pub fn run(options: &GlobalOptions) -> CommandResult {
    let config = match AppConfig::load(options.load_options()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        Field {
            key_path: "storage.backend",
            env_keys: &["RACKRATE_STORAGE_BACKEND"],
            value: format!("{:?}", config.storage.backend),
        },
        Field {
            key_path: "storage.data_dir",
            env_keys: &["RACKRATE_STORAGE_DATA_DIR"],
            value: config.storage.data_dir.display().to_string(),
        },
        Field {
            key_path: "routing.approver1_item_discount_pct",
            env_keys: &["RACKRATE_ROUTING_APPROVER1_ITEM_DISCOUNT_PCT"],
            value: config.routing.approver1_item_discount_pct.to_string(),
        },
        Field {
            key_path: "routing.approver2_blended_discount_pct",
            env_keys: &["RACKRATE_ROUTING_APPROVER2_BLENDED_DISCOUNT_PCT"],
            value: config.routing.approver2_blended_discount_pct.to_string(),
        },
        Field {
            key_path: "catalog.path",
            env_keys: &["RACKRATE_CATALOG_PATH"],
            value: config
                .catalog
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
        },
        Field {
            key_path: "notifications.enabled",
            env_keys: &["RACKRATE_NOTIFICATIONS_ENABLED"],
            value: config.notifications.enabled.to_string(),
        },
        Field {
            key_path: "logging.level",
            env_keys: &["RACKRATE_LOGGING_LEVEL", "RACKRATE_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_keys: &["RACKRATE_LOGGING_FORMAT", "RACKRATE_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = if field.key_path == "storage.data_dir" && options.data_dir.is_some() {
            "flag (--data-dir)".to_string()
        } else {
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(render_line(field.key_path, &field.value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("rackrate.toml"), PathBuf::from("config/rackrate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false) {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
