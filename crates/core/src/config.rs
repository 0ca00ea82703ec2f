use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discount::routing::RoutingThresholds;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub routing: RoutingConfig,
    pub catalog: CatalogConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoutingConfig {
    pub approver1_item_discount_pct: Decimal,
    pub approver2_blended_discount_pct: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NotificationsConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub storage_backend: Option<StorageBackend>,
    pub catalog_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let thresholds = RoutingThresholds::default();
        Self {
            storage: StorageConfig {
                backend: StorageBackend::File,
                data_dir: PathBuf::from(".rackrate/submissions"),
            },
            routing: RoutingConfig {
                approver1_item_discount_pct: thresholds.approver1_item_discount_pct,
                approver2_blended_discount_pct: thresholds.approver2_blended_discount_pct,
            },
            catalog: CatalogConfig::default(),
            notifications: NotificationsConfig { enabled: true },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend `{other}` (expected memory|file)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl RoutingConfig {
    pub fn thresholds(&self) -> RoutingThresholds {
        RoutingThresholds {
            approver1_item_discount_pct: self.approver1_item_discount_pct,
            approver2_blended_discount_pct: self.approver2_blended_discount_pct,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("rackrate.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(storage) = patch.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if let Some(data_dir) = storage.data_dir {
                self.storage.data_dir = data_dir;
            }
        }

        if let Some(routing) = patch.routing {
            if let Some(pct) = routing.approver1_item_discount_pct {
                self.routing.approver1_item_discount_pct = pct;
            }
            if let Some(pct) = routing.approver2_blended_discount_pct {
                self.routing.approver2_blended_discount_pct = pct;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(enabled) = notifications.enabled {
                self.notifications.enabled = enabled;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RACKRATE_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = read_env("RACKRATE_STORAGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("RACKRATE_ROUTING_APPROVER1_ITEM_DISCOUNT_PCT") {
            self.routing.approver1_item_discount_pct =
                parse_decimal("RACKRATE_ROUTING_APPROVER1_ITEM_DISCOUNT_PCT", &value)?;
        }
        if let Some(value) = read_env("RACKRATE_ROUTING_APPROVER2_BLENDED_DISCOUNT_PCT") {
            self.routing.approver2_blended_discount_pct =
                parse_decimal("RACKRATE_ROUTING_APPROVER2_BLENDED_DISCOUNT_PCT", &value)?;
        }

        if let Some(value) = read_env("RACKRATE_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("RACKRATE_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_bool("RACKRATE_NOTIFICATIONS_ENABLED", &value)?;
        }

        let log_level =
            read_env("RACKRATE_LOGGING_LEVEL").or_else(|| read_env("RACKRATE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RACKRATE_LOGGING_FORMAT").or_else(|| read_env("RACKRATE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.storage_backend {
            self.storage.backend = backend;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.storage.data_dir = data_dir;
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(enabled) = overrides.notifications_enabled {
            self.notifications.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_storage(&self.storage)?;
        validate_routing(&self.routing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("rackrate.toml"), PathBuf::from("config/rackrate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.backend == StorageBackend::File && storage.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "storage.data_dir must not be empty for the file backend".to_string(),
        ));
    }
    Ok(())
}

fn validate_routing(routing: &RoutingConfig) -> Result<(), ConfigError> {
    let in_range = |value: Decimal| value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED;

    if !in_range(routing.approver1_item_discount_pct) {
        return Err(ConfigError::Validation(
            "routing.approver1_item_discount_pct must be in range 0..=100".to_string(),
        ));
    }
    if !in_range(routing.approver2_blended_discount_pct) {
        return Err(ConfigError::Validation(
            "routing.approver2_blended_discount_pct must be in range 0..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    storage: Option<StoragePatch>,
    routing: Option<RoutingPatch>,
    catalog: Option<CatalogPatch>,
    notifications: Option<NotificationsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    backend: Option<StorageBackend>,
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RoutingPatch {
    approver1_item_discount_pct: Option<Decimal>,
    approver2_blended_discount_pct: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationsPatch {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, StorageBackend};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_thresholds() -> Result<(), String> {
        let config = AppConfig::default();
        let thresholds = config.routing.thresholds();

        ensure(
            thresholds.approver1_item_discount_pct == Decimal::from(80),
            "approver1 threshold should default to 80",
        )?;
        ensure(
            thresholds.approver2_blended_discount_pct == Decimal::from(60),
            "approver2 threshold should default to 60",
        )?;
        ensure(config.storage.backend == StorageBackend::File, "file backend should be default")?;
        ensure(config.notifications.enabled, "notifications should be enabled by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_RACKRATE_DATA_ROOT", "/srv/rackrate");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rackrate.toml");
            fs::write(
                &path,
                r#"
[storage]
data_dir = "${TEST_RACKRATE_DATA_ROOT}/submissions"

[routing]
approver1_item_discount_pct = "75"
approver2_blended_discount_pct = "55.5"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.storage.data_dir == PathBuf::from("/srv/rackrate/submissions"),
                "data dir should be interpolated from environment",
            )?;
            ensure(
                config.routing.approver2_blended_discount_pct == Decimal::new(555, 1),
                "blended threshold should be read from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_RACKRATE_DATA_ROOT"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RACKRATE_LOG_LEVEL", "warn");
        env::set_var("RACKRATE_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["RACKRATE_LOG_LEVEL", "RACKRATE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RACKRATE_STORAGE_DATA_DIR", "/from-env");
        env::set_var("RACKRATE_NOTIFICATIONS_ENABLED", "false");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rackrate.toml");
            fs::write(
                &path,
                r#"
[storage]
data_dir = "/from-file"

[notifications]
enabled = true

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.storage.data_dir == PathBuf::from("/from-env"),
                "env data dir should win over file and defaults",
            )?;
            ensure(!config.notifications.enabled, "env should disable notifications")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["RACKRATE_STORAGE_DATA_DIR", "RACKRATE_NOTIFICATIONS_ENABLED"]);
        result
    }

    #[test]
    fn invalid_threshold_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RACKRATE_ROUTING_APPROVER1_ITEM_DISCOUNT_PCT", "eighty");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected override failure but config loaded".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "RACKRATE_ROUTING_APPROVER1_ITEM_DISCOUNT_PCT"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["RACKRATE_ROUTING_APPROVER1_ITEM_DISCOUNT_PCT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RACKRATE_ROUTING_APPROVER2_BLENDED_DISCOUNT_PCT", "140");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("routing.approver2_blended_discount_pct")
            );
            ensure(has_message, "validation failure should name the threshold")
        })();

        clear_vars(&["RACKRATE_ROUTING_APPROVER2_BLENDED_DISCOUNT_PCT"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing file error".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref missing) if *missing == path),
            "missing file error should carry the requested path",
        )
    }
}
