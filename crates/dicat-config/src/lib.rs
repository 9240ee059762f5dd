//! `dicat.toml` configuration: loading, discovery, validation and logging setup.

use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use dicat_diagnostics::ErrorMessageMode;
use globset::{Glob, GlobSet, GlobSetBuilder};
use parking_lot::ReentrantMutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

mod diagnostics;
mod schema;

pub use diagnostics::{ConfigDiagnostics, ConfigValidationError, ConfigWarning};
pub use schema::json_schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct DicatConfig {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub contexts: ContextsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// How the diagnostic block is rendered: `human` or `debug` (JSON).
    #[serde(default)]
    pub mode: ErrorMessageMode,
}

/// Which files may define a context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ContextsConfig {
    /// Glob patterns a context file must match. Empty accepts every file.
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns that exclude files even when they match `include`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ContextsConfig {
    pub fn filter(&self) -> Result<ContextFilter, ConfigError> {
        let include = if self.include.is_empty() {
            None
        } else {
            Some(build_glob_set(&self.include)?)
        };
        Ok(ContextFilter {
            include,
            exclude: build_glob_set(&self.exclude)?,
        })
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            message: err.kind().to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| ConfigError::InvalidGlob {
        pattern: patterns.join(", "),
        message: err.kind().to_string(),
    })
}

/// Compiled form of [`ContextsConfig`].
#[derive(Debug, Clone)]
pub struct ContextFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl ContextFilter {
    pub fn allow_all() -> Self {
        Self {
            include: None,
            exclude: GlobSet::empty(),
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if self.exclude.is_match(path) {
            return false;
        }
        match &self.include {
            Some(include) => include.is_match(path),
            None => true,
        }
    }
}

impl Default for ContextFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all dicat crates, or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective `EnvFilter`; `RUST_LOG`, when set, is merged into the configured level.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid glob pattern `{pattern}`: {message}")]
    InvalidGlob { pattern: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep the message and drop the source snippet.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl DicatConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = read_config(path.as_ref())?;
        Ok(toml::from_str(&text)?)
    }

    /// Loads a config file and returns diagnostics (unknown keys and semantic validation failures).
    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let text = read_config(path.as_ref())?;
        Self::load_from_str_with_diagnostics(&text)
    }

    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) =
            diagnostics::deserialize_toml_with_unknown_keys::<DicatConfig>(text)?;

        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };
        diagnostics::validate(&config, &mut diagnostics);

        Ok((config, diagnostics))
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub const DICAT_CONFIG_ENV_VAR: &str = "DICAT_CONFIG_PATH";

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Runs `f` while holding the config environment lock.
///
/// Tests that set [`DICAT_CONFIG_ENV_VAR`] wrap the mutation and the discovery
/// call in this so that concurrent discovery never observes the override.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Discovers the configuration file for a workspace root.
///
/// Search order:
/// 1) `DICAT_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `dicat.toml` in `workspace_root`
/// 3) `.dicat.toml` in `workspace_root`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(DICAT_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["dicat.toml", ".dicat.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Loads the configuration for a workspace root.
///
/// If no config is present, returns [`DicatConfig::default`], `None`, and empty diagnostics.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(DicatConfig, Option<PathBuf>, ConfigDiagnostics), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((DicatConfig::default(), None, ConfigDiagnostics::default()));
    };

    let (config, diagnostics) = DicatConfig::load_from_path_with_diagnostics(&path)?;
    Ok((config, Some(path), diagnostics))
}

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber, writing to stderr.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!(
                target: "dicat.config",
                "a global tracing subscriber is already installed"
            );
        }
    });
}
