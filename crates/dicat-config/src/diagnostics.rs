use serde::de::DeserializeOwned;

use crate::{ContextsConfig, DicatConfig, LoggingConfig};

/// Diagnostics produced while loading and validating a config.
///
/// Loading is best effort: callers always get a `DicatConfig` when
/// deserialization succeeds, plus whatever problems were found on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Keys present in the input that the schema does not know, as dotted paths.
    pub unknown_keys: Vec<String>,
    pub warnings: Vec<ConfigWarning>,
    /// Fatal semantic validation failures.
    pub errors: Vec<ConfigValidationError>,
}

impl ConfigDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    LoggingLevelInvalid { value: String, normalized: String },
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidGlob {
        toml_path: String,
        pattern: String,
        message: String,
    },
}

pub(crate) fn validate(config: &DicatConfig, out: &mut ConfigDiagnostics) {
    validate_contexts(&config.contexts, out);
    validate_logging(&config.logging, out);
}

fn validate_contexts(contexts: &ContextsConfig, out: &mut ConfigDiagnostics) {
    let sections = [("include", &contexts.include), ("exclude", &contexts.exclude)];
    for (key, patterns) in sections {
        for (idx, pattern) in patterns.iter().enumerate() {
            if let Err(err) = globset::Glob::new(pattern) {
                out.errors.push(ConfigValidationError::InvalidGlob {
                    toml_path: format!("contexts.{key}[{idx}]"),
                    pattern: pattern.clone(),
                    message: err.kind().to_string(),
                });
            }
        }
    }
}

fn validate_logging(logging: &LoggingConfig, out: &mut ConfigDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&logging.level);
    if !logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: logging.level.clone(),
            normalized,
        });
    }
}

pub(crate) fn deserialize_toml_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::<String>::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(path.to_string().trim_start_matches('.').to_owned());
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}
