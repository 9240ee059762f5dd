use dicat_config::{json_schema, ConfigValidationError, ConfigWarning, DicatConfig};
use dicat_diagnostics::ErrorMessageMode;
use pretty_assertions::assert_eq;

#[test]
fn parses_full_config() {
    let text = r#"
[diagnostics]
mode = "debug"

[contexts]
include = ["**/*.diconfig.ts"]
exclude = ["**/legacy/**"]

[logging]
level = "debug"
json = true
"#;

    let (config, diagnostics) =
        DicatConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:#?}");
    assert_eq!(config.diagnostics.mode, ErrorMessageMode::Debug);
    assert_eq!(config.contexts.include, vec!["**/*.diconfig.ts"]);
    assert_eq!(config.contexts.exclude, vec!["**/legacy/**"]);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn missing_sections_use_defaults() {
    let (config, diagnostics) =
        DicatConfig::load_from_str_with_diagnostics("").expect("empty config should parse");

    assert!(diagnostics.is_empty());
    assert_eq!(config, DicatConfig::default());
    assert_eq!(config.diagnostics.mode, ErrorMessageMode::Human);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn reports_unknown_keys_with_full_paths() {
    let text = r#"
typo = 1

[contexts]
inclde = ["*.ts"]

[logging]
levle = "debug"
"#;

    let (_config, diagnostics) =
        DicatConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.unknown_keys,
        vec!["contexts.inclde", "logging.levle", "typo"]
    );
    assert!(diagnostics.is_ok());
}

#[test]
fn invalid_glob_is_a_validation_error() {
    let text = r#"
[contexts]
include = ["src/**/*.ts", "src/[unclosed"]
"#;

    let (config, diagnostics) =
        DicatConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert!(!diagnostics.is_ok());
    let [ConfigValidationError::InvalidGlob {
        toml_path, pattern, ..
    }] = diagnostics.errors.as_slice()
    else {
        panic!("expected one invalid glob error, got {:#?}", diagnostics.errors);
    };
    assert_eq!(toml_path, "contexts.include[1]");
    assert_eq!(pattern, "src/[unclosed");
    assert!(config.contexts.filter().is_err());
}

#[test]
fn invalid_logging_level_is_a_warning() {
    let text = r#"
[logging]
level = "dicat.resolve=loud"
"#;

    let (_config, diagnostics) =
        DicatConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.warnings,
        vec![ConfigWarning::LoggingLevelInvalid {
            value: "dicat.resolve=loud".to_string(),
            normalized: "dicat.resolve=loud".to_string(),
        }]
    );
    assert!(diagnostics.is_ok());
}

#[test]
fn unknown_mode_is_a_parse_error() {
    let text = r#"
[diagnostics]
mode = "verbose"
"#;

    assert!(DicatConfig::load_from_str_with_diagnostics(text).is_err());
}

#[test]
fn json_schema_describes_sections() {
    let value = serde_json::to_value(json_schema()).expect("schema serializes");

    for section in ["diagnostics", "contexts", "logging"] {
        assert!(
            value.pointer(&format!("/properties/{section}")).is_some(),
            "missing section {section} in schema"
        );
    }
    let mode = value
        .pointer("/definitions/ErrorMessageMode")
        .expect("mode schema definition exists");
    assert!(mode.to_string().contains("debug"));
}
