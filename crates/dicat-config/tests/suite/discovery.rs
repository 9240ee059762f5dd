use std::ffi::OsString;

use dicat_config::{
    discover_config_path, load_for_workspace, with_config_env_lock, DICAT_CONFIG_ENV_VAR,
};
use dicat_diagnostics::ErrorMessageMode;
use tempfile::tempdir;

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn discovers_dicat_toml_in_workspace_root() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(DICAT_CONFIG_ENV_VAR);

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("dicat.toml");
        std::fs::write(&config_path, "[diagnostics]\nmode = \"debug\"\n").unwrap();

        let discovered = discover_config_path(dir.path()).expect("dicat.toml is discovered");
        assert_eq!(discovered, config_path.canonicalize().unwrap_or(config_path));
    });
}

#[test]
fn falls_back_to_hidden_config() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(DICAT_CONFIG_ENV_VAR);

        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".dicat.toml");
        std::fs::write(&config_path, "").unwrap();

        let discovered = discover_config_path(dir.path()).expect(".dicat.toml is discovered");
        assert_eq!(discovered, config_path.canonicalize().unwrap_or(config_path));
    });
}

#[test]
fn env_override_wins_over_workspace_file() {
    with_config_env_lock(|| {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("dicat.toml"), "[diagnostics]\nmode = \"human\"\n")
            .unwrap();
        std::fs::write(
            dir.path().join("override.toml"),
            "[diagnostics]\nmode = \"debug\"\n",
        )
        .unwrap();

        // Relative values are resolved against the workspace root.
        let _env = EnvVarGuard::set(DICAT_CONFIG_ENV_VAR, std::path::Path::new("override.toml"));

        let (config, path, diagnostics) = load_for_workspace(dir.path()).unwrap();
        assert_eq!(config.diagnostics.mode, ErrorMessageMode::Debug);
        assert!(path.unwrap().ends_with("override.toml"));
        assert!(diagnostics.is_empty());
    });
}

#[test]
fn missing_config_yields_defaults() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(DICAT_CONFIG_ENV_VAR);

        let dir = tempdir().unwrap();
        let (config, path, diagnostics) = load_for_workspace(dir.path()).unwrap();
        assert_eq!(config, Default::default());
        assert_eq!(path, None);
        assert!(diagnostics.is_empty());
    });
}
