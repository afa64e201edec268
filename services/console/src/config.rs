//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The gateway password is loaded from the CONSOLE_PASSWORD env var or
//! password_file, never stored in the TOML directly to avoid leaking
//! secrets.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stream_ingest::AlertSettings;

use crate::error::{Error, Result};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub timers: TimerConfig,
}

/// Gateway connection settings
#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(skip)]
    pub password: Option<String>,
    /// Path to a file containing the console password (alternative to the
    /// CONSOLE_PASSWORD env var)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
}

/// Alert detection settings
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub rate_limit_alerts: bool,
    #[serde(default = "default_true")]
    pub account_error_alerts: bool,
    #[serde(default)]
    pub sound: bool,
    /// Suppression window for repeated rate-limit notifications, seconds.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            rate_limit_alerts: true,
            account_error_alerts: true,
            sound: false,
            rate_limit_window_secs: default_rate_limit_window(),
        }
    }
}

/// Session timer intervals. Overridable so tests can compress time.
#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    #[serde(default = "default_version_poll_secs")]
    pub version_poll_secs: u64,
    #[serde(default = "default_resync_millis")]
    pub resync_millis: u64,
    #[serde(default = "default_stream_retry_millis")]
    pub stream_retry_millis: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            version_poll_secs: default_version_poll_secs(),
            resync_millis: default_resync_millis(),
            stream_retry_millis: default_stream_retry_millis(),
        }
    }
}

impl TimerConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn version_poll(&self) -> Duration {
        Duration::from_secs(self.version_poll_secs)
    }

    pub fn resync(&self) -> Duration {
        Duration::from_millis(self.resync_millis)
    }

    pub fn stream_retry(&self) -> Duration {
        Duration::from_millis(self.stream_retry_millis)
    }
}

fn default_true() -> bool {
    true
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_refresh_secs() -> u64 {
    30
}

fn default_version_poll_secs() -> u64 {
    120
}

fn default_resync_millis() -> u64 {
    4000
}

fn default_stream_retry_millis() -> u64 {
    5000
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables.
    ///
    /// Password resolution order:
    /// 1. CONSOLE_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.gateway.base_url.starts_with("http://")
            && !config.gateway.base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.gateway.base_url
            )));
        }

        if config.alerts.rate_limit_window_secs > 3600 {
            return Err(Error::Validation {
                field: "rate_limit_window_secs",
                message: format!(
                    "must be at most 3600, got {}",
                    config.alerts.rate_limit_window_secs
                ),
            });
        }

        // Resolve the password: env var takes precedence over file
        if let Ok(password) = std::env::var("CONSOLE_PASSWORD") {
            config.gateway.password = Some(password);
        } else if let Some(ref password_file) = config.gateway.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = password.trim().to_owned();
            if !password.is_empty() {
                config.gateway.password = Some(password);
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("gateway-console.toml")
    }

    /// Alert-detector settings derived from the alerts section.
    pub fn alert_settings(&self) -> AlertSettings {
        AlertSettings {
            rate_limit_alerts: self.alerts.rate_limit_alerts,
            account_error_alerts: self.alerts.account_error_alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables,
    /// preventing data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env
    /// mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[gateway]
base_url = "http://127.0.0.1:8080"

[alerts]
sound = true
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_valid_config_applies_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.gateway.base_url, "http://127.0.0.1:8080");
        assert!(config.gateway.password.is_none());
        assert!(config.alerts.rate_limit_alerts);
        assert!(config.alerts.account_error_alerts);
        assert!(config.alerts.sound);
        assert_eq!(config.alerts.rate_limit_window_secs, 60);
        assert_eq!(config.timers.refresh(), Duration::from_secs(30));
        assert_eq!(config.timers.version_poll(), Duration::from_secs(120));
        assert_eq!(config.timers.resync(), Duration::from_millis(4000));
        assert_eq!(config.timers.stream_retry(), Duration::from_millis(5000));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(matches!(Config::load(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn base_url_without_scheme_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[gateway]\nbase_url = \"127.0.0.1:8080\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url must start with http"));
    }

    #[test]
    fn oversized_rate_limit_window_rejected_locally() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[gateway]
base_url = "http://127.0.0.1:8080"

[alerts]
rate_limit_window_secs = 7200
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                field: "rate_limit_window_secs",
                ..
            }
        ));
    }

    #[test]
    fn password_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("CONSOLE_PASSWORD", "hunter2") };
        let config = Config::load(&path).unwrap();
        assert_eq!(config.gateway.password.as_deref(), Some("hunter2"));
        unsafe { remove_env("CONSOLE_PASSWORD") };
    }

    #[test]
    fn password_from_file_trimmed() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let password_path = dir.path().join("password");
        std::fs::write(&password_path, "from-file\n").unwrap();

        let path = write_config(
            &dir,
            &format!(
                "[gateway]\nbase_url = \"http://127.0.0.1:8080\"\npassword_file = \"{}\"\n",
                password_path.display()
            ),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.gateway.password.as_deref(), Some("from-file"));
    }

    #[test]
    fn password_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let password_path = dir.path().join("password");
        std::fs::write(&password_path, "file-value").unwrap();

        let path = write_config(
            &dir,
            &format!(
                "[gateway]\nbase_url = \"http://127.0.0.1:8080\"\npassword_file = \"{}\"\n",
                password_path.display()
            ),
        );

        unsafe { set_env("CONSOLE_PASSWORD", "env-value") };
        let config = Config::load(&path).unwrap();
        assert_eq!(config.gateway.password.as_deref(), Some("env-value"));
        unsafe { remove_env("CONSOLE_PASSWORD") };
    }

    #[test]
    fn whitespace_only_password_file_yields_none() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let password_path = dir.path().join("password");
        std::fs::write(&password_path, "  \n  ").unwrap();

        let path = write_config(
            &dir,
            &format!(
                "[gateway]\nbase_url = \"http://127.0.0.1:8080\"\npassword_file = \"{}\"\n",
                password_path.display()
            ),
        );

        let config = Config::load(&path).unwrap();
        assert!(config.gateway.password.is_none());
    }

    #[test]
    fn nonexistent_password_file_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[gateway]\nbase_url = \"http://127.0.0.1:8080\"\npassword_file = \"/nonexistent/password\"\n",
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        assert_eq!(
            Config::resolve_path(Some("/cli/wins.toml")),
            PathBuf::from("/cli/wins.toml")
        );
        assert_eq!(
            Config::resolve_path(None),
            PathBuf::from("/env/should-lose.toml")
        );
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(
            Config::resolve_path(None),
            PathBuf::from("gateway-console.toml")
        );
    }

    #[test]
    fn timer_overrides_apply() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[gateway]
base_url = "http://127.0.0.1:8080"

[timers]
refresh_secs = 1
resync_millis = 10
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timers.refresh(), Duration::from_secs(1));
        assert_eq!(config.timers.resync(), Duration::from_millis(10));
        // Unset timers keep defaults
        assert_eq!(config.timers.version_poll(), Duration::from_secs(120));
    }

    #[test]
    fn alert_settings_mirror_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONSOLE_PASSWORD") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[gateway]
base_url = "http://127.0.0.1:8080"

[alerts]
rate_limit_alerts = false
"#,
        );

        let config = Config::load(&path).unwrap();
        let settings = config.alert_settings();
        assert!(!settings.rate_limit_alerts);
        assert!(settings.account_error_alerts);
    }
}
