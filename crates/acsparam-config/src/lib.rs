//! Shared configuration for acsparam front ends.
//!
//! TOML config file plus `ACSPARAM_*` environment overrides, NBI credential
//! resolution (env + keyring + plaintext), and translation into the
//! transport and task options `acsparam-api` expects.

use std::path::{Path, PathBuf};
use std::time::Duration;

use acsparam_api::{BasicAuth, TaskOptions, TlsMode, TransportConfig};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const KEYRING_SERVICE: &str = "acsparam";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no NBI password configured for user '{username}'")]
    NoCredentials { username: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the web UI; the CSV export link is built on it.
    #[serde(default = "default_ui_url")]
    pub ui_url: String,

    /// NBI base URL. Without it tasks are staged locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbi_url: Option<String>,

    /// Username for an NBI behind basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbi_username: Option<String>,

    /// NBI password (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbi_password: Option<String>,

    /// Environment variable name holding the NBI password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbi_password_env: Option<String>,

    /// Ask the ACS to wake the device when a task is posted.
    #[serde(default = "default_connection_request")]
    pub connection_request: bool,

    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    #[serde(default = "default_expression_cache_capacity")]
    pub expression_cache_capacity: usize,

    /// Accept invalid TLS certificates from the NBI.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate for the NBI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ui_url: default_ui_url(),
            nbi_url: None,
            nbi_username: None,
            nbi_password: None,
            nbi_password_env: None,
            connection_request: default_connection_request(),
            task_timeout_ms: default_task_timeout_ms(),
            search_debounce_ms: default_search_debounce_ms(),
            expression_cache_capacity: default_expression_cache_capacity(),
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
        }
    }
}

fn default_ui_url() -> String {
    "http://localhost:3000".into()
}
fn default_connection_request() -> bool {
    true
}
fn default_task_timeout_ms() -> u64 {
    3000
}
fn default_search_debounce_ms() -> u64 {
    500
}
fn default_expression_cache_capacity() -> usize {
    4096
}
fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Parsed `ui_url`.
    pub fn ui_base_url(&self) -> Result<Url, ConfigError> {
        parse_url("ui_url", &self.ui_url)
    }

    /// Parsed `nbi_url`, if one is configured.
    pub fn nbi_base_url(&self) -> Result<Option<Url>, ConfigError> {
        self.nbi_url
            .as_deref()
            .map(|raw| parse_url("nbi_url", raw))
            .transpose()
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn task_options(&self) -> TaskOptions {
        TaskOptions {
            connection_request: self.connection_request,
            timeout: (self.task_timeout_ms > 0).then(|| Duration::from_millis(self.task_timeout_ms)),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.timeout),
        }
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ui_base_url()?;
        self.nbi_base_url()?;
        if self.expression_cache_capacity == 0 {
            return Err(ConfigError::Validation {
                field: "expression_cache_capacity".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("'{raw}' cannot be used as a base URL"),
        });
    }
    Ok(url)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "acsparam", "acsparam").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("acsparam");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` plus environment. A missing file is not an
/// error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ACSPARAM_"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve NBI basic-auth credentials.
///
/// `Ok(None)` when no username is configured. With a username, the
/// password comes from `nbi_password_env`, then the system keyring, then
/// plaintext `nbi_password`.
pub fn resolve_nbi_credentials(cfg: &Config) -> Result<Option<BasicAuth>, ConfigError> {
    resolve_nbi_credentials_with(cfg, keyring_password)
}

/// Same as [`resolve_nbi_credentials`] with an injectable keyring lookup.
pub fn resolve_nbi_credentials_with<K>(
    cfg: &Config,
    keyring: K,
) -> Result<Option<BasicAuth>, ConfigError>
where
    K: FnOnce(&str) -> Option<String>,
{
    let Some(ref username) = cfg.nbi_username else {
        return Ok(None);
    };

    // 1. Env var named by the config
    if let Some(ref env_name) = cfg.nbi_password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(Some(basic(username, val)));
        }
    }

    // 2. System keyring
    if let Some(secret) = keyring(username) {
        return Ok(Some(basic(username, secret)));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = cfg.nbi_password {
        return Ok(Some(basic(username, pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        username: username.clone(),
    })
}

/// Store the NBI password for the configured username in the system
/// keyring, where [`resolve_nbi_credentials`] looks for it.
pub fn store_nbi_password(cfg: &Config, password: &str) -> Result<(), ConfigError> {
    store_nbi_password_with(cfg, password, |user, secret| {
        keyring::Entry::new(KEYRING_SERVICE, user).and_then(|entry| entry.set_password(secret))
    })
}

/// Same as [`store_nbi_password`] with an injectable keyring write. `write`
/// receives the keyring user name and the secret.
pub fn store_nbi_password_with<W>(
    cfg: &Config,
    password: &str,
    write: W,
) -> Result<(), ConfigError>
where
    W: FnOnce(&str, &str) -> keyring::Result<()>,
{
    let Some(ref username) = cfg.nbi_username else {
        return Err(ConfigError::Validation {
            field: "nbi_username".into(),
            reason: "set a username before storing a password".into(),
        });
    };
    if password.is_empty() {
        return Err(ConfigError::Validation {
            field: "nbi_password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    write(&keyring_user(username), password).map_err(|e| ConfigError::Validation {
        field: "keyring".into(),
        reason: format!("failed to store password in keyring: {e}"),
    })
}

fn keyring_password(username: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(username))
        .and_then(|entry| entry.get_password())
        .ok()
}

fn keyring_user(username: &str) -> String {
    format!("{username}/nbi-password")
}

fn basic(username: &str, password: String) -> BasicAuth {
    BasicAuth {
        username: username.to_owned(),
        password: SecretString::from(password),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn no_keyring(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("missing.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.ui_url, "http://localhost:3000");
            assert_eq!(cfg.search_debounce(), Duration::from_millis(500));
            assert_eq!(cfg.expression_cache_capacity, 4096);
            assert_eq!(cfg.task_options(), TaskOptions::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    ui_url = "https://acs.example.net"
                    nbi_url = "http://acs.example.net:7557"
                    task_timeout_ms = 1000
                "#,
            )?;
            jail.set_env("ACSPARAM_TASK_TIMEOUT_MS", "5000");
            jail.set_env("ACSPARAM_CONNECTION_REQUEST", "false");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.ui_url, "https://acs.example.net");
            assert_eq!(cfg.nbi_url.as_deref(), Some("http://acs.example.net:7557"));
            assert_eq!(
                cfg.task_options(),
                TaskOptions {
                    connection_request: false,
                    timeout: Some(Duration::from_millis(5000)),
                }
            );
            Ok(())
        });
    }

    #[test]
    fn rejects_bad_urls() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", r#"ui_url = "not a url""#)?;
            let err = load_config_from(Path::new("config.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "ui_url"));
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_omits_task_timeout() {
        let cfg = Config {
            task_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(cfg.task_options().timeout, None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            nbi_url: Some("http://acs:7557".into()),
            insecure: true,
            ..Config::default()
        };

        save_config_to(&cfg, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("nbi_url = \"http://acs:7557\""));
        assert!(!text.contains("nbi_password"));

        let loaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn transport_modes() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.transport().tls, TlsMode::System));
        cfg.ca_cert = Some(PathBuf::from("/etc/acs-ca.pem"));
        assert!(matches!(cfg.transport().tls, TlsMode::CustomCa(_)));
        cfg.insecure = true;
        assert!(matches!(cfg.transport().tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(cfg.transport().timeout, Duration::from_secs(30));
    }

    #[test]
    fn no_username_means_no_credentials() {
        let auth = resolve_nbi_credentials_with(&Config::default(), no_keyring).unwrap();
        assert!(auth.is_none());
    }

    #[test]
    fn stored_password_is_found_by_resolution() {
        let cfg = Config {
            nbi_username: Some("ops".into()),
            ..Config::default()
        };

        let mut vault: Option<(String, String)> = None;
        store_nbi_password_with(&cfg, "s3cret", |user, secret| {
            vault = Some((user.to_owned(), secret.to_owned()));
            Ok(())
        })
        .unwrap();
        let (stored_user, stored_secret) = vault.unwrap();
        assert_eq!(stored_user, "ops/nbi-password");

        let auth = resolve_nbi_credentials_with(&cfg, |username| {
            (keyring_user(username) == stored_user).then(|| stored_secret.clone())
        })
        .unwrap()
        .unwrap();
        assert_eq!(auth.password.expose_secret(), "s3cret");
    }

    #[test]
    fn storing_a_password_needs_username_and_secret() {
        let never = |_: &str, _: &str| -> keyring::Result<()> { unreachable!() };

        let err = store_nbi_password_with(&Config::default(), "pw", never).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "nbi_username"));

        let cfg = Config {
            nbi_username: Some("ops".into()),
            ..Config::default()
        };
        let err = store_nbi_password_with(&cfg, "", never).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "nbi_password"));

        let err =
            store_nbi_password_with(&cfg, "pw", |_, _| Err(keyring::Error::NoEntry)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "keyring"));
    }

    #[test]
    fn password_resolution_order() {
        Jail::expect_with(|jail| {
            let mut cfg = Config {
                nbi_username: Some("ops".into()),
                nbi_password: Some("plain".into()),
                nbi_password_env: Some("ACS_NBI_PW".into()),
                ..Config::default()
            };

            let auth = resolve_nbi_credentials_with(&cfg, no_keyring).unwrap().unwrap();
            assert_eq!(auth.password.expose_secret(), "plain");

            let auth = resolve_nbi_credentials_with(&cfg, |_| Some("stored".into()))
                .unwrap()
                .unwrap();
            assert_eq!(auth.password.expose_secret(), "stored");

            jail.set_env("ACS_NBI_PW", "from-env");
            let auth = resolve_nbi_credentials_with(&cfg, |_| Some("stored".into()))
                .unwrap()
                .unwrap();
            assert_eq!(auth.username, "ops");
            assert_eq!(auth.password.expose_secret(), "from-env");

            cfg.nbi_password = None;
            cfg.nbi_password_env = None;
            let err = resolve_nbi_credentials_with(&cfg, no_keyring).unwrap_err();
            assert!(matches!(err, ConfigError::NoCredentials { .. }));
            Ok(())
        });
    }
}
