use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use harbor_day2_api::{ClientConfig, Credentials};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub harbor: HarborSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    /// OIDC values injected into the configurations document
    #[serde(default)]
    pub oidc: OidcSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Harbor validations
        let api_url = self
            .harbor
            .api_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or("harbor.api_url is required")?;
        let parsed =
            url::Url::parse(api_url).map_err(|e| format!("harbor.api_url is invalid: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err("harbor.api_url must use http or https".into());
        }
        if self.harbor.timeout_secs == 0 {
            return Err("harbor.timeout_secs must be > 0".into());
        }
        if self.harbor.page_size == 0 {
            return Err("harbor.page_size must be > 0".into());
        }
        // Admin validations
        if self.admin.username.is_empty() {
            return Err("admin.username must not be empty".into());
        }
        if self.admin.password.as_deref().unwrap_or("").is_empty() {
            return Err("admin.password is required".into());
        }
        if self.admin.rotation_timeout_secs == 0 {
            return Err("admin.rotation_timeout_secs must be > 0".into());
        }
        // Sync validations
        if self.sync.config_folder.is_none() {
            return Err("sync.config_folder is required".into());
        }
        if self.sync.health_poll_interval_secs == 0 {
            return Err("sync.health_poll_interval_secs must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// Client settings authenticating the admin user with `password`.
    pub fn client_config(&self, password: &str) -> ClientConfig {
        ClientConfig::new(
            self.harbor.api_url.clone().unwrap_or_default(),
            Credentials::new(self.admin.username.clone(), password),
        )
        .with_timeout(self.timeout())
        .with_accept_invalid_certs(self.harbor.insecure)
        .with_page_size(self.harbor.page_size)
    }

    /// Client settings authenticating with the old admin password, bounded
    /// by `admin.rotation_timeout_secs`.
    pub fn rotation_client_config(&self, old_password: &str) -> ClientConfig {
        self.client_config(old_password)
            .with_timeout(Duration::from_secs(self.admin.rotation_timeout_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.harbor.timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.health_poll_interval_secs)
    }

    pub fn config_folder(&self) -> PathBuf {
        self.sync.config_folder.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarborSettings {
    /// Base URL of the instance, without the `/api/v2.0` suffix
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Accept self-signed certificates
    #[serde(default = "default_insecure")]
    pub insecure: bool,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_timeout_secs() -> u64 {
    100
}
fn default_insecure() -> bool {
    true
}
fn default_page_size() -> usize {
    100
}

impl Default for HarborSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_timeout_secs(),
            insecure: default_insecure(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AdminSettings {
    #[serde(default = "default_admin_username")]
    pub username: String,
    /// Password the admin user must end up with
    #[serde(default)]
    pub password: Option<String>,
    /// Password to rotate away from when the configured one is rejected
    #[serde(default)]
    pub old_password: Option<String>,
    /// Request timeout of the client authenticated with `old_password`
    #[serde(default = "default_rotation_timeout_secs")]
    pub rotation_timeout_secs: u64,
}

fn default_admin_username() -> String {
    "admin".into()
}
fn default_rotation_timeout_secs() -> u64 {
    10
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
            old_password: None,
            rotation_timeout_secs: default_rotation_timeout_secs(),
        }
    }
}

impl fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSettings")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("old_password", &self.old_password.as_ref().map(|_| "***"))
            .field("rotation_timeout_secs", &self.rotation_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Folder holding the resource documents
    #[serde(default)]
    pub config_folder: Option<PathBuf>,
    #[serde(default = "default_robot_prefix")]
    pub robot_prefix: String,
    #[serde(default = "default_health_poll_interval_secs")]
    pub health_poll_interval_secs: u64,
}

fn default_robot_prefix() -> String {
    "robot$".into()
}
fn default_health_poll_interval_secs() -> u64 {
    5
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            config_folder: None,
            robot_prefix: default_robot_prefix(),
            health_poll_interval_secs: default_health_poll_interval_secs(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct OidcSettings {
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl fmt::Debug for OidcSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcSettings")
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use std::path::PathBuf;

    /// Default configuration file, read when present.
    pub const DEFAULT_CONFIG_FILE: &str = "harbor-day2.toml";

    /// Builds the configuration from the TOML file at `path` (if it exists)
    /// and `HARBOR_DAY2__*` environment overrides, without validating it.
    pub fn load_unvalidated(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf).format(FileFormat::Toml));
        }
        // Environment variable overrides, e.g. HARBOR_DAY2__HARBOR__PAGE_SIZE=50
        builder = builder.add_source(
            Environment::with_prefix("HARBOR_DAY2")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        cfg.try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))
    }

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let merged = load_unvalidated(path)?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.harbor.api_url = Some("https://harbor.example.com".into());
        cfg.admin.password = Some("Harbor12345".into());
        cfg.sync.config_folder = Some(PathBuf::from("/config"));
        cfg
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.harbor.timeout_secs, 100);
        assert!(cfg.harbor.insecure);
        assert_eq!(cfg.admin.username, "admin");
        assert_eq!(cfg.sync.robot_prefix, "robot$");
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_validate_requires_connection_settings() {
        assert!(valid().validate().is_ok());

        let mut cfg = valid();
        cfg.harbor.api_url = None;
        assert!(cfg.validate().unwrap_err().contains("api_url"));

        let mut cfg = valid();
        cfg.harbor.api_url = Some("ftp://harbor".into());
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.admin.password = Some(String::new());
        assert!(cfg.validate().unwrap_err().contains("admin.password"));

        let mut cfg = valid();
        cfg.sync.config_folder = None;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rotation_client_has_its_own_timeout() {
        let cfg = valid();
        assert_eq!(cfg.client_config("new").timeout, Duration::from_secs(100));
        assert_eq!(
            cfg.rotation_client_config("old").timeout,
            Duration::from_secs(10)
        );

        let mut cfg = valid();
        cfg.admin.rotation_timeout_secs = 0;
        assert!(cfg.validate().unwrap_err().contains("rotation_timeout_secs"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut cfg = valid();
        cfg.oidc.client_secret = Some("oidc-secret".into());
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("Harbor12345"));
        assert!(!rendered.contains("oidc-secret"));
    }
}
