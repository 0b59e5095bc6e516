use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "harbor-day2")]
#[command(about = "Synchronize a Harbor instance with a folder of configuration documents")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "HARBOR_DAY2_CONFIG")]
    pub config: Option<String>,

    /// Harbor base URL, e.g. https://harbor.example.com
    #[arg(long, env = "HARBOR_API_URL")]
    pub api_url: Option<String>,

    /// Folder holding registries.json, projects.json, ...
    #[arg(long, env = "CONFIG_FOLDER_PATH")]
    pub config_folder: Option<PathBuf>,

    #[arg(long, env = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Password the admin user must have after the run
    #[arg(long, env = "ADMIN_PASSWORD_NEW", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Current admin password, used when the new one is rejected
    #[arg(long, env = "ADMIN_PASSWORD_OLD", hide_env_values = true)]
    pub old_admin_password: Option<String>,

    /// Prefix the service puts in front of robot account names
    #[arg(long, env = "ROBOT_NAME_PREFIX")]
    pub robot_prefix: Option<String>,

    #[arg(long, env = "OIDC_STATIC_CLIENT_TOKEN", hide_env_values = true)]
    pub oidc_client_secret: Option<String>,

    #[arg(long, env = "OIDC_ENDPOINT")]
    pub oidc_endpoint: Option<String>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long)]
    pub log_format: Option<LogFormatArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    /// Overrides file and environment settings with the given flags.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(url) = &self.api_url {
            cfg.harbor.api_url = Some(url.clone());
        }
        if let Some(folder) = &self.config_folder {
            cfg.sync.config_folder = Some(folder.clone());
        }
        if let Some(username) = &self.admin_username {
            cfg.admin.username = username.clone();
        }
        if let Some(password) = &self.admin_password {
            cfg.admin.password = Some(password.clone());
        }
        if let Some(password) = &self.old_admin_password {
            cfg.admin.old_password = Some(password.clone());
        }
        if let Some(prefix) = &self.robot_prefix {
            cfg.sync.robot_prefix = prefix.clone();
        }
        if let Some(secret) = &self.oidc_client_secret {
            cfg.oidc.client_secret = Some(secret.clone());
        }
        if let Some(endpoint) = &self.oidc_endpoint {
            cfg.oidc.endpoint = Some(endpoint.clone());
        }
        if let Some(level) = &self.log_level {
            cfg.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            cfg.logging.format = format.into();
        }
    }
}
