use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding the built SPA (index.html + assets)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static/dist")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens. Sessions do not survive a restart when unset.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Mark the `token` cookie as Secure (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookie: bool,
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Password for the bootstrap admin. No admin is created when unset.
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            secure_cookie: false,
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
            admin_password: None,
        }
    }
}

fn default_jwt_secret() -> String {
    warn!("No auth.jwt_secret configured, generating an ephemeral one");
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@hrdesk.local".to_string()
}

/// Business-rule knobs that are constants in most deployments.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Hours recorded when an admin marks a day as leave
    #[serde(default = "default_leave_day_hours")]
    pub leave_day_hours: f64,
    /// A user counts as online when last active within this window
    #[serde(default = "default_online_window_minutes")]
    pub online_window_minutes: i64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Initial leave allocations, copied into system settings on first start
    #[serde(default)]
    pub leave_defaults: LeaveDefaults,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            leave_day_hours: default_leave_day_hours(),
            online_window_minutes: default_online_window_minutes(),
            min_password_length: default_min_password_length(),
            leave_defaults: LeaveDefaults::default(),
        }
    }
}

fn default_leave_day_hours() -> f64 {
    8.0
}

fn default_online_window_minutes() -> i64 {
    5
}

fn default_min_password_length() -> usize {
    8
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LeaveDefaults {
    #[serde(default = "default_sick_leave")]
    pub sick_leave: i64,
    #[serde(default = "default_vacation")]
    pub vacation: i64,
    #[serde(default = "default_personal_leave")]
    pub personal_leave: i64,
}

impl Default for LeaveDefaults {
    fn default() -> Self {
        Self {
            sick_leave: default_sick_leave(),
            vacation: default_vacation(),
            personal_leave: default_personal_leave(),
        }
    }
}

fn default_sick_leave() -> i64 {
    12
}

fn default_vacation() -> i64 {
    20
}

fn default_personal_leave() -> i64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            policy: PolicyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.policy.leave_day_hours, 8.0);
        assert_eq!(config.policy.online_window_minutes, 5);
        assert_eq!(config.policy.leave_defaults.sick_leave, 12);
        assert!(config.auth.admin_password.is_none());
        assert_eq!(config.auth.jwt_secret.len(), 64);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8081

            [policy.leave_defaults]
            vacation = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.policy.leave_defaults.vacation, 25);
        assert_eq!(config.policy.leave_defaults.sick_leave, 12);
        assert_eq!(config.logging.level, "info");
    }
}
