//! Configuration file management.
//!
//! The server reads `config.toml` from its data directory. Every section
//! and field is optional; missing values fall back to the defaults below.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use eksporyuk_ledger::commission::{
    RevenueSplit, DEFAULT_ADMIN_PCT, DEFAULT_COFOUNDER_PCT, DEFAULT_FOUNDER_PCT,
};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "EKSPORYUK_DATA_DIR";

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Platform revenue split.
    #[serde(default)]
    pub revenue: RevenueConfig,
    /// Affiliate defaults.
    #[serde(default)]
    pub affiliate: AffiliateConfig,
    /// First-run admin account.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// 0 = OS-assigned ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in hours.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (HTTPS only).
    #[serde(default)]
    pub secure_cookie: bool,
}

/// Revenue split configuration.
///
/// Empty recipient ids mean "the admin who records the sale".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueConfig {
    #[serde(default)]
    pub admin_user_id: String,
    #[serde(default)]
    pub founder_user_id: String,
    #[serde(default)]
    pub cofounder_user_id: String,
    /// Admin fee, percent of what is left after the affiliate commission.
    #[serde(default = "default_admin_pct")]
    pub admin_pct: i64,
    /// Founder share, percent of what is left after the admin fee.
    #[serde(default = "default_founder_pct")]
    pub founder_pct: i64,
    /// Co-founder share, percent of what is left after the admin fee.
    #[serde(default = "default_cofounder_pct")]
    pub cofounder_pct: i64,
}

/// Affiliate defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateConfig {
    /// Commission rate (percent) given to new affiliates.
    #[serde(default = "default_commission_rate")]
    pub default_commission_rate: i64,
    /// Let affiliates post package top-ups themselves. No payment is
    /// collected, so keep this off unless a payment step sits in front.
    #[serde(default)]
    pub self_service_top_up: bool,
}

/// Admin account created on first start when no admin exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Empty = do not create an admin.
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: String,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_session_ttl() -> u64 {
    24 * 7
}

fn default_cookie_name() -> String {
    "eksporyuk_session".to_string()
}

fn default_admin_pct() -> i64 {
    DEFAULT_ADMIN_PCT
}

fn default_founder_pct() -> i64 {
    DEFAULT_FOUNDER_PCT
}

fn default_cofounder_pct() -> i64 {
    DEFAULT_COFOUNDER_PCT
}

fn default_commission_rate() -> i64 {
    eksporyuk_types::DEFAULT_COMMISSION_RATE
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl(),
            cookie_name: default_cookie_name(),
            secure_cookie: false,
        }
    }
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            admin_user_id: String::new(),
            founder_user_id: String::new(),
            cofounder_user_id: String::new(),
            admin_pct: default_admin_pct(),
            founder_pct: default_founder_pct(),
            cofounder_pct: default_cofounder_pct(),
        }
    }
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        Self {
            default_commission_rate: default_commission_rate(),
            self_service_top_up: false,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_email: String::new(),
            admin_password: String::new(),
            admin_name: default_admin_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RevenueConfig {
    /// The configured percentages as a ledger split.
    pub fn split(&self) -> RevenueSplit {
        RevenueSplit {
            admin_pct: self.admin_pct,
            founder_pct: self.founder_pct,
            cofounder_pct: self.cofounder_pct,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config: ServerConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.revenue
            .split()
            .validate()
            .map_err(|e| anyhow::anyhow!("[revenue] {e}"))?;
        if !(0..=100).contains(&self.affiliate.default_commission_rate) {
            anyhow::bail!(
                "[affiliate] default_commission_rate {} out of range",
                self.affiliate.default_commission_rate
            );
        }
        if self.auth.session_ttl_hours == 0 {
            anyhow::bail!("[auth] session_ttl_hours must be positive");
        }
        Ok(())
    }

    /// Socket address to listen on.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.bind, self.server.port).parse()?)
    }

    /// Session lifetime in seconds.
    pub fn session_ttl_secs(&self) -> u64 {
        self.auth.session_ttl_hours * 3600
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Default data directory: `$EKSPORYUK_DATA_DIR`, else `~/.eksporyuk`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".eksporyuk"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/eksporyuk"))
    }
}
