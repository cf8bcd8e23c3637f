use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub renewal: RenewalConfig,
    #[serde(default)]
    pub acme: AcmeConfig,
    pub vault: VaultConfig,
    #[serde(default)]
    pub webroot: WebrootConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    9480
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("certward.db")
}

/// Renewal pass policy and background schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenewalConfig {
    /// Run renewal passes periodically in the background.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between background renewal passes.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Renew items last renewed more than this many days ago (0 = always).
    #[serde(default = "default_renewal_interval_days")]
    pub renewal_interval_days: u32,
    /// Only consider items flagged for auto renewal.
    #[serde(default = "default_true")]
    pub auto_renew_only: bool,
    /// Skip items whose site is known to be stopped.
    #[serde(default = "default_true")]
    pub skip_stopped_sites: bool,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            check_interval_secs: default_check_interval(),
            renewal_interval_days: default_renewal_interval_days(),
            auto_renew_only: true,
            skip_stopped_sites: true,
        }
    }
}

fn default_check_interval() -> u64 {
    12 * 60 * 60 // twice a day
}

fn default_renewal_interval_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// Certificate request behaviour.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AcmeConfig {
    /// Reuse still-valid identifiers from the vault instead of revalidating.
    #[serde(default)]
    pub reuse_identifiers: bool,
}

/// Vault sidecar connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
    /// Vault URL (e.g., "http://localhost:9400")
    pub url: String,
    /// Bearer token for the vault API
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Bounded wait for challenge validation in seconds (default: 120)
    #[serde(default = "default_validation_timeout")]
    pub validation_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_validation_timeout() -> u64 {
    120
}

/// Webroot binding administrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebrootConfig {
    /// Directory installed certificates are copied into.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Timeout for the configuration check request.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// HTTP port the configuration check connects to.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,
}

impl Default for WebrootConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            probe_timeout_secs: default_probe_timeout(),
            probe_port: default_probe_port(),
        }
    }
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("certs")
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_probe_port() -> u16 {
    80
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub renewal: RenewalConfig,
    pub acme: AcmeConfig,
    pub vault: SanitizedVaultConfig,
    pub webroot: WebrootConfig,
}

/// Sanitized vault config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedVaultConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
    pub validation_timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            renewal: config.renewal.clone(),
            acme: config.acme.clone(),
            vault: SanitizedVaultConfig {
                url: config.vault.url.clone(),
                api_key_configured: config.vault.api_key.is_some(),
                timeout_secs: config.vault.timeout_secs,
                validation_timeout_secs: config.vault.validation_timeout_secs,
            },
            webroot: config.webroot.clone(),
        }
    }
}
