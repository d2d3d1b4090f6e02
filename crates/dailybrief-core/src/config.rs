use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Missed-schedule sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 15 * 60;
/// Liveness self-ping cadence (platform anti-idle).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10 * 60;

/// Top-level config (dailybrief.toml + DAILYBRIEF_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DailybriefConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Externally reachable base URL, e.g. "https://dailybrief.example.com".
    /// The heartbeat pinger targets `{public_url}/ping`.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Reference time zone for delivery times, as minutes east of UTC.
    /// 0 means delivery times are interpreted as UTC wall-clock.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Cadence of the missed-schedule sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Delay before the single generation retry after a transient failure.
    /// 0 disables the retry.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            sweep_interval_secs: default_sweep_interval(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Enable the self-ping loop. Set true in production deployments where
    /// the hosting platform suspends idle processes.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
    /// Delay before the single retry after a failed ping.
    #[serde(default = "default_heartbeat_retry")]
    pub retry_delay_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_heartbeat_interval(),
            retry_delay_secs: default_heartbeat_retry(),
        }
    }
}

/// Summary-generation collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SummaryConfig {
    /// Endpoint of the external generation/send service. When unset the
    /// server falls back to a null generator that only logs.
    pub endpoint_url: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_retry_delay() -> u64 {
    120
}
fn default_heartbeat_interval() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}
fn default_heartbeat_retry() -> u64 {
    30
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.dailybrief/dailybrief.db", home)
}

impl DailybriefConfig {
    /// Load config from a TOML file with DAILYBRIEF_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.dailybrief/dailybrief.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: DailybriefConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("DAILYBRIEF_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.dailybrief/dailybrief.toml", home)
}
