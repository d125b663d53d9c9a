// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    /// Wait after a session disappears before asking for its summary.
    pub end_grace_secs: u64,
    /// Owners whose sessions get persisted and enriched. Empty means everyone.
    pub owners: Vec<i64>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 20,
            end_grace_secs: 10,
            owners: Vec::new(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn end_grace(&self) -> Duration {
        Duration::from_secs(self.end_grace_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub list_url: String,
    pub cut_info_url: String,
    pub visitor_login_url: String,
    pub summary_url: String,
    pub playback_url: String,
    pub user_agent: String,
    /// Sent as the `_did` cookie. Generated per process when unset.
    pub device_id: Option<String>,
    pub request_timeout_secs: u64,
    pub initial_page_size: u64,
    pub page_size_factor: u64,
    pub page_size_ceiling: u64,
    /// Substring identifying the primary CDN's recording URLs.
    pub primary_cdn_sign: String,
    /// Substring identifying the backup CDN's recording URLs.
    pub backup_cdn_sign: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            list_url: "https://live.acfun.cn/api/channel/list".into(),
            cut_info_url: "https://live.acfun.cn/rest/pc-direct/live/getLiveCutInfo".into(),
            visitor_login_url: "https://id.app.acfun.cn/rest/app/visitor/login".into(),
            summary_url: "https://api.kuaishouzt.com/rest/zt/live/web/endSummary".into(),
            playback_url: "https://api.kuaishouzt.com/rest/zt/live/playBack/startPlay".into(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.0.0 Safari/537.36".into(),
            device_id: None,
            request_timeout_secs: 10,
            initial_page_size: 10_000,
            page_size_factor: 10,
            page_size_ceiling: 100_000_000,
            primary_cdn_sign: "alivod".into(),
            backup_cdn_sign: "txvod".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(paths::db_path)
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the watcher cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.watch.poll_interval_secs == 0 {
            anyhow::bail!("watch.poll_interval_secs must be at least 1");
        }
        if self.retry.attempts == 0 {
            anyhow::bail!("retry.attempts must be at least 1");
        }
        if self.upstream.page_size_factor < 2 {
            anyhow::bail!("upstream.page_size_factor must be at least 2");
        }
        if self.upstream.initial_page_size == 0
            || self.upstream.initial_page_size > self.upstream.page_size_ceiling
        {
            anyhow::bail!("upstream.initial_page_size must be between 1 and page_size_ceiling");
        }
        Ok(())
    }
}
