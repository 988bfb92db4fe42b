use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context};
use coursebin_client::ApiSettings;
use coursebin_core::{PollSchedule, TimeoutPolicy};
use coursebin_logging::{cb_info, LogDestination, DEFAULT_LOG_FILE};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILENAME: &str = "coursebin.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTarget {
    #[default]
    File,
    Terminal,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
    pub access_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let defaults = ApiSettings::default();
        Self {
            base_url: defaults.base_url,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            max_bytes: defaults.max_bytes,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub base_ms: u64,
    pub max_ms: u64,
    /// `None` polls until the job is terminal.
    pub ttl: Option<u32>,
    pub on_timeout: TimeoutPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        let defaults = PollSchedule::default();
        Self {
            base_ms: defaults.base.as_millis() as u64,
            max_ms: defaults.max.as_millis() as u64,
            ttl: defaults.ttl,
            on_timeout: defaults.on_timeout,
        }
    }
}

/// Contents of `coursebin.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub section_lifetime_secs: i64,
    pub log_to: LogTarget,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            poll: PollConfig::default(),
            section_lifetime_secs: coursebin_core::default_lifetime().num_seconds(),
            log_to: LogTarget::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl AppConfig {
    /// Reads `explicit` if given, else `coursebin.ron` in `state_dir` when it
    /// exists. A missing default file yields the defaults.
    pub fn load(explicit: Option<&Path>, state_dir: &Path) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = state_dir.join(CONFIG_FILENAME);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = ron::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        cb_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.section_lifetime_secs > 0,
            "section_lifetime_secs must be positive, got {}",
            self.section_lifetime_secs
        );
        ensure!(
            chrono::Duration::try_seconds(self.section_lifetime_secs).is_some(),
            "section_lifetime_secs {} is out of range",
            self.section_lifetime_secs
        );
        Ok(())
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api.base_url.clone(),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
            max_bytes: self.api.max_bytes,
            access_token: self.api.access_token.clone(),
        }
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            base: Duration::from_millis(self.poll.base_ms),
            max: Duration::from_millis(self.poll.max_ms),
            ttl: self.poll.ttl,
            on_timeout: self.poll.on_timeout,
        }
    }

    pub fn section_lifetime(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.section_lifetime_secs)
            .unwrap_or_else(coursebin_core::default_lifetime)
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log_to {
            LogTarget::File => LogDestination::File(self.log_file.clone()),
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both(self.log_file.clone()),
        }
    }
}
