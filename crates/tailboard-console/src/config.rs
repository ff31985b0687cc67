/*
[INPUT]:  YAML configuration file and TAILBOARD__* environment overrides
[OUTPUT]: Parsed dashboard configuration (server, polling, rendering)
[POS]:    Configuration layer - shared by every view
[UPDATE]: When adding new configuration options
*/

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use anyhow::Context;
use serde::{Deserialize, Serialize};

use tailboard_adapter::ClientConfig;

use crate::poller::PollerConfig;
use crate::row::TimestampZone;

pub const ENV_PREFIX: &str = "TAILBOARD";
const CONFIG_DIR_NAME: &str = "tailboard";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Base URL the cgi-bin and fetch endpoints live under
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Poll scheduling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PollConfig {
    /// Wait after a caught-up response or a failed request
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,
    /// Wait before the first request of a tail view
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    #[serde(default = "default_queue_interval_ms")]
    pub queue_interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: default_idle_delay_ms(),
            start_delay_ms: default_start_delay_ms(),
            queue_interval_ms: default_queue_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default = "default_render_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub time_zone: TimestampZone,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_render_interval_ms(),
            time_zone: TimestampZone::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:4242/".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_idle_delay_ms() -> u64 {
    1000
}

fn default_start_delay_ms() -> u64 {
    100
}

fn default_queue_interval_ms() -> u64 {
    2000
}

fn default_render_interval_ms() -> u64 {
    33
}

impl DashboardConfig {
    /// Load from `path` (or the per-user default file when present) plus environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`DashboardConfig::load`], reading overrides from `env` instead of the process
    /// environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
            }
            None => {
                if let Some(default) = default_config_path().filter(|p| p.exists()) {
                    builder =
                        builder.add_source(File::from(default).format(FileFormat::Yaml).required(false));
                }
            }
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder
            .build()
            .context("read configuration")?
            .try_deserialize()
            .context("parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.base_url.trim().is_empty() {
            anyhow::bail!("server.base_url must not be empty");
        }
        if self.render.interval_ms == 0 {
            anyhow::bail!("render.interval_ms must be positive");
        }
        if self.poll.queue_interval_ms == 0 {
            anyhow::bail!("poll.queue_interval_ms must be positive");
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_millis(self.server.timeout_ms),
            connect_timeout: Duration::from_millis(self.server.connect_timeout_ms),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            idle_delay: Duration::from_millis(self.poll.idle_delay_ms),
            start_delay: Duration::from_millis(self.poll.start_delay_ms),
        }
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.poll.idle_delay_ms)
    }

    pub fn queue_interval(&self) -> Duration {
        Duration::from_millis(self.poll.queue_interval_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render.interval_ms)
    }
}

/// `<config_dir>/tailboard/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn missing_sections_take_defaults() {
        let file = yaml_file("server:\n  base_url: http://logs.internal:4242/\n");
        let config = DashboardConfig::load_with_env(Some(file.path()), Some(HashMap::new()))
            .expect("load");

        assert_eq!(config.server.base_url, "http://logs.internal:4242/");
        assert_eq!(config.server.timeout_ms, 15_000);
        assert_eq!(config.poll, PollConfig::default());
        assert_eq!(config.render.interval_ms, 33);
        assert_eq!(config.render.time_zone, TimestampZone::Local);
    }

    #[test]
    fn environment_overrides_file_values() {
        let file = yaml_file("poll:\n  idle_delay_ms: 500\nrender:\n  time_zone: utc\n");
        let env = HashMap::from([
            ("TAILBOARD__POLL__IDLE_DELAY_MS".to_string(), "250".to_string()),
            ("TAILBOARD__SERVER__BASE_URL".to_string(), "http://env:1/".to_string()),
        ]);
        let config = DashboardConfig::load_with_env(Some(file.path()), Some(env)).expect("load");

        assert_eq!(config.poll.idle_delay_ms, 250);
        assert_eq!(config.server.base_url, "http://env:1/");
        assert_eq!(config.render.time_zone, TimestampZone::Utc);
        assert_eq!(config.poller_config().idle_delay, Duration::from_millis(250));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = DashboardConfig::load_with_env(
            Some(Path::new("/nonexistent/tailboard.yaml")),
            Some(HashMap::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn zero_render_interval_is_rejected() {
        let file = yaml_file("render:\n  interval_ms: 0\n");
        let result = DashboardConfig::load_with_env(Some(file.path()), Some(HashMap::new()));
        assert!(result.is_err());
    }

    #[test]
    fn printed_yaml_loads_back_unchanged() {
        let config = DashboardConfig::default();
        let file = yaml_file(&config.to_yaml().expect("yaml"));
        let loaded = DashboardConfig::load_with_env(Some(file.path()), Some(HashMap::new()))
            .expect("parse");
        assert_eq!(loaded, config);
        assert_eq!(config.client_config().timeout, Duration::from_secs(15));
    }
}
