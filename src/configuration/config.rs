use super::types::*;
use crate::error_handling::types::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

/// Application configuration structure that defines all runtime parameters.
///
/// Every field has a default so a configuration file only needs to name what it changes, and
/// running without any file at all reproduces the stock behaviour: one minute of capture,
/// 1500-byte admission limit, two replay retries and size-proportional pacing.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use netmon::configuration::config::Config;
///
/// let config = Config::from_file(Path::new("netmon.toml")).unwrap();
/// println!("Capturing for {:?}", config.capture_duration());
/// ```
///
/// # Fields Overview
///
/// - `interface`: capture interface, the command-line positional argument takes precedence
/// - `capture_duration_secs`: wall-clock capture deadline
/// - `queue_capacity`: bound of the capture→routing queue
/// - `read_timeout_ms`: how long a single acquisition may block before the capture loop
/// re-checks the stop signal
/// - `admission`: size limit and address filters, see [`AdmissionConfig`]
/// - `replay`: retry, pacing and sink settings, see [`ReplayConfig`]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interface: Option<String>,
    pub capture_duration_secs: u64,
    pub queue_capacity: usize,
    pub read_timeout_ms: u64,
    pub admission: AdmissionConfig,
    pub replay: ReplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: None,
            capture_duration_secs: 60,
            queue_capacity: 4096,
            read_timeout_ms: 250,
            admission: AdmissionConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

impl Config {
    /// Reads a TOML configuration file and validates it.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::IoError`] if the file cannot be read
    /// - [`ConfigError::TomlError`] if the content is not valid TOML for this structure
    /// - any error returned by [`Config::validate`]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and cross-field requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_duration_secs == 0 {
            return Err(ConfigError::NotInRange(
                "capture_duration_secs must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NotInRange(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::NotInRange(
                "read_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.replay.idle_poll_ms == 0 {
            return Err(ConfigError::NotInRange(
                "replay.idle_poll_ms must be at least 1".to_string(),
            ));
        }
        if self.admission.max_frame_size == 0 || self.admission.max_frame_size > 65535 {
            return Err(ConfigError::NotInRange(format!(
                "admission.max_frame_size must be within 1..=65535, got {}",
                self.admission.max_frame_size
            )));
        }
        if self.replay.sink == SinkKind::Interface && self.replay.interface.trim().is_empty() {
            return Err(ConfigError::MissingValue(
                "replay.interface is required when replay.sink = \"interface\"".to_string(),
            ));
        }

        parse_filter(&self.admission.source_filter)?;
        parse_filter(&self.admission.destination_filter)?;

        Ok(())
    }

    pub fn capture_duration(&self) -> Duration {
        Duration::from_secs(self.capture_duration_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.replay.idle_poll_ms)
    }

    /// Parsed source filter, `None` when blank.
    pub fn source_filter(&self) -> Result<Option<Ipv4Addr>, ConfigError> {
        parse_filter(&self.admission.source_filter)
    }

    /// Parsed destination filter, `None` when blank.
    pub fn destination_filter(&self) -> Result<Option<Ipv4Addr>, ConfigError> {
        parse_filter(&self.admission.destination_filter)
    }
}

fn parse_filter(value: &str) -> Result<Option<Ipv4Addr>, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value
        .parse::<Ipv4Addr>()
        .map(Some)
        .map_err(|_| ConfigError::BadIPFormatting(format!("'{}' is not an IPv4 address", value)))
}
