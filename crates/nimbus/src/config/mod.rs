mod risk;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use crate::util::logging::LogConfig;
pub use risk::RiskConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: SensorConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sector hint. When unset the monitor assigns one after admission.
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default = "default_sensor_type")]
    pub sensor_type: String,
    #[serde(default = "default_base_interval")]
    pub base_interval_secs: u64,
    /// RNG seed for reproducible sampling.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_sensor_type() -> String {
    "meteo".into()
}

fn default_base_interval() -> u64 {
    5
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sector: None,
            sensor_type: default_sensor_type(),
            base_interval_secs: default_base_interval(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_assignment_timeout")]
    pub assignment_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_assignment_timeout() -> u64 {
    30
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keep_alive_secs: default_keep_alive(),
            connect_timeout_secs: default_connect_timeout(),
            assignment_timeout_secs: default_assignment_timeout(),
        }
    }
}

impl AgentConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(sector) = &self.agent.sector {
            if !crate::sampler::SECTORS.contains(&sector.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "unknown sector '{}'",
                    sector
                )));
            }
        }

        if self.agent.sensor_type.is_empty() {
            return Err(ConfigError::Validation("sensor_type must not be empty".into()));
        }

        if self.agent.base_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "base_interval_secs must be positive".into(),
            ));
        }

        if self.broker.connect_timeout_secs == 0 || self.broker.assignment_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "broker timeouts must be positive".into(),
            ));
        }

        self.risk.validate()?;
        Ok(())
    }

    pub fn minimal() -> Self {
        Self {
            agent: SensorConfig::default(),
            broker: BrokerConfig::default(),
            risk: RiskConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::minimal()
    }
}
