use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Tunables for the risk engine. Defaults reproduce the deployed network's
/// behavior; overriding them is an operator decision, not an agent one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: f64,
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: f64,
    #[serde(default = "default_pressure_drop_hpa")]
    pub pressure_drop_hpa: f64,
    #[serde(default = "default_pressure_drop_weight")]
    pub pressure_drop_weight: f64,
    #[serde(default = "default_cold_wet_weight")]
    pub cold_wet_weight: f64,
    #[serde(default = "default_extremes_weight")]
    pub extremes_weight: f64,
    #[serde(default = "default_cold_temp_c")]
    pub cold_temp_c: f64,
    #[serde(default = "default_wet_humidity_pct")]
    pub wet_humidity_pct: f64,
    #[serde(default = "default_extreme_cold_c")]
    pub extreme_cold_c: f64,
    #[serde(default = "default_extreme_heat_c")]
    pub extreme_heat_c: f64,
    #[serde(default = "default_extreme_low_pressure_hpa")]
    pub extreme_low_pressure_hpa: f64,
    #[serde(default = "default_min_sensitivity")]
    pub min_sensitivity: f64,
    #[serde(default = "default_max_sensitivity")]
    pub max_sensitivity: f64,
    #[serde(default = "default_sensitivity_step")]
    pub sensitivity_step: f64,
    #[serde(default = "default_correct_step")]
    pub correct_step: f64,
}

fn default_history_size() -> usize {
    10
}

fn default_risk_threshold() -> f64 {
    0.6
}

fn default_consensus_threshold() -> f64 {
    0.4
}

fn default_pressure_drop_hpa() -> f64 {
    5.0
}

fn default_pressure_drop_weight() -> f64 {
    0.4
}

fn default_cold_wet_weight() -> f64 {
    0.3
}

fn default_extremes_weight() -> f64 {
    0.3
}

fn default_cold_temp_c() -> f64 {
    2.0
}

fn default_wet_humidity_pct() -> f64 {
    80.0
}

fn default_extreme_cold_c() -> f64 {
    -10.0
}

fn default_extreme_heat_c() -> f64 {
    35.0
}

fn default_extreme_low_pressure_hpa() -> f64 {
    970.0
}

fn default_min_sensitivity() -> f64 {
    0.5
}

fn default_max_sensitivity() -> f64 {
    1.5
}

fn default_sensitivity_step() -> f64 {
    0.1
}

fn default_correct_step() -> f64 {
    0.05
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_size < 2 {
            return Err(ConfigError::Validation(
                "history_size must be at least 2".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.risk_threshold) {
            return Err(ConfigError::Validation(
                "risk_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.consensus_threshold) {
            return Err(ConfigError::Validation(
                "consensus_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        let weight_sum = self.pressure_drop_weight + self.cold_wet_weight + self.extremes_weight;
        if self.pressure_drop_weight < 0.0
            || self.cold_wet_weight < 0.0
            || self.extremes_weight < 0.0
            || weight_sum > 1.0 + f64::EPSILON
        {
            return Err(ConfigError::Validation(
                "risk factor weights must be non-negative and sum to at most 1.0".into(),
            ));
        }

        if self.min_sensitivity <= 0.0 {
            return Err(ConfigError::Validation(
                "min_sensitivity must be positive".into(),
            ));
        }

        if self.max_sensitivity <= self.min_sensitivity {
            return Err(ConfigError::Validation(
                "max_sensitivity must be > min_sensitivity".into(),
            ));
        }

        if !(self.min_sensitivity..=self.max_sensitivity).contains(&1.0) {
            return Err(ConfigError::Validation(
                "sensitivity bounds must bracket the neutral value 1.0".into(),
            ));
        }

        if self.sensitivity_step <= 0.0 || self.correct_step <= 0.0 {
            return Err(ConfigError::Validation(
                "learning steps must be positive".into(),
            ));
        }

        if self.extreme_heat_c <= self.extreme_cold_c {
            return Err(ConfigError::Validation(
                "extreme_heat_c must be > extreme_cold_c".into(),
            ));
        }

        Ok(())
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            risk_threshold: default_risk_threshold(),
            consensus_threshold: default_consensus_threshold(),
            pressure_drop_hpa: default_pressure_drop_hpa(),
            pressure_drop_weight: default_pressure_drop_weight(),
            cold_wet_weight: default_cold_wet_weight(),
            extremes_weight: default_extremes_weight(),
            cold_temp_c: default_cold_temp_c(),
            wet_humidity_pct: default_wet_humidity_pct(),
            extreme_cold_c: default_extreme_cold_c(),
            extreme_heat_c: default_extreme_heat_c(),
            extreme_low_pressure_hpa: default_extreme_low_pressure_hpa(),
            min_sensitivity: default_min_sensitivity(),
            max_sensitivity: default_max_sensitivity(),
            sensitivity_step: default_sensitivity_step(),
            correct_step: default_correct_step(),
        }
    }
}
