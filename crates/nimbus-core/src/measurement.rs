use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, ValidationResult};

/// Wall-clock seconds since the Unix epoch.
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A single environmental reading.
///
/// Every agent tick produces one `Measurement`; the same struct travels on
/// the wire inside data and alert payloads.
///
/// # Example
///
/// ```rust
/// use nimbus_core::Measurement;
///
/// let m = Measurement::new(12.5, 1013.2, 64.0);
/// assert!(m.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
    pub humidity_pct: f64,
    pub timestamp: u64,
}

impl Measurement {
    pub fn new(temperature_c: f64, pressure_hpa: f64, humidity_pct: f64) -> Self {
        Self {
            temperature_c,
            pressure_hpa,
            humidity_pct,
            timestamp: unix_timestamp(),
        }
    }

    pub fn at(temperature_c: f64, pressure_hpa: f64, humidity_pct: f64, timestamp: u64) -> Self {
        Self {
            temperature_c,
            pressure_hpa,
            humidity_pct,
            timestamp,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        if !self.temperature_c.is_finite() {
            return Err(ValidationError::not_finite("temperature_c", self.temperature_c));
        }
        if !self.pressure_hpa.is_finite() {
            return Err(ValidationError::not_finite("pressure_hpa", self.pressure_hpa));
        }
        if !self.humidity_pct.is_finite() {
            return Err(ValidationError::not_finite("humidity_pct", self.humidity_pct));
        }
        if self.humidity_pct < 0.0 {
            return Err(ValidationError::min_value("humidity_pct", 0.0, self.humidity_pct));
        }
        if self.humidity_pct > 100.0 {
            return Err(ValidationError::max_value("humidity_pct", 100.0, self.humidity_pct));
        }
        Ok(())
    }
}

/// Human-readable risk bands used in belief payloads and operator views.
///
/// The mapping is closed-interval on the unit range: [0, 0.3) stable,
/// [0.3, 0.6) moderate, [0.6, 0.8) high, [0.8, 1.0] critical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Stable,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_risk(risk: f64) -> Self {
        if risk < 0.3 {
            Self::Stable
        } else if risk < 0.6 {
            Self::Moderate
        } else if risk < 0.8 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stamps_current_time() {
        let m = Measurement::new(10.0, 1000.0, 50.0);
        assert!(m.timestamp > 0);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let m = Measurement::at(f64::NAN, 1000.0, 50.0, 1);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_humidity() {
        let m = Measurement::at(10.0, 1000.0, 101.0, 1);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_risk_label_boundaries() {
        assert_eq!(RiskLevel::from_risk(0.0), RiskLevel::Stable);
        assert_eq!(RiskLevel::from_risk(0.3), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_risk(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk(0.8), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_risk(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_label_serializes_lowercase() {
        let json = serde_json::to_string(&RiskLevel::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }
}
