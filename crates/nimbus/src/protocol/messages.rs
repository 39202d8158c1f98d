//! Wire payloads. Everything on the bus is a UTF-8 JSON object; missing
//! required fields fail deserialization and take the malformed-message path
//! in the dispatcher.

use serde::{Deserialize, Serialize};

use nimbus_core::{Measurement, RiskLevel};

/// Raw telemetry, published every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPayload {
    pub sensor_id: String,
    pub timestamp: u64,
    pub temperature_c: f64,
    pub pressure_hpa: f64,
    pub humidity_pct: f64,
}

impl DataPayload {
    pub fn from_measurement(sensor_id: impl Into<String>, m: &Measurement) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp: m.timestamp,
            temperature_c: m.temperature_c,
            pressure_hpa: m.pressure_hpa,
            humidity_pct: m.humidity_pct,
        }
    }
}

/// A sensor's opinion about local risk, gossiped to the sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefPayload {
    pub sensor_id: String,
    pub timestamp: u64,
    pub local_risk: f64,
    pub risk_level: RiskLevel,
    pub neighbor_count: usize,
    pub neighbor_avg_risk: Option<f64>,
    pub sensitivity: f64,
    pub false_alarm_count: u32,
    pub missed_event_count: u32,
    pub would_alert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub sensor_id: String,
    pub timestamp: u64,
    pub alert_type: String,
    pub risk_level: f64,
    pub message: String,
    pub measurements: Measurement,
}

impl AlertPayload {
    pub fn weather_risk(sensor_id: impl Into<String>, risk: f64, measurements: Measurement) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp: measurements.timestamp,
            alert_type: "weather_risk".into(),
            risk_level: risk,
            message: format!("High risk detected (local:{:.2}, neighbors agree)", risk),
            measurements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Retained presence record. The offline variant doubles as the last-will
/// the broker publishes on ungraceful disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresencePayload {
    pub sensor_id: String,
    pub status: PresenceStatus,
    pub sensor_type: String,
    pub sector: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PresencePayload {
    pub fn online(sensor_id: &str, sensor_type: &str, sector: &str) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            status: PresenceStatus::Online,
            sensor_type: sensor_type.into(),
            sector: sector.into(),
            timestamp: nimbus_core::unix_timestamp(),
            reason: None,
        }
    }

    pub fn offline(sensor_id: &str, sensor_type: &str, sector: &str, reason: Option<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            status: PresenceStatus::Offline,
            sensor_type: sensor_type.into(),
            sector: sector.into(),
            timestamp: nimbus_core::unix_timestamp(),
            reason,
        }
    }
}

/// Monitor verdicts on admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub sector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    #[serde(default = "default_rejection_reason")]
    pub reason: String,
    #[serde(default)]
    pub retry_after: Option<u64>,
}

fn default_rejection_reason() -> String {
    "unknown".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    FalseAlarm,
    MissedEvent,
    Correct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackPayload {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
}

/// Monitor control commands, tagged on the `command` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum ControlCommand {
    #[serde(rename = "adjust_interval")]
    AdjustInterval { interval: u64 },
    #[serde(rename = "reset_learning")]
    ResetLearning,
    #[serde(rename = "SHUTDOWN")]
    Shutdown {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_belief_serializes_null_neighbor_avg() {
        let belief = BeliefPayload {
            sensor_id: "meteo-1-100".into(),
            timestamp: 1,
            local_risk: 0.0,
            risk_level: RiskLevel::Stable,
            neighbor_count: 0,
            neighbor_avg_risk: None,
            sensitivity: 1.0,
            false_alarm_count: 0,
            missed_event_count: 0,
            would_alert: false,
        };

        let json = serde_json::to_value(&belief).unwrap();
        assert!(json["neighbor_avg_risk"].is_null());
        assert_eq!(json["risk_level"], "stable");
    }

    #[test]
    fn test_control_command_wire_tags() {
        let cmd: ControlCommand =
            serde_json::from_str(r#"{"command": "adjust_interval", "interval": 12}"#).unwrap();
        assert!(matches!(cmd, ControlCommand::AdjustInterval { interval: 12 }));

        let cmd: ControlCommand =
            serde_json::from_str(r#"{"command": "SHUTDOWN", "reason": "maintenance"}"#).unwrap();
        assert!(matches!(cmd, ControlCommand::Shutdown { reason: Some(_) }));

        let cmd: ControlCommand = serde_json::from_str(r#"{"command": "SHUTDOWN"}"#).unwrap();
        assert!(matches!(cmd, ControlCommand::Shutdown { reason: None }));
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let result = serde_json::from_str::<ControlCommand>(r#"{"command": "reboot"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_feedback_kind_wire_names() {
        let payload: FeedbackPayload =
            serde_json::from_str(r#"{"type": "false_alarm"}"#).unwrap();
        assert_eq!(payload.kind, FeedbackKind::FalseAlarm);

        assert_eq!(
            serde_json::to_string(&FeedbackPayload { kind: FeedbackKind::MissedEvent }).unwrap(),
            r#"{"type":"missed_event"}"#
        );
    }

    #[test]
    fn test_rejection_defaults() {
        let rejection: Rejection = serde_json::from_str("{}").unwrap();
        assert_eq!(rejection.reason, "unknown");
        assert!(rejection.retry_after.is_none());
    }

    #[test]
    fn test_presence_omits_empty_reason() {
        let presence = PresencePayload::online("meteo-1-100", "meteo", "sector1");
        let json = serde_json::to_value(&presence).unwrap();

        assert_eq!(json["status"], "online");
        assert!(json.get("reason").is_none());
    }
}
