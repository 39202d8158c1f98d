use nimbus::protocol::{
    AlertPayload, Assignment, BeliefPayload, ControlCommand, DataPayload, FeedbackKind,
    FeedbackPayload, PresencePayload, PresenceStatus, Rejection,
};
use nimbus_core::{Measurement, RiskLevel};

// =============================================================================
// OUTBOUND SHAPES
// =============================================================================

mod outbound_shapes {
    use super::*;

    #[test]
    fn data_payload_mirrors_the_measurement() {
        let m = Measurement::at(1.5, 1013.2, 64.0, 1_700_000_000);
        let data = DataPayload::from_measurement("meteo-1-100", &m);
        let json = serde_json::to_value(&data).unwrap();

        assert_eq!(json["sensor_id"], "meteo-1-100");
        assert_eq!(json["timestamp"], 1_700_000_000);
        assert_eq!(json["temperature_c"], 1.5);
        assert_eq!(json["pressure_hpa"], 1013.2);
        assert_eq!(json["humidity_pct"], 64.0);
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn belief_payload_carries_the_full_opinion() {
        let belief = BeliefPayload {
            sensor_id: "meteo-1-100".into(),
            timestamp: 7,
            local_risk: 0.65,
            risk_level: RiskLevel::High,
            neighbor_count: 2,
            neighbor_avg_risk: Some(0.45),
            sensitivity: 1.1,
            false_alarm_count: 1,
            missed_event_count: 2,
            would_alert: true,
        };
        let json = serde_json::to_value(&belief).unwrap();

        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["neighbor_avg_risk"], 0.45);
        assert_eq!(json["would_alert"], true);
        assert_eq!(json.as_object().unwrap().len(), 10);
    }

    #[test]
    fn alert_payload_embeds_the_measurements() {
        let m = Measurement::at(-12.0, 960.0, 85.0, 9);
        let alert = AlertPayload::weather_risk("meteo-1-100", 1.0, m);
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["alert_type"], "weather_risk");
        assert_eq!(json["risk_level"], 1.0);
        assert_eq!(json["timestamp"], 9);
        assert_eq!(json["measurements"]["pressure_hpa"], 960.0);
        assert!(json["message"].as_str().unwrap().contains("1.00"));
    }

    #[test]
    fn presence_statuses_serialize_lowercase() {
        let online = PresencePayload::online("meteo-1-100", "meteo", "sector1");
        assert_eq!(online.status, PresenceStatus::Online);
        assert_eq!(
            serde_json::to_value(&online).unwrap()["status"],
            "online"
        );

        let offline = PresencePayload::offline(
            "meteo-1-100",
            "meteo",
            "pending",
            Some("connection_lost".into()),
        );
        let json = serde_json::to_value(&offline).unwrap();
        assert_eq!(json["status"], "offline");
        assert_eq!(json["sector"], "pending");
        assert_eq!(json["reason"], "connection_lost");
    }
}

// =============================================================================
// INBOUND PARSING
// =============================================================================

mod inbound_parsing {
    use super::*;

    #[test]
    fn assignment_parses_the_sector() {
        let assignment: Assignment = serde_json::from_str(r#"{"sector": "sector4"}"#).unwrap();
        assert_eq!(assignment.sector, "sector4");
    }

    #[test]
    fn assignment_without_sector_is_an_error() {
        assert!(serde_json::from_str::<Assignment>("{}").is_err());
    }

    #[test]
    fn rejection_parses_with_and_without_retry() {
        let rejection: Rejection =
            serde_json::from_str(r#"{"reason": "quota", "retry_after": 60}"#).unwrap();
        assert_eq!(rejection.reason, "quota");
        assert_eq!(rejection.retry_after, Some(60));

        let rejection: Rejection = serde_json::from_str(r#"{"reason": "quota"}"#).unwrap();
        assert!(rejection.retry_after.is_none());
    }

    #[test]
    fn feedback_kinds_cover_the_contract() {
        for (wire, kind) in [
            ("false_alarm", FeedbackKind::FalseAlarm),
            ("missed_event", FeedbackKind::MissedEvent),
            ("correct", FeedbackKind::Correct),
        ] {
            let payload: FeedbackPayload =
                serde_json::from_str(&format!(r#"{{"type": "{}"}}"#, wire)).unwrap();
            assert_eq!(payload.kind, kind);
        }
    }

    #[test]
    fn unknown_feedback_kind_is_an_error() {
        assert!(serde_json::from_str::<FeedbackPayload>(r#"{"type": "praise"}"#).is_err());
    }

    #[test]
    fn control_commands_dispatch_on_the_command_field() {
        let cmd: ControlCommand =
            serde_json::from_str(r#"{"command": "adjust_interval", "interval": 30}"#).unwrap();
        assert!(matches!(cmd, ControlCommand::AdjustInterval { interval: 30 }));

        let cmd: ControlCommand = serde_json::from_str(r#"{"command": "reset_learning"}"#).unwrap();
        assert!(matches!(cmd, ControlCommand::ResetLearning));

        let cmd: ControlCommand =
            serde_json::from_str(r#"{"command": "SHUTDOWN", "reason": "rollout"}"#).unwrap();
        match cmd {
            ControlCommand::Shutdown { reason } => assert_eq!(reason.as_deref(), Some("rollout")),
            other => panic!("expected shutdown, got {:?}", other),
        }
    }

    #[test]
    fn inbound_beliefs_tolerate_extra_fields() {
        let raw = r#"{
            "sensor_id": "meteo-2-200",
            "timestamp": 1,
            "local_risk": 0.4,
            "risk_level": "moderate",
            "neighbor_count": 1,
            "neighbor_avg_risk": null,
            "sensitivity": 1.0,
            "false_alarm_count": 0,
            "missed_event_count": 0,
            "would_alert": false,
            "firmware": "2.1.0"
        }"#;

        let belief: BeliefPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(belief.sensor_id, "meteo-2-200");
        assert_eq!(belief.local_risk, 0.4);
    }
}
