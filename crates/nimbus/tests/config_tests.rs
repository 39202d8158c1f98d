use std::io::Write;

use nimbus::config::{AgentConfig, RiskConfig};
use tempfile::NamedTempFile;

// =============================================================================
// AGENT CONFIG TESTS
// =============================================================================

mod agent_config_tests {
    use super::*;

    mod construction {
        use super::*;

        #[test]
        fn minimal_should_create_valid_config() {
            let config = AgentConfig::minimal();
            assert!(config.validate().is_ok());
        }

        #[test]
        fn default_should_be_same_as_minimal() {
            let minimal = AgentConfig::minimal();
            let default = AgentConfig::default();

            assert_eq!(minimal.broker.host, default.broker.host);
            assert_eq!(minimal.broker.port, default.broker.port);
            assert_eq!(minimal.agent.sensor_type, default.agent.sensor_type);
        }

        #[test]
        fn minimal_should_have_no_sector() {
            let config = AgentConfig::minimal();
            assert!(config.agent.sector.is_none());
        }

        #[test]
        fn minimal_should_use_the_contract_defaults() {
            let config = AgentConfig::minimal();

            assert_eq!(config.broker.host, "localhost");
            assert_eq!(config.broker.port, 1883);
            assert_eq!(config.broker.connect_timeout_secs, 5);
            assert_eq!(config.broker.assignment_timeout_secs, 30);
            assert_eq!(config.agent.base_interval_secs, 5);
            assert_eq!(config.agent.sensor_type, "meteo");
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn empty_toml_should_fall_back_to_defaults() {
            let config = AgentConfig::from_toml("").unwrap();
            assert_eq!(config.broker.port, 1883);
            assert_eq!(config.risk.history_size, 10);
        }

        #[test]
        fn sections_should_override_defaults() {
            let toml = r#"
                [agent]
                sector = "sector5"
                base_interval_secs = 15

                [broker]
                host = "broker.internal"
                port = 8883
                keep_alive_secs = 30

                [risk]
                risk_threshold = 0.7

                [logging]
                enabled = false
            "#;

            let config = AgentConfig::from_toml(toml).unwrap();
            assert_eq!(config.agent.sector.as_deref(), Some("sector5"));
            assert_eq!(config.agent.base_interval_secs, 15);
            assert_eq!(config.broker.host, "broker.internal");
            assert_eq!(config.broker.port, 8883);
            assert_eq!(config.risk.risk_threshold, 0.7);
            assert!(!config.logging.enabled);
        }

        #[test]
        fn from_file_should_read_a_toml_file() {
            let mut file = NamedTempFile::new().unwrap();
            writeln!(
                file,
                "[agent]\nsector = \"sector1\"\n\n[broker]\nport = 1900"
            )
            .unwrap();

            let config = AgentConfig::from_file(file.path()).unwrap();
            assert_eq!(config.agent.sector.as_deref(), Some("sector1"));
            assert_eq!(config.broker.port, 1900);
        }

        #[test]
        fn missing_file_should_be_an_io_error() {
            assert!(AgentConfig::from_file("/does/not/exist.toml").is_err());
        }

        #[test]
        fn invalid_toml_should_be_a_parse_error() {
            assert!(AgentConfig::from_toml("agent = {").is_err());
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn unknown_sector_should_fail() {
            let mut config = AgentConfig::minimal();
            config.agent.sector = Some("sector7".into());
            assert!(config.validate().is_err());
        }

        #[test]
        fn every_known_sector_should_pass() {
            for sector in nimbus::sampler::SECTORS {
                let mut config = AgentConfig::minimal();
                config.agent.sector = Some(sector.into());
                assert!(config.validate().is_ok(), "sector {} rejected", sector);
            }
        }

        #[test]
        fn empty_sensor_type_should_fail() {
            let mut config = AgentConfig::minimal();
            config.agent.sensor_type = String::new();
            assert!(config.validate().is_err());
        }

        #[test]
        fn zero_timeouts_should_fail() {
            let mut config = AgentConfig::minimal();
            config.broker.connect_timeout_secs = 0;
            assert!(config.validate().is_err());

            let mut config = AgentConfig::minimal();
            config.broker.assignment_timeout_secs = 0;
            assert!(config.validate().is_err());
        }

        #[test]
        fn risk_section_is_validated_too() {
            let mut config = AgentConfig::minimal();
            config.risk.history_size = 1;
            assert!(config.validate().is_err());
        }
    }
}

// =============================================================================
// RISK CONFIG TESTS
// =============================================================================

mod risk_config_tests {
    use super::*;

    #[test]
    fn defaults_should_match_the_deployed_constants() {
        let config = RiskConfig::default();

        assert_eq!(config.history_size, 10);
        assert_eq!(config.risk_threshold, 0.6);
        assert_eq!(config.consensus_threshold, 0.4);
        assert_eq!(config.pressure_drop_hpa, 5.0);
        assert_eq!(config.pressure_drop_weight, 0.4);
        assert_eq!(config.cold_wet_weight, 0.3);
        assert_eq!(config.extremes_weight, 0.3);
        assert_eq!(config.min_sensitivity, 0.5);
        assert_eq!(config.max_sensitivity, 1.5);
    }

    #[test]
    fn sensitivity_bounds_must_bracket_neutral() {
        let config = RiskConfig {
            min_sensitivity: 1.1,
            max_sensitivity: 1.4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_weights_should_fail() {
        let config = RiskConfig {
            cold_wet_weight: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_extreme_band_should_fail() {
        let config = RiskConfig {
            extreme_cold_c: 40.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
