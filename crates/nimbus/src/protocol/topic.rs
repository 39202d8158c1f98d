//! Topic codec for the bus namespace.
//!
//! Every wire topic is the flat rendering of a [`Topic`] value and every
//! incoming topic is parsed back into the tagged form before dispatch; the
//! agent never classifies by substring.

use std::fmt;

use thiserror::Error;

pub const TOPIC_ROOT: &str = "weather";

/// The broadcast id on the group control topic.
pub const CONTROL_GROUP_ID: &str = "all";

/// Delivery class on the bus. Admission traffic wants exactly-once; all
/// steady-state traffic is at-least-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosClass {
    AtLeastOnce,
    ExactlyOnce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    Data { sector: String, sensor_type: String, sensor_id: String },
    Belief { sector: String, sensor_type: String, sensor_id: String },
    Alert { sector: String, sensor_type: String, sensor_id: String },
    Status { sector: String, sensor_type: String, sensor_id: String },
    ControlOne { sector: String, sensor_type: String, sensor_id: String },
    ControlGroup { sector: String, sensor_type: String },
    Feedback { sector: String, sensor_type: String, sensor_id: String },
    Assign { sensor_id: String },
    Reject { sensor_id: String },
}

impl Topic {
    pub fn data(sector: impl Into<String>, sensor_type: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self::Data { sector: sector.into(), sensor_type: sensor_type.into(), sensor_id: sensor_id.into() }
    }

    pub fn belief(sector: impl Into<String>, sensor_type: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self::Belief { sector: sector.into(), sensor_type: sensor_type.into(), sensor_id: sensor_id.into() }
    }

    pub fn alert(sector: impl Into<String>, sensor_type: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self::Alert { sector: sector.into(), sensor_type: sensor_type.into(), sensor_id: sensor_id.into() }
    }

    pub fn status(sector: impl Into<String>, sensor_type: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self::Status { sector: sector.into(), sensor_type: sensor_type.into(), sensor_id: sensor_id.into() }
    }

    pub fn control_one(sector: impl Into<String>, sensor_type: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self::ControlOne { sector: sector.into(), sensor_type: sensor_type.into(), sensor_id: sensor_id.into() }
    }

    pub fn control_group(sector: impl Into<String>, sensor_type: impl Into<String>) -> Self {
        Self::ControlGroup { sector: sector.into(), sensor_type: sensor_type.into() }
    }

    pub fn feedback(sector: impl Into<String>, sensor_type: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self::Feedback { sector: sector.into(), sensor_type: sensor_type.into(), sensor_id: sensor_id.into() }
    }

    pub fn assign(sensor_id: impl Into<String>) -> Self {
        Self::Assign { sensor_id: sensor_id.into() }
    }

    pub fn reject(sensor_id: impl Into<String>) -> Self {
        Self::Reject { sensor_id: sensor_id.into() }
    }

    pub fn qos(&self) -> QosClass {
        match self {
            Self::Assign { .. } | Self::Reject { .. } => QosClass::ExactlyOnce,
            _ => QosClass::AtLeastOnce,
        }
    }

    /// Only presence is retained, so late joiners learn the last-known state.
    pub fn retained(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    pub fn parse(raw: &str) -> Result<Self, TopicError> {
        let segments: Vec<&str> = raw.split('/').collect();

        if segments.iter().any(|s| s.is_empty()) {
            return Err(TopicError::EmptySegment(raw.to_string()));
        }
        if segments[0] != TOPIC_ROOT {
            return Err(TopicError::UnknownRoot(segments[0].to_string()));
        }
        if segments.len() < 2 {
            return Err(TopicError::SegmentCount {
                kind: "<missing>".into(),
                expected: 3,
                actual: segments.len(),
            });
        }

        let kind = segments[1];
        match kind {
            "data" | "belief" | "alert" | "status" | "control" | "feedback" => {
                if segments.len() != 5 {
                    return Err(TopicError::SegmentCount {
                        kind: kind.to_string(),
                        expected: 5,
                        actual: segments.len(),
                    });
                }

                let sector = segments[2].to_string();
                let sensor_type = segments[3].to_string();
                let sensor_id = segments[4].to_string();

                Ok(match kind {
                    "data" => Self::Data { sector, sensor_type, sensor_id },
                    "belief" => Self::Belief { sector, sensor_type, sensor_id },
                    "alert" => Self::Alert { sector, sensor_type, sensor_id },
                    "status" => Self::Status { sector, sensor_type, sensor_id },
                    "feedback" => Self::Feedback { sector, sensor_type, sensor_id },
                    "control" if sensor_id == CONTROL_GROUP_ID => {
                        Self::ControlGroup { sector, sensor_type }
                    }
                    _ => Self::ControlOne { sector, sensor_type, sensor_id },
                })
            }
            "assign" | "reject" => {
                if segments.len() != 3 {
                    return Err(TopicError::SegmentCount {
                        kind: kind.to_string(),
                        expected: 3,
                        actual: segments.len(),
                    });
                }

                let sensor_id = segments[2].to_string();
                Ok(if kind == "assign" {
                    Self::Assign { sensor_id }
                } else {
                    Self::Reject { sensor_id }
                })
            }
            other => Err(TopicError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data { sector, sensor_type, sensor_id } => {
                write!(f, "{TOPIC_ROOT}/data/{sector}/{sensor_type}/{sensor_id}")
            }
            Self::Belief { sector, sensor_type, sensor_id } => {
                write!(f, "{TOPIC_ROOT}/belief/{sector}/{sensor_type}/{sensor_id}")
            }
            Self::Alert { sector, sensor_type, sensor_id } => {
                write!(f, "{TOPIC_ROOT}/alert/{sector}/{sensor_type}/{sensor_id}")
            }
            Self::Status { sector, sensor_type, sensor_id } => {
                write!(f, "{TOPIC_ROOT}/status/{sector}/{sensor_type}/{sensor_id}")
            }
            Self::ControlOne { sector, sensor_type, sensor_id } => {
                write!(f, "{TOPIC_ROOT}/control/{sector}/{sensor_type}/{sensor_id}")
            }
            Self::ControlGroup { sector, sensor_type } => {
                write!(f, "{TOPIC_ROOT}/control/{sector}/{sensor_type}/{CONTROL_GROUP_ID}")
            }
            Self::Feedback { sector, sensor_type, sensor_id } => {
                write!(f, "{TOPIC_ROOT}/feedback/{sector}/{sensor_type}/{sensor_id}")
            }
            Self::Assign { sensor_id } => write!(f, "{TOPIC_ROOT}/assign/{sensor_id}"),
            Self::Reject { sensor_id } => write!(f, "{TOPIC_ROOT}/reject/{sensor_id}"),
        }
    }
}

/// Subscription filter matching every belief published in a sector.
pub fn belief_wildcard(sector: &str, sensor_type: &str) -> String {
    format!("{TOPIC_ROOT}/belief/{sector}/{sensor_type}/+")
}

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("unknown topic root: {0}")]
    UnknownRoot(String),
    #[error("unknown topic kind: {0}")]
    UnknownKind(String),
    #[error("wrong segment count for '{kind}': expected {expected}, got {actual}")]
    SegmentCount {
        kind: String,
        expected: usize,
        actual: usize,
    },
    #[error("empty segment in topic: {0}")]
    EmptySegment(String),
}
