//! Per-agent intelligence: rolling history, risk assessment, neighbor
//! beliefs, consensus-gated alerting, adaptive pacing and feedback-driven
//! sensitivity learning.

mod window;

pub use window::RollingWindow;

use std::collections::HashMap;

use nimbus_core::RiskLevel;

use crate::config::RiskConfig;
use crate::protocol::{BeliefPayload, FeedbackKind};

/// The decision core of one sensor agent.
///
/// The publisher context feeds measurements in and reads the alert decision;
/// the dispatcher context feeds neighbor beliefs and feedback in. Callers
/// serialize access (the agent holds the brain behind one lock) so that
/// `should_alert` always sees a consistent (local_risk, neighbor table) pair.
#[derive(Debug)]
pub struct SensorBrain {
    sensor_id: String,
    config: RiskConfig,
    temperature: RollingWindow,
    pressure: RollingWindow,
    humidity: RollingWindow,
    neighbor_beliefs: HashMap<String, f64>,
    local_risk: f64,
    sensitivity: f64,
    false_alarm_count: u32,
    missed_event_count: u32,
    base_interval: u64,
}

impl SensorBrain {
    pub fn new(sensor_id: impl Into<String>, config: RiskConfig) -> Self {
        let sensor_id = sensor_id.into();
        let history_size = config.history_size;

        tracing::debug!(sensor_id = %sensor_id, history_size, "brain initialized");

        Self {
            sensor_id,
            temperature: RollingWindow::new(history_size),
            pressure: RollingWindow::new(history_size),
            humidity: RollingWindow::new(history_size),
            neighbor_beliefs: HashMap::new(),
            local_risk: 0.0,
            sensitivity: 1.0,
            false_alarm_count: 0,
            missed_event_count: 0,
            base_interval: 5,
            config,
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn local_risk(&self) -> f64 {
        self.local_risk
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn base_interval(&self) -> u64 {
        self.base_interval
    }

    pub fn set_base_interval(&mut self, secs: u64) {
        self.base_interval = secs;
    }

    pub fn add_measurement(&mut self, temperature: f64, pressure: f64, humidity: f64) {
        self.temperature.push(temperature);
        self.pressure.push(pressure);
        self.humidity.push(humidity);

        tracing::debug!(
            sensor_id = %self.sensor_id,
            temperature_c = temperature,
            pressure_hpa = pressure,
            humidity_pct = humidity,
            "measurement recorded"
        );
    }

    /// Storm precursor: pressure fell by more than the configured drop across
    /// the last three samples. Inactive until three samples exist.
    fn pressure_drop(&self) -> bool {
        let (Some(oldest), Some(latest)) = (self.pressure.nth_from_end(2), self.pressure.latest())
        else {
            return false;
        };

        let drop = oldest - latest;
        if drop > self.config.pressure_drop_hpa {
            tracing::warn!(sensor_id = %self.sensor_id, drop_hpa = drop, "rapid pressure drop");
            return true;
        }
        false
    }

    /// Ice risk: cold and wet at the same time.
    fn cold_wet(&self) -> bool {
        let (Some(temperature), Some(humidity)) = (self.temperature.latest(), self.humidity.latest())
        else {
            return false;
        };

        if temperature < self.config.cold_temp_c && humidity > self.config.wet_humidity_pct {
            tracing::warn!(
                sensor_id = %self.sensor_id,
                temperature_c = temperature,
                humidity_pct = humidity,
                "ice risk conditions"
            );
            return true;
        }
        false
    }

    fn extremes(&self) -> bool {
        let (Some(temperature), Some(pressure)) = (self.temperature.latest(), self.pressure.latest())
        else {
            return false;
        };

        if temperature < self.config.extreme_cold_c || temperature > self.config.extreme_heat_c {
            tracing::warn!(sensor_id = %self.sensor_id, temperature_c = temperature, "extreme temperature");
            return true;
        }

        if pressure < self.config.extreme_low_pressure_hpa {
            tracing::warn!(sensor_id = %self.sensor_id, pressure_hpa = pressure, "very low pressure");
            return true;
        }

        false
    }

    /// Recomputes the local risk from the current windows.
    ///
    /// Returns 0.0 while fewer than two samples exist. Otherwise the three
    /// factor weights are summed, scaled by the learned sensitivity and
    /// clamped to the unit interval.
    pub fn compute_local_risk(&mut self) -> f64 {
        if self.temperature.len() < 2 {
            return 0.0;
        }

        let mut risk = 0.0;
        if self.pressure_drop() {
            risk += self.config.pressure_drop_weight;
        }
        if self.cold_wet() {
            risk += self.config.cold_wet_weight;
        }
        if self.extremes() {
            risk += self.config.extremes_weight;
        }

        risk = (risk * self.sensitivity).min(1.0);
        self.local_risk = risk;

        tracing::debug!(sensor_id = %self.sensor_id, risk, "local risk computed");
        risk
    }

    /// Upserts a neighbor's reported risk. The agent's own gossip echoes
    /// back on the belief wildcard; it is filtered here by id.
    pub fn update_neighbor_belief(&mut self, neighbor_id: &str, risk: f64) {
        if neighbor_id == self.sensor_id {
            return;
        }
        self.neighbor_beliefs.insert(neighbor_id.to_string(), risk);
    }

    pub fn neighbors_avg(&self) -> Option<f64> {
        if self.neighbor_beliefs.is_empty() {
            return None;
        }
        let sum: f64 = self.neighbor_beliefs.values().sum();
        Some(sum / self.neighbor_beliefs.len() as f64)
    }

    pub fn active_neighbors(&self) -> usize {
        self.neighbor_beliefs.len()
    }

    /// The distributed decision rule: alert only when local risk is
    /// significant and the neighborhood does not disagree.
    pub fn should_alert(&self) -> bool {
        if self.local_risk < self.config.risk_threshold {
            return false;
        }

        match self.neighbors_avg() {
            None => {
                tracing::info!(
                    sensor_id = %self.sensor_id,
                    local_risk = self.local_risk,
                    "high local risk, no neighbors, alerting alone"
                );
                true
            }
            Some(avg) if avg >= self.config.consensus_threshold => {
                tracing::info!(
                    sensor_id = %self.sensor_id,
                    local_risk = self.local_risk,
                    neighbor_avg = avg,
                    "consensus reached"
                );
                true
            }
            Some(avg) => {
                tracing::info!(
                    sensor_id = %self.sensor_id,
                    local_risk = self.local_risk,
                    neighbor_avg = avg,
                    "no consensus, holding alert"
                );
                false
            }
        }
    }

    /// Publishing cadence backs off as the neighborhood gets busier.
    pub fn adaptive_interval(&self, base: u64) -> u64 {
        match self.active_neighbors() {
            0..=2 => base,
            3..=5 => (base as f64 * 1.5).floor() as u64,
            _ => base * 2,
        }
    }

    pub fn process_feedback(&mut self, kind: FeedbackKind) {
        match kind {
            FeedbackKind::FalseAlarm => {
                self.false_alarm_count += 1;
                self.sensitivity = (self.sensitivity - self.config.sensitivity_step)
                    .max(self.config.min_sensitivity);
                tracing::info!(
                    sensor_id = %self.sensor_id,
                    sensitivity = self.sensitivity,
                    "false alarm feedback, sensitivity lowered"
                );
            }
            FeedbackKind::MissedEvent => {
                self.missed_event_count += 1;
                self.sensitivity = (self.sensitivity + self.config.sensitivity_step)
                    .min(self.config.max_sensitivity);
                tracing::info!(
                    sensor_id = %self.sensor_id,
                    sensitivity = self.sensitivity,
                    "missed event feedback, sensitivity raised"
                );
            }
            FeedbackKind::Correct => {
                // Contract toward the neutral 1.0 without overshooting it.
                if self.sensitivity < 1.0 {
                    self.sensitivity = (self.sensitivity + self.config.correct_step).min(1.0);
                } else if self.sensitivity > 1.0 {
                    self.sensitivity = (self.sensitivity - self.config.correct_step).max(1.0);
                }
                tracing::info!(
                    sensor_id = %self.sensor_id,
                    sensitivity = self.sensitivity,
                    "correct prediction feedback"
                );
            }
        }
    }

    pub fn reset_learning(&mut self) {
        self.sensitivity = 1.0;
        self.false_alarm_count = 0;
        self.missed_event_count = 0;
        tracing::info!(sensor_id = %self.sensor_id, "learning parameters reset");
    }

    /// Snapshot gossiped to peers. `would_alert` reports what this sensor is
    /// about to do in the current tick.
    pub fn belief_summary(&self, timestamp: u64) -> BeliefPayload {
        BeliefPayload {
            sensor_id: self.sensor_id.clone(),
            timestamp,
            local_risk: round3(self.local_risk),
            risk_level: RiskLevel::from_risk(self.local_risk),
            neighbor_count: self.active_neighbors(),
            neighbor_avg_risk: self.neighbors_avg().map(round3),
            sensitivity: round2(self.sensitivity),
            false_alarm_count: self.false_alarm_count,
            missed_event_count: self.missed_event_count,
            would_alert: self.should_alert(),
        }
    }

    pub fn stats(&self) -> BrainStats {
        BrainStats {
            measurements: self.temperature.len(),
            local_risk: round3(self.local_risk),
            neighbors: self.active_neighbors(),
            sensitivity: round2(self.sensitivity),
            false_alarms: self.false_alarm_count,
            missed_events: self.missed_event_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrainStats {
    pub measurements: usize,
    pub local_risk: f64,
    pub neighbors: usize,
    pub sensitivity: f64,
    pub false_alarms: u32,
    pub missed_events: u32,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
