//! Agent lifecycle: bus connection, admission handshake with the monitor,
//! message dispatch, the periodic publish loop and graceful shutdown.
//!
//! Two concurrency contexts share the brain: the publisher (timer-driven
//! sampling and publishing) and the dispatcher (bus-message driven). The
//! dispatcher runs as its own task and never propagates handler errors; the
//! publisher holds one brain write lock across the compute → decide →
//! snapshot triad so alerts are always consistent with the belief published
//! in the same tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;

use crate::brain::SensorBrain;
use crate::config::AgentConfig;
use crate::network::{BusError, Inbound, MqttSession, SessionOptions};
use crate::protocol::{
    belief_wildcard, AlertPayload, Assignment, BeliefPayload, ControlCommand, DataPayload,
    FeedbackPayload, PresencePayload, QosClass, Rejection, Topic,
};
use crate::sampler::{make_sensor_id, Sampler};
use crate::util::logging::AlertLogger;

/// Placeholder sector used for presence messaging before admission.
pub const PENDING_SECTOR: &str = "pending";

/// Lifecycle states. `Terminated` is terminal; everything else can still
/// move toward it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Unconnected,
    ConnectedUnassigned,
    ConnectedAssigned,
    Rejected,
    ShuttingDown,
    Terminated,
}

pub struct Agent {
    inner: Arc<AgentInner>,
    dispatcher_handle: RwLock<Option<JoinHandle<()>>>,
}

struct AgentInner {
    config: AgentConfig,
    sensor_id: String,
    session: RwLock<Option<MqttSession>>,
    brain: RwLock<SensorBrain>,
    sampler: Mutex<Box<dyn Sampler>>,
    state: RwLock<AgentState>,
    sector: watch::Sender<Option<String>>,
    running: AtomicBool,
    disconnected: AtomicBool,
    publish_interval: AtomicU64,
    shutdown: Notify,
    rejection: RwLock<Option<String>>,
    alert_logger: Option<AlertLogger>,
}

impl Agent {
    pub fn new(config: AgentConfig, sampler: Box<dyn Sampler>) -> Self {
        let sensor_id = make_sensor_id(&config.agent.sensor_type);
        let brain = SensorBrain::new(&sensor_id, config.risk.clone());
        let alert_logger = AlertLogger::new(&config.logging, &sensor_id);
        let (sector_tx, _) = watch::channel(None);

        match &config.agent.sector {
            Some(sector) => tracing::info!(sensor_id = %sensor_id, sector = %sector, "agent created"),
            None => tracing::info!(sensor_id = %sensor_id, "agent created, awaiting sector assignment"),
        }

        Self {
            inner: Arc::new(AgentInner {
                sensor_id,
                session: RwLock::new(None),
                brain: RwLock::new(brain),
                sampler: Mutex::new(sampler),
                state: RwLock::new(AgentState::Unconnected),
                sector: sector_tx,
                running: AtomicBool::new(false),
                disconnected: AtomicBool::new(false),
                publish_interval: AtomicU64::new(config.agent.base_interval_secs),
                shutdown: Notify::new(),
                rejection: RwLock::new(None),
                alert_logger,
                config,
            }),
            dispatcher_handle: RwLock::new(None),
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.inner.sensor_id
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> AgentState {
        *self.inner.state.read().await
    }

    pub fn sector(&self) -> Option<String> {
        self.inner.sector.borrow().clone()
    }

    pub fn publish_interval(&self) -> u64 {
        self.inner.publish_interval.load(Ordering::SeqCst)
    }

    /// Establishes the bus session and performs the pre-admission setup:
    /// last-will registration, admission subscriptions, online presence.
    pub async fn connect(&self) -> Result<(), AgentError> {
        let inner = &self.inner;
        let sensor_type = inner.config.agent.sensor_type.clone();
        let hint = inner.config.agent.sector.clone();
        let will_sector = hint.clone().unwrap_or_else(|| PENDING_SECTOR.to_string());

        let will = PresencePayload::offline(
            &inner.sensor_id,
            &sensor_type,
            &will_sector,
            Some("connection_lost".into()),
        );
        let will_topic = Topic::status(&will_sector, &sensor_type, &inner.sensor_id);

        tracing::info!(
            sensor_id = %inner.sensor_id,
            host = %inner.config.broker.host,
            port = inner.config.broker.port,
            "connecting to broker"
        );

        let (session, inbound_rx) = MqttSession::start(SessionOptions {
            client_id: inner.sensor_id.clone(),
            host: inner.config.broker.host.clone(),
            port: inner.config.broker.port,
            keep_alive: Duration::from_secs(inner.config.broker.keep_alive_secs),
            will_topic: will_topic.to_string(),
            will_payload: serde_json::to_vec(&will)?,
        });

        let connect_timeout = Duration::from_secs(inner.config.broker.connect_timeout_secs);
        if session.await_connected(connect_timeout).await.is_err() {
            session.disconnect().await;
            return Err(AgentError::ConnectionTimeout(connect_timeout));
        }

        inner.running.store(true, Ordering::SeqCst);
        Self::transition(inner, AgentState::ConnectedUnassigned).await;

        // Admission topics before any publish: a fast rejection must not
        // race past us.
        session
            .subscribe(Topic::reject(&inner.sensor_id).to_string(), QosClass::ExactlyOnce)
            .await?;
        session
            .subscribe(Topic::assign(&inner.sensor_id).to_string(), QosClass::ExactlyOnce)
            .await?;

        let presence = PresencePayload::online(&inner.sensor_id, &sensor_type, &will_sector);
        session
            .publish(&will_topic, serde_json::to_vec(&presence)?)
            .await?;

        *inner.session.write().await = Some(session);

        if let Some(sector) = hint {
            Self::apply_assignment(inner, &sector, "startup hint").await;
        }

        let dispatch_inner = Arc::clone(inner);
        let handle = tokio::spawn(dispatcher_loop(dispatch_inner, inbound_rx));
        *self.dispatcher_handle.write().await = Some(handle);

        Ok(())
    }

    /// The steady-state loop: waits for admission if needed, then samples,
    /// publishes and sleeps for the adaptive interval until shutdown.
    pub async fn run(&self, base_interval: u64) -> Result<(), AgentError> {
        let inner = &self.inner;
        if inner.session.read().await.is_none() {
            return Err(AgentError::NotConnected);
        }

        let base_interval = base_interval.max(1);
        inner.publish_interval.store(base_interval, Ordering::SeqCst);
        inner.brain.write().await.set_base_interval(base_interval);

        if inner.sector.borrow().is_none() {
            let timeout = Duration::from_secs(inner.config.broker.assignment_timeout_secs);
            tracing::info!(
                sensor_id = %inner.sensor_id,
                timeout_secs = timeout.as_secs(),
                "waiting for sector assignment"
            );

            if !Self::await_assignment(inner, timeout).await {
                self.disconnect().await;
                if let Some(reason) = inner.rejection.read().await.clone() {
                    return Err(AgentError::Rejected { reason });
                }
                tracing::error!(sensor_id = %inner.sensor_id, "no sector assignment, shutting down");
                return Err(AgentError::AssignmentTimeout(timeout));
            }
        }

        tracing::info!(
            sensor_id = %inner.sensor_id,
            sector = %inner.sector.borrow().as_deref().unwrap_or(PENDING_SECTOR),
            base_interval_secs = base_interval,
            "entering publish loop"
        );

        while inner.running.load(Ordering::SeqCst) {
            Self::publish_tick(inner).await;

            let base = inner.publish_interval.load(Ordering::SeqCst);
            let (interval, neighbors) = {
                let brain = inner.brain.read().await;
                (brain.adaptive_interval(base), brain.active_neighbors())
            };
            if interval != base {
                tracing::info!(
                    sensor_id = %inner.sensor_id,
                    interval_secs = interval,
                    neighbors,
                    "adaptive interval in effect"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
                _ = inner.shutdown.notified() => {}
            }
        }

        self.disconnect().await;

        if let Some(reason) = inner.rejection.read().await.clone() {
            return Err(AgentError::Rejected { reason });
        }
        Ok(())
    }

    /// Asks the publish loop to wind down at its next check.
    pub fn request_shutdown(&self, reason: &str) {
        tracing::info!(sensor_id = %self.inner.sensor_id, reason, "shutdown requested");
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
    }

    /// Publishes the final offline presence and tears the session down.
    /// Idempotent; runs on every exit path.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        if inner.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }

        inner.running.store(false, Ordering::SeqCst);
        Self::transition(inner, AgentState::ShuttingDown).await;

        let session = inner.session.write().await.take();
        if let Some(session) = session {
            let sector = inner
                .sector
                .borrow()
                .clone()
                .unwrap_or_else(|| PENDING_SECTOR.to_string());
            let sensor_type = &inner.config.agent.sensor_type;
            let presence =
                PresencePayload::offline(&inner.sensor_id, sensor_type, &sector, None);
            let topic = Topic::status(&sector, sensor_type, &inner.sensor_id);

            match serde_json::to_vec(&presence) {
                Ok(bytes) => {
                    if let Err(e) = session.publish(&topic, bytes).await {
                        tracing::warn!(error = %e, "failed to publish offline presence");
                    }
                }
                Err(e) => tracing::error!(error = %e, "offline presence serialization failed"),
            }

            session.disconnect().await;
        }

        if let Some(handle) = self.dispatcher_handle.write().await.take() {
            handle.abort();
        }
        if let Some(logger) = &inner.alert_logger {
            logger.shutdown();
        }

        Self::transition(inner, AgentState::Terminated).await;
        tracing::info!(sensor_id = %inner.sensor_id, "agent disconnected");
    }

    async fn transition(inner: &AgentInner, to: AgentState) {
        let mut state = inner.state.write().await;
        if *state == to {
            return;
        }
        tracing::info!(
            sensor_id = %inner.sensor_id,
            from = ?*state,
            to = ?to,
            "state transition"
        );
        *state = to;
    }

    /// True once a sector is known; false on timeout or shutdown/rejection.
    async fn await_assignment(inner: &Arc<AgentInner>, timeout: Duration) -> bool {
        let mut sector_rx = inner.sector.subscribe();
        let wait = async {
            loop {
                if sector_rx.borrow_and_update().is_some() {
                    return true;
                }
                if !inner.running.load(Ordering::SeqCst) {
                    return false;
                }
                tokio::select! {
                    changed = sector_rx.changed() => {
                        if changed.is_err() {
                            return false;
                        }
                    }
                    _ = inner.shutdown.notified() => {}
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }

    async fn apply_assignment(inner: &AgentInner, sector: &str, source: &str) {
        tracing::info!(sensor_id = %inner.sensor_id, sector, source, "sector assigned");

        let sensor_type = inner.config.agent.sensor_type.clone();
        // Presence went out under the placeholder only when no startup hint
        // existed; only then is there a retained "pending" record to retire.
        let was_pending = inner.config.agent.sector.is_none() && inner.sector.borrow().is_none();

        {
            let session_guard = inner.session.read().await;
            let Some(session) = session_guard.as_ref() else {
                return;
            };

            let subscriptions = [
                Topic::control_one(sector, &sensor_type, &inner.sensor_id).to_string(),
                Topic::control_group(sector, &sensor_type).to_string(),
                belief_wildcard(sector, &sensor_type),
                Topic::feedback(sector, &sensor_type, &inner.sensor_id).to_string(),
            ];
            for filter in subscriptions {
                if let Err(e) = session.subscribe(filter.clone(), QosClass::AtLeastOnce).await {
                    tracing::error!(filter = %filter, error = %e, "sector subscription failed");
                }
            }

            // Retire the retained pending presence before announcing under
            // the real sector, so late joiners never see a ghost sensor.
            if was_pending {
                let tombstone = PresencePayload::offline(
                    &inner.sensor_id,
                    &sensor_type,
                    PENDING_SECTOR,
                    Some("sector_assigned".into()),
                );
                let topic = Topic::status(PENDING_SECTOR, &sensor_type, &inner.sensor_id);
                publish_json(session, &topic, &tombstone).await;
            }

            let presence = PresencePayload::online(&inner.sensor_id, &sensor_type, sector);
            let topic = Topic::status(sector, &sensor_type, &inner.sensor_id);
            publish_json(session, &topic, &presence).await;
        }

        Self::transition(inner, AgentState::ConnectedAssigned).await;
        // send_replace records the sector even before anyone waits on it.
        inner.sector.send_replace(Some(sector.to_string()));
    }

    /// One publisher tick: sample, update the brain, publish data, belief
    /// and (on consensus) the alert, in that order.
    async fn publish_tick(inner: &AgentInner) {
        let Some(sector) = inner.sector.borrow().clone() else {
            return;
        };

        let measurement = inner.sampler.lock().await.sample();
        if let Err(e) = measurement.validate() {
            tracing::error!(error = %e, "sampler produced an invalid measurement, skipping tick");
            return;
        }

        // One write lock across update, risk, snapshot and decision: the
        // alert must carry the same risk the belief of this tick reports.
        let (data, belief, alert) = {
            let mut brain = inner.brain.write().await;
            brain.add_measurement(
                measurement.temperature_c,
                measurement.pressure_hpa,
                measurement.humidity_pct,
            );
            let risk = brain.compute_local_risk();
            let belief = brain.belief_summary(measurement.timestamp);
            let alert = brain
                .should_alert()
                .then(|| AlertPayload::weather_risk(&inner.sensor_id, risk, measurement.clone()));
            let data = DataPayload::from_measurement(&inner.sensor_id, &measurement);
            (data, belief, alert)
        };

        let session_guard = inner.session.read().await;
        let Some(session) = session_guard.as_ref() else {
            tracing::warn!(sensor_id = %inner.sensor_id, "not connected, skipping publish");
            return;
        };

        let sensor_type = &inner.config.agent.sensor_type;

        publish_json(session, &Topic::data(&sector, sensor_type, &inner.sensor_id), &data).await;
        tracing::info!(
            sensor_id = %inner.sensor_id,
            temperature_c = data.temperature_c,
            pressure_hpa = data.pressure_hpa,
            humidity_pct = data.humidity_pct,
            "published data"
        );

        publish_json(session, &Topic::belief(&sector, sensor_type, &inner.sensor_id), &belief)
            .await;
        tracing::info!(
            sensor_id = %inner.sensor_id,
            local_risk = belief.local_risk,
            risk_level = %belief.risk_level,
            "published belief"
        );

        if let Some(alert) = alert {
            publish_json(session, &Topic::alert(&sector, sensor_type, &inner.sensor_id), &alert)
                .await;
            tracing::warn!(
                sensor_id = %inner.sensor_id,
                risk = alert.risk_level,
                "alert published"
            );
            if let Some(logger) = &inner.alert_logger {
                logger.log(&alert);
            }
        }
    }
}

/// Transient publish failures are logged and retried implicitly on the next
/// tick; nothing is queued.
async fn publish_json<T: Serialize>(session: &MqttSession, topic: &Topic, payload: &T) {
    match serde_json::to_vec(payload) {
        Ok(bytes) => {
            if let Err(e) = session.publish(topic, bytes).await {
                tracing::warn!(topic = %topic, error = %e, "publish failed, will retry next tick");
            }
        }
        Err(e) => tracing::error!(topic = %topic, error = %e, "payload serialization failed"),
    }
}

async fn dispatcher_loop(inner: Arc<AgentInner>, mut inbound: mpsc::Receiver<Inbound>) {
    tracing::debug!(sensor_id = %inner.sensor_id, "dispatcher started");

    while let Some(msg) = inbound.recv().await {
        // Handlers never propagate: a bad message must not take the
        // dispatcher down.
        dispatch(&inner, msg).await;
    }

    tracing::debug!(sensor_id = %inner.sensor_id, "dispatcher stopped");
}

async fn dispatch(inner: &AgentInner, msg: Inbound) {
    let topic = match Topic::parse(&msg.topic) {
        Ok(topic) => topic,
        Err(e) => {
            tracing::error!(topic = %msg.topic, error = %e, "unparseable topic, dropping message");
            return;
        }
    };

    match topic {
        Topic::Reject { .. } => handle_rejection(inner, &msg.payload).await,
        Topic::Assign { .. } => handle_assignment(inner, &msg.payload).await,
        Topic::Belief { .. } => handle_belief(inner, &msg.payload).await,
        Topic::Feedback { .. } => handle_feedback(inner, &msg.payload).await,
        Topic::ControlOne { .. } | Topic::ControlGroup { .. } => {
            handle_control(inner, &msg.payload).await
        }
        other => tracing::debug!(topic = %other, "unhandled topic kind"),
    }
}

async fn handle_rejection(inner: &AgentInner, payload: &[u8]) {
    let rejection: Rejection = match serde_json::from_slice(payload) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "malformed rejection payload, dropping");
            return;
        }
    };

    tracing::warn!(
        sensor_id = %inner.sensor_id,
        reason = %rejection.reason,
        retry_after = ?rejection.retry_after,
        "admission rejected by monitor, shutting down"
    );

    *inner.rejection.write().await = Some(rejection.reason);
    Agent::transition(inner, AgentState::Rejected).await;
    inner.running.store(false, Ordering::SeqCst);
    inner.shutdown.notify_waiters();
}

async fn handle_assignment(inner: &AgentInner, payload: &[u8]) {
    let assignment: Assignment = match serde_json::from_slice(payload) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %e, "malformed assignment payload, dropping");
            return;
        }
    };

    if assignment.sector.is_empty() {
        tracing::error!(sensor_id = %inner.sensor_id, "empty sector in assignment, dropping");
        return;
    }

    Agent::apply_assignment(inner, &assignment.sector, "monitor").await;
}

async fn handle_belief(inner: &AgentInner, payload: &[u8]) {
    let belief: BeliefPayload = match serde_json::from_slice(payload) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "malformed belief payload, dropping");
            return;
        }
    };

    let mut brain = inner.brain.write().await;
    brain.update_neighbor_belief(&belief.sensor_id, belief.local_risk);

    tracing::debug!(
        sensor_id = %inner.sensor_id,
        neighbor = %belief.sensor_id,
        risk = belief.local_risk,
        "neighbor belief recorded"
    );
}

async fn handle_feedback(inner: &AgentInner, payload: &[u8]) {
    let feedback: FeedbackPayload = match serde_json::from_slice(payload) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(error = %e, "malformed feedback payload, dropping");
            return;
        }
    };

    inner.brain.write().await.process_feedback(feedback.kind);
}

async fn handle_control(inner: &AgentInner, payload: &[u8]) {
    let command: ControlCommand = match serde_json::from_slice(payload) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "malformed control payload, dropping");
            return;
        }
    };

    match command {
        ControlCommand::AdjustInterval { interval } => {
            if interval == 0 {
                tracing::error!(sensor_id = %inner.sensor_id, "zero interval in control command, dropping");
                return;
            }
            inner.publish_interval.store(interval, Ordering::SeqCst);
            tracing::info!(sensor_id = %inner.sensor_id, interval_secs = interval, "publish interval adjusted");
        }
        ControlCommand::ResetLearning => {
            inner.brain.write().await.reset_learning();
        }
        ControlCommand::Shutdown { reason } => {
            tracing::warn!(
                sensor_id = %inner.sensor_id,
                reason = %reason.as_deref().unwrap_or("monitor shutdown"),
                "shutdown command received"
            );
            inner.running.store(false, Ordering::SeqCst);
            inner.shutdown.notify_waiters();
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("broker session not ready within {0:?}")]
    ConnectionTimeout(Duration),
    #[error("no sector assignment within {0:?}")]
    AssignmentTimeout(Duration),
    #[error("admission rejected: {reason}")]
    Rejected { reason: String },
    #[error("agent is not connected")]
    NotConnected,
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
