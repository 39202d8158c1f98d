//! MQTT session management.
//!
//! The rumqttc event loop is isolated in its own background task; the
//! session struct is a thin controller that talks to the broker through the
//! async client and surfaces inbound publishes over an mpsc channel, so no
//! caller ever blocks the network driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::protocol::{QosClass, Topic};

const INBOUND_BUFFER: usize = 256;

/// A message delivered by the broker.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    /// Registered with the broker inside CONNECT; the broker, not the agent,
    /// publishes it (retained) on ungraceful disconnect.
    pub will_topic: String,
    pub will_payload: Vec<u8>,
}

pub struct MqttSession {
    client: AsyncClient,
    connected: watch::Receiver<bool>,
    closing: Arc<AtomicBool>,
    poll_handle: JoinHandle<()>,
}

impl MqttSession {
    /// Starts a session and its background poll task. Returns the inbound
    /// message stream alongside the session handle.
    pub fn start(opts: SessionOptions) -> (Self, mpsc::Receiver<Inbound>) {
        let mut mqtt = MqttOptions::new(&opts.client_id, &opts.host, opts.port);
        mqtt.set_keep_alive(opts.keep_alive);
        mqtt.set_last_will(LastWill::new(
            &opts.will_topic,
            opts.will_payload.clone(),
            QoS::AtLeastOnce,
            true,
        ));

        let (client, eventloop) = AsyncClient::new(mqtt, INBOUND_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (connected_tx, connected_rx) = watch::channel(false);
        let closing = Arc::new(AtomicBool::new(false));

        let poll_handle = tokio::spawn(poll_task(
            eventloop,
            inbound_tx,
            connected_tx,
            Arc::clone(&closing),
        ));

        (
            Self {
                client,
                connected: connected_rx,
                closing,
                poll_handle,
            },
            inbound_rx,
        )
    }

    /// Blocks until the broker acknowledges the session, or the timeout.
    pub async fn await_connected(&self, timeout: Duration) -> Result<(), BusError> {
        let mut connected = self.connected.clone();
        tokio::time::timeout(timeout, connected.wait_for(|up| *up))
            .await
            .map_err(|_| BusError::ConnectTimeout(timeout))?
            .map_err(|_| BusError::Closed)?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// QoS and retain flag come from the topic kind itself.
    pub async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(topic.to_string(), map_qos(topic.qos()), topic.retained(), payload)
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    pub async fn subscribe(&self, filter: impl Into<String>, qos: QosClass) -> Result<(), BusError> {
        let filter = filter.into();
        self.client
            .subscribe(filter.clone(), map_qos(qos))
            .await
            .map_err(|e| BusError::Subscribe(format!("{}: {}", filter, e)))
    }

    /// Tears the session down. Safe to call more than once.
    pub async fn disconnect(&self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!(error = %e, "disconnect request failed, aborting poll task");
            self.poll_handle.abort();
        }
    }
}

fn map_qos(class: QosClass) -> QoS {
    match class {
        QosClass::AtLeastOnce => QoS::AtLeastOnce,
        QosClass::ExactlyOnce => QoS::ExactlyOnce,
    }
}

async fn poll_task(
    mut eventloop: rumqttc::EventLoop,
    inbound: mpsc::Sender<Inbound>,
    connected: watch::Sender<bool>,
    closing: Arc<AtomicBool>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("broker session established");
                let _ = connected.send(true);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = Inbound {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if inbound.send(msg).await.is_err() {
                    tracing::debug!("inbound receiver dropped, stopping poll task");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                let _ = connected.send(false);
                if closing.load(Ordering::SeqCst) {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                let _ = connected.send(false);
                if closing.load(Ordering::SeqCst) {
                    break;
                }
                tracing::error!(error = %e, "mqtt poll error, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    tracing::debug!("mqtt poll task stopped");
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("broker session not ready within {0:?}")]
    ConnectTimeout(Duration),
    #[error("session closed")]
    Closed,
    #[error("failed to publish: {0}")]
    Publish(String),
    #[error("failed to subscribe: {0}")]
    Subscribe(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_await_connected_times_out_without_broker() {
        let (session, _rx) = MqttSession::start(SessionOptions {
            client_id: "test-sensor".into(),
            host: "127.0.0.1".into(),
            // Reserved port, nothing listens here.
            port: 1,
            keep_alive: Duration::from_secs(5),
            will_topic: "weather/status/pending/meteo/test-sensor".into(),
            will_payload: b"{}".to_vec(),
        });

        let result = session.await_connected(Duration::from_millis(200)).await;
        assert!(matches!(result, Err(BusError::ConnectTimeout(_))));

        session.disconnect().await;
    }
}
