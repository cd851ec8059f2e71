//! Transport abstraction for broker communication
//!
//! The handler talks to the broker through [`ClientTransport`], which
//! dispatches to a real MQTT connection or an in-process memory transport.
//! The memory transport keeps the handler testable without a live broker
//! and doubles as in-process wiring for embedded setups.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, mpsc};
use url::Url;
use uuid::Uuid;

use crate::error::ClientError;

/// Default MQTT port when the broker URL does not carry one.
const DEFAULT_MQTT_PORT: u16 = 1883;

/// Inbound message envelope handed to transport readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw message payload.
    pub payload: Vec<u8>,
    /// Whether the broker flagged this as a retained message.
    pub retain: bool,
}

impl Publication {
    /// Create a non-retained publication.
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            retain: false,
        }
    }
}

/// Transport abstraction for broker communication
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), ClientError>;
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), ClientError>;
    async fn read_message(&self) -> Result<Publication, ClientError>;
    async fn close(&self) -> Result<(), ClientError>;
}

/// Transport variants available to a handler instance.
#[derive(Debug, Clone)]
pub enum ClientTransport {
    Mqtt(MqttTransport),
    Memory(MemoryTransport),
}

impl ClientTransport {
    pub async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), ClientError> {
        match self {
            ClientTransport::Mqtt(t) => t.subscribe(topic, qos).await,
            ClientTransport::Memory(t) => t.subscribe(topic, qos).await,
        }
    }

    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
    ) -> Result<(), ClientError> {
        match self {
            ClientTransport::Mqtt(t) => t.publish(topic, payload, qos).await,
            ClientTransport::Memory(t) => t.publish(topic, payload, qos).await,
        }
    }

    pub async fn read_message(&self) -> Result<Publication, ClientError> {
        match self {
            ClientTransport::Mqtt(t) => t.read_message().await,
            ClientTransport::Memory(t) => t.read_message().await,
        }
    }

    pub async fn close(&self) -> Result<(), ClientError> {
        match self {
            ClientTransport::Mqtt(t) => t.close().await,
            ClientTransport::Memory(t) => t.close().await,
        }
    }
}

/// MQTT Transport Implementation
///
/// Wraps a rumqttc client plus a spawned pump task that drives the event
/// loop and feeds inbound PUBLISH packets into a channel. The event loop
/// also completes the QoS 2 acknowledgement handshakes for outbound
/// publishes.
#[derive(Debug, Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    inbound: Arc<Mutex<mpsc::Receiver<Publication>>>,
}

impl MqttTransport {
    /// Connect to the broker at `broker_url` (`mqtt://host[:port]`).
    ///
    /// Drives the event loop until the broker acknowledges the session, so
    /// a refused or unreachable broker surfaces here as
    /// [`ClientError::Connect`] instead of failing silently in the
    /// background.
    pub async fn connect(broker_url: &str) -> Result<Self, ClientError> {
        let options = parse_broker_url(broker_url)?;
        let (client, mut event_loop) = AsyncClient::new(options, 16);

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => {}
                Err(e) => return Err(ClientError::Connect(e.to_string())),
            }
        }
        tracing::info!("Connected to MQTT broker at {}", broker_url);

        let (tx, rx) = mpsc::channel(64);

        // Pump task: keeps the connection alive and forwards inbound
        // publishes until the connection drops or the receiver is gone.
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let publication = Publication {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                            retain: publish.retain,
                        };
                        if tx.send(publication).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("MQTT event loop terminated: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            client,
            inbound: Arc::new(Mutex::new(rx)),
        })
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), ClientError> {
        self.client
            .subscribe(topic, qos)
            .await
            .map_err(|e| ClientError::Subscribe(e.to_string()))
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), ClientError> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| ClientError::Publish(e.to_string()))
    }

    async fn read_message(&self) -> Result<Publication, ClientError> {
        let mut inbound = self.inbound.lock().await;
        inbound
            .recv()
            .await
            .ok_or_else(|| ClientError::Connect("broker connection closed".to_string()))
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))
    }
}

/// Build MQTT options from a `mqtt://host[:port]` connection string.
///
/// The URL is not validated beyond what the connection needs: host and
/// optional port. Each transport gets a unique client id so two stations
/// never evict each other's session.
fn parse_broker_url(broker_url: &str) -> Result<MqttOptions, ClientError> {
    let url = Url::parse(broker_url)
        .map_err(|e| ClientError::Connect(format!("invalid broker url '{broker_url}': {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| ClientError::Connect(format!("broker url '{broker_url}' has no host")))?;
    let port = url.port().unwrap_or(DEFAULT_MQTT_PORT);

    let client_id = format!("station-{}", Uuid::new_v4());
    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(Duration::from_secs(5));
    Ok(options)
}

/// Memory Transport Implementation (for in-process communication)
///
/// Behaves like a minimal topic-filtering broker client: only messages on
/// subscribed topics are handed out by `read_message`.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Receiver for messages FROM the broker side
    rx: Arc<Mutex<broadcast::Receiver<Publication>>>,
    /// Sender for messages TO the broker side
    tx: broadcast::Sender<Publication>,
    subscriptions: Arc<StdMutex<Vec<(String, QoS)>>>,
    connected: Arc<AtomicBool>,
}

impl MemoryTransport {
    /// Create a new memory transport
    ///
    /// # Arguments
    /// * `broker_tx` - broadcast sender the broker side publishes on
    /// * `client_tx` - channel this transport publishes outbound messages to
    pub fn new(
        broker_tx: &broadcast::Sender<Publication>,
        client_tx: &broadcast::Sender<Publication>,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(broker_tx.subscribe())),
            tx: client_tx.clone(),
            subscriptions: Arc::new(StdMutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Topics this transport is currently subscribed to.
    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Whether the transport still holds its connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::Subscribe("transport is closed".to_string()));
        }
        let mut subscriptions = self.subscriptions.lock().unwrap();
        // A broker holds at most one subscription per topic and session, so
        // a repeated subscribe must not register a second one.
        if !subscriptions.iter().any(|(t, _)| t == topic) {
            subscriptions.push((topic.to_string(), qos));
        }
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, _qos: QoS) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::Publish("transport is closed".to_string()));
        }
        self.tx
            .send(Publication::new(topic, payload))
            .map_err(|e| ClientError::Publish(format!("memory channel error: {e}")))?;
        Ok(())
    }

    async fn read_message(&self) -> Result<Publication, ClientError> {
        let mut rx = self.rx.lock().await;
        loop {
            let publication = rx
                .recv()
                .await
                .map_err(|e| ClientError::Connect(format!("memory channel error: {e}")))?;
            let subscribed = self
                .subscriptions
                .lock()
                .unwrap()
                .iter()
                .any(|(t, _)| t == &publication.topic);
            if subscribed {
                return Ok(publication);
            }
        }
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
