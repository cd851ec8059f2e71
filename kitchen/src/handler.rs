//! Order handler for dispatching restaurant deliveries
//!
//! Each inbound order gets its own preparation task so a slow order never
//! blocks the ones behind it.

use rand::Rng;
use rumqttc::QoS;
use shared::{DELIVER_TOPIC, ORDER_TOPIC, order};
use station_client::ClientResult;
use station_client::transport::{ClientTransport, MqttTransport, Publication};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Dispatches restaurant deliveries in response to restaurant orders.
#[derive(Debug, Clone)]
pub struct OrderHandler {
    transport: ClientTransport,
    min_wait: Duration,
    max_wait: Duration,
    shutdown: CancellationToken,
}

impl OrderHandler {
    /// Create a handler on an established transport.
    pub fn new(transport: ClientTransport, min_wait: Duration, max_wait: Duration) -> Self {
        Self {
            transport,
            min_wait,
            max_wait,
            shutdown: CancellationToken::new(),
        }
    }

    /// Connect to the configured broker.
    pub async fn connect(config: &Config) -> ClientResult<Self> {
        let transport = MqttTransport::connect(&config.broker_url).await?;
        Ok(Self::new(
            ClientTransport::Mqtt(transport),
            Duration::from_secs_f64(config.min_order_wait),
            Duration::from_secs_f64(config.max_order_wait),
        ))
    }

    /// Subscribe to the order topic at exactly-once QoS.
    pub async fn subscribe(&self) -> ClientResult<()> {
        self.transport.subscribe(ORDER_TOPIC, QoS::ExactlyOnce).await
    }

    /// Handle incoming orders until the connection drops or the shutdown
    /// token fires.
    pub async fn run(&self) {
        tracing::info!("Listening for orders...");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Order handler shutting down");
                    break;
                }
                message = self.transport.read_message() => match message {
                    Ok(publication) => self.handle_order(publication),
                    Err(e) => {
                        tracing::error!("Error while listening for orders: {}", e);
                        break;
                    }
                }
            }
        }
    }

    /// Handle a single order message.
    ///
    /// A malformed order is logged and dropped; well-formed orders get a
    /// preparation task that publishes the delivery after the wait.
    fn handle_order(&self, publication: Publication) {
        let order = match order::decode(&publication.payload) {
            Ok(order) => order,
            Err(e) => {
                tracing::error!("Failed to parse order: {}", e);
                return;
            }
        };

        let transport = self.transport.clone();
        let wait = self.preparation_time();
        tokio::spawn(async move {
            tracing::info!(table = order.table, food = %order.food, "Preparing order");
            tokio::time::sleep(wait).await;

            match transport
                .publish(DELIVER_TOPIC, order::encode(&order), QoS::ExactlyOnce)
                .await
            {
                Ok(()) => {
                    tracing::info!(table = order.table, food = %order.food, "Delivered order")
                }
                Err(e) => tracing::error!("Failed to publish delivery: {}", e),
            }
        });
    }

    /// Random preparation time within the configured bounds.
    fn preparation_time(&self) -> Duration {
        let secs = rand::thread_rng()
            .gen_range(self.min_wait.as_secs_f64()..=self.max_wait.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Token that stops [`OrderHandler::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the run loop and close the broker connection.
    pub async fn close(&self) -> ClientResult<()> {
        self.shutdown.cancel();
        self.transport.close().await
    }
}
