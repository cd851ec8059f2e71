//! Food Handler
//!
//! The order channel handler for a table-side ordering station. Owns one
//! broker connection, publishes outgoing orders, and records inbound
//! deliveries in the [`DeliveryLedger`].

use rumqttc::QoS;
use shared::{DELIVER_TOPIC, ORDER_TOPIC, Order, order};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, ClientResult};
use crate::ledger::DeliveryLedger;
use crate::transport::{ClientTransport, MqttTransport, Publication};

/// A handler for publishing food orders and recording their deliveries.
///
/// Construction spawns the inbound dispatch loop; [`FoodHandler::subscribe`]
/// must be called before any deliveries are expected. After
/// [`FoodHandler::close`] the handler is terminal and every operation fails
/// with [`ClientError::AlreadyClosed`].
#[derive(Debug, Clone)]
pub struct FoodHandler {
    transport: ClientTransport,
    ledger: DeliveryLedger,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl FoodHandler {
    /// Create a handler on an established transport.
    ///
    /// The ledger is passed in by the owner so presentation code can hold
    /// its own handle and observe deliveries as they are recorded.
    pub fn new(transport: ClientTransport, ledger: DeliveryLedger) -> Self {
        let shutdown = CancellationToken::new();

        let handler = Self {
            transport: transport.clone(),
            ledger: ledger.clone(),
            closed: Arc::new(AtomicBool::new(false)),
            shutdown: shutdown.clone(),
        };

        // Inbound dispatch loop. The broker client serializes delivery per
        // connection, so the ledger has a single writer.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    message = transport.read_message() => match message {
                        Ok(publication) => Self::handle_delivery(&ledger, &publication),
                        Err(e) => {
                            tracing::error!("Transport read error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        handler
    }

    /// Connect to the broker at `broker_url` and build a handler on the
    /// resulting MQTT transport.
    pub async fn connect(broker_url: &str, ledger: DeliveryLedger) -> ClientResult<Self> {
        let transport = MqttTransport::connect(broker_url).await?;
        Ok(Self::new(ClientTransport::Mqtt(transport), ledger))
    }

    /// Handle one inbound delivery message.
    ///
    /// A payload that fails schema validation is logged and dropped; the
    /// ledger is left untouched and the loop keeps processing. This also
    /// covers a retained message replayed at subscribe time.
    fn handle_delivery(ledger: &DeliveryLedger, publication: &Publication) {
        match order::decode(&publication.payload) {
            Ok(order) => {
                tracing::info!(table = order.table, food = %order.food, "Recorded delivery");
                ledger.append(order);
            }
            Err(e) => {
                tracing::error!("Failed to parse delivery payload: {}", e);
            }
        }
    }

    /// Subscribe to the delivery topic at exactly-once QoS.
    ///
    /// Must be called before any deliveries are expected. Safe to call
    /// again: the broker keeps one subscription per topic and session.
    pub async fn subscribe(&self) -> ClientResult<()> {
        self.ensure_open()?;
        self.transport
            .subscribe(DELIVER_TOPIC, QoS::ExactlyOnce)
            .await
    }

    /// Encode and publish a food order at exactly-once QoS.
    ///
    /// Exactly-once matters on both topics: the ledger has no natural
    /// deduplication key, so a redelivered message would be recorded as a
    /// second genuine order.
    pub async fn send_order(&self, order: &Order) -> ClientResult<()> {
        self.ensure_open()?;
        self.transport
            .publish(ORDER_TOPIC, order::encode(order), QoS::ExactlyOnce)
            .await
    }

    /// Close the broker connection.
    ///
    /// The transition is one-way: the inbound loop stops and every later
    /// operation on this handler, including a second `close`, fails with
    /// [`ClientError::AlreadyClosed`].
    pub async fn close(&self) -> ClientResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyClosed);
        }
        self.shutdown.cancel();
        self.transport.close().await
    }

    /// Handle on the delivery ledger for read access.
    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    fn ensure_open(&self) -> ClientResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::AlreadyClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use shared::order::encode;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct Harness {
        handler: FoodHandler,
        transport: MemoryTransport,
        /// Broker side: messages sent here reach the handler.
        broker_tx: broadcast::Sender<Publication>,
        /// Broker side: messages the handler publishes arrive here.
        published: broadcast::Receiver<Publication>,
    }

    fn harness() -> Harness {
        let (broker_tx, _) = broadcast::channel(16);
        let (client_tx, published) = broadcast::channel(16);
        let transport = MemoryTransport::new(&broker_tx, &client_tx);
        let handler = FoodHandler::new(
            ClientTransport::Memory(transport.clone()),
            DeliveryLedger::new(),
        );
        Harness {
            handler,
            transport,
            broker_tx,
            published,
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within one second");
    }

    fn deliver(broker_tx: &broadcast::Sender<Publication>, payload: Vec<u8>) {
        broker_tx
            .send(Publication::new(DELIVER_TOPIC, payload))
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_registers_delivery_topic() {
        let h = harness();
        h.handler.subscribe().await.unwrap();

        assert_eq!(
            h.transport.subscriptions(),
            vec![(DELIVER_TOPIC.to_string(), QoS::ExactlyOnce)]
        );
    }

    #[tokio::test]
    async fn test_send_order_publishes_exactly_one_message() {
        let mut h = harness();
        let order = Order::new(1, "pizza");
        h.handler.send_order(&order).await.unwrap();

        let published = h.published.recv().await.unwrap();
        assert_eq!(published.topic, ORDER_TOPIC);
        assert_eq!(order::decode(&published.payload).unwrap(), order);
        assert!(h.published.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_receives_a_single_delivery() {
        let h = harness();
        h.handler.subscribe().await.unwrap();

        let order = Order::new(1, "pizza");
        deliver(&h.broker_tx, encode(&order));

        let ledger = h.handler.ledger().clone();
        wait_until(|| ledger.table_count() == 1).await;
        assert_eq!(ledger.orders_for(1), Some(vec![order]));
    }

    #[tokio::test]
    async fn test_receives_deliveries_for_distinct_tables() {
        const NUM_ORDERS: u32 = 5;

        let h = harness();
        h.handler.subscribe().await.unwrap();

        for table in 0..NUM_ORDERS {
            deliver(&h.broker_tx, encode(&Order::new(table, "pizza")));
        }

        let ledger = h.handler.ledger().clone();
        wait_until(|| ledger.table_count() == NUM_ORDERS as usize).await;
        for table in 0..NUM_ORDERS {
            assert_eq!(
                ledger.orders_for(table),
                Some(vec![Order::new(table, "pizza")])
            );
        }
    }

    #[tokio::test]
    async fn test_deliveries_for_one_table_accumulate_in_order() {
        let h = harness();
        h.handler.subscribe().await.unwrap();

        deliver(&h.broker_tx, encode(&Order::new(2, "soup")));
        deliver(&h.broker_tx, encode(&Order::new(2, "bread")));

        let ledger = h.handler.ledger().clone();
        wait_until(|| ledger.orders_for(2).is_some_and(|orders| orders.len() == 2)).await;
        assert_eq!(
            ledger.orders_for(2),
            Some(vec![Order::new(2, "soup"), Order::new(2, "bread")])
        );
    }

    #[tokio::test]
    async fn test_retained_delivery_is_recorded() {
        let h = harness();
        h.handler.subscribe().await.unwrap();

        let order = Order::new(4, "ramen");
        let mut publication = Publication::new(DELIVER_TOPIC, encode(&order));
        publication.retain = true;
        h.broker_tx.send(publication).unwrap();

        let ledger = h.handler.ledger().clone();
        wait_until(|| ledger.table_count() == 1).await;
        assert_eq!(ledger.orders_for(4), Some(vec![order]));
    }

    #[tokio::test]
    async fn test_malformed_delivery_leaves_ledger_unchanged() {
        let h = harness();
        h.handler.subscribe().await.unwrap();

        deliver(&h.broker_tx, b"not json at all".to_vec());
        deliver(&h.broker_tx, br#"{"table": "one", "food": "pizza"}"#.to_vec());

        // A well-formed delivery after the bad ones proves the loop kept
        // processing.
        let order = Order::new(9, "pasta");
        deliver(&h.broker_tx, encode(&order));

        let ledger = h.handler.ledger().clone();
        wait_until(|| ledger.table_count() == 1).await;
        assert_eq!(ledger.tables(), vec![9]);
        assert_eq!(ledger.orders_for(9), Some(vec![order]));
    }

    #[tokio::test]
    async fn test_close_disconnects_and_rejects_further_operations() {
        let h = harness();
        h.handler.close().await.unwrap();
        assert!(!h.transport.is_connected());

        assert!(matches!(
            h.handler.subscribe().await,
            Err(ClientError::AlreadyClosed)
        ));
        assert!(matches!(
            h.handler.send_order(&Order::new(1, "pizza")).await,
            Err(ClientError::AlreadyClosed)
        ));
        assert!(matches!(
            h.handler.close().await,
            Err(ClientError::AlreadyClosed)
        ));
    }

    #[tokio::test]
    async fn test_ledger_is_shared_with_the_owner() {
        let (broker_tx, _) = broadcast::channel(16);
        let (client_tx, _) = broadcast::channel(16);
        let transport = MemoryTransport::new(&broker_tx, &client_tx);

        let ledger = DeliveryLedger::new();
        let handler = FoodHandler::new(ClientTransport::Memory(transport), ledger.clone());
        handler.subscribe().await.unwrap();

        let order = Order::new(6, "salad");
        broker_tx
            .send(Publication::new(DELIVER_TOPIC, encode(&order)))
            .unwrap();

        // The externally held handle observes the append.
        wait_until(|| ledger.table_count() == 1).await;
        assert_eq!(ledger.orders_for(6), Some(vec![order]));
    }
}
