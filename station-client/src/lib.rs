//! Station Client - order channel handler for table-side ordering stations
//!
//! Owns one broker connection, publishes food orders on `restaurant/order`,
//! listens for deliveries on `restaurant/deliver`, and accumulates delivered
//! orders per table in an in-memory [`DeliveryLedger`].

pub mod error;
pub mod handler;
pub mod ledger;
pub mod transport;

pub use error::{ClientError, ClientResult};
pub use handler::FoodHandler;
pub use ledger::DeliveryLedger;
pub use transport::{ClientTransport, MemoryTransport, MqttTransport, Publication};

// Re-export shared types for convenience
pub use shared::{DELIVER_TOPIC, DecodeError, ORDER_TOPIC, Order};
