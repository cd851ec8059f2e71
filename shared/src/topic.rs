//! Well-known broker topics
//!
//! Outbound orders and inbound deliveries use separate topics so that a
//! station's publish and subscribe concerns never collide on one channel,
//! and so that multiple order-producing stations can share one
//! delivery-listening handler without cross-talk.

/// Topic on which ordering stations publish new food orders.
pub const ORDER_TOPIC: &str = "restaurant/order";

/// Topic on which the kitchen publishes finished deliveries.
pub const DELIVER_TOPIC: &str = "restaurant/deliver";
