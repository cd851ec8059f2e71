//! Shared types for the restaurant ordering stack
//!
//! Common types used on both sides of the broker: the `Order` value type,
//! the well-known topic contract, and the JSON payload codec.

pub mod order;
pub mod topic;

// Re-exports
pub use order::{DecodeError, Order};
pub use topic::{DELIVER_TOPIC, ORDER_TOPIC};
