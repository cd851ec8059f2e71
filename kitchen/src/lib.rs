//! Kitchen Service - prepares and delivers published restaurant orders
//!
//! Listens on `restaurant/order`, simulates preparation with a random
//! wait, and publishes each finished order back on `restaurant/deliver`
//! so the ordering stations can record the delivery.

pub mod config;
pub mod handler;
pub mod logger;

// Re-export public types
pub use config::{Config, ConfigError};
pub use handler::OrderHandler;
pub use logger::init_logger;
