//! Client error types

use shared::DecodeError;
use thiserror::Error;

/// Errors surfaced by the order channel handler and its transports.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection to the broker failed or was lost
    #[error("connection error: {0}")]
    Connect(String),

    /// Subscription setup was rejected or the connection was unusable
    #[error("subscribe error: {0}")]
    Subscribe(String),

    /// A publish round trip failed or was rejected by the broker
    #[error("publish error: {0}")]
    Publish(String),

    /// The handler was used after `close()` completed
    #[error("handler is already closed")]
    AlreadyClosed,

    /// An inbound payload could not be parsed into an order
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
