//! Order value type and payload codec
//!
//! Orders cross the broker as JSON (`{"table": 1, "food": "pizza"}`).
//! Decoding enforces the schema up front: a missing field, a wrong type,
//! or non-JSON input is a [`DecodeError`], never a partially populated
//! value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single food order placed from a numbered table.
///
/// Immutable once constructed; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    /// Table the order was placed from.
    pub table: u32,
    /// Description of the ordered food.
    pub food: String,
}

impl Order {
    /// Create a new order for the given table.
    pub fn new(table: u32, food: impl Into<String>) -> Self {
        Self {
            table,
            food: food.into(),
        }
    }
}

/// Error raised when an inbound payload cannot be parsed into an [`Order`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON, or a required field is missing or has the
    /// wrong type.
    #[error("malformed order payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload parsed but the food description is empty.
    #[error("order for table {table} has an empty food description")]
    EmptyFood {
        /// Table the rejected order was addressed to.
        table: u32,
    },
}

/// Serialize an [`Order`] to its JSON wire payload.
///
/// Deterministic and exactly reversible by [`decode`].
pub fn encode(order: &Order) -> Vec<u8> {
    serde_json::to_vec(order).expect("Failed to serialize order payload")
}

/// Parse a wire payload into an [`Order`], validating the schema.
pub fn decode(payload: &[u8]) -> Result<Order, DecodeError> {
    let order: Order = serde_json::from_slice(payload)?;
    if order.food.is_empty() {
        return Err(DecodeError::EmptyFood { table: order.table });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let order = Order::new(1, "pizza");
        let payload = encode(&order);
        assert_eq!(decode(&payload).unwrap(), order);
    }

    #[test]
    fn test_decode_plain_json() {
        let order = decode(br#"{"table": 4, "food": "ramen"}"#).unwrap();
        assert_eq!(order, Order::new(4, "ramen"));
    }

    #[test]
    fn test_decode_tolerates_unknown_fields() {
        let order = decode(br#"{"table": 2, "food": "soup", "note": "no salt"}"#).unwrap();
        assert_eq!(order, Order::new(2, "soup"));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(
            decode(b"not json at all"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        assert!(matches!(
            decode(br#"{"table": 1}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(br#"{"food": "pizza"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        // No silent coercion of a string table number
        assert!(matches!(
            decode(br#"{"table": "1", "food": "pizza"}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(br#"{"table": -1, "food": "pizza"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_food() {
        assert!(matches!(
            decode(br#"{"table": 7, "food": ""}"#),
            Err(DecodeError::EmptyFood { table: 7 })
        ));
    }
}
