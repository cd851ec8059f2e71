//! Delivery ledger
//!
//! In-memory record of which orders have been delivered, keyed by table.
//! Writes flow exclusively through the handler's inbound loop; presentation
//! code holds a cloned handle and only reads. Per-table appends go through
//! a single sharded map entry, so a concurrent reader sees either the
//! pre-append or the post-append sequence, never a partial one.

use dashmap::DashMap;
use shared::Order;
use std::sync::Arc;

/// Mapping from table identifier to the orders delivered to it, in arrival
/// order. A table appears as a key only after its first delivery.
#[derive(Debug, Clone, Default)]
pub struct DeliveryLedger {
    tables: Arc<DashMap<u32, Vec<Order>>>,
}

impl DeliveryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delivered order under its table, creating the entry on the
    /// first delivery for that table.
    pub(crate) fn append(&self, order: Order) {
        self.tables.entry(order.table).or_default().push(order);
    }

    /// Delivered orders for one table, oldest first. `None` if the table
    /// has not received a delivery yet.
    pub fn orders_for(&self, table: u32) -> Option<Vec<Order>> {
        self.tables.get(&table).map(|orders| orders.clone())
    }

    /// Tables that have received at least one delivery, ascending.
    pub fn tables(&self) -> Vec<u32> {
        let mut tables: Vec<u32> = self.tables.iter().map(|entry| *entry.key()).collect();
        tables.sort_unstable();
        tables
    }

    /// Number of tables with at least one delivery.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Whether no delivery has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_starts_empty() {
        let ledger = DeliveryLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.table_count(), 0);
        assert_eq!(ledger.orders_for(1), None);
    }

    #[test]
    fn test_append_creates_entry_on_first_delivery() {
        let ledger = DeliveryLedger::new();
        ledger.append(Order::new(1, "pizza"));

        assert_eq!(ledger.table_count(), 1);
        assert_eq!(ledger.orders_for(1), Some(vec![Order::new(1, "pizza")]));
    }

    #[test]
    fn test_appends_preserve_arrival_order() {
        let ledger = DeliveryLedger::new();
        ledger.append(Order::new(2, "soup"));
        ledger.append(Order::new(2, "bread"));

        assert_eq!(
            ledger.orders_for(2),
            Some(vec![Order::new(2, "soup"), Order::new(2, "bread")])
        );
    }

    #[test]
    fn test_tables_are_sorted() {
        let ledger = DeliveryLedger::new();
        ledger.append(Order::new(3, "a"));
        ledger.append(Order::new(1, "b"));
        ledger.append(Order::new(2, "c"));

        assert_eq!(ledger.tables(), vec![1, 2, 3]);
    }

    #[test]
    fn test_shared_handles_observe_the_same_state() {
        let ledger = DeliveryLedger::new();
        let reader = ledger.clone();
        ledger.append(Order::new(5, "noodles"));

        assert_eq!(reader.orders_for(5), Some(vec![Order::new(5, "noodles")]));
    }
}
