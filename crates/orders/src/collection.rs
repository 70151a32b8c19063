use std::collections::HashMap;
use tracing::warn;

use crate::{Order, OrderId};

/// Orders keyed by id, iterated in snapshot order.
///
/// Each id appears at most once. Only [`crate::OrderSyncState`] mutates a
/// collection, so the type exposes read access publicly and keeps writers
/// crate-private.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderCollection {
    orders: Vec<Order>,
    index: HashMap<OrderId, usize>,
}

impl OrderCollection {
    /// Builds a collection from a server listing.
    ///
    /// A repeated id replaces the earlier entry in place, keeping the
    /// position of its first occurrence.
    pub fn from_snapshot(orders: Vec<Order>) -> Self {
        let mut collection = Self::default();

        for order in orders {
            if let Some(&position) = collection.index.get(&order.order_id) {
                warn!(order_id = %order.order_id, "Duplicate order in snapshot, keeping latest entry");
                collection.orders[position] = order;
            } else {
                collection.index.insert(order.order_id.clone(), collection.orders.len());
                collection.orders.push(order);
            }
        }

        collection
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.index.get(order_id).map(|&position| &self.orders[position])
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub(crate) fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut Order> {
        self.index
            .get(order_id)
            .copied()
            .map(move |position| &mut self.orders[position])
    }
}

impl<'a> IntoIterator for &'a OrderCollection {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
