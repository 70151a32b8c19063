use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::{
    DeliveryTransition, Notification, Order, OrderCollection, OrderId, OrderStatus, OrderUpdate,
    ValidationError,
};

/// Result of feeding one live update into [`OrderSyncState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Merged {
        order_id: OrderId,
        previous_status: OrderStatus,
        status_changed: bool,
    },
    /// The update named an order that is not loaded; nothing changed.
    Discarded { order_id: OrderId },
}

/// Notifications kept before older ones are dropped, read ones first.
pub const MAX_NOTIFICATIONS: usize = 100;

/// Client-held view of the orders and the notifications derived from them.
///
/// [`Self::load_snapshot`] and [`Self::apply_update`] are the only writers for
/// order entries. Counts are computed from the current state on every call.
#[derive(Debug, Default)]
pub struct OrderSyncState {
    orders: OrderCollection,
    notifications: VecDeque<Notification>,
    next_notification_id: u64,
}

impl OrderSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every order with a fresh server listing.
    pub fn load_snapshot(&mut self, orders: Vec<Order>) {
        self.orders = OrderCollection::from_snapshot(orders);
        info!(orders = self.orders.len(), "Loaded order snapshot");
    }

    /// Merges a partial update into the matching order.
    ///
    /// Updates are applied in the order they arrive; a repeated or older status
    /// simply overwrites the current one. Updates for orders that are not
    /// loaded are dropped.
    pub fn apply_update(&mut self, update: OrderUpdate) -> ApplyOutcome {
        let order_id = update.order_id.clone();
        let server_message = update.message().map(str::to_owned);

        let Some(order) = self.orders.get_mut(&order_id) else {
            warn!(%order_id, "Discarding update for order that is not loaded");
            return ApplyOutcome::Discarded { order_id };
        };

        match order.merge(update) {
            Some(previous_status) => {
                let status = order.status.clone();
                info!(%order_id, from = %previous_status, to = %status, "Order status changed");

                let message =
                    server_message.unwrap_or_else(|| status_message(&order_id, &status));
                self.push_notification(message);

                ApplyOutcome::Merged {
                    order_id,
                    previous_status,
                    status_changed: true,
                }
            }
            None => {
                debug!(%order_id, "Merged order update without status change");
                ApplyOutcome::Merged {
                    previous_status: order.status.clone(),
                    order_id,
                    status_changed: false,
                }
            }
        }
    }

    /// Validates a driver-initiated transition against the loaded order and
    /// returns the update to apply once the server confirms it.
    pub fn plan_transition(
        &self,
        order_id: &OrderId,
        transition: DeliveryTransition,
    ) -> Result<OrderUpdate, ValidationError> {
        let order = self
            .orders
            .get(order_id)
            .ok_or_else(|| ValidationError::UnknownOrder {
                order_id: order_id.clone(),
            })?;

        let target = transition.check(order_id, &order.status)?;
        Ok(OrderUpdate::status_only(order_id.clone(), target))
    }

    pub fn orders(&self) -> &OrderCollection {
        &self.orders
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn pending_count(&self) -> usize {
        self.orders.iter().filter(|order| order.status.is_pending()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.orders.iter().filter(|order| order.status.is_completed()).count()
    }

    /// First assigned order in list order.
    pub fn next_delivery(&self) -> Option<&Order> {
        self.orders
            .iter()
            .find(|order| order.status == OrderStatus::Assigned)
    }

    /// Newest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    /// Records a notification, e.g. one pushed by the server.
    pub fn push_notification(&mut self, message: String) -> u64 {
        self.push_notification_at(message, Utc::now())
    }

    pub fn push_notification_at(&mut self, message: String, created_at: DateTime<Utc>) -> u64 {
        self.next_notification_id += 1;
        let id = self.next_notification_id;
        self.notifications
            .push_front(Notification::new(id, message, created_at));
        self.trim_notifications();
        id
    }

    /// Drops the oldest read notification while over capacity, or the oldest
    /// one outright when all of them are unread.
    fn trim_notifications(&mut self) {
        while self.notifications.len() > MAX_NOTIFICATIONS {
            let oldest_read = self.notifications.iter().rposition(|n| n.read);
            let dropped = match oldest_read {
                Some(index) => self.notifications.remove(index),
                None => self.notifications.pop_back(),
            };
            if let Some(dropped) = dropped {
                debug!(id = dropped.id, read = dropped.read, "Dropped old notification");
            }
        }
    }

    /// Returns `false` when no notification has this id.
    pub fn mark_read(&mut self, id: u64) -> bool {
        self.notifications
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| n.read = true)
            .is_some()
    }

    pub fn mark_all_read(&mut self) {
        for notification in &mut self.notifications {
            notification.read = true;
        }
    }
}

fn status_message(order_id: &OrderId, status: &OrderStatus) -> String {
    match status {
        OrderStatus::Pending => format!("Order {order_id} is pending"),
        OrderStatus::InWarehouse => format!("Order {order_id} has arrived at the warehouse"),
        OrderStatus::InTransit => format!("Order {order_id} is now in transit"),
        OrderStatus::Delivered => format!("Order {order_id} has been delivered"),
        OrderStatus::Failed => format!("Delivery of order {order_id} failed"),
        OrderStatus::Assigned => format!("Order {order_id} has been assigned to a driver"),
        OrderStatus::Completed => format!("Order {order_id} has been completed"),
        OrderStatus::Unknown(raw) => format!("Order {order_id} status changed to {raw}"),
    }
}
