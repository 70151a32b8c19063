use swift_orders::{ApplyOutcome, Order, OrderId, OrderSyncState, OrderUpdate};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::StreamError;
use crate::tracking::{
    DynSubscriber, ErrorCallback, TrackingEvent, TrackingRegistry, UpdateCallback,
};

/// A live event stamped with the subscription that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEvent {
    pub order_id: OrderId,
    pub generation: u64,
    pub event: TrackingEvent,
}

/// Owns the order state together with the live channels feeding it.
///
/// Subscriptions deliver into a channel rather than touching the state, so
/// every mutation happens on the task that calls [`Self::handle`],
/// [`Self::load_snapshot`] or [`Self::apply_update`]. Events still queued from
/// a subscription that has since been untracked or replaced are dropped.
#[derive(Debug)]
pub struct OrderSync {
    state: OrderSyncState,
    subscriber: DynSubscriber,
    registry: TrackingRegistry,
    events_tx: mpsc::UnboundedSender<TrackedEvent>,
    events_rx: mpsc::UnboundedReceiver<TrackedEvent>,
}

impl OrderSync {
    pub fn new(subscriber: DynSubscriber) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            state: OrderSyncState::new(),
            subscriber,
            registry: TrackingRegistry::default(),
            events_tx,
            events_rx,
        }
    }

    pub const fn state(&self) -> &OrderSyncState {
        &self.state
    }

    pub fn load_snapshot(&mut self, orders: Vec<Order>) {
        self.state.load_snapshot(orders);
    }

    pub fn apply_update(&mut self, update: OrderUpdate) -> ApplyOutcome {
        self.state.apply_update(update)
    }

    pub fn mark_read(&mut self, notification_id: u64) -> bool {
        self.state.mark_read(notification_id)
    }

    pub fn mark_all_read(&mut self) {
        self.state.mark_all_read();
    }

    /// Opens a live channel for `order_id`, replacing any existing one.
    /// Returns the generation of the new subscription.
    pub fn track(&mut self, order_id: &OrderId) -> u64 {
        let tx = self.events_tx.clone();
        self.registry
            .track(self.subscriber.as_ref(), order_id, |generation| {
                forward(tx, order_id.clone(), generation)
            })
    }

    /// Tracks every loaded order that can still change. Returns how many.
    pub fn track_all(&mut self) -> usize {
        let open: Vec<OrderId> = self
            .state
            .orders()
            .iter()
            .filter(|order| !order.status.is_terminal())
            .map(|order| order.order_id.clone())
            .collect();

        for order_id in &open {
            self.track(order_id);
        }

        info!(count = open.len(), "Tracking open orders");
        open.len()
    }

    pub fn untrack(&mut self, order_id: &OrderId) -> bool {
        self.registry.untrack(order_id)
    }

    pub fn is_tracking(&self, order_id: &OrderId) -> bool {
        self.registry.is_tracking(order_id)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.registry.active_count()
    }

    pub fn close_all(&mut self) {
        self.registry.close_all();
    }

    /// Waits for the next event from a currently tracked subscription,
    /// skipping anything left behind by closed or replaced ones.
    pub async fn next_event(&mut self) -> Option<TrackedEvent> {
        loop {
            let tracked = self.events_rx.recv().await?;
            if self.registry.is_current(&tracked.order_id, tracked.generation) {
                return Some(tracked);
            }
            debug!(
                order_id = %tracked.order_id,
                generation = tracked.generation,
                "Skipping event from a closed subscription"
            );
        }
    }

    /// Applies an update or surfaces a stream error to the caller.
    ///
    /// Events from a subscription that is no longer current are discarded
    /// without touching the state.
    pub fn handle(&mut self, tracked: TrackedEvent) -> Result<ApplyOutcome, StreamError> {
        let TrackedEvent {
            order_id,
            generation,
            event,
        } = tracked;

        if !self.registry.is_current(&order_id, generation) {
            debug!(%order_id, generation, "Discarding event from a closed subscription");
            return Ok(ApplyOutcome::Discarded { order_id });
        }

        match event {
            TrackingEvent::Update(update) => Ok(self.apply_update(update)),
            TrackingEvent::Error(err) => {
                if err.is_fatal() {
                    error!(%order_id, "Lost live tracking: {err}");
                    self.registry.forget(&order_id, generation);
                } else {
                    warn!(%order_id, "Skipped tracking frame: {err}");
                }
                Err(err)
            }
        }
    }
}

fn forward(
    tx: mpsc::UnboundedSender<TrackedEvent>,
    order_id: OrderId,
    generation: u64,
) -> (UpdateCallback, ErrorCallback) {
    let updates = tx.clone();
    let update_id = order_id.clone();

    let on_update: UpdateCallback = Box::new(move |update| {
        let _ = updates.send(TrackedEvent {
            order_id: update_id.clone(),
            generation,
            event: TrackingEvent::Update(update),
        });
    });
    let on_error: ErrorCallback = Box::new(move |err| {
        let _ = tx.send(TrackedEvent {
            order_id: order_id.clone(),
            generation,
            event: TrackingEvent::Error(err),
        });
    });

    (on_update, on_error)
}
