//! Live order tracking over a server-push channel.
//!
//! A [`LiveTrackingSubscriber`] opens one channel per order and hands back a
//! [`Subscription`] straight away; the channel opens in the background and
//! every outcome, including a failure to connect, arrives through the
//! callbacks. Malformed frames are reported without closing the channel. A
//! transport fault or the server ending the stream closes it and is reported
//! exactly once. There is no automatic reconnect.

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use swift_orders::{OrderId, OrderUpdate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::StreamError;

mod http;
mod simulated;
pub mod sse;

pub use http::SseSubscriber;
pub use simulated::SimulatedSubscriber;
pub use sse::{SseDecoder, SseEvent};

pub type UpdateCallback = Box<dyn FnMut(OrderUpdate) + Send>;
pub type ErrorCallback = Box<dyn FnMut(StreamError) + Send>;

/// Opens a live status channel for one order.
///
/// Implementations spawn onto the current Tokio runtime, so `subscribe` must
/// be called from within one.
pub trait LiveTrackingSubscriber: Send + Sync + Debug {
    fn subscribe(
        &self,
        order_id: &OrderId,
        on_update: UpdateCallback,
        on_error: ErrorCallback,
    ) -> Subscription;
}

pub type DynSubscriber = Arc<dyn LiveTrackingSubscriber>;

/// Server route serving the status stream.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackingRoute {
    /// `/orders/track/{orderId}`
    #[default]
    Track,
    /// `/sse/order/{orderId}`
    Sse,
}

impl TrackingRoute {
    pub fn path(self, order_id: &OrderId) -> String {
        match self {
            Self::Track => format!("/orders/track/{order_id}"),
            Self::Sse => format!("/sse/order/{order_id}"),
        }
    }
}

struct Callbacks {
    on_update: UpdateCallback,
    on_error: ErrorCallback,
}

struct Shared {
    closed: AtomicBool,
    callbacks: Mutex<Option<Callbacks>>,
}

impl Shared {
    fn new(on_update: UpdateCallback, on_error: ErrorCallback) -> Self {
        Self {
            closed: AtomicBool::new(false),
            callbacks: Mutex::new(Some(Callbacks {
                on_update,
                on_error,
            })),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Runs `f` against the callbacks unless the subscription is closed.
    /// Returns `false` once closed.
    fn with_callbacks(&self, f: impl FnOnce(&mut Callbacks)) -> bool {
        let Ok(mut guard) = self.callbacks.lock() else {
            return false;
        };

        if self.is_closed() {
            return false;
        }

        guard.as_mut().map(f).is_some()
    }

    /// Closes the subscription and reports `err` if it was still open.
    fn fail(&self, err: StreamError) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let callbacks = self.callbacks.lock().ok().and_then(|mut guard| guard.take());
        if let Some(mut callbacks) = callbacks {
            (callbacks.on_error)(err);
        }
    }
}

/// Handle to one open live channel.
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    order_id: OrderId,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// `false` after `unsubscribe` or once the channel has failed.
    pub fn is_active(&self) -> bool {
        !self.shared.is_closed()
    }

    /// Closes the channel. No callback runs after this returns; repeated
    /// calls do nothing.
    pub fn unsubscribe(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(task) = self.task.lock().ok().and_then(|mut guard| guard.take()) {
            task.abort();
        }

        // The lock is held while a callback runs; if this is called from
        // inside one, the dispatch task drops the callbacks instead.
        if let Ok(mut callbacks) = self.shared.callbacks.try_lock() {
            callbacks.take();
        }

        info!(order_id = %self.order_id, "Unsubscribed from order tracking");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("order_id", &self.order_id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Spawns the task that drives `events` into the callbacks.
pub(crate) fn spawn_dispatch<S>(
    order_id: OrderId,
    events: S,
    on_update: UpdateCallback,
    on_error: ErrorCallback,
) -> Subscription
where
    S: Stream<Item = Result<SseEvent, StreamError>> + Send + 'static,
{
    let shared = Arc::new(Shared::new(on_update, on_error));
    let task = tokio::spawn(dispatch(order_id.clone(), events, Arc::clone(&shared)));

    Subscription {
        order_id,
        shared,
        task: Mutex::new(Some(task)),
    }
}

async fn dispatch<S>(order_id: OrderId, events: S, shared: Arc<Shared>)
where
    S: Stream<Item = Result<SseEvent, StreamError>> + Send,
{
    let mut events = std::pin::pin!(events);

    while let Some(item) = events.next().await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!(%order_id, "Tracking stream failed: {err}");
                shared.fail(err);
                return;
            }
        };

        let delivered = match decode_event(&order_id, &event) {
            Ok(Some(update)) => {
                debug!(%order_id, "Received order update");
                shared.with_callbacks(|callbacks| (callbacks.on_update)(update))
            }
            Ok(None) => true,
            Err(err) => {
                warn!(%order_id, data = %event.data, "Dropping malformed frame: {err}");
                shared.with_callbacks(|callbacks| (callbacks.on_error)(err))
            }
        };

        if !delivered {
            return;
        }
    }

    info!(%order_id, "Tracking stream ended by server");
    shared.fail(StreamError::Closed { order_id });
}

/// Maps a raw event to an update.
///
/// Unnamed events and `order-update` events carry order JSON. Other named
/// events, such as the `connected` greeting, are ignored. A payload without an
/// identifier is attributed to the subscribed order.
pub(crate) fn decode_event(
    order_id: &OrderId,
    event: &SseEvent,
) -> Result<Option<OrderUpdate>, StreamError> {
    match event.event_type() {
        "message" | "order-update" => {}
        other => {
            debug!(%order_id, event = other, data = %event.data, "Ignoring named stream event");
            return Ok(None);
        }
    }

    let malformed = |reason: String| StreamError::MalformedFrame {
        order_id: order_id.clone(),
        reason,
        data: event.data.clone(),
    };

    let value: Value = serde_json::from_str(&event.data).map_err(|e| malformed(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(malformed("expected a JSON object".to_string()));
    };

    if !fields.contains_key("orderId") && !fields.contains_key("id") {
        fields.insert("orderId".to_string(), Value::String(order_id.to_string()));
    }

    serde_json::from_value(Value::Object(fields))
        .map(Some)
        .map_err(|e| malformed(e.to_string()))
}

/// Callback output folded into one type for channel delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    Update(OrderUpdate),
    Error(StreamError),
}

impl TrackingEvent {
    /// Callbacks that forward into `tx`, for consumers that apply events from
    /// their own loop.
    pub fn forward_to(tx: &mpsc::UnboundedSender<Self>) -> (UpdateCallback, ErrorCallback) {
        let updates = tx.clone();
        let errors = tx.clone();

        (
            Box::new(move |update| {
                let _ = updates.send(Self::Update(update));
            }),
            Box::new(move |err| {
                let _ = errors.send(Self::Error(err));
            }),
        )
    }
}

#[derive(Debug)]
struct Tracked {
    generation: u64,
    subscription: Subscription,
}

/// At most one live subscription per order.
///
/// Every subscription opened through the registry gets a fresh generation
/// number, so events queued by a closed or replaced subscription can be told
/// apart from those of the current one.
#[derive(Debug, Default)]
pub struct TrackingRegistry {
    subscriptions: HashMap<OrderId, Tracked>,
    last_generation: u64,
}

impl TrackingRegistry {
    /// Subscribes to `order_id`, closing any subscription already held for it
    /// before the new one opens. `callbacks` receives the generation assigned
    /// to the new subscription, which is also returned.
    pub fn track<F>(
        &mut self,
        subscriber: &dyn LiveTrackingSubscriber,
        order_id: &OrderId,
        callbacks: F,
    ) -> u64
    where
        F: FnOnce(u64) -> (UpdateCallback, ErrorCallback),
    {
        if let Some(previous) = self.subscriptions.remove(order_id) {
            debug!(%order_id, generation = previous.generation, "Replacing existing subscription");
            previous.subscription.unsubscribe();
        }

        self.last_generation += 1;
        let generation = self.last_generation;
        let (on_update, on_error) = callbacks(generation);
        let subscription = subscriber.subscribe(order_id, on_update, on_error);
        self.subscriptions.insert(
            order_id.clone(),
            Tracked {
                generation,
                subscription,
            },
        );

        generation
    }

    /// Returns `false` when the order was not tracked.
    pub fn untrack(&mut self, order_id: &OrderId) -> bool {
        self.subscriptions
            .remove(order_id)
            .map(|tracked| tracked.subscription.unsubscribe())
            .is_some()
    }

    /// Whether `generation` is the subscription currently held for
    /// `order_id`. Stays `true` after that channel fails, until it is
    /// forgotten or replaced.
    pub fn is_current(&self, order_id: &OrderId, generation: u64) -> bool {
        self.subscriptions
            .get(order_id)
            .is_some_and(|tracked| tracked.generation == generation)
    }

    /// Drops the entry for `order_id` if it still belongs to `generation`.
    pub fn forget(&mut self, order_id: &OrderId, generation: u64) -> bool {
        if !self.is_current(order_id, generation) {
            return false;
        }
        self.untrack(order_id)
    }

    pub fn is_tracking(&self, order_id: &OrderId) -> bool {
        self.subscriptions
            .get(order_id)
            .is_some_and(|tracked| tracked.subscription.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.subscriptions
            .values()
            .filter(|tracked| tracked.subscription.is_active())
            .count()
    }

    /// Forgets subscriptions whose channel has closed. Returns how many.
    pub fn prune(&mut self) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|_, tracked| tracked.subscription.is_active());
        before - self.subscriptions.len()
    }

    pub fn close_all(&mut self) {
        for (_, tracked) in self.subscriptions.drain() {
            tracked.subscription.unsubscribe();
        }
    }
}
