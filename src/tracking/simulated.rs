use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::time::Duration;
use swift_orders::{OrderId, OrderStatus};
use tracing::info;

use crate::error::StreamError;

use super::{
    ErrorCallback, LiveTrackingSubscriber, SseEvent, Subscription, UpdateCallback, spawn_dispatch,
};

/// One in this many simulated deliveries ends in `FAILED`.
const FAILURE_ODDS: u32 = 10;

/// Local stand-in for the server stream.
///
/// Walks each order through `PENDING -> IN_WAREHOUSE -> IN_TRANSIT` and then
/// `DELIVERED` (occasionally `FAILED`), waiting `step` plus up to half a step
/// of jitter before each change. The channel stays open after the last update.
#[derive(Debug, Clone)]
pub struct SimulatedSubscriber {
    step: Duration,
    seed: Option<u64>,
}

impl SimulatedSubscriber {
    pub const fn new(step: Duration) -> Self {
        Self { step, seed: None }
    }

    /// Deterministic jitter and outcome, for tests.
    pub const fn with_seed(step: Duration, seed: u64) -> Self {
        Self {
            step,
            seed: Some(seed),
        }
    }

    fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
    }
}

fn script(rng: &mut StdRng) -> Vec<OrderStatus> {
    let last = if rng.gen_ratio(1, FAILURE_ODDS) {
        OrderStatus::Failed
    } else {
        OrderStatus::Delivered
    };

    vec![
        OrderStatus::Pending,
        OrderStatus::InWarehouse,
        OrderStatus::InTransit,
        last,
    ]
}

/// `step` plus up to half a step of jitter, saturating at `Duration::MAX`.
fn next_delay(step: Duration, rng: &mut StdRng) -> Duration {
    let max_jitter = u64::try_from(step.as_millis() / 2).unwrap_or(u64::MAX);
    let jitter = Duration::from_millis(rng.gen_range(0..=max_jitter));
    step.saturating_add(jitter)
}

fn message(status: &OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Order received",
        OrderStatus::InWarehouse => "Package is being prepared at the warehouse",
        OrderStatus::InTransit => "Package is out for delivery",
        OrderStatus::Delivered => "Package delivered",
        OrderStatus::Failed => "Delivery attempt failed",
        _ => "Status updated",
    }
}

impl LiveTrackingSubscriber for SimulatedSubscriber {
    fn subscribe(
        &self,
        order_id: &OrderId,
        on_update: UpdateCallback,
        on_error: ErrorCallback,
    ) -> Subscription {
        info!(%order_id, step = ?self.step, "Subscribing to simulated order tracking");

        let mut rng = self.rng();
        let steps = script(&mut rng);
        let step = self.step;
        let id = order_id.clone();

        let events = stream::unfold(
            (steps.into_iter(), rng),
            move |(mut steps, mut rng)| {
                let id = id.clone();
                async move {
                    let status = steps.next()?;

                    tokio::time::sleep(next_delay(step, &mut rng)).await;

                    let text = message(&status);
                    let data = json!({
                        "orderId": id,
                        "status": status,
                        "message": text,
                        "timestamp": Utc::now().to_rfc3339(),
                    });
                    let event = SseEvent {
                        event: Some("order-update".to_string()),
                        data: data.to_string(),
                        id: None,
                    };

                    Some((Ok::<_, StreamError>(event), (steps, rng)))
                }
            },
        )
        .chain(stream::pending());

        spawn_dispatch(order_id.clone(), events, on_update, on_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackingEvent;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_walks_order_to_a_terminal_status() {
        let subscriber = SimulatedSubscriber::with_seed(Duration::from_millis(5), 7);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (on_update, on_error) = TrackingEvent::forward_to(&tx);

        let subscription = subscriber.subscribe(&OrderId::from("ORD-1"), on_update, on_error);

        let mut statuses = Vec::new();
        while statuses.len() < 4 {
            match rx.recv().await.unwrap() {
                TrackingEvent::Update(update) => {
                    assert_eq!(update.order_id, OrderId::from("ORD-1"));
                    assert!(update.message().is_some());
                    statuses.push(update.status.unwrap());
                }
                TrackingEvent::Error(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(
            statuses[..3],
            [
                OrderStatus::Pending,
                OrderStatus::InWarehouse,
                OrderStatus::InTransit
            ]
        );
        assert!(statuses[3].is_terminal());
        assert!(subscription.is_active());
    }

    #[test]
    fn test_seeded_script_is_deterministic() {
        let subscriber = SimulatedSubscriber::with_seed(Duration::from_secs(1), 42);

        assert_eq!(script(&mut subscriber.rng()), script(&mut subscriber.rng()));
    }

    #[test]
    fn test_delay_stays_within_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let step = Duration::from_millis(200);

        for _ in 0..100 {
            let delay = next_delay(step, &mut rng);
            assert!(delay >= step && delay <= Duration::from_millis(300), "{delay:?}");
        }
    }

    #[test]
    fn test_delay_saturates_for_huge_steps() {
        let mut rng = StdRng::seed_from_u64(11);

        assert_eq!(next_delay(Duration::MAX, &mut rng), Duration::MAX);
        let huge = Duration::from_secs(u64::MAX / 2);
        assert!(next_delay(huge, &mut rng) >= huge);
    }

    #[test]
    fn test_failure_is_possible() {
        let failed = (0..200).any(|seed| {
            let subscriber = SimulatedSubscriber::with_seed(Duration::from_secs(1), seed);
            script(&mut subscriber.rng()).last() == Some(&OrderStatus::Failed)
        });

        assert!(failed);
    }
}
