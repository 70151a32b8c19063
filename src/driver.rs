use swift_orders::{ApplyOutcome, DeliveryTransition, Order, OrderId, OrderStatus};
use tracing::info;

use crate::endpoints::{DeliveryStatusUpdate, DriverRoute};
use crate::error::ClientError;
use crate::network::ApiClient;
use crate::sync::OrderSync;
use crate::tracking::DynSubscriber;

/// Driver-facing view over the deliveries assigned to one driver.
///
/// Status transitions are checked locally, sent to the server, and applied to
/// the local state only after the server accepts them.
#[derive(Debug)]
pub struct DriverDesk {
    api: ApiClient,
    driver_id: String,
    sync: OrderSync,
}

impl DriverDesk {
    pub fn new(api: ApiClient, driver_id: impl Into<String>, subscriber: DynSubscriber) -> Self {
        Self {
            api,
            driver_id: driver_id.into(),
            sync: OrderSync::new(subscriber),
        }
    }

    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    pub const fn sync(&self) -> &OrderSync {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut OrderSync {
        &mut self.sync
    }

    /// Reloads assigned deliveries. Returns the number loaded.
    pub async fn refresh(&mut self) -> Result<usize, ClientError> {
        let orders = self.api.assigned_deliveries(&self.driver_id).await?;
        self.sync.load_snapshot(orders);
        Ok(self.sync.state().orders().len())
    }

    pub async fn route(&self) -> Result<DriverRoute, ClientError> {
        self.api.driver_route(&self.driver_id).await
    }

    pub fn next_delivery(&self) -> Option<&Order> {
        self.sync.state().next_delivery()
    }

    pub async fn start(&mut self, order_id: &OrderId) -> Result<ApplyOutcome, ClientError> {
        self.transition(order_id, DeliveryTransition::Start, None)
            .await
    }

    pub async fn complete(&mut self, order_id: &OrderId) -> Result<ApplyOutcome, ClientError> {
        self.transition(order_id, DeliveryTransition::Complete, None)
            .await
    }

    pub async fn fail(
        &mut self,
        order_id: &OrderId,
        reason: Option<String>,
    ) -> Result<ApplyOutcome, ClientError> {
        self.transition(order_id, DeliveryTransition::Fail, reason)
            .await
    }

    async fn transition(
        &mut self,
        order_id: &OrderId,
        transition: DeliveryTransition,
        reason: Option<String>,
    ) -> Result<ApplyOutcome, ClientError> {
        let update = self.sync.state().plan_transition(order_id, transition)?;

        match transition {
            DeliveryTransition::Start => self.api.start_delivery(order_id).await?,
            DeliveryTransition::Complete => self.api.complete_delivery(order_id).await?,
            DeliveryTransition::Fail => {
                self.api
                    .update_delivery_status(&DeliveryStatusUpdate {
                        order_id: order_id.clone(),
                        status: OrderStatus::Failed,
                        reason,
                        proof_of_delivery: None,
                    })
                    .await?
            }
        };

        info!(%order_id, %transition, driver_id = %self.driver_id, "Delivery transition accepted");
        Ok(self.sync.apply_update(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::SimulatedSubscriber;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use swift_orders::ValidationError;

    fn desk(server: &MockServer) -> DriverDesk {
        DriverDesk::new(
            ApiClient::new(&server.base_url()),
            "DRV-001",
            Arc::new(SimulatedSubscriber::new(Duration::from_secs(60))),
        )
    }

    fn mock_assigned(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/drivers/orders/DRV-001");
            then.status(200).json_body(json!([
                {"orderId": "ORD-12345", "status": "IN_TRANSIT"},
                {"orderId": "ORD-12346", "status": "ASSIGNED"},
                {"orderId": "ORD-12347", "status": "ASSIGNED"},
                {"orderId": "ORD-12349", "status": "COMPLETED"}
            ]));
        });
    }

    #[tokio::test]
    async fn test_refresh_and_next_delivery() {
        let server = MockServer::start();
        mock_assigned(&server);

        let mut desk = desk(&server);
        assert_eq!(desk.refresh().await.unwrap(), 4);

        assert_eq!(
            desk.next_delivery().unwrap().order_id,
            OrderId::from("ORD-12346")
        );
        assert_eq!(desk.sync().state().pending_count(), 2);
        assert_eq!(desk.sync().state().completed_count(), 1);
    }

    #[tokio::test]
    async fn test_start_then_complete() {
        let server = MockServer::start();
        mock_assigned(&server);
        let start = server.mock(|when, then| {
            when.method(PUT).path("/drivers/driver/start/ORD-12346");
            then.status(200);
        });
        let complete = server.mock(|when, then| {
            when.method(PUT).path("/drivers/driver/complete/ORD-12346");
            then.status(200);
        });

        let mut desk = desk(&server);
        desk.refresh().await.unwrap();
        let order_id = OrderId::from("ORD-12346");

        desk.start(&order_id).await.unwrap();
        assert_eq!(
            desk.sync().state().order(&order_id).unwrap().status,
            OrderStatus::InTransit
        );

        desk.complete(&order_id).await.unwrap();
        assert_eq!(
            desk.sync().state().order(&order_id).unwrap().status,
            OrderStatus::Completed
        );

        start.assert();
        complete.assert();
    }

    #[tokio::test]
    async fn test_invalid_transition_sends_nothing() {
        let server = MockServer::start();
        mock_assigned(&server);
        let complete = server.mock(|when, then| {
            when.method(PUT).path_contains("/drivers/driver/complete/");
            then.status(200);
        });

        let mut desk = desk(&server);
        desk.refresh().await.unwrap();

        let err = desk
            .complete(&OrderId::from("ORD-12346"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InvalidTransition { .. })
        ));

        let err = desk
            .complete(&OrderId::from("ORD-99999"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::UnknownOrder { .. })
        ));

        complete.assert_hits(0);
    }

    #[tokio::test]
    async fn test_server_rejection_leaves_state_untouched() {
        let server = MockServer::start();
        mock_assigned(&server);
        server.mock(|when, then| {
            when.method(PUT).path("/drivers/driver/start/ORD-12346");
            then.status(500);
        });

        let mut desk = desk(&server);
        desk.refresh().await.unwrap();
        let order_id = OrderId::from("ORD-12346");

        let err = desk.start(&order_id).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(
            desk.sync().state().order(&order_id).unwrap().status,
            OrderStatus::Assigned
        );
        assert_eq!(desk.sync().state().unread_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_posts_reason() {
        let server = MockServer::start();
        mock_assigned(&server);
        let update = server.mock(|when, then| {
            when.method(POST).path("/drivers/deliveries/update").json_body(json!({
                "orderId": "ORD-12345",
                "status": "FAILED",
                "reason": "Address not found"
            }));
            then.status(200).json_body(json!({"ok": true}));
        });

        let mut desk = desk(&server);
        desk.refresh().await.unwrap();
        let order_id = OrderId::from("ORD-12345");

        let outcome = desk
            .fail(&order_id, Some("Address not found".to_string()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Merged {
                order_id: order_id.clone(),
                previous_status: OrderStatus::InTransit,
                status_changed: true,
            }
        );
        update.assert();
    }

    #[tokio::test]
    async fn test_route() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/drivers/DRV-001/route");
            then.status(200)
                .json_body(json!({"routeId": "RT-1", "waypoints": ["Warehouse A"]}));
        });

        let desk = desk(&server);
        let route = desk.route().await.unwrap();

        assert_eq!(route.route_id.as_deref(), Some("RT-1"));
        assert!(route.orders.is_empty());
    }
}
