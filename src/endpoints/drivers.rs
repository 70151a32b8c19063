use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use swift_orders::error::require;
use swift_orders::{Order, OrderId, OrderStatus, ValidationError};

use crate::error::ClientError;
use crate::network::ApiClient;

/// Route planned for a driver, with the orders on it when the server includes
/// them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRoute {
    #[serde(default)]
    pub route_id: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatusUpdate {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_of_delivery: Option<String>,
}

impl ApiClient {
    pub async fn assigned_deliveries(&self, driver_id: &str) -> Result<Vec<Order>, ClientError> {
        require("driverId", driver_id)?;

        let orders: Option<Vec<Order>> =
            self.get(&format!("/drivers/orders/{driver_id}")).await?;
        Ok(orders.unwrap_or_default())
    }

    pub async fn driver_route(&self, driver_id: &str) -> Result<DriverRoute, ClientError> {
        require("driverId", driver_id)?;

        let route: Option<DriverRoute> = self.get(&format!("/drivers/{driver_id}/route")).await?;
        Ok(route.unwrap_or_default())
    }

    pub async fn start_delivery(&self, order_id: &OrderId) -> Result<Value, ClientError> {
        require_order(order_id)?;

        Ok(self
            .put(&format!("/drivers/driver/start/{order_id}"), None)
            .await?)
    }

    pub async fn complete_delivery(&self, order_id: &OrderId) -> Result<Value, ClientError> {
        require_order(order_id)?;

        Ok(self
            .put(&format!("/drivers/driver/complete/{order_id}"), None)
            .await?)
    }

    /// Reports a status with an optional reason, used when a delivery fails.
    pub async fn update_delivery_status(
        &self,
        update: &DeliveryStatusUpdate,
    ) -> Result<Value, ClientError> {
        require_order(&update.order_id)?;
        require("status", update.status.as_str())?;

        Ok(self.post("/drivers/deliveries/update", update).await?)
    }
}

fn require_order(order_id: &OrderId) -> Result<(), ValidationError> {
    require("orderId", order_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_assigned_deliveries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/drivers/orders/DRV-001");
            then.status(200).json_body(json!([
                {"orderId": "ORD-12345", "status": "ASSIGNED"},
                {"orderId": "ORD-12346", "status": "IN_TRANSIT"}
            ]));
        });

        let client = ApiClient::new(&server.base_url());
        let orders = client.assigned_deliveries("DRV-001").await.unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].status, OrderStatus::InTransit);
        mock.assert();
    }

    #[tokio::test]
    async fn test_driver_route() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/drivers/DRV-001/route");
            then.status(200).json_body(json!({
                "routeId": "RT-7",
                "waypoints": ["Warehouse A", "Galle Road", "Kandy Road"],
                "createdAt": "2024-11-15T08:00:00",
                "orders": [{"orderId": "ORD-12345", "status": "ASSIGNED"}]
            }));
        });

        let client = ApiClient::new(&server.base_url());
        let route = client.driver_route("DRV-001").await.unwrap();

        assert_eq!(route.route_id.as_deref(), Some("RT-7"));
        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(route.orders[0].status, OrderStatus::Assigned);
    }

    #[tokio::test]
    async fn test_start_and_complete_delivery() {
        let server = MockServer::start();
        let start = server.mock(|when, then| {
            when.method(PUT).path("/drivers/driver/start/ORD-1");
            then.status(200);
        });
        let complete = server.mock(|when, then| {
            when.method(PUT).path("/drivers/driver/complete/ORD-1");
            then.status(200);
        });

        let client = ApiClient::new(&server.base_url());
        let order_id = OrderId::from("ORD-1");
        client.start_delivery(&order_id).await.unwrap();
        client.complete_delivery(&order_id).await.unwrap();

        start.assert();
        complete.assert();
    }

    #[tokio::test]
    async fn test_start_delivery_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/drivers/driver/start/ORD-1");
            then.status(500);
        });

        let client = ApiClient::new(&server.base_url());
        let err = client
            .start_delivery(&OrderId::from("ORD-1"))
            .await
            .unwrap_err();

        let ClientError::Network(err) = err else {
            panic!("expected network error, got {err:?}");
        };
        assert_eq!(err.status_code, Some(500));
        assert_eq!(err.message, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_update_delivery_status_with_reason() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/drivers/deliveries/update").json_body(json!({
                "orderId": "ORD-1",
                "status": "FAILED",
                "reason": "Customer not home"
            }));
            then.status(200).json_body(json!({"ok": true}));
        });

        let client = ApiClient::new(&server.base_url());
        let response = client
            .update_delivery_status(&DeliveryStatusUpdate {
                order_id: OrderId::from("ORD-1"),
                status: OrderStatus::Failed,
                reason: Some("Customer not home".to_string()),
                proof_of_delivery: None,
            })
            .await
            .unwrap();

        assert_eq!(response["ok"], true);
        mock.assert();
    }

    #[tokio::test]
    async fn test_blank_order_id_is_rejected() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client
            .complete_delivery(&OrderId::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::MissingField { field: "orderId" })
        ));
    }
}
