use serde::Serialize;
use serde_json::Value;
use swift_orders::Order;
use swift_orders::error::require;
use tracing::info;

use super::Driver;
use crate::error::ClientError;
use crate::network::ApiClient;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub delivery_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

impl ApiClient {
    /// Returns the server's response as-is; callers refresh their snapshot
    /// rather than inserting the new order locally.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Value, ClientError> {
        require("customerId", &request.customer_id)?;
        require("deliveryAddress", &request.delivery_address)?;

        let response: Value = self.post("/orders", request).await?;
        info!(customer_id = %request.customer_id, "Order created");
        Ok(response)
    }

    /// Lists a customer's orders; an empty response body is an empty list.
    pub async fn list_orders(&self, customer_id: &str) -> Result<Vec<Order>, ClientError> {
        require("customerId", customer_id)?;

        let orders: Option<Vec<Order>> = self.get(&format!("/orders/{customer_id}")).await?;
        Ok(orders.unwrap_or_default())
    }

    pub async fn get_driver(&self, driver_id: &str) -> Result<Driver, ClientError> {
        require("driverId", driver_id)?;

        Ok(self.get(&format!("/drivers/{driver_id}")).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use swift_orders::{OrderId, OrderStatus, ValidationError};

    #[tokio::test]
    async fn test_create_order_posts_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/orders").json_body(json!({
                "customerId": "CUST-1",
                "deliveryAddress": "12 Main Street",
                "city": "Kandy",
                "totalAmount": 42.5
            }));
            then.status(201).json_body(json!({"orderId": "ORD-9", "status": "PENDING"}));
        });

        let client = ApiClient::new(&server.base_url());
        let response = client
            .create_order(&CreateOrderRequest {
                customer_id: "CUST-1".to_string(),
                delivery_address: "12 Main Street".to_string(),
                city: Some("Kandy".to_string()),
                total_amount: Some(42.5),
                ..CreateOrderRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(response["orderId"], "ORD-9");
        mock.assert();
    }

    #[tokio::test]
    async fn test_create_order_requires_address() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/orders");
            then.status(201);
        });

        let client = ApiClient::new(&server.base_url());
        let err = client
            .create_order(&CreateOrderRequest {
                customer_id: "CUST-1".to_string(),
                ..CreateOrderRequest::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::MissingField {
                field: "deliveryAddress"
            })
        ));
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_list_orders() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/orders/CUST-1");
            then.status(200).json_body(json!([
                {"orderId": "ORD-1", "status": "IN_TRANSIT", "deliveryAddress": "12 Main Street"},
                {"orderId": "ORD-2", "status": "ON_HOLD"}
            ]));
        });

        let client = ApiClient::new(&server.base_url());
        let orders = client.list_orders("CUST-1").await.unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, OrderId::from("ORD-1"));
        assert_eq!(orders[0].status, OrderStatus::InTransit);
        assert_eq!(orders[1].status.label(), "Unknown");
        mock.assert();
    }

    #[tokio::test]
    async fn test_list_orders_empty_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/orders/CUST-2");
            then.status(200);
        });

        let client = ApiClient::new(&server.base_url());
        let orders = client.list_orders("CUST-2").await.unwrap();

        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_requires_customer_id() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client.list_orders(" ").await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::MissingField { field: "customerId" })
        ));
    }

    #[tokio::test]
    async fn test_get_driver() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/drivers/DRV-001");
            then.status(200)
                .json_body(json!({"driverId": "DRV-001", "driverName": "Kasun Perera"}));
        });

        let client = ApiClient::new(&server.base_url());
        let driver = client.get_driver("DRV-001").await.unwrap();

        assert_eq!(driver.driver_id, "DRV-001");
        assert_eq!(driver.driver_name.as_deref(), Some("Kasun Perera"));
        assert!(!driver.available);
    }
}
