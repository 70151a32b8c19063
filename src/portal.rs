use serde_json::Value;
use tracing::info;

use crate::endpoints::CreateOrderRequest;
use crate::error::ClientError;
use crate::network::ApiClient;
use crate::sync::OrderSync;
use crate::tracking::DynSubscriber;

/// Customer-facing view: the customer's orders kept in sync with the server.
#[derive(Debug)]
pub struct CustomerPortal {
    api: ApiClient,
    customer_id: String,
    sync: OrderSync,
}

impl CustomerPortal {
    pub fn new(api: ApiClient, customer_id: impl Into<String>, subscriber: DynSubscriber) -> Self {
        Self {
            api,
            customer_id: customer_id.into(),
            sync: OrderSync::new(subscriber),
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub const fn sync(&self) -> &OrderSync {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut OrderSync {
        &mut self.sync
    }

    /// Reloads the full order list. Returns the number of orders.
    pub async fn refresh(&mut self) -> Result<usize, ClientError> {
        let orders = self.api.list_orders(&self.customer_id).await?;
        self.sync.load_snapshot(orders);
        Ok(self.sync.state().orders().len())
    }

    /// Creates an order for this customer and reloads the list so the new
    /// order shows up as the server stored it.
    pub async fn create_order(
        &mut self,
        mut request: CreateOrderRequest,
    ) -> Result<Value, ClientError> {
        if request.customer_id.trim().is_empty() {
            request.customer_id.clone_from(&self.customer_id);
        }

        let response = self.api.create_order(&request).await?;
        let count = self.refresh().await?;
        info!(customer_id = %self.customer_id, orders = count, "Refreshed orders after create");

        Ok(response)
    }
}
