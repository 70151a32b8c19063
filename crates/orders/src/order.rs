use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{OrderId, OrderStatus};

/// Order as held by the client.
///
/// Fields the client does not model are kept in `extra` so that a merge or a
/// re-serialization never drops data the server sent. The identifier is read
/// from `orderId`, or from `id` when `orderId` is absent; when both are sent,
/// `id` is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    /// Server timestamps are passed through untouched; the API mixes
    /// `2024-11-15T09:00:00` and `2024-11-15 09:00` forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    pub fn new(order_id: impl Into<OrderId>, status: OrderStatus) -> Self {
        Self {
            order_id: order_id.into(),
            status,
            ..Self::default()
        }
    }

    /// Whether a driver is attached, either by id or by display name.
    pub const fn has_driver(&self) -> bool {
        self.driver_id.is_some() || self.driver_name.is_some()
    }

    /// Merges every field present in `update` into this order.
    ///
    /// Absent and `null` fields leave the current value alone. Returns the
    /// previous status when the update changed it.
    pub(crate) fn merge(&mut self, update: OrderUpdate) -> Option<OrderStatus> {
        let OrderUpdate {
            order_id: _,
            status,
            customer_id,
            customer_name,
            pickup_address,
            delivery_address,
            city,
            postal_code,
            country,
            items,
            driver_id,
            driver_name,
            total_amount,
            created_at,
            updated_at,
            estimated_delivery,
            extra,
        } = update;

        overwrite(&mut self.customer_id, customer_id);
        overwrite(&mut self.customer_name, customer_name);
        overwrite(&mut self.pickup_address, pickup_address);
        overwrite(&mut self.delivery_address, delivery_address);
        overwrite(&mut self.city, city);
        overwrite(&mut self.postal_code, postal_code);
        overwrite(&mut self.country, country);
        overwrite(&mut self.driver_id, driver_id);
        overwrite(&mut self.driver_name, driver_name);
        overwrite(&mut self.total_amount, total_amount);
        overwrite(&mut self.created_at, created_at);
        overwrite(&mut self.updated_at, updated_at);
        overwrite(&mut self.estimated_delivery, estimated_delivery);

        if let Some(items) = items {
            self.items = items;
        }

        self.extra
            .extend(extra.into_iter().filter(|(_, value)| !value.is_null()));

        match status {
            Some(status) if status != self.status => Some(std::mem::replace(&mut self.status, status)),
            _ => None,
        }
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Partial order carried by a live-tracking event.
///
/// Only the identifier is required, read the same way as for [`Order`];
/// everything else is merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderUpdate {
    pub fn status_only(order_id: impl Into<OrderId>, status: OrderStatus) -> Self {
        Self {
            order_id: order_id.into(),
            status: Some(status),
            ..Self::default()
        }
    }

    /// Free-text `message` attached by the server, if any.
    pub fn message(&self) -> Option<&str> {
        self.extra.get("message").and_then(Value::as_str)
    }
}

/// Renames a bare `id` to `orderId`. A payload carrying both keeps `id` as an
/// ordinary field.
fn promote_id(mut fields: Map<String, Value>) -> Value {
    if fields.contains_key("orderId") {
        return Value::Object(fields);
    }

    if let Some(id) = fields.remove("id") {
        fields.insert("orderId".to_string(), id);
    }
    Value::Object(fields)
}

impl<'de> Deserialize<'de> for Order {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        Self::deserialize(promote_id(fields)).map_err(D::Error::custom)
    }
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Self::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for OrderUpdate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        Self::deserialize(promote_id(fields)).map_err(D::Error::custom)
    }
}

impl Serialize for OrderUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Self::serialize(self, serializer)
    }
}
