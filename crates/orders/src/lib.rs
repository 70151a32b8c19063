use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod collection;
pub mod error;
pub mod notification;
pub mod order;
pub mod status;
pub mod sync;
pub mod transition;

pub use collection::OrderCollection;
pub use error::ValidationError;
pub use notification::Notification;
pub use order::{Order, OrderUpdate};
pub use status::OrderStatus;
pub use sync::{ApplyOutcome, OrderSyncState};
pub use transition::DeliveryTransition;

/// Opaque order identifier assigned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
