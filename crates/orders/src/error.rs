use crate::{DeliveryTransition, OrderId, OrderStatus};

/// Input rejected before any request leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("Invalid email: {email}")]
    InvalidEmail { email: String },
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Cannot {transition} order {order_id} while it is {from}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        transition: DeliveryTransition,
    },
    #[error("Order {order_id} is not loaded")]
    UnknownOrder { order_id: OrderId },
}

/// Fails with `MissingField` when `value` is empty or whitespace only.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(())
    }
}
