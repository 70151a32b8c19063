use crate::{OrderId, OrderStatus, ValidationError};

/// Status change a driver may initiate from the client.
///
/// `ASSIGNED -> IN_TRANSIT -> {COMPLETED | FAILED}`; every other edge belongs to
/// the server and only reaches the client through updates or snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTransition {
    Start,
    Complete,
    Fail,
}

impl DeliveryTransition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail => "fail",
        }
    }

    pub const fn target(self) -> OrderStatus {
        match self {
            Self::Start => OrderStatus::InTransit,
            Self::Complete => OrderStatus::Completed,
            Self::Fail => OrderStatus::Failed,
        }
    }

    pub const fn allowed_from(self, status: &OrderStatus) -> bool {
        matches!(
            (self, status),
            (Self::Start, OrderStatus::Assigned)
                | (Self::Complete | Self::Fail, OrderStatus::InTransit)
        )
    }

    /// Returns the status the order ends up in, or why it cannot move.
    pub fn check(self, order_id: &OrderId, from: &OrderStatus) -> Result<OrderStatus, ValidationError> {
        if self.allowed_from(from) {
            Ok(self.target())
        } else {
            Err(ValidationError::InvalidTransition {
                order_id: order_id.clone(),
                from: from.clone(),
                transition: self,
            })
        }
    }
}

impl std::fmt::Display for DeliveryTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
