//! Error taxonomy for the client: validation failures raised before any I/O,
//! HTTP failures, and live-tracking stream failures.

use serde_json::Value;
use swift_orders::{OrderId, ValidationError};

/// A failed REST call.
///
/// `status_code` is `None` when the request never produced an HTTP response
/// (connection refused, timeout, unreadable body).
#[derive(Debug, thiserror::Error)]
#[error("{endpoint} failed{}: {message}", status_suffix(*.status_code))]
pub struct NetworkError {
    pub status_code: Option<u16>,
    pub endpoint: String,
    pub message: String,
    pub raw_data: Option<Value>,
}

fn status_suffix(status_code: Option<u16>) -> String {
    status_code.map_or_else(String::new, |code| format!(" with status {code}"))
}

impl NetworkError {
    pub(crate) fn transport(endpoint: &str, error: &reqwest::Error) -> Self {
        Self {
            status_code: error.status().map(|status| status.as_u16()),
            endpoint: endpoint.to_string(),
            message: error.to_string(),
            raw_data: None,
        }
    }
}

/// Failure on a live-tracking channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A single frame could not be used; the channel stays open.
    #[error("Malformed frame on order {order_id} stream: {reason}")]
    MalformedFrame {
        order_id: OrderId,
        reason: String,
        data: String,
    },
    /// The channel failed and has been closed.
    #[error("Tracking stream for order {order_id} failed{}: {message}", status_suffix(*.status_code))]
    Transport {
        order_id: OrderId,
        status_code: Option<u16>,
        message: String,
    },
    /// The server ended the stream.
    #[error("Tracking stream for order {order_id} closed by server")]
    Closed { order_id: OrderId },
}

impl StreamError {
    /// Whether the subscription is gone after this error.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedFrame { .. })
    }

    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::MalformedFrame { order_id, .. }
            | Self::Transport { order_id, .. }
            | Self::Closed { order_id } => order_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}
