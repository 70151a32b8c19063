//! Client for the order tracking and delivery management service.
//!
//! [`ApiClient`] talks to the REST API, [`tracking`] follows orders over live
//! status streams, and [`OrderSync`] keeps a local copy of a customer's or
//! driver's orders up to date from both.

pub mod cli;
mod driver;
pub mod endpoints;
pub mod env;
pub mod error;
mod network;
mod portal;
mod sync;
pub mod tracking;

pub use driver::DriverDesk;
pub use env::{Env, LogLevel, setup_tracing};
pub use error::{ClientError, NetworkError, StreamError};
pub use network::ApiClient;
pub use portal::CustomerPortal;
pub use sync::{OrderSync, TrackedEvent};
pub use tracking::{
    DynSubscriber, LiveTrackingSubscriber, SimulatedSubscriber, SseSubscriber, Subscription,
    TrackingEvent, TrackingRegistry, TrackingRoute,
};

pub use swift_orders as orders;
