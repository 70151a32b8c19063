//! Typed wrappers over the REST API, one method per server capability.
//!
//! Each operation checks that its required identifiers are present before any
//! request is sent; sign-up additionally validates the email shape and the
//! password length.

pub mod auth;
pub mod drivers;
pub mod orders;

pub use auth::{Customer, Driver, SignUp};
pub use drivers::{DeliveryStatusUpdate, DriverRoute};
pub use orders::CreateOrderRequest;
