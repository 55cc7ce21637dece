//! Core types and trait definitions for SendIt shipment tracking.
//!
//! This crate is deliberately free of HTTP, socket and database dependencies.
//! The tracking subsystem, the storage backends and the HTTP layer all depend
//! on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod shipment;
pub mod status;
pub mod store;

pub use error::{Error, Result};
pub use shipment::{Coordinate, NewShipment, RoutePoint, Shipment, TrackingId};
pub use status::{NotificationTrigger, ParcelStatus, Transition};
