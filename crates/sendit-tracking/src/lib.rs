//! Real-time shipment tracking.
//!
//! Live connections subscribe to a shipment's room by tracking id. Driver
//! reports flow through the location and status pipelines, are persisted via
//! a [`sendit_core::store::ShipmentStore`], and are then fanned out to every
//! connection currently in that shipment's room.
//!
//! ```text
//!  driver report ──▶ Tracker (pipelines) ──▶ ShipmentStore
//!                          │
//!                          ▼
//!                  TrackingBroadcaster ──▶ RoomRegistry
//!                          │
//!            ┌─────────────┼─────────────┐
//!            ▼             ▼             ▼
//!        outbound      outbound      outbound      (bounded, per connection)
//!            │             │             │
//!         socket        socket        socket
//! ```

pub mod broadcaster;
pub mod event;
pub mod geocode;
pub mod ledger;
pub mod locks;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod registry;
pub mod session;

pub use broadcaster::{EmitReport, OutboundConfig, TrackingBroadcaster};
pub use event::{EventPayload, TrackingEvent};
pub use geocode::{
  GeocodeClient, Geocoder, GeocoderConfig, NominatimGeocoder,
};
pub use notify::{Notice, Notifier, TracingNotifier};
pub use pipeline::{
  EtaReport, LocationReport, StatusReport, Tracker, TrackingConfig,
};
pub use queue::{Frame, OverflowPolicy};
pub use registry::{
  ConnectionHandle, ConnectionId, RoomRegistry, RoomSummary,
};
pub use session::{CredentialVerifier, Identity, Role, Session};
