//! Recipient notifications raised by status transitions.
//!
//! Delivery channels (SMS, email) live outside this crate. The status
//! pipeline hands a [`Notice`] to whatever [`Notifier`] it was built with,
//! after the transition has been persisted.

use chrono::{DateTime, Utc};
use sendit_core::{NotificationTrigger, ParcelStatus, TrackingId};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
  pub tracking_id: TrackingId,
  pub trigger:     NotificationTrigger,
  pub status:      ParcelStatus,
  pub at:          DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:       Option<String>,
}

/// Must not block: it is called while the shipment's update lock is held.
pub trait Notifier: Send + Sync {
  fn notify(&self, notice: Notice);
}

/// Logs each notice. The default when no delivery channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, notice: Notice) {
    tracing::info!(
      tracking_id = %notice.tracking_id,
      trigger = %notice.trigger,
      status = %notice.status,
      "recipient notification"
    );
  }
}

/// Forwards notices to a consumer task.
impl Notifier for mpsc::UnboundedSender<Notice> {
  fn notify(&self, notice: Notice) {
    if self.send(notice).is_err() {
      tracing::warn!("notification consumer has gone away");
    }
  }
}
