//! Parcel status lifecycle and the transition validator.
//!
//! A shipment moves through a fixed directed graph of statuses. Every status
//! change must name an edge of that graph; there is no way to set a status
//! directly. Side effects (the delivery timestamp, recipient notifications)
//! are derived from the validated [`Transition`], never from the raw write.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a parcel is in its delivery lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParcelStatus {
  #[default]
  Pending,
  Assigned,
  /// Accepted as a reported status but not wired into the transition graph:
  /// nothing leads to it and nothing leaves it.
  PickedUp,
  PendingPickup,
  InTransit,
  OutForDelivery,
  Delivered,
}

impl ParcelStatus {
  /// The statuses this one may move to. Empty for terminal statuses.
  pub fn allowed_targets(self) -> &'static [ParcelStatus] {
    use ParcelStatus::*;
    match self {
      Pending => &[Assigned, PendingPickup],
      Assigned => &[PendingPickup, InTransit],
      PendingPickup => &[InTransit],
      InTransit => &[OutForDelivery, Delivered],
      OutForDelivery => &[Delivered],
      PickedUp | Delivered => &[],
    }
  }

  pub fn can_transition_to(self, target: ParcelStatus) -> bool {
    self.allowed_targets().contains(&target)
  }

  pub fn is_terminal(self) -> bool { self.allowed_targets().is_empty() }

  /// The snake_case wire and column representation.
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse the snake_case representation, mapping failures into the domain
  /// error.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }
}

// ─── Side effects ────────────────────────────────────────────────────────────

/// A recipient-facing notification a transition asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationTrigger {
  Assigned,
  OutForDelivery,
  Delivered,
}

// ─── Transition ──────────────────────────────────────────────────────────────

/// A validated edge of the lifecycle graph.
///
/// The only way to obtain one is [`Transition::validate`], so holding a
/// `Transition` proves `from → to` is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  from: ParcelStatus,
  to:   ParcelStatus,
}

impl Transition {
  /// Check `from → to` against the allow-list.
  ///
  /// Requests to stay in the same status are rejected like any other edge
  /// missing from the table.
  pub fn validate(from: ParcelStatus, to: ParcelStatus) -> Result<Self> {
    if from.can_transition_to(to) {
      Ok(Self { from, to })
    } else {
      Err(Error::InvalidTransition { from, to })
    }
  }

  pub fn from(&self) -> ParcelStatus { self.from }

  pub fn to(&self) -> ParcelStatus { self.to }

  /// Whether committing this transition sets the shipment's delivered-at.
  pub fn stamps_delivered_at(&self) -> bool {
    self.to == ParcelStatus::Delivered
  }

  pub fn notification(&self) -> Option<NotificationTrigger> {
    match self.to {
      ParcelStatus::Assigned => Some(NotificationTrigger::Assigned),
      ParcelStatus::OutForDelivery => Some(NotificationTrigger::OutForDelivery),
      ParcelStatus::Delivered => Some(NotificationTrigger::Delivered),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;
  use ParcelStatus::*;

  const ALLOWED: &[(ParcelStatus, ParcelStatus)] = &[
    (Pending, Assigned),
    (Pending, PendingPickup),
    (Assigned, PendingPickup),
    (Assigned, InTransit),
    (PendingPickup, InTransit),
    (InTransit, OutForDelivery),
    (InTransit, Delivered),
    (OutForDelivery, Delivered),
  ];

  #[test]
  fn every_pair_matches_the_table() {
    for from in ParcelStatus::iter() {
      for to in ParcelStatus::iter() {
        let expected = ALLOWED.contains(&(from, to));
        assert_eq!(
          Transition::validate(from, to).is_ok(),
          expected,
          "{from} -> {to}"
        );
      }
    }
  }

  #[test]
  fn no_status_transitions_to_itself() {
    for s in ParcelStatus::iter() {
      assert!(!s.can_transition_to(s), "{s} has a self edge");
    }
  }

  #[test]
  fn delivered_is_terminal() {
    assert!(Delivered.is_terminal());
    assert!(!InTransit.is_terminal());
  }

  #[test]
  fn rejection_names_both_statuses() {
    let err = Transition::validate(Assigned, Delivered).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { from: Assigned, to: Delivered }
    ));
    let msg = err.to_string();
    assert!(msg.contains("assigned"), "{msg}");
    assert!(msg.contains("delivered"), "{msg}");
  }

  #[test]
  fn only_delivery_stamps_delivered_at() {
    for (from, to) in ALLOWED {
      let t = Transition::validate(*from, *to).unwrap();
      assert_eq!(t.stamps_delivered_at(), *to == Delivered);
    }
  }

  #[test]
  fn notification_triggers() {
    let t = Transition::validate(InTransit, OutForDelivery).unwrap();
    assert_eq!(t.notification(), Some(NotificationTrigger::OutForDelivery));
    let t = Transition::validate(Pending, PendingPickup).unwrap();
    assert_eq!(t.notification(), None);
  }

  #[test]
  fn parse_and_display_are_snake_case() {
    assert_eq!(ParcelStatus::parse("out_for_delivery").unwrap(), OutForDelivery);
    assert_eq!(PendingPickup.to_string(), "pending_pickup");
    assert_eq!(InTransit.as_str(), "in_transit");
    assert_eq!(
      serde_json::to_string(&PickedUp).unwrap(),
      "\"picked_up\""
    );
    assert!(matches!(
      ParcelStatus::parse("lost"),
      Err(Error::UnknownStatus(s)) if s == "lost"
    ));
  }
}
