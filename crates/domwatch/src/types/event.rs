/*! Lifecycle events broadcast by a `DomWaiter`. */

use super::Requirement;
use serde::Serialize;
use ts_rs::TS;

/// Waiter lifecycle events.
///
/// These describe bookkeeping transitions, not page content: elements are
/// live host handles and never cross the event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum Event {
  /// A new pending entry was created for `(selector, requirement)`.
  EntryRegistered {
    selector: String,
    requirement: Requirement,
  },
  /// A match was found and delivered to every live waiter.
  EntryResolved {
    selector: String,
    requirement: Requirement,
    waiters: u32,
  },
  /// A match was found but the runtime was gone, so nothing was delivered.
  DeliverySuppressed {
    selector: String,
    requirement: Requirement,
    waiters: u32,
  },
  /// Every waiter on the entry was dropped before a match arrived.
  EntryAbandoned {
    selector: String,
    requirement: Requirement,
  },
  /// The shared mutation observer started watching the document body.
  ObserverAttached,
  /// The shared mutation observer was disconnected.
  ObserverDetached,
}
