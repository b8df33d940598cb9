/*!
Lifecycle of the shared body observer: `Absent -> Creating -> Attached -> Absent`.
*/

use crate::platform::DomObserver;

/// Observable phase of the shared observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverPhase {
  /// No observer and no creation in flight.
  Absent,
  /// Creation started (possibly deferred until content loads).
  Creating,
  /// Watching the document body.
  Attached,
}

/// Owns the observer handle. `Creating` is the single guard against
/// duplicate creation while content is still loading.
pub(crate) enum ObserverState<O> {
  Absent,
  Creating,
  Attached(O),
}

impl<O: DomObserver> ObserverState<O> {
  pub(crate) const fn phase(&self) -> ObserverPhase {
    match self {
      Self::Absent => ObserverPhase::Absent,
      Self::Creating => ObserverPhase::Creating,
      Self::Attached(_) => ObserverPhase::Attached,
    }
  }

  /// Move `Absent -> Creating`. False if creation is already underway or done.
  pub(crate) fn begin_creating(&mut self) -> bool {
    match self {
      Self::Absent => {
        *self = Self::Creating;
        true
      }
      Self::Creating | Self::Attached(_) => false,
    }
  }

  /// Move `Creating -> Attached`. Hands the observer back if creation was
  /// abandoned in the meantime.
  pub(crate) fn attach(&mut self, observer: O) -> Result<(), O> {
    match self {
      Self::Creating => {
        *self = Self::Attached(observer);
        Ok(())
      }
      Self::Absent | Self::Attached(_) => Err(observer),
    }
  }

  /// Back to `Absent`, returning the observer to disconnect, if any.
  pub(crate) fn reset(&mut self) -> Option<O> {
    match std::mem::replace(self, Self::Absent) {
      Self::Attached(observer) => Some(observer),
      Self::Absent | Self::Creating => None,
    }
  }
}
