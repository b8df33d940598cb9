/*!
Element waiter - deduplicated, mutation-driven waiting for selectors.

# Module Structure

- `mod.rs` - `DomWaiter`, builder, lookups, registration, observer activation
- `entry.rs` - `WaitingEntry` keyed by `(selector, requirement)`
- `matching.rs` - matching routine run per mutation batch
- `observer.rs` - `Absent -> Creating -> Attached` observer lifecycle
- `future.rs` - `WaitForElement`

# Example

```ignore
use domwatch::{DomWaiter, Requirement};

let waiter = DomWaiter::new(document);
let player = waiter.wait_for_element(".player", Requirement::Visible)?.await;
```
*/

mod entry;
mod future;
mod matching;
mod observer;

pub use future::WaitForElement;
pub use observer::ObserverPhase;

use async_broadcast::{InactiveReceiver, Sender};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use entry::{WaitKey, WaitingEntry};
use observer::ObserverState;

use crate::platform::{AlwaysAlive, Document, DomObserver, MutationHandler, MutationRecord, RuntimeContext};
use crate::types::{DomResult, Event, Requirement};
use crate::visibility::{VisibilityConfig, VisibilityOracle, VisibleOptions};

const EVENT_CHANNEL_CAPACITY: usize = 1000;

pub(crate) struct WaiterState<D: Document> {
  pub(crate) pending: HashMap<WaitKey, WaitingEntry<D::Node>>,
  pub(crate) observer: ObserverState<D::Observer>,
}

pub(crate) struct Shared<D: Document> {
  pub(crate) document: D,
  pub(crate) oracle: VisibilityOracle,
  pub(crate) runtime: Arc<dyn RuntimeContext>,
  state: RwLock<WaiterState<D>>,
  events_tx: Sender<Event>,
  events_keepalive: InactiveReceiver<Event>,
}

/// Owns the pending set and the shared body observer for one document.
///
/// The observer exists only while something is waiting: it is created on the
/// first registration that cannot be satisfied immediately and disconnected
/// as soon as the last pending entry resolves.
/// Clone is cheap (Arc bump).
pub struct DomWaiter<D: Document> {
  shared: Arc<Shared<D>>,
}

impl<D: Document> Clone for DomWaiter<D> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<D: Document> std::fmt::Debug for DomWaiter<D> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DomWaiter")
      .field("pending", &self.pending_count())
      .field("observer", &self.observer_phase())
      .finish_non_exhaustive()
  }
}

/// Builder for configuring a `DomWaiter`.
#[must_use = "Builder does nothing until .build() is called"]
pub struct DomWaiterBuilder<D: Document> {
  document: D,
  runtime: Arc<dyn RuntimeContext>,
  visibility: VisibilityConfig,
  event_capacity: usize,
}

impl<D: Document> std::fmt::Debug for DomWaiterBuilder<D> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DomWaiterBuilder")
      .field("visibility", &self.visibility)
      .field("event_capacity", &self.event_capacity)
      .finish_non_exhaustive()
  }
}

impl<D: Document> DomWaiterBuilder<D> {
  /// Liveness check consulted before delivering matches. Default: always alive.
  pub fn runtime(mut self, runtime: impl RuntimeContext) -> Self {
    self.runtime = Arc::new(runtime);
    self
  }

  /// Visibility cascade configuration.
  pub fn visibility(mut self, config: VisibilityConfig) -> Self {
    self.visibility = config;
    self
  }

  /// Capacity of the lifecycle event channel. Oldest events drop on overflow.
  pub const fn event_capacity(mut self, capacity: usize) -> Self {
    self.event_capacity = capacity;
    self
  }

  pub fn build(self) -> DomWaiter<D> {
    let (mut tx, rx) = async_broadcast::broadcast(self.event_capacity.max(1));
    tx.set_overflow(true);

    DomWaiter {
      shared: Arc::new(Shared {
        document: self.document,
        oracle: VisibilityOracle::new(self.visibility),
        runtime: self.runtime,
        state: RwLock::new(WaiterState {
          pending: HashMap::new(),
          observer: ObserverState::Absent,
        }),
        events_tx: tx,
        events_keepalive: rx.deactivate(),
      }),
    }
  }
}

impl<D: Document> DomWaiter<D> {
  /// Waiter with default visibility rules and an always-alive runtime.
  pub fn new(document: D) -> Self {
    Self::builder(document).build()
  }

  pub fn builder(document: D) -> DomWaiterBuilder<D> {
    DomWaiterBuilder {
      document,
      runtime: Arc::new(AlwaysAlive),
      visibility: VisibilityConfig::default(),
      event_capacity: EVENT_CHANNEL_CAPACITY,
    }
  }

  pub fn document(&self) -> &D {
    &self.shared.document
  }

  pub fn oracle(&self) -> &VisibilityOracle {
    &self.shared.oracle
  }

  /// Subscribe to lifecycle events.
  pub fn subscribe(&self) -> async_broadcast::Receiver<Event> {
    self.shared.events_keepalive.activate_cloned()
  }

  /// Number of distinct `(selector, requirement)` entries still waiting.
  pub fn pending_count(&self) -> usize {
    self.read(|s| s.pending.len())
  }

  pub fn observer_phase(&self) -> ObserverPhase {
    self.read(|s| s.observer.phase())
  }

  /// Whether `node` is genuinely visible.
  pub fn is_visible(&self, node: &D::Node) -> bool {
    self.shared.oracle.is_visible(&self.shared.document, node)
  }

  /// First visible element among `candidates`, in order.
  pub fn find_valid_element(&self, candidates: impl IntoIterator<Item = D::Node>) -> Option<D::Node> {
    self
      .shared
      .oracle
      .find_valid_element(&self.shared.document, candidates, VisibleOptions::default())
  }

  /// First visible element among the first matches of each selector.
  pub fn find_valid_element_from_selector<S: AsRef<str>>(&self, selectors: &[S]) -> DomResult<Option<D::Node>> {
    self.shared.oracle.find_valid_element_from_selector(
      &self.shared.document,
      selectors,
      VisibleOptions::default(),
    )
  }

  /// Synchronous, non-waiting lookup.
  pub fn get_element(&self, selector: &str, requirement: impl Into<Requirement>) -> DomResult<Option<D::Node>> {
    self
      .lookup(selector, requirement.into())
      .map(|(found, _)| found)
  }

  /// Current result for `(selector, requirement)` plus the candidates it was
  /// picked from.
  fn lookup(&self, selector: &str, requirement: Requirement) -> DomResult<(Option<D::Node>, Vec<D::Node>)> {
    let document = &self.shared.document;
    match requirement.visible_options() {
      None => {
        let first = document.query_selector(selector)?;
        Ok((first.clone(), first.into_iter().collect()))
      }
      Some(options) => {
        let candidates = document.query_selector_all(selector)?;
        let found = self
          .shared
          .oracle
          .find_valid_element(document, candidates.iter().cloned(), options);
        Ok((found, candidates))
      }
    }
  }

  /// Wait until an element matching `selector` satisfies `requirement`.
  ///
  /// Resolves on the first poll when a match already exists, without touching
  /// the pending set or the observer. Otherwise joins (or creates) the entry
  /// for `(selector, requirement)`; every caller on that entry gets the same
  /// element. A new entry starts from the candidates seen here, so later
  /// batches re-check their visibility even when nothing is added. A
  /// malformed selector is returned here, before anything is registered.
  pub fn wait_for_element(
    &self,
    selector: &str,
    requirement: impl Into<Requirement>,
  ) -> DomResult<WaitForElement<D::Node>> {
    let requirement = requirement.into();
    let (found, candidates) = self.lookup(selector, requirement)?;
    if let Some(node) = found {
      return Ok(WaitForElement::ready(node));
    }

    let (tx, rx) = futures::channel::oneshot::channel();
    let key = WaitKey::new(selector, requirement);
    let created = self.write(|s| match s.pending.entry(key.clone()) {
      Entry::Occupied(mut slot) => {
        slot.get_mut().push_waiter(tx);
        false
      }
      Entry::Vacant(slot) => {
        let mut entry = WaitingEntry::new(key.clone(), tx);
        entry.cache_matches(candidates);
        slot.insert(entry);
        true
      }
    });

    if created {
      log::debug!("Waiting for {key}");
      self.emit(Event::EntryRegistered {
        selector: key.selector,
        requirement,
      });
    }

    self.ensure_observer();
    Ok(WaitForElement::waiting(rx))
  }

  /// `wait_for_element`, giving up with `Ok(None)` once `deadline` completes.
  pub async fn wait_for_element_until<F>(
    &self,
    selector: &str,
    requirement: impl Into<Requirement>,
    deadline: F,
  ) -> DomResult<Option<D::Node>>
  where
    F: Future<Output = ()>,
  {
    let wait = self.wait_for_element(selector, requirement)?;
    match futures::future::select(wait, std::pin::pin!(deadline)).await {
      futures::future::Either::Left((node, _)) => Ok(Some(node)),
      futures::future::Either::Right(_) => Ok(None),
    }
  }

  /// `wait_for_element` bounded by a tokio timer.
  ///
  /// Fails with `Timeout`, or `ContextInvalidated` when the runtime went away
  /// while waiting.
  #[cfg(feature = "tokio")]
  pub async fn wait_for_element_timeout(
    &self,
    selector: &str,
    requirement: impl Into<Requirement>,
    after: std::time::Duration,
  ) -> DomResult<D::Node> {
    let found = self
      .wait_for_element_until(selector, requirement, tokio::time::sleep(after))
      .await?;
    match found {
      Some(node) => Ok(node),
      None if !self.shared.runtime.is_alive() => Err(crate::types::DomError::ContextInvalidated),
      None => Err(crate::types::DomError::Timeout {
        selector: selector.to_owned(),
        after,
      }),
    }
  }

  /// Start observer creation unless it is already underway.
  fn ensure_observer(&self) {
    if !self.write(|s| s.observer.begin_creating()) {
      return;
    }

    if self.shared.document.content_loaded() {
      self.activate_observer();
    } else {
      log::debug!("Document still loading, deferring body observer");
      self.shared.document.on_content_loaded(self.sink());
    }
  }

  /// Run the catch-up pass, then attach the body observer if anything is
  /// still pending.
  fn activate_observer(&self) {
    if self.observer_phase() != ObserverPhase::Creating {
      return;
    }

    self.run_matching(&[]);

    let still_needed = self.read(|s| s.observer.phase() == ObserverPhase::Creating && !s.pending.is_empty());
    if !still_needed {
      log::debug!("Catch-up pass resolved everything, no observer needed");
      return;
    }

    match self.shared.document.observe_body(self.sink()) {
      Ok(observer) => match self.write(|s| s.observer.attach(observer)) {
        Ok(()) => {
          log::debug!("Attached body observer");
          self.emit(Event::ObserverAttached);
        }
        Err(stale) => stale.disconnect(),
      },
      Err(e) => {
        log::warn!("Failed to observe document body: {e}");
        if let Some(stale) = self.write(|s| s.observer.reset()) {
          stale.disconnect();
        }
      }
    }
  }

  fn sink(&self) -> Arc<dyn MutationHandler<D::Node>> {
    Arc::new(WaiterSink {
      shared: Arc::downgrade(&self.shared),
    })
  }

  fn emit(&self, event: Event) {
    if let Err(e) = self.shared.events_tx.try_broadcast(event) {
      if e.is_full() {
        log::error!("Event channel overflow - waiter events are being dropped.");
      }
    }
  }

  /// Read state. Never call host functions inside the closure.
  #[inline]
  pub(crate) fn read<R>(&self, f: impl FnOnce(&WaiterState<D>) -> R) -> R {
    f(&self.shared.state.read())
  }

  /// Write state. Never call host functions inside the closure.
  #[inline]
  pub(crate) fn write<R>(&self, f: impl FnOnce(&mut WaiterState<D>) -> R) -> R {
    f(&mut self.shared.state.write())
  }
}

/// Handler given to the host. Holds the waiter weakly so a host that keeps
/// the handler around does not keep the waiter alive.
struct WaiterSink<D: Document> {
  shared: Weak<Shared<D>>,
}

impl<D: Document> WaiterSink<D> {
  fn waiter(&self) -> Option<DomWaiter<D>> {
    self.shared.upgrade().map(|shared| DomWaiter { shared })
  }
}

impl<D: Document> MutationHandler<D::Node> for WaiterSink<D> {
  fn on_mutations(&self, records: &[MutationRecord<D::Node>]) {
    if let Some(waiter) = self.waiter() {
      waiter.run_matching(records);
    }
  }

  fn on_content_loaded(&self) {
    if let Some(waiter) = self.waiter() {
      waiter.activate_observer();
    }
  }
}
