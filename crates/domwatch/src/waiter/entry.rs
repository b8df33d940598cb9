/*!
Pending waits, keyed by `(selector, requirement)`.
*/

use futures::channel::oneshot;

use crate::platform::{Document, DomNode, MutationRecord};
use crate::types::Requirement;
use crate::visibility::VisibilityOracle;

/// Identity of a pending wait. At most one entry per key exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{selector} [{requirement}]")]
pub(crate) struct WaitKey {
  pub(crate) selector: String,
  pub(crate) requirement: Requirement,
}

impl WaitKey {
  pub(crate) fn new(selector: &str, requirement: Requirement) -> Self {
    Self {
      selector: selector.to_owned(),
      requirement,
    }
  }
}

/// A pending request shared by every caller waiting on the same key.
pub(crate) struct WaitingEntry<N> {
  pub(crate) key: WaitKey,
  waiters: Vec<oneshot::Sender<N>>,
  /// Candidates from the last query. `None` forces a re-query.
  last_known_matches: Option<Vec<N>>,
}

impl<N: DomNode> WaitingEntry<N> {
  pub(crate) fn new(key: WaitKey, waiter: oneshot::Sender<N>) -> Self {
    Self {
      key,
      waiters: vec![waiter],
      last_known_matches: None,
    }
  }

  pub(crate) fn push_waiter(&mut self, waiter: oneshot::Sender<N>) {
    self.waiters.push(waiter);
  }

  /// Take over another entry's waiters, keeping the fresher candidate cache.
  pub(crate) fn absorb(&mut self, other: Self) {
    self.waiters.extend(other.waiters);
    if self.last_known_matches.is_none() {
      self.last_known_matches = other.last_known_matches;
    }
  }

  pub(crate) fn waiter_count(&self) -> usize {
    self.waiters.len()
  }

  /// Drop waiters whose futures were dropped. Returns true if none remain.
  pub(crate) fn prune_abandoned(&mut self) -> bool {
    self.waiters.retain(|waiter| !waiter.is_canceled());
    self.waiters.is_empty()
  }

  /// Whether any record in the batch could have produced a new match.
  ///
  /// Only child-list records that added nodes count, and only when the target
  /// or an added node matches the selector or contains a match. A selector
  /// the host rejects is treated as relevant so the re-query surfaces it.
  pub(crate) fn is_relevant(&self, records: &[MutationRecord<N>]) -> bool {
    let selector = self.key.selector.as_str();
    let touches = |node: &N| {
      node.matches_or_contains(selector).unwrap_or_else(|e| {
        log::warn!("Relevance check for '{selector}' failed: {e}");
        true
      })
    };

    records
      .iter()
      .filter(|record| record.adds_nodes())
      .any(|record| touches(&record.target) || record.added_nodes.iter().any(touches))
  }

  pub(crate) const fn has_cached_matches(&self) -> bool {
    self.last_known_matches.is_some()
  }

  pub(crate) fn cache_matches(&mut self, matches: Vec<N>) {
    self.last_known_matches = Some(matches);
  }

  /// Pick a result from the cached candidates, honouring the requirement.
  pub(crate) fn select<D>(&self, document: &D, oracle: &VisibilityOracle) -> Option<N>
  where
    D: Document<Node = N>,
  {
    let candidates = self
      .last_known_matches
      .as_deref()
      .filter(|candidates| !candidates.is_empty())?;

    match self.key.requirement.visible_options() {
      None => candidates.first().cloned(),
      Some(options) => oracle.find_valid_element(document, candidates.iter().cloned(), options),
    }
  }

  /// Hand `node` to every waiter. Returns how many were still listening.
  pub(crate) fn deliver(&mut self, node: &N) -> usize {
    let mut delivered = 0;
    for waiter in self.waiters.drain(..) {
      if waiter.send(node.clone()).is_ok() {
        delivered += 1;
      }
    }
    delivered
  }
}
