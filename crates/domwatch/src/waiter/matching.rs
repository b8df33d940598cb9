/*!
Matching routine, run once on activation and then per mutation batch.

The pending set is taken out of the shared state, processed without holding
the lock (hit-testing and selector queries go to the host), then merged back.
*/

use std::collections::hash_map::Entry;

use super::DomWaiter;
use crate::platform::{Document, DomObserver, MutationRecord};
use crate::types::Event;

impl<D: Document> DomWaiter<D> {
  /// Try to resolve every pending entry against the current document.
  ///
  /// An empty `records` slice is the initial pass: every entry re-queries.
  /// Otherwise only entries that the batch could have affected, or that have
  /// no cached candidates yet, re-query; the rest re-check their cached
  /// candidates (visibility may have changed).
  pub(crate) fn run_matching(&self, records: &[MutationRecord<D::Node>]) {
    let mut entries = self.write(|s| std::mem::take(&mut s.pending));
    let document = &self.shared.document;
    let oracle = &self.shared.oracle;
    let initial_pass = records.is_empty();
    let mut events = Vec::new();

    entries.retain(|key, entry| {
      if entry.prune_abandoned() {
        log::debug!("Dropping abandoned wait for {key}");
        events.push(Event::EntryAbandoned {
          selector: key.selector.clone(),
          requirement: key.requirement,
        });
        return false;
      }

      if initial_pass || !entry.has_cached_matches() || entry.is_relevant(records) {
        match document.query_selector_all(&key.selector) {
          Ok(matches) => entry.cache_matches(matches),
          Err(e) => log::warn!("Re-query for {key} failed: {e}"),
        }
      }

      let Some(found) = entry.select(document, oracle) else {
        return true;
      };

      let waiters = u32::try_from(entry.waiter_count()).unwrap_or(u32::MAX);
      if self.shared.runtime.is_alive() {
        let delivered = entry.deliver(&found);
        log::debug!("Resolved {key} with {found:?} for {delivered}/{waiters} waiter(s)");
        events.push(Event::EntryResolved {
          selector: key.selector.clone(),
          requirement: key.requirement,
          waiters: u32::try_from(delivered).unwrap_or(u32::MAX),
        });
      } else {
        log::debug!("Runtime invalidated, not delivering {key} to {waiters} waiter(s)");
        events.push(Event::DeliverySuppressed {
          selector: key.selector.clone(),
          requirement: key.requirement,
          waiters,
        });
      }
      false
    });

    let detached = self.write(|s| {
      for (key, entry) in entries {
        match s.pending.entry(key) {
          Entry::Occupied(mut slot) => slot.get_mut().absorb(entry),
          Entry::Vacant(slot) => {
            slot.insert(entry);
          }
        }
      }
      if s.pending.is_empty() {
        s.observer.reset()
      } else {
        None
      }
    });

    if let Some(observer) = detached {
      observer.disconnect();
      log::debug!("No pending waits, disconnected body observer");
      events.push(Event::ObserverDetached);
    }

    for event in events {
      self.emit(event);
    }
  }
}
