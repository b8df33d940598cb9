/*!
Domwatch - DOM observation primitives for content scripts

A visibility check that goes beyond "is it in the DOM", and a waiter that
resolves when an element matching a selector appears (and is visible, if
asked). Concurrent waits on the same selector share one pending entry, and a
single body observer exists only while something is waiting.

```ignore
use domwatch::{DomWaiter, Requirement, RuntimeFlag};

// `document` is the host's implementation of `domwatch::Document`
let runtime = RuntimeFlag::new();
let waiter = DomWaiter::builder(document).runtime(runtime.clone()).build();

// Resolves immediately if a match exists, otherwise on a later mutation batch
let player = waiter.wait_for_element(".player", Requirement::Visible)?.await;

// Non-waiting lookups
let badge = waiter.get_element(".badge", Requirement::Present)?;
let first = waiter.find_valid_element_from_selector(&["#primary", ".fallback"])?;

// Lifecycle events
let mut events = waiter.subscribe();
while let Ok(event) = events.recv().await {
    // handle event
}

// Host runtime went away: pending waits are never delivered
runtime.invalidate();
```
*/

mod platform;
mod visibility;
mod waiter;

#[cfg(test)]
mod testing;

mod types;
pub use types::*;

pub use crate::platform::{
  AlwaysAlive, Document, DomNode, DomObserver, MutationHandler, MutationKind, MutationRecord,
  RuntimeContext, RuntimeFlag,
};
pub use crate::visibility::{Probe, Rule, VisibilityConfig, VisibilityOracle, VisibleOptions};
pub use crate::waiter::{DomWaiter, DomWaiterBuilder, ObserverPhase, WaitForElement};
