/*!
Host abstraction.

The core never names a concrete DOM binding. A host (a wasm content script,
a CDP bridge, the in-memory document used by tests) implements these traits
and hands a `Document` to `DomWaiter`.
*/

mod mutation;
mod runtime;
mod traits;

pub use mutation::{MutationKind, MutationRecord};
pub use runtime::{AlwaysAlive, RuntimeContext, RuntimeFlag};
pub use traits::{Document, DomNode, DomObserver, MutationHandler};
