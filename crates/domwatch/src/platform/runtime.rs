/*!
Extension runtime liveness.

After an extension reload the content script keeps running in the page while
its runtime is gone. Callers check liveness before handing results back.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness check for the surrounding extension runtime.
pub trait RuntimeContext: Send + Sync + 'static {
  /// False once the runtime has been invalidated.
  fn is_alive(&self) -> bool;
}

/// Runtime that never goes away. Default for hosts without a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAlive;

impl RuntimeContext for AlwaysAlive {
  fn is_alive(&self) -> bool {
    true
  }
}

/// Shared flag a host flips when its runtime is torn down.
///
/// Clones share the flag.
#[derive(Debug, Clone)]
pub struct RuntimeFlag {
  alive: Arc<AtomicBool>,
}

impl RuntimeFlag {
  /// A live runtime.
  pub fn new() -> Self {
    Self {
      alive: Arc::new(AtomicBool::new(true)),
    }
  }

  /// Mark the runtime as gone. Irreversible.
  pub fn invalidate(&self) {
    if self.alive.swap(false, Ordering::SeqCst) {
      log::debug!("Extension runtime invalidated");
    }
  }
}

impl Default for RuntimeFlag {
  fn default() -> Self {
    Self::new()
  }
}

impl RuntimeContext for RuntimeFlag {
  fn is_alive(&self) -> bool {
    self.alive.load(Ordering::SeqCst)
  }
}
