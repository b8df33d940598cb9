/*!
Future returned by `DomWaiter::wait_for_element`.
*/

use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

enum WaitState<N> {
  /// Found during the synchronous lookup.
  Ready(Option<N>),
  /// Registered on a pending entry.
  Waiting(oneshot::Receiver<N>),
  /// Delivered, or the entry was dropped without delivering.
  Done,
}

/// Resolves with the first element satisfying the wait.
///
/// Never fails. If the extension runtime is invalidated before a match
/// arrives, the match is not delivered and this future stays pending; wrap it
/// in a timeout (see `DomWaiter::wait_for_element_until`) when that matters.
/// Dropping the future cancels the wait.
#[must_use = "futures do nothing unless polled"]
pub struct WaitForElement<N> {
  state: WaitState<N>,
}

impl<N> Unpin for WaitForElement<N> {}

impl<N> std::fmt::Debug for WaitForElement<N> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match self.state {
      WaitState::Ready(_) => "ready",
      WaitState::Waiting(_) => "waiting",
      WaitState::Done => "done",
    };
    f.debug_struct("WaitForElement").field("state", &state).finish()
  }
}

impl<N> WaitForElement<N> {
  pub(crate) const fn ready(node: N) -> Self {
    Self {
      state: WaitState::Ready(Some(node)),
    }
  }

  pub(crate) const fn waiting(receiver: oneshot::Receiver<N>) -> Self {
    Self {
      state: WaitState::Waiting(receiver),
    }
  }

  /// True if the element was already present when the wait was requested.
  pub const fn is_immediate(&self) -> bool {
    matches!(self.state, WaitState::Ready(Some(_)))
  }
}

impl<N> Future for WaitForElement<N> {
  type Output = N;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<N> {
    let this = &mut *self;
    match &mut this.state {
      WaitState::Ready(node) => match node.take() {
        Some(node) => {
          this.state = WaitState::Done;
          Poll::Ready(node)
        }
        None => Poll::Pending,
      },
      WaitState::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
        Poll::Ready(Ok(node)) => {
          this.state = WaitState::Done;
          Poll::Ready(node)
        }
        Poll::Ready(Err(oneshot::Canceled)) => {
          log::debug!("Wait dropped without delivery");
          this.state = WaitState::Done;
          Poll::Pending
        }
        Poll::Pending => Poll::Pending,
      },
      WaitState::Done => Poll::Pending,
    }
  }
}
