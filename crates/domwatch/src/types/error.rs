/*! Error types for domwatch operations. */

use std::time::Duration;

/// Errors that can occur while querying or observing the host document.
///
/// Absence of a match is never an error; it is "no result yet".
#[derive(Debug, thiserror::Error)]
pub enum DomError {
  #[error("Invalid selector '{selector}': {reason}")]
  InvalidSelector { selector: String, reason: String },

  #[error("Observer error: {0}")]
  ObserverError(String),

  #[error("Extension context invalidated")]
  ContextInvalidated,

  #[error("Timed out after {after:?} waiting for '{selector}'")]
  Timeout { selector: String, after: Duration },

  #[error("Invalid configuration: {0}")]
  InvalidConfig(#[from] serde_json::Error),
}

impl DomError {
  /// Shorthand for a selector the host refused to parse.
  pub fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
    Self::InvalidSelector {
      selector: selector.to_owned(),
      reason: reason.into(),
    }
  }
}

/// Result type for domwatch operations.
pub type DomResult<T> = Result<T, DomError>;
