/*!
What a waiter requires of a matching element before it counts as found.
*/

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::visibility::VisibleOptions;

/// Requirement attached to a selector lookup.
///
/// Part of the identity of a pending wait: the same selector waited on with
/// different requirements produces independent entries.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Requirement {
  /// Any element in the document matching the selector.
  #[default]
  #[display("present")]
  Present,
  /// First matching element that passes the visibility check.
  #[display("visible")]
  Visible,
  /// Visibility check that tolerates a zero layout width.
  #[display("visible (ignoring width)")]
  VisibleIgnoringWidth,
}

impl Requirement {
  /// Visibility options to apply, or `None` when presence is enough.
  pub const fn visible_options(self) -> Option<VisibleOptions> {
    match self {
      Self::Present => None,
      Self::Visible => Some(VisibleOptions { ignore_width: false }),
      Self::VisibleIgnoringWidth => Some(VisibleOptions { ignore_width: true }),
    }
  }
}

impl From<bool> for Requirement {
  fn from(visibility_required: bool) -> Self {
    if visibility_required {
      Self::Visible
    } else {
      Self::Present
    }
  }
}
