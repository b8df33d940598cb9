/*!
The visibility cascade.

Each `Rule` either decides (`Some(verdict)`) or falls through (`None`). The
oracle walks its rules in order and the first decision wins; a cascade that
falls through entirely means "not visible".
*/

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

use super::{VisibilityConfig, VisibleOptions};
use crate::platform::{Document, DomNode};
use crate::types::Rect;

/// One step of the visibility cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
  /// The main video, when it is the only video in the document, is visible
  /// even while it reports zero geometry right after load.
  SoleMainVideo,
  /// Zero layout height (or width, unless ignored) is not visible.
  ZeroSize,
  /// The player root scrolled above the viewport still counts as visible
  /// when hit-testing finds nothing.
  ScrolledPastPlayer,
  /// The topmost element at the hit-test point is the element or one of its
  /// descendants.
  Unobscured,
  /// Hover-preview controls drawn over a video: accept when the nearest
  /// player container of the hit element holds the video.
  PlayerContainer,
}

impl Rule {
  /// Cascade order used unless configured otherwise.
  pub const DEFAULT_ORDER: [Self; 5] = [
    Self::SoleMainVideo,
    Self::ZeroSize,
    Self::ScrolledPastPlayer,
    Self::Unobscured,
    Self::PlayerContainer,
  ];

  /// Evaluate this rule. `None` falls through to the next rule.
  pub fn evaluate<D: Document>(
    self,
    probe: &Probe<'_, D>,
    config: &VisibilityConfig,
  ) -> Option<bool> {
    let node = probe.node();
    match self {
      Self::SoleMainVideo => {
        let sole_main_video = node.is_tag(&config.video_tag)
          && node.has_class(&config.main_video_class)
          && match probe.document().query_selector_all(&config.video_tag) {
            Ok(videos) => videos.len() == 1,
            Err(e) => {
              log::warn!("Video selector '{}' rejected: {e}", config.video_tag);
              false
            }
          };
        sole_main_video.then_some(true)
      }

      Self::ZeroSize => {
        let size = node.rendered_size();
        let collapsed = size.has_no_height() || (size.has_no_width() && !probe.options().ignore_width);
        collapsed.then_some(false)
      }

      Self::ScrolledPastPlayer => {
        let is_player = node.element_id().as_deref() == Some(config.player_root_id.as_str());
        (is_player && probe.hit().is_none() && probe.rect().is_above_viewport()).then_some(true)
      }

      Self::Unobscured => probe
        .hit()
        .is_some_and(|hit| node.contains(hit))
        .then_some(true),

      Self::PlayerContainer => {
        if !node.is_tag(&config.video_tag) {
          return None;
        }
        let hit = probe.hit()?;
        match hit.closest(&config.player_container_selector) {
          Ok(container) => container
            .is_some_and(|container| container.contains(node))
            .then_some(true),
          Err(e) => {
            log::warn!(
              "Player container selector '{}' rejected: {e}",
              config.player_container_selector
            );
            None
          }
        }
      }
    }
  }
}

/// Lazily measured facts about one candidate element.
///
/// The bounding rect and the hit-test result are computed at most once per
/// evaluation, and only if a rule asks for them.
pub struct Probe<'a, D: Document> {
  document: &'a D,
  node: &'a D::Node,
  options: VisibleOptions,
  rect: OnceCell<Rect>,
  hit: OnceCell<Option<D::Node>>,
}

impl<D: Document> std::fmt::Debug for Probe<'_, D> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Probe")
      .field("node", self.node)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

impl<'a, D: Document> Probe<'a, D> {
  pub fn new(document: &'a D, node: &'a D::Node, options: VisibleOptions) -> Self {
    Self {
      document,
      node,
      options,
      rect: OnceCell::new(),
      hit: OnceCell::new(),
    }
  }

  pub const fn document(&self) -> &'a D {
    self.document
  }

  pub const fn node(&self) -> &'a D::Node {
    self.node
  }

  pub const fn options(&self) -> VisibleOptions {
    self.options
  }

  /// Bounding client rect of the candidate.
  pub fn rect(&self) -> Rect {
    *self.rect.get_or_init(|| self.node.bounding_rect())
  }

  /// Topmost element at the candidate's center, or at its top-left corner
  /// when the center hits nothing (clipped by the viewport).
  pub fn hit(&self) -> Option<&D::Node> {
    self
      .hit
      .get_or_init(|| {
        let rect = self.rect();
        self
          .document
          .element_from_point(rect.center())
          .or_else(|| self.document.element_from_point(rect.top_left()))
      })
      .as_ref()
  }
}
