/*!
Visibility oracle.

Decides whether an element is actually visible to the user rather than merely
present in the layout tree: laid out with a non-zero size and not occluded at
its visual center, with a few known exceptions for video players.

```ignore
let oracle = VisibilityOracle::default();
if oracle.is_visible(&document, &node) {
    // topmost at its center, or one of the documented exceptions
}
```
*/

mod rules;

pub use rules::{Probe, Rule};

use serde::{Deserialize, Serialize};

use crate::platform::Document;
use crate::types::DomResult;

const DEFAULT_VIDEO_TAG: &str = "video";
const DEFAULT_MAIN_VIDEO_CLASS: &str = "html5-main-video";
const DEFAULT_PLAYER_ROOT_ID: &str = "movie_player";
const DEFAULT_PLAYER_CONTAINER_SELECTOR: &str = ".html5-video-player";

/// Per-check options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VisibleOptions {
  /// Accept elements with zero layout width (height still has to be non-zero).
  pub ignore_width: bool,
}

/// Page-structure knobs for the special cases, plus the cascade order.
///
/// Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisibilityConfig {
  /// Tag name treated as a video element.
  pub video_tag: String,
  /// Marker class of the primary video.
  pub main_video_class: String,
  /// `id` of the movie-player root.
  pub player_root_id: String,
  /// Selector for the nearest player container used to see past hover-preview controls.
  pub player_container_selector: String,
  /// Cascade order. First decision wins.
  pub rules: Vec<Rule>,
}

impl Default for VisibilityConfig {
  fn default() -> Self {
    Self {
      video_tag: DEFAULT_VIDEO_TAG.into(),
      main_video_class: DEFAULT_MAIN_VIDEO_CLASS.into(),
      player_root_id: DEFAULT_PLAYER_ROOT_ID.into(),
      player_container_selector: DEFAULT_PLAYER_CONTAINER_SELECTOR.into(),
      rules: Rule::DEFAULT_ORDER.to_vec(),
    }
  }
}

impl VisibilityConfig {
  /// Parse a JSON override. Unknown rules are an error; missing fields default.
  pub fn from_json(json: &str) -> DomResult<Self> {
    Ok(serde_json::from_str(json)?)
  }
}

/// Evaluates the visibility cascade against a host document.
#[derive(Debug, Clone, Default)]
pub struct VisibilityOracle {
  config: VisibilityConfig,
}

impl VisibilityOracle {
  pub const fn new(config: VisibilityConfig) -> Self {
    Self { config }
  }

  pub const fn config(&self) -> &VisibilityConfig {
    &self.config
  }

  /// Whether `node` is genuinely visible.
  pub fn is_visible<D: Document>(&self, document: &D, node: &D::Node) -> bool {
    self.is_visible_with(document, node, VisibleOptions::default())
  }

  /// Whether `node` is genuinely visible under `options`.
  pub fn is_visible_with<D: Document>(
    &self,
    document: &D,
    node: &D::Node,
    options: VisibleOptions,
  ) -> bool {
    let probe = Probe::new(document, node, options);
    let decision = self
      .config
      .rules
      .iter()
      .find_map(|rule| rule.evaluate(&probe, &self.config).map(|verdict| (*rule, verdict)));

    match decision {
      Some((rule, verdict)) => {
        log::trace!("{node:?}: {rule:?} -> {verdict}");
        verdict
      }
      None => false,
    }
  }

  /// First candidate, in iteration order, that is visible.
  pub fn find_valid_element<D, I>(
    &self,
    document: &D,
    candidates: I,
    options: VisibleOptions,
  ) -> Option<D::Node>
  where
    D: Document,
    I: IntoIterator<Item = D::Node>,
  {
    candidates
      .into_iter()
      .find(|node| self.is_visible_with(document, node, options))
  }

  /// Like [`find_valid_element`](Self::find_valid_element), resolving each
  /// item (e.g. a selector) to an element first. Items resolving to nothing
  /// are skipped; a resolution error stops the scan.
  pub fn find_valid_element_from_generator<D, I, F>(
    &self,
    document: &D,
    items: I,
    options: VisibleOptions,
    mut resolve: F,
  ) -> DomResult<Option<D::Node>>
  where
    D: Document,
    I: IntoIterator,
    F: FnMut(&D, I::Item) -> DomResult<Option<D::Node>>,
  {
    for item in items {
      if let Some(node) = resolve(document, item)? {
        if self.is_visible_with(document, &node, options) {
          return Ok(Some(node));
        }
      }
    }
    Ok(None)
  }

  /// First visible element among the first matches of each selector.
  pub fn find_valid_element_from_selector<D, S>(
    &self,
    document: &D,
    selectors: &[S],
    options: VisibleOptions,
  ) -> DomResult<Option<D::Node>>
  where
    D: Document,
    S: AsRef<str>,
  {
    self.find_valid_element_from_generator(document, selectors, options, |doc, selector| {
      doc.query_selector(selector.as_ref())
    })
  }
}
