/*!
Platform abstraction traits.

These traits define the contract between the core and the host document.
Core code only uses these traits, never host-specific types directly.
*/

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use super::MutationRecord;
use crate::types::{DomResult, Point, Rect, Size};

/// Live handle to an element in the host document. Clone is cheap.
///
/// Equality is identity: two handles are equal when they refer to the same
/// element.
pub trait DomNode: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  /// Lower-case tag name (`"video"`, `"div"`).
  fn tag_name(&self) -> String;

  /// The element's `id` attribute, if any.
  fn element_id(&self) -> Option<String>;

  /// Check the element's class list.
  fn has_class(&self, class: &str) -> bool;

  /// Bounding client rectangle in viewport coordinates.
  fn bounding_rect(&self) -> Rect;

  /// Rendered layout size.
  fn rendered_size(&self) -> Size;

  /// Parent element. `None` for the root or a detached element.
  fn parent(&self) -> Option<Self>;

  /// Whether this element matches `selector`.
  fn matches(&self, selector: &str) -> DomResult<bool>;

  /// First descendant (excluding self) matching `selector`.
  fn query_selector(&self, selector: &str) -> DomResult<Option<Self>>;

  /// Check the tag name, ignoring ASCII case.
  fn is_tag(&self, tag: &str) -> bool {
    self.tag_name().eq_ignore_ascii_case(tag)
  }

  /// Inclusive ancestry: true if `other` is this element or a descendant.
  fn contains(&self, other: &Self) -> bool {
    let mut current = Some(other.clone());
    while let Some(node) = current {
      if node == *self {
        return true;
      }
      current = node.parent();
    }
    false
  }

  /// Nearest inclusive ancestor matching `selector`.
  fn closest(&self, selector: &str) -> DomResult<Option<Self>> {
    let mut current = Some(self.clone());
    while let Some(node) = current {
      if node.matches(selector)? {
        return Ok(Some(node));
      }
      current = node.parent();
    }
    Ok(None)
  }

  /// True if this element matches `selector` or has a descendant that does.
  fn matches_or_contains(&self, selector: &str) -> DomResult<bool> {
    Ok(self.matches(selector)? || self.query_selector(selector)?.is_some())
  }
}

/// Sink the host calls when observed things happen.
pub trait MutationHandler<N>: Send + Sync {
  /// A batch of mutation records from one scheduling turn.
  fn on_mutations(&self, records: &[MutationRecord<N>]);

  /// Document content finished parsing.
  fn on_content_loaded(&self);
}

/// Subtree mutation observer. Delivers nothing once disconnected.
pub trait DomObserver: Send + Sync + 'static {
  /// Stop delivering mutation batches.
  fn disconnect(&self);
}

/// Document-global operations.
pub trait Document: Send + Sync + 'static {
  /// Element handle type for this host.
  type Node: DomNode;
  /// Observer type for this host.
  type Observer: DomObserver;

  /// Whether content has been parsed far enough that the body exists.
  fn content_loaded(&self) -> bool;

  /// Call `handler.on_content_loaded()` once content is available.
  fn on_content_loaded(&self, handler: Arc<dyn MutationHandler<Self::Node>>);

  /// Watch the whole body subtree for child-list changes.
  fn observe_body(
    &self,
    handler: Arc<dyn MutationHandler<Self::Node>>,
  ) -> DomResult<Self::Observer>;

  /// All elements matching `selector`, in document order.
  fn query_selector_all(&self, selector: &str) -> DomResult<Vec<Self::Node>>;

  /// First element matching `selector`.
  fn query_selector(&self, selector: &str) -> DomResult<Option<Self::Node>> {
    Ok(self.query_selector_all(selector)?.into_iter().next())
  }

  /// Topmost rendered element at a viewport point.
  fn element_from_point(&self, point: Point) -> Option<Self::Node>;
}
