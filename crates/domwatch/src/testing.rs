/*!
In-memory document for unit tests.

Implements the platform traits over an arena tree with:
- a small selector engine (tag, `#id`, `.class`, `*`, descendant combinator, `,` groups)
- z-ordered hit testing over bounding rects, clipped to a 1280x720 viewport
  (highest `z`, then latest in document order, wins)
- synchronous mutation delivery to connected observers
- per-selector query counters
*/

#![allow(clippy::indexing_slicing, clippy::expect_used, clippy::unwrap_used)]

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::platform::{Document, DomNode, DomObserver, MutationHandler, MutationRecord};
use crate::types::{DomError, DomResult, Point, Rect, Size};

const BODY: usize = 0;
const VIEWPORT_WIDTH: f64 = 1280.0;
const VIEWPORT_HEIGHT: f64 = 720.0;

type Handler = Arc<dyn MutationHandler<FakeNode>>;

struct NodeData {
  tag: String,
  id: Option<String>,
  classes: Vec<String>,
  parent: Option<usize>,
  children: Vec<usize>,
  rect: Rect,
  size: Size,
  z: i32,
}

struct ObserverSlot {
  connected: Arc<AtomicBool>,
  handler: Handler,
}

struct Tree {
  nodes: Vec<NodeData>,
  loaded: bool,
  deferred: Vec<Handler>,
  observers: Vec<ObserverSlot>,
  query_all_counts: HashMap<String, usize>,
  query_counts: HashMap<String, usize>,
  batches_delivered: usize,
  viewport: Rect,
}

impl Tree {
  fn is_attached(&self, mut index: usize) -> bool {
    loop {
      if index == BODY {
        return true;
      }
      match self.nodes[index].parent {
        Some(parent) => index = parent,
        None => return false,
      }
    }
  }

  /// Attached nodes in document order (pre-order from body).
  fn document_order(&self) -> Vec<usize> {
    let mut order = Vec::new();
    let mut stack = vec![BODY];
    while let Some(index) = stack.pop() {
      order.push(index);
      stack.extend(self.nodes[index].children.iter().rev().copied());
    }
    order
  }

  fn descendants(&self, root: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut stack: Vec<usize> = self.nodes[root].children.iter().rev().copied().collect();
    while let Some(index) = stack.pop() {
      order.push(index);
      stack.extend(self.nodes[index].children.iter().rev().copied());
    }
    order
  }

  fn connected_handlers(&mut self) -> Vec<Handler> {
    self
      .observers
      .retain(|slot| slot.connected.load(Ordering::SeqCst));
    self
      .observers
      .iter()
      .map(|slot| Arc::clone(&slot.handler))
      .collect()
  }
}

/// Description of an element to create.
#[derive(Debug, Clone)]
pub(crate) struct Spec {
  tag: String,
  id: Option<String>,
  classes: Vec<String>,
  rect: Rect,
  size: Size,
  z: i32,
}

impl Spec {
  pub(crate) fn new(tag: &str) -> Self {
    Self {
      tag: tag.to_ascii_lowercase(),
      id: None,
      classes: Vec::new(),
      rect: Rect::default(),
      size: Size::default(),
      z: 0,
    }
  }

  pub(crate) fn id(mut self, id: &str) -> Self {
    self.id = Some(id.to_owned());
    self
  }

  pub(crate) fn class(mut self, class: &str) -> Self {
    self.classes.push(class.to_owned());
    self
  }

  /// Sets the bounding rect and a matching layout size.
  pub(crate) fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
    self.rect = Rect::new(x, y, width, height);
    self.size = Size::new(width, height);
    self
  }

  /// Overrides the layout size independently of the rect.
  pub(crate) fn size(mut self, width: f64, height: f64) -> Self {
    self.size = Size::new(width, height);
    self
  }

  pub(crate) fn z(mut self, z: i32) -> Self {
    self.z = z;
    self
  }
}

/// Handle into a `FakeDocument`.
#[derive(Clone)]
pub(crate) struct FakeNode {
  index: usize,
  tree: Arc<RwLock<Tree>>,
}

impl PartialEq for FakeNode {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index && Arc::ptr_eq(&self.tree, &other.tree)
  }
}

impl Eq for FakeNode {}

impl std::hash::Hash for FakeNode {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.index.hash(state);
  }
}

impl std::fmt::Debug for FakeNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let tree = self.tree.read();
    let data = &tree.nodes[self.index];
    f.debug_struct("FakeNode")
      .field("index", &self.index)
      .field("tag", &data.tag)
      .field("id", &data.id)
      .field("classes", &data.classes)
      .finish()
  }
}

impl FakeNode {
  fn sibling(&self, index: usize) -> Self {
    Self {
      index,
      tree: Arc::clone(&self.tree),
    }
  }
}

impl DomNode for FakeNode {
  fn tag_name(&self) -> String {
    self.tree.read().nodes[self.index].tag.clone()
  }

  fn element_id(&self) -> Option<String> {
    self.tree.read().nodes[self.index].id.clone()
  }

  fn has_class(&self, class: &str) -> bool {
    self.tree.read().nodes[self.index]
      .classes
      .iter()
      .any(|c| c == class)
  }

  fn bounding_rect(&self) -> Rect {
    self.tree.read().nodes[self.index].rect
  }

  fn rendered_size(&self) -> Size {
    self.tree.read().nodes[self.index].size
  }

  fn parent(&self) -> Option<Self> {
    let parent = self.tree.read().nodes[self.index].parent;
    parent.map(|index| self.sibling(index))
  }

  fn matches(&self, selector: &str) -> DomResult<bool> {
    let selector = Selector::parse(selector)?;
    Ok(selector.matches(&self.tree.read(), self.index))
  }

  fn query_selector(&self, selector: &str) -> DomResult<Option<Self>> {
    let selector = Selector::parse(selector)?;
    let tree = self.tree.read();
    let found = tree
      .descendants(self.index)
      .into_iter()
      .find(|&index| selector.matches(&tree, index));
    Ok(found.map(|index| self.sibling(index)))
  }
}

/// Observer handle returned by `FakeDocument::observe_body`.
#[derive(Debug)]
pub(crate) struct FakeObserver {
  connected: Arc<AtomicBool>,
}

impl DomObserver for FakeObserver {
  fn disconnect(&self) {
    self.connected.store(false, Ordering::SeqCst);
  }
}

/// In-memory document. Clones share the same tree.
#[derive(Clone)]
pub(crate) struct FakeDocument {
  tree: Arc<RwLock<Tree>>,
}

impl std::fmt::Debug for FakeDocument {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FakeDocument").finish_non_exhaustive()
  }
}

impl FakeDocument {
  /// A parsed document with an empty body.
  pub(crate) fn new() -> Self {
    let doc = Self::loading();
    doc.tree.write().loaded = true;
    doc
  }

  /// A document whose content has not finished parsing.
  pub(crate) fn loading() -> Self {
    let body = NodeData {
      tag: "body".into(),
      id: None,
      classes: Vec::new(),
      parent: None,
      children: Vec::new(),
      rect: Rect::default(),
      size: Size::default(),
      z: i32::MIN,
    };
    Self {
      tree: Arc::new(RwLock::new(Tree {
        nodes: vec![body],
        loaded: false,
        deferred: Vec::new(),
        observers: Vec::new(),
        query_all_counts: HashMap::new(),
        query_counts: HashMap::new(),
        batches_delivered: 0,
        viewport: Rect::new(0.0, 0.0, VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
      })),
    }
  }

  fn node(&self, index: usize) -> FakeNode {
    FakeNode {
      index,
      tree: Arc::clone(&self.tree),
    }
  }

  pub(crate) fn body(&self) -> FakeNode {
    self.node(BODY)
  }

  /// Create a detached element.
  pub(crate) fn create(&self, spec: Spec) -> FakeNode {
    let mut tree = self.tree.write();
    tree.nodes.push(NodeData {
      tag: spec.tag,
      id: spec.id,
      classes: spec.classes,
      parent: None,
      children: Vec::new(),
      rect: spec.rect,
      size: spec.size,
      z: spec.z,
    });
    let index = tree.nodes.len() - 1;
    drop(tree);
    self.node(index)
  }

  /// Create an element and append it under `parent`.
  pub(crate) fn insert(&self, parent: &FakeNode, spec: Spec) -> FakeNode {
    let node = self.create(spec);
    self.append(parent, &node);
    node
  }

  /// Append `child` under `parent`, notifying observers if `parent` is attached.
  pub(crate) fn append(&self, parent: &FakeNode, child: &FakeNode) {
    let handlers = {
      let mut tree = self.tree.write();
      tree.nodes[child.index].parent = Some(parent.index);
      tree.nodes[parent.index].children.push(child.index);
      if tree.is_attached(parent.index) {
        tree.connected_handlers()
      } else {
        Vec::new()
      }
    };
    let record = MutationRecord::children_added(parent.clone(), vec![child.clone()]);
    self.dispatch(&handlers, &[record]);
  }

  /// Detach `node` from its parent, notifying observers.
  pub(crate) fn remove(&self, node: &FakeNode) {
    let (parent, handlers) = {
      let mut tree = self.tree.write();
      let Some(parent) = tree.nodes[node.index].parent.take() else {
        return;
      };
      tree.nodes[parent].children.retain(|&c| c != node.index);
      let handlers = if tree.is_attached(parent) {
        tree.connected_handlers()
      } else {
        Vec::new()
      };
      (parent, handlers)
    };
    let record = MutationRecord::children_removed(self.node(parent), vec![node.clone()]);
    self.dispatch(&handlers, &[record]);
  }

  /// Deliver an arbitrary batch to connected observers.
  pub(crate) fn deliver(&self, records: &[MutationRecord<FakeNode>]) {
    let handlers = self.tree.write().connected_handlers();
    self.dispatch(&handlers, records);
  }

  fn dispatch(&self, handlers: &[Handler], records: &[MutationRecord<FakeNode>]) {
    if handlers.is_empty() {
      return;
    }
    self.tree.write().batches_delivered += 1;
    for handler in handlers {
      handler.on_mutations(records);
    }
  }

  /// Change geometry without a child-list mutation.
  pub(crate) fn set_rect(&self, node: &FakeNode, rect: Rect) {
    let mut tree = self.tree.write();
    tree.nodes[node.index].rect = rect;
    tree.nodes[node.index].size = Size::new(rect.width, rect.height);
  }

  /// Mark content as parsed and run deferred handlers.
  pub(crate) fn finish_loading(&self) {
    let deferred = {
      let mut tree = self.tree.write();
      tree.loaded = true;
      std::mem::take(&mut tree.deferred)
    };
    for handler in deferred {
      handler.on_content_loaded();
    }
  }

  pub(crate) fn query_all_count(&self, selector: &str) -> usize {
    self
      .tree
      .read()
      .query_all_counts
      .get(selector)
      .copied()
      .unwrap_or(0)
  }

  pub(crate) fn query_count(&self, selector: &str) -> usize {
    self.tree.read().query_counts.get(selector).copied().unwrap_or(0)
  }

  pub(crate) fn active_observers(&self) -> usize {
    self
      .tree
      .read()
      .observers
      .iter()
      .filter(|slot| slot.connected.load(Ordering::SeqCst))
      .count()
  }

  pub(crate) fn batches_delivered(&self) -> usize {
    self.tree.read().batches_delivered
  }

  pub(crate) fn deferred_count(&self) -> usize {
    self.tree.read().deferred.len()
  }
}

impl Document for FakeDocument {
  type Node = FakeNode;
  type Observer = FakeObserver;

  fn content_loaded(&self) -> bool {
    self.tree.read().loaded
  }

  fn on_content_loaded(&self, handler: Handler) {
    let loaded = {
      let mut tree = self.tree.write();
      if !tree.loaded {
        tree.deferred.push(Arc::clone(&handler));
      }
      tree.loaded
    };
    if loaded {
      handler.on_content_loaded();
    }
  }

  fn observe_body(&self, handler: Handler) -> DomResult<FakeObserver> {
    let connected = Arc::new(AtomicBool::new(true));
    self.tree.write().observers.push(ObserverSlot {
      connected: Arc::clone(&connected),
      handler,
    });
    Ok(FakeObserver { connected })
  }

  fn query_selector_all(&self, selector: &str) -> DomResult<Vec<FakeNode>> {
    let parsed = Selector::parse(selector)?;
    let mut tree = self.tree.write();
    *tree
      .query_all_counts
      .entry(selector.to_owned())
      .or_default() += 1;
    let found: Vec<usize> = tree
      .document_order()
      .into_iter()
      .filter(|&index| parsed.matches(&tree, index))
      .collect();
    drop(tree);
    Ok(found.into_iter().map(|index| self.node(index)).collect())
  }

  fn query_selector(&self, selector: &str) -> DomResult<Option<FakeNode>> {
    let parsed = Selector::parse(selector)?;
    let mut tree = self.tree.write();
    *tree.query_counts.entry(selector.to_owned()).or_default() += 1;
    let found = tree
      .document_order()
      .into_iter()
      .find(|&index| parsed.matches(&tree, index));
    drop(tree);
    Ok(found.map(|index| self.node(index)))
  }

  fn element_from_point(&self, point: Point) -> Option<FakeNode> {
    let tree = self.tree.read();
    if !tree.viewport.contains(point) {
      return None;
    }
    let hit = tree
      .document_order()
      .into_iter()
      .enumerate()
      .filter(|&(_, index)| {
        let data = &tree.nodes[index];
        data.rect.width > 0.0 && data.rect.height > 0.0 && data.rect.contains(point)
      })
      .max_by_key(|&(order, index)| (tree.nodes[index].z, order))
      .map(|(_, index)| index);
    drop(tree);
    hit.map(|index| self.node(index))
  }
}

/// Parsed selector list.
struct Selector {
  groups: Vec<Vec<Compound>>,
}

#[derive(Default)]
struct Compound {
  tag: Option<String>,
  id: Option<String>,
  classes: Vec<String>,
}

impl Compound {
  fn matches(&self, data: &NodeData) -> bool {
    self.tag.as_ref().map_or(true, |tag| *tag == data.tag)
      && self
        .id
        .as_ref()
        .map_or(true, |id| data.id.as_ref() == Some(id))
      && self.classes.iter().all(|c| data.classes.contains(c))
  }

  fn parse(source: &str, text: &str) -> DomResult<Self> {
    let mut compound = Self::default();
    let mut chars = text.chars().peekable();
    let name = |chars: &mut std::iter::Peekable<std::str::Chars<'_>>| {
      let mut out = String::new();
      while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
          out.push(c);
          chars.next();
        } else {
          break;
        }
      }
      out
    };

    if chars.peek() == Some(&'*') {
      chars.next();
    } else if chars.peek().is_some_and(char::is_ascii_alphabetic) {
      compound.tag = Some(name(&mut chars).to_ascii_lowercase());
    }

    while let Some(c) = chars.next() {
      let value = name(&mut chars);
      if value.is_empty() {
        return Err(DomError::invalid_selector(source, format!("empty name after '{c}'")));
      }
      match c {
        '.' => compound.classes.push(value),
        '#' => compound.id = Some(value),
        other => {
          return Err(DomError::invalid_selector(source, format!("unexpected '{other}'")));
        }
      }
    }
    Ok(compound)
  }
}

impl Selector {
  fn parse(source: &str) -> DomResult<Self> {
    let mut groups = Vec::new();
    for group in source.split(',') {
      let compounds = group
        .split_whitespace()
        .map(|part| Compound::parse(source, part))
        .collect::<DomResult<Vec<_>>>()?;
      if compounds.is_empty() {
        return Err(DomError::invalid_selector(source, "empty selector"));
      }
      groups.push(compounds);
    }
    Ok(Self { groups })
  }

  fn matches(&self, tree: &Tree, index: usize) -> bool {
    self.groups.iter().any(|group| {
      let Some((last, ancestors)) = group.split_last() else {
        return false;
      };
      if !last.matches(&tree.nodes[index]) {
        return false;
      }
      let mut current = tree.nodes[index].parent;
      for compound in ancestors.iter().rev() {
        loop {
          let Some(ancestor) = current else {
            return false;
          };
          current = tree.nodes[ancestor].parent;
          if compound.matches(&tree.nodes[ancestor]) {
            break;
          }
        }
      }
      true
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selector_engine_handles_compounds_and_descendants() {
    let doc = FakeDocument::new();
    let player = doc.insert(&doc.body(), Spec::new("div").id("movie_player").class("html5-video-player"));
    let video = doc.insert(&player, Spec::new("video").class("html5-main-video"));

    assert!(video.matches("video").unwrap());
    assert!(video.matches("video.html5-main-video").unwrap());
    assert!(video.matches("#movie_player video").unwrap());
    assert!(video.matches(".nope, video").unwrap());
    assert!(!video.matches("span video").unwrap());
    assert!(player.matches("div#movie_player.html5-video-player").unwrap());
    assert_eq!(doc.body().query_selector("video").unwrap(), Some(video));
  }

  #[test]
  fn malformed_selectors_are_rejected() {
    let doc = FakeDocument::new();
    for bad in ["", "div >", "..x", "a[href]", "div,"] {
      assert!(
        doc.query_selector_all(bad).is_err(),
        "'{bad}' should be rejected"
      );
    }
  }

  #[test]
  fn hit_test_prefers_higher_z_then_later_nodes() {
    let doc = FakeDocument::new();
    let below = doc.insert(&doc.body(), Spec::new("div").rect(0.0, 0.0, 100.0, 100.0));
    let above = doc.insert(&doc.body(), Spec::new("div").rect(0.0, 0.0, 100.0, 100.0));
    assert_eq!(doc.element_from_point(Point::new(50.0, 50.0)), Some(above.clone()));

    doc.set_rect(&above, Rect::new(500.0, 500.0, 10.0, 10.0));
    assert_eq!(doc.element_from_point(Point::new(50.0, 50.0)), Some(below.clone()));

    let raised = doc.insert(&doc.body(), Spec::new("div").rect(0.0, 0.0, 10.0, 10.0).z(-1));
    assert_ne!(doc.element_from_point(Point::new(5.0, 5.0)), Some(raised));
  }

  #[test]
  fn detached_subtrees_do_not_notify_until_attached() {
    let doc = FakeDocument::new();
    let observer = doc.observe_body(Arc::new(Noop)).unwrap();
    let wrapper = doc.create(Spec::new("section"));
    doc.insert(&wrapper, Spec::new("div").class("badge"));
    assert_eq!(doc.batches_delivered(), 0);

    doc.append(&doc.body(), &wrapper);
    assert_eq!(doc.batches_delivered(), 1);

    observer.disconnect();
    doc.remove(&wrapper);
    assert_eq!(doc.batches_delivered(), 1, "disconnected observer sees nothing");
    assert_eq!(doc.active_observers(), 0);
  }

  struct Noop;

  impl MutationHandler<FakeNode> for Noop {
    fn on_mutations(&self, _records: &[MutationRecord<FakeNode>]) {}
    fn on_content_loaded(&self) {}
  }
}
