/*! Mutation records delivered by the host observer. */

/// Kind of DOM change a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum MutationKind {
  /// Children were added or removed (`childList`).
  #[display("childList")]
  ChildList,
  /// An attribute changed.
  #[display("attributes")]
  Attributes,
  /// Text content changed.
  #[display("characterData")]
  CharacterData,
}

/// One DOM change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
  pub kind: MutationKind,
  pub target: N,
  pub added_nodes: Vec<N>,
  pub removed_nodes: Vec<N>,
}

impl<N> MutationRecord<N> {
  /// Child-list record for nodes appended under `target`.
  pub const fn children_added(target: N, added_nodes: Vec<N>) -> Self {
    Self {
      kind: MutationKind::ChildList,
      target,
      added_nodes,
      removed_nodes: Vec::new(),
    }
  }

  /// Child-list record for nodes removed from `target`.
  pub const fn children_removed(target: N, removed_nodes: Vec<N>) -> Self {
    Self {
      kind: MutationKind::ChildList,
      target,
      added_nodes: Vec::new(),
      removed_nodes,
    }
  }

  /// True for child-list records that added at least one node.
  pub fn adds_nodes(&self) -> bool {
    self.kind == MutationKind::ChildList && !self.added_nodes.is_empty()
  }
}
