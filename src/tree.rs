//! Arena-backed move tree.
//!
//! Ownership runs one way: a [`MoveList`] owns its nodes, a [`MoveNode`] owns
//! its [`VariationGroup`], a group owns its [`Variation`]s and each variation
//! owns one list. The reverse edges (node -> list, list -> variation,
//! variation -> anchor node) are plain ids into the arena.
//!
//! Entries are never freed individually. Anything cut out of the tree stays
//! in the arena, unreachable from the mainline, until the whole tree is
//! dropped.

use crate::position::Position;
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Payload fields the tree does not model (origin/destination squares,
/// clock readings, ...), carried through edits untouched.
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariationId(usize);

/// One ply.
#[derive(Debug, Clone)]
pub struct MoveNode {
    notation: String,
    position: Position,
    comment: Option<String>,
    extra: Extra,
    list: ListId,
    variations: VariationGroup,
}

impl MoveNode {
    pub fn notation(&self) -> &str {
        &self.notation
    }

    /// Position reached after this move.
    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// The list this node currently lives in.
    pub fn list(&self) -> ListId {
        self.list
    }

    /// Alternatives to this move.
    pub fn variations(&self) -> &VariationGroup {
        &self.variations
    }

    pub(crate) fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }
}

#[derive(Debug, Clone)]
pub struct VariationGroup {
    anchor: NodeId,
    variations: SmallVec<[VariationId; 2]>,
}

impl VariationGroup {
    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    pub fn as_slice(&self) -> &[VariationId] {
        &self.variations
    }

    pub fn iter(&self) -> impl Iterator<Item = VariationId> + '_ {
        self.variations.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.variations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MoveList {
    nodes: Vec<NodeId>,
    owner: Option<VariationId>,
}

impl MoveList {
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// `None` for the mainline.
    pub fn owner(&self) -> Option<VariationId> {
        self.owner
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Variation {
    list: ListId,
    anchor: Option<NodeId>,
}

impl Variation {
    pub fn list(&self) -> ListId {
        self.list
    }

    /// Move whose group holds this variation; `None` once detached.
    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }
}

#[derive(Debug, Clone)]
pub struct MoveTree {
    nodes: Vec<MoveNode>,
    lists: Vec<MoveList>,
    variations: Vec<Variation>,
    mainline: ListId,
}

impl Default for MoveTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            lists: vec![MoveList::default()],
            variations: Vec::new(),
            mainline: ListId(0),
        }
    }

    pub fn mainline(&self) -> ListId {
        self.mainline
    }

    pub fn node(&self, id: NodeId) -> &MoveNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut MoveNode {
        &mut self.nodes[id.0]
    }

    pub fn list(&self, id: ListId) -> &MoveList {
        &self.lists[id.0]
    }

    pub fn variation(&self, id: VariationId) -> &Variation {
        &self.variations[id.0]
    }

    /// Index of `node` inside its own list.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        let list = self.node(node).list;
        self.list(list).nodes.iter().position(|&id| id == node)
    }

    /// The move following `node` in its own list, if any.
    pub fn successor(&self, node: NodeId) -> Option<NodeId> {
        let list = self.list(self.node(node).list);
        let index = self.index_of(node)?;
        list.nodes.get(index + 1).copied()
    }

    /// Variation whose list directly contains `node`.
    pub fn owner_variation(&self, node: NodeId) -> Option<VariationId> {
        self.list(self.node(node).list).owner
    }

    pub fn is_on_mainline(&self, node: NodeId) -> bool {
        self.node(node).list == self.mainline
    }

    /// Creates a node at the end of `list`.
    pub fn push_move(
        &mut self,
        list: ListId,
        notation: impl Into<String>,
        position: Position,
        comment: Option<String>,
        extra: Extra,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MoveNode {
            notation: notation.into(),
            position,
            comment,
            extra,
            list,
            variations: VariationGroup {
                anchor: id,
                variations: SmallVec::new(),
            },
        });
        self.lists[list.0].nodes.push(id);
        id
    }

    /// Creates a detached variation owning a fresh, empty list.
    pub fn new_variation(&mut self) -> VariationId {
        let id = VariationId(self.variations.len());
        let list = ListId(self.lists.len());
        self.lists.push(MoveList {
            nodes: Vec::new(),
            owner: Some(id),
        });
        self.variations.push(Variation { list, anchor: None });
        id
    }

    /// Moves `node` (with its whole variation group) to the end of `list`.
    pub fn append(&mut self, list: ListId, node: NodeId) {
        let previous = self.node(node).list;
        self.lists[previous.0].nodes.retain(|&id| id != node);
        self.lists[list.0].nodes.push(node);
        self.node_mut(node).list = list;
    }

    /// Removes the node at `index` and everything after it, returning the
    /// removed nodes in order.
    pub fn truncate_from(&mut self, list: ListId, index: usize) -> Vec<NodeId> {
        let nodes = &mut self.lists[list.0].nodes;
        if index >= nodes.len() {
            return Vec::new();
        }
        nodes.split_off(index)
    }

    /// Overwrites the tail of `list` from `index` on with `nodes`.
    pub fn splice_replace(&mut self, list: ListId, index: usize, nodes: &[NodeId]) {
        self.truncate_from(list, index);
        for &node in nodes {
            self.append(list, node);
        }
    }

    /// Removes `variation` from the group it belongs to and returns the
    /// former anchor.
    pub fn detach(&mut self, variation: VariationId) -> Option<NodeId> {
        let anchor = self.variations[variation.0].anchor.take()?;
        self.node_mut(anchor)
            .variations
            .variations
            .retain(|id| *id != variation);
        Some(anchor)
    }

    /// Appends `variation` to the group of `anchor`.
    pub fn attach(&mut self, anchor: NodeId, variation: VariationId) {
        self.detach(variation);
        self.node_mut(anchor).variations.variations.push(variation);
        self.variations[variation.0].anchor = Some(anchor);
    }
}
