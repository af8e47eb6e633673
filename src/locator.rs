//! Find a move by the board it produces.
//!
//! For every node of a list, in order: a board match is remembered as a
//! shallow candidate, then the node's variations are searched and any hit
//! there is returned at once. A hit nested under an earlier node therefore
//! beats a shallow match recorded later in the same list. Without a nested
//! hit the last shallow candidate wins.

use crate::error::{GameError, Result};
use crate::position::Position;
use crate::tree::{ListId, MoveTree, NodeId, VariationId};

#[derive(Debug, Clone, Copy)]
pub struct PositionLocator<'a> {
    tree: &'a MoveTree,
}

impl<'a> PositionLocator<'a> {
    pub fn new(tree: &'a MoveTree) -> Self {
        Self { tree }
    }

    pub fn find_in_list(&self, list: ListId, target: &Position) -> Result<NodeId> {
        self.search_list(list, target).ok_or_else(|| not_found(target))
    }

    /// Searches the variations hanging off `anchor`, returning the match
    /// together with the top-level variation it was found under.
    pub fn find_in_group(
        &self,
        anchor: NodeId,
        target: &Position,
    ) -> Result<(NodeId, VariationId)> {
        self.search_group(anchor, target).ok_or_else(|| not_found(target))
    }

    fn search_list(&self, list: ListId, target: &Position) -> Option<NodeId> {
        let mut shallow = None;

        for &id in self.tree.list(list).nodes() {
            if self.tree.node(id).position().same_board(target) {
                shallow = Some(id);
            }

            if let Some((nested, _)) = self.search_group(id, target) {
                return Some(nested);
            }
        }

        shallow
    }

    fn search_group(&self, anchor: NodeId, target: &Position) -> Option<(NodeId, VariationId)> {
        self.tree
            .node(anchor)
            .variations()
            .iter()
            .find_map(|variation| {
                let list = self.tree.variation(variation).list();
                self.search_list(list, target).map(|id| (id, variation))
            })
    }
}

fn not_found(target: &Position) -> GameError {
    GameError::PositionNotFound(target.to_string())
}
