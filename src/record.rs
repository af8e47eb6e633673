//! Nested record form of a move tree, the shape exchanged with a notation codec.

use crate::position::Position;
use crate::tree::{Extra, ListId, MoveTree};
use serde::{Deserialize, Serialize};

/// One move plus the alternatives to it.
///
/// Serialized field names follow the payload convention: `m` for the move
/// notation, `fen` for the resulting position, `variations` for the nested
/// lines. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    #[serde(rename = "m", default)]
    pub notation: String,

    #[serde(rename = "fen", default)]
    pub position: Position,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Vec<MoveRecord>>,
}

impl MoveRecord {
    pub fn new(notation: impl Into<String>, position: impl Into<Position>) -> Self {
        Self {
            notation: notation.into(),
            position: position.into(),
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn with_variation(mut self, line: Vec<MoveRecord>) -> Self {
        self.variations.push(line);
        self
    }
}

impl MoveTree {
    pub fn from_records(records: &[MoveRecord]) -> Self {
        let mut tree = Self::new();
        let mainline = tree.mainline();
        tree.extend_from_records(mainline, records);
        tree
    }

    fn extend_from_records(&mut self, list: ListId, records: &[MoveRecord]) {
        for record in records {
            let node = self.push_move(
                list,
                record.notation.clone(),
                record.position.clone(),
                record.comment.clone(),
                record.extra.clone(),
            );
            for line in &record.variations {
                let variation = self.new_variation();
                let variation_list = self.variation(variation).list();
                self.extend_from_records(variation_list, line);
                self.attach(node, variation);
            }
        }
    }

    /// Materializes `list` and everything below it, preserving the order of
    /// moves and of variations.
    pub fn to_records(&self, list: ListId) -> Vec<MoveRecord> {
        self.list(list)
            .nodes()
            .iter()
            .map(|&id| {
                let node = self.node(id);
                MoveRecord {
                    notation: node.notation().to_string(),
                    position: node.position().clone(),
                    comment: node.comment().map(str::to_string),
                    extra: node.extra().clone(),
                    variations: node
                        .variations()
                        .iter()
                        .map(|variation| self.to_records(self.variation(variation).list()))
                        .collect(),
                }
            })
            .collect()
    }
}
