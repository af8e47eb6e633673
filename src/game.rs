//! A game as an editable tree of moves, addressed by board position.
//!
//! Every edit follows the same shape: all lookups first, then the structural
//! change, then [`Game::sync`] regenerates the nested record payload that the
//! codec renders from. A failed lookup therefore leaves both the tree and the
//! payload untouched.

use crate::codec::{NotationCodec, ParsedGame, PgnCodec};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::locator::PositionLocator;
use crate::position::Position;
use crate::record::MoveRecord;
use crate::tree::{Extra, ListId, MoveNode, MoveTree, NodeId};
use crate::types::Metadata;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Payload keys with a fixed meaning; caller supplied extra fields may not
/// shadow them.
const RESERVED_FIELDS: [&str; 4] = ["m", "fen", "comment", "variations"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    Promoted,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The move is the start position or lives directly on the mainline.
    OnMainline,
    /// The move's variation is not hanging off any move.
    NoBranchPoint,
    /// The branch point is on the mainline and the promotion guard protects it.
    MainlineProtected,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OnMainline => "move is on the mainline",
            Self::NoBranchPoint => "variation has no branch point",
            Self::MainlineProtected => "mainline of a recorded game is protected",
        })
    }
}

/// JSON document form of a game: start position, moves and any top-level
/// metadata strings.
#[derive(Debug, Serialize, Deserialize)]
struct PayloadDocument {
    #[serde(default = "Position::initial")]
    fen: Position,

    #[serde(default)]
    moves: Vec<MoveRecord>,

    #[serde(flatten)]
    metadata: Extra,
}

#[derive(Debug, Clone)]
pub struct Game<C: NotationCodec = PgnCodec> {
    tree: MoveTree,
    start: Position,
    header_lines: Vec<String>,
    metadata: Metadata,
    config: GameConfig,
    codec: C,
    payload: Vec<MoveRecord>,
}

impl Game<PgnCodec> {
    pub fn from_pgn(text: &str) -> Result<Self> {
        Self::from_pgn_with(text, PgnCodec::new(), GameConfig::default())
    }

    /// A game without tag pairs, straight from nested records.
    pub fn from_records(start: impl Into<Position>, moves: Vec<MoveRecord>) -> Self {
        let parsed = ParsedGame {
            start_position: start.into(),
            moves,
            ..ParsedGame::default()
        };
        Self::from_parts(parsed, PgnCodec::new(), GameConfig::default())
    }

    pub fn from_payload_json(json: &str) -> Result<Self> {
        Self::from_payload_json_with(json, PgnCodec::new(), GameConfig::default())
    }
}

impl<C: NotationCodec> Game<C> {
    pub fn from_pgn_with(text: &str, codec: C, config: GameConfig) -> Result<Self> {
        let parsed = codec.parse(text)?;
        Ok(Self::from_parts(parsed, codec, config))
    }

    /// Builds a game from a `{"fen": ..., "moves": [...], ...}` document.
    /// Top-level string fields other than `fen` and `moves` become metadata.
    pub fn from_payload_json_with(json: &str, codec: C, config: GameConfig) -> Result<Self> {
        let document: PayloadDocument = serde_json::from_str(json)?;

        let mut metadata = Metadata::new();
        for (name, value) in &document.metadata {
            if let Some(value) = value.as_str() {
                metadata.insert(name.as_str(), value);
            }
        }

        let parsed = ParsedGame {
            metadata,
            start_position: document.fen,
            moves: document.moves,
            ..ParsedGame::default()
        };
        Ok(Self::from_parts(parsed, codec, config))
    }

    pub fn from_parts(parsed: ParsedGame, codec: C, config: GameConfig) -> Self {
        let mut game = Self {
            tree: MoveTree::from_records(&parsed.moves),
            start: parsed.start_position,
            header_lines: parsed.header_lines,
            metadata: parsed.metadata,
            config,
            codec,
            payload: Vec::new(),
        };
        game.sync();
        game
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tree(&self) -> &MoveTree {
        &self.tree
    }

    pub fn start_position(&self) -> &Position {
        &self.start
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn header_lines(&self) -> &[String] {
        &self.header_lines
    }

    /// Nested records of the whole game, as of the last edit.
    pub fn payload(&self) -> &[MoveRecord] {
        &self.payload
    }

    pub fn payload_json(&self) -> Result<String> {
        let metadata = self
            .metadata
            .iter()
            .filter(|(name, _)| !matches!(*name, "fen" | "moves"))
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();

        let document = PayloadDocument {
            fen: self.start.clone(),
            moves: self.payload.clone(),
            metadata,
        };
        Ok(serde_json::to_string(&document)?)
    }

    /// Movetext of the current payload.
    pub fn render(&self) -> String {
        self.codec.render(&self.payload)
    }

    /// Header lines, a blank line, then the movetext.
    pub fn pgn_content(&self) -> String {
        let mut content = self.header_lines.join("\n");
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(&self.render());
        content
    }

    /// `Ok(None)` means `pos` is the start position, i.e. before the first move.
    pub fn find_by_position(&self, pos: &Position) -> Result<Option<&MoveNode>> {
        Ok(self.locate(pos)?.map(|id| self.tree.node(id)))
    }

    /// The move recorded right after `pos`, within the same line.
    pub fn find_next_by_position(&self, pos: &Position) -> Result<&MoveNode> {
        self.next_after(self.locate(pos)?)
            .map(|id| self.tree.node(id))
            .ok_or_else(|| GameError::EndOfLine(pos.to_string()))
    }

    /// `true` for the start position or any recorded move; a miss is `false`.
    pub fn position_exists(&self, pos: &Position) -> bool {
        self.locate(pos).is_ok()
    }

    /// Index within the mainline; `None` for the start position or a move
    /// inside a variation.
    pub fn mainline_index(&self, pos: &Position) -> Result<Option<usize>> {
        Ok(self
            .locate(pos)?
            .filter(|&id| self.tree.is_on_mainline(id))
            .and_then(|id| self.tree.index_of(id)))
    }

    /// The full recorded descriptor for the board of `pos`.
    pub fn game_position(&self, pos: &Position) -> Result<Position> {
        Ok(match self.locate(pos)? {
            Some(id) => self.tree.node(id).position().clone(),
            None => self.start.clone(),
        })
    }

    /// Every move with a label, in render order. Moves inside a variation
    /// are labelled `"<branch move> <move>"`.
    pub fn labelled_positions(&self) -> Vec<(String, Position)> {
        let mut out = Vec::new();
        self.collect_labels(self.tree.mainline(), None, &mut out);
        out
    }

    fn collect_labels(&self, list: ListId, branch: Option<&str>, out: &mut Vec<(String, Position)>) {
        for &id in self.tree.list(list).nodes() {
            let node = self.tree.node(id);
            let label = match branch {
                Some(branch) => format!("{branch} {}", node.notation()),
                None => node.notation().to_string(),
            };
            out.push((label, node.position().clone()));

            for variation in node.variations().iter() {
                let list = self.tree.variation(variation).list();
                self.collect_labels(list, Some(node.notation()), out);
            }
        }
    }

    /// Records `notation` as played from `before`.
    ///
    /// If a move already follows `before`, the new move becomes an
    /// alternative to it in a fresh variation. Otherwise the line of
    /// `before` is extended. Returns the rendered movetext.
    pub fn insert_new_move(
        &mut self,
        before: &Position,
        after: impl Into<Position>,
        extra: Extra,
        notation: impl Into<String>,
    ) -> Result<String> {
        let current = self.locate(before)?;
        let notation = notation.into();
        let extra = without_reserved(extra);

        match self.next_after(current) {
            Some(next) => {
                debug!(
                    "inserted {notation} as an alternative to {}",
                    self.tree.node(next).notation()
                );
                let variation = self.tree.new_variation();
                let list = self.tree.variation(variation).list();
                self.tree.push_move(list, notation, after.into(), None, extra);
                self.tree.attach(next, variation);
            }
            None => {
                let list = current.map_or(self.tree.mainline(), |id| self.tree.node(id).list());
                debug!("appended {notation} to the end of its line");
                self.tree.push_move(list, notation, after.into(), None, extra);
            }
        }

        self.sync();
        Ok(self.render())
    }

    /// Drops every move after `pos` in its own line. Variations hanging off
    /// the kept moves stay.
    pub fn remove_remaining_moves(&mut self, pos: &Position) -> Result<String> {
        let (list, from) = match self.locate(pos)? {
            Some(id) => {
                let index = self
                    .tree
                    .index_of(id)
                    .ok_or_else(|| GameError::PositionNotFound(pos.to_string()))?;
                (self.tree.node(id).list(), index + 1)
            }
            None => (self.tree.mainline(), 0),
        };

        let removed = self.tree.truncate_from(list, from);
        debug!("removed {} moves after {pos}", removed.len());

        self.sync();
        Ok(self.render())
    }

    /// Removes the whole variation containing `pos`. Moves on the mainline
    /// are left alone.
    pub fn delete_variation(&mut self, pos: &Position) -> Result<String> {
        let owner = self
            .locate(pos)?
            .and_then(|id| self.tree.owner_variation(id));

        match owner {
            Some(variation) => {
                if let Some(anchor) = self.tree.detach(variation) {
                    debug!("deleted a variation of {}", self.tree.node(anchor).notation());
                }
            }
            None => debug!("{pos} is on the mainline, nothing to delete"),
        }

        self.sync();
        Ok(self.render())
    }

    /// Makes the variation containing `pos` the continuation of the line it
    /// branches from. The displaced continuation becomes a variation of the
    /// first promoted move.
    pub fn promote_variation(&mut self, pos: &Position) -> Result<PromotionOutcome> {
        let Some(node) = self.locate(pos)? else {
            return Ok(skipped(SkipReason::OnMainline));
        };
        let Some(variation) = self.tree.owner_variation(node) else {
            return Ok(skipped(SkipReason::OnMainline));
        };
        let Some(branch) = self.tree.variation(variation).anchor() else {
            return Ok(skipped(SkipReason::NoBranchPoint));
        };

        let parent_list = self.tree.node(branch).list();
        if parent_list == self.tree.mainline()
            && self.config.promotion_guard.protects_mainline(&self.metadata)
        {
            return Ok(skipped(SkipReason::MainlineProtected));
        }

        let Some(index) = self.tree.index_of(branch) else {
            return Ok(skipped(SkipReason::NoBranchPoint));
        };
        let promoted = self
            .tree
            .list(self.tree.variation(variation).list())
            .nodes()
            .to_vec();
        let Some(&first) = promoted.first() else {
            return Ok(skipped(SkipReason::NoBranchPoint));
        };

        self.tree.detach(variation);

        let displaced = self.tree.truncate_from(parent_list, index);
        let demoted = self.tree.new_variation();
        let demoted_list = self.tree.variation(demoted).list();
        for id in displaced {
            self.tree.append(demoted_list, id);
        }
        self.tree.attach(first, demoted);

        self.tree.splice_replace(parent_list, index, &promoted);

        debug!(
            "promoted {} over {}",
            self.tree.node(first).notation(),
            self.tree.node(branch).notation()
        );

        self.sync();
        Ok(PromotionOutcome::Promoted)
    }

    /// Sets the comment of the move at `pos`. The payload is updated, call
    /// [`Game::render`] for the text.
    ///
    /// Text containing `}` is rejected since it could not be written back
    /// between braces.
    pub fn add_comment(&mut self, pos: &Position, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        let id = self
            .locate(pos)?
            .ok_or_else(|| GameError::PositionNotFound(pos.to_string()))?;
        if text.contains('}') {
            return Err(GameError::InvalidComment(text));
        }

        self.tree.node_mut(id).set_comment(text);
        self.sync();
        Ok(())
    }

    fn sync(&mut self) {
        self.payload = self.tree.to_records(self.tree.mainline());
    }

    /// `Ok(None)` for the start position.
    fn locate(&self, pos: &Position) -> Result<Option<NodeId>> {
        if pos.same_board(&self.start) {
            return Ok(None);
        }

        PositionLocator::new(&self.tree)
            .find_in_list(self.tree.mainline(), pos)
            .map(Some)
    }

    fn next_after(&self, current: Option<NodeId>) -> Option<NodeId> {
        match current {
            Some(id) => self.tree.successor(id),
            None => self.tree.list(self.tree.mainline()).first(),
        }
    }
}

impl<C: NotationCodec> fmt::Display for Game<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = ["White", "Black", "Date", "Event", "Round"]
            .map(|name| self.metadata.get(name).unwrap_or_default());
        f.write_str(&fields.join("-"))
    }
}

fn skipped(reason: SkipReason) -> PromotionOutcome {
    debug!("promotion skipped: {reason}");
    PromotionOutcome::Skipped(reason)
}

fn without_reserved(mut extra: Extra) -> Extra {
    for key in RESERVED_FIELDS {
        extra.remove(key);
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromotionGuard;
    use serde_json::json;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn pos(descriptor: &str) -> Position {
        Position::new(descriptor)
    }

    fn notations(records: &[MoveRecord]) -> Vec<&str> {
        records.iter().map(|r| r.notation.as_str()).collect()
    }

    fn game_with_black(moves: Vec<MoveRecord>) -> Game {
        let mut metadata = Metadata::new();
        metadata.insert("Black", "parciful");
        let parsed = ParsedGame {
            metadata,
            start_position: pos("S"),
            moves,
            ..ParsedGame::default()
        };
        Game::from_parts(parsed, PgnCodec::new(), GameConfig::default())
    }

    #[test]
    fn test_linear_lookup_and_end_of_line() {
        let game = Game::from_records(
            "S",
            vec![MoveRecord::new("first", "A"), MoveRecord::new("second", "B")],
        );

        let found = game.find_by_position(&pos("A")).unwrap().unwrap();
        assert_eq!(found.notation(), "first");
        assert_eq!(
            game.find_next_by_position(&pos("A")).unwrap().notation(),
            "second"
        );
        assert!(matches!(
            game.find_next_by_position(&pos("B")),
            Err(GameError::EndOfLine(ref p)) if p == "B"
        ));
    }

    #[test]
    fn test_deep_match_and_end_of_variation() {
        let game = Game::from_records(
            "S",
            vec![MoveRecord::new("first", "test")
                .with_variation(vec![MoveRecord::new("v1", "vfen")])],
        );

        let found = game.find_by_position(&pos("vfen")).unwrap().unwrap();
        assert_eq!(found.notation(), "v1");
        assert!(matches!(
            game.find_next_by_position(&pos("vfen")),
            Err(GameError::EndOfLine(_))
        ));
    }

    #[test]
    fn test_start_position_is_sentinel() {
        let game = Game::from_records("S w", vec![MoveRecord::new("first", "A")]);

        assert!(game.find_by_position(&pos("S b")).unwrap().is_none());
        assert_eq!(
            game.find_next_by_position(&pos("S")).unwrap().notation(),
            "first"
        );
        assert!(game.position_exists(&pos("S")));
        assert!(game.position_exists(&pos("A")));
        assert!(!game.position_exists(&pos("Z")));
        assert!(matches!(
            game.find_by_position(&pos("Z")),
            Err(GameError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_find_next_from_start_of_empty_game() {
        let game = Game::from_records("S", Vec::new());
        assert!(matches!(
            game.find_next_by_position(&pos("S")),
            Err(GameError::EndOfLine(_))
        ));
    }

    #[test]
    fn test_promote_nested_variation() {
        init_logging();
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("a", "A").with_variation(vec![
                MoveRecord::new("v1", "P1"),
                MoveRecord::new("v2", "P2").with_variation(vec![
                    MoveRecord::new("d1", "D1"),
                    MoveRecord::new("d2", "D2"),
                ]),
            ])],
        );

        let outcome = game.promote_variation(&pos("D1")).unwrap();
        assert_eq!(outcome, PromotionOutcome::Promoted);

        let line = &game.payload()[0].variations[0];
        assert_eq!(notations(line), vec!["v1", "d1", "d2"]);
        assert_eq!(line[1].variations.len(), 1);
        assert_eq!(notations(&line[1].variations[0]), vec!["v2"]);
        assert!(line[1].variations[0][0].variations.is_empty());

        assert_eq!(game.mainline_index(&pos("D1")).unwrap(), None);
        let v2 = game.find_by_position(&pos("P2")).unwrap().unwrap();
        assert_eq!(v2.notation(), "v2");
        assert_eq!(
            game.find_next_by_position(&pos("D1")).unwrap().notation(),
            "d2"
        );
    }

    #[test]
    fn test_promote_moves_displaced_tail_into_new_variation() {
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("main", "M").with_variation(vec![
                MoveRecord::new("v1", "V1"),
                MoveRecord::new("v2", "V2").with_variation(vec![
                    MoveRecord::new("d1", "D1"),
                    MoveRecord::new("d2", "D2"),
                ]),
                MoveRecord::new("v3", "V3"),
            ])],
        );

        game.promote_variation(&pos("D2")).unwrap();

        let expected = vec![MoveRecord::new("main", "M").with_variation(vec![
            MoveRecord::new("v1", "V1"),
            MoveRecord::new("d1", "D1").with_variation(vec![
                MoveRecord::new("v2", "V2"),
                MoveRecord::new("v3", "V3"),
            ]),
            MoveRecord::new("d2", "D2"),
        ])];
        assert_eq!(game.payload(), expected.as_slice());
    }

    #[test]
    fn test_promote_over_mainline() {
        let mut game = Game::from_records(
            "S",
            vec![
                MoveRecord::new("e4", "E4"),
                MoveRecord::new("c6", "C6")
                    .with_variation(vec![MoveRecord::new("c5", "C5"), MoveRecord::new("Nf3", "NF3")]),
                MoveRecord::new("d4", "D4"),
            ],
        );

        game.promote_variation(&pos("NF3")).unwrap();

        let payload = game.payload();
        assert_eq!(notations(payload), vec!["e4", "c5", "Nf3"]);
        assert_eq!(notations(&payload[1].variations[0]), vec!["c6", "d4"]);
        assert_eq!(game.mainline_index(&pos("NF3")).unwrap(), Some(2));
    }

    #[test]
    fn test_promote_on_mainline_is_skipped() {
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("a", "A").with_variation(vec![MoveRecord::new("b", "B")])],
        );
        let before = game.payload().to_vec();

        assert_eq!(
            game.promote_variation(&pos("A")).unwrap(),
            PromotionOutcome::Skipped(SkipReason::OnMainline)
        );
        assert_eq!(
            game.promote_variation(&pos("S")).unwrap(),
            PromotionOutcome::Skipped(SkipReason::OnMainline)
        );
        assert_eq!(game.payload(), before.as_slice());
        assert!(matches!(
            game.promote_variation(&pos("Z")),
            Err(GameError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_promotion_guard_protects_recorded_game() {
        let moves = vec![MoveRecord::new("e4", "E").with_variation(vec![MoveRecord::new("d4", "X")])];

        let mut game = game_with_black(moves.clone());
        assert_eq!(
            game.promote_variation(&pos("X")).unwrap(),
            PromotionOutcome::Skipped(SkipReason::MainlineProtected)
        );
        assert_eq!(notations(game.payload()), vec!["e4"]);

        let mut game = game_with_black(moves).with_config(GameConfig::analysis());
        assert_eq!(
            game.promote_variation(&pos("X")).unwrap(),
            PromotionOutcome::Promoted
        );
        assert_eq!(notations(game.payload()), vec!["d4"]);
        assert_eq!(notations(&game.payload()[0].variations[0]), vec!["e4"]);
    }

    #[test]
    fn test_guard_allows_promotion_inside_analysis_branch() {
        let mut game = game_with_black(vec![MoveRecord::new("a", "A").with_variation(vec![
            MoveRecord::new("b", "B").with_variation(vec![MoveRecord::new("c", "C")]),
        ])]);

        assert_eq!(
            game.promote_variation(&pos("C")).unwrap(),
            PromotionOutcome::Promoted
        );

        let config = GameConfig {
            promotion_guard: PromotionGuard::ProtectMainline,
        };
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("a", "A").with_variation(vec![MoveRecord::new("b", "B")])],
        )
        .with_config(config);
        assert_eq!(
            game.promote_variation(&pos("B")).unwrap(),
            PromotionOutcome::Skipped(SkipReason::MainlineProtected)
        );
    }

    #[test]
    fn test_insert_at_end_of_line_appends() {
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("a", "A").with_variation(vec![MoveRecord::new("b", "B")])],
        );

        game.insert_new_move(&pos("B"), "C", Extra::new(), "c").unwrap();
        let line = &game.payload()[0].variations;
        assert_eq!(line.len(), 1);
        assert_eq!(notations(&line[0]), vec!["b", "c"]);

        game.insert_new_move(&pos("A"), "D", Extra::new(), "d").unwrap();
        assert_eq!(notations(game.payload()), vec!["a", "d"]);
    }

    #[test]
    fn test_insert_with_existing_successor_branches() {
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("a", "A"), MoveRecord::new("b", "B")],
        );

        let mut extra = Extra::new();
        extra.insert("from".to_string(), json!("g1"));
        extra.insert("fen".to_string(), json!("ignored"));
        game.insert_new_move(&pos("A"), "X", extra, "x").unwrap();

        let payload = game.payload();
        assert_eq!(notations(payload), vec!["a", "b"]);
        assert_eq!(payload[1].variations.len(), 1);
        let inserted = &payload[1].variations[0][0];
        assert_eq!(inserted.notation, "x");
        assert_eq!(inserted.position.as_str(), "X");
        assert_eq!(inserted.extra.get("from"), Some(&json!("g1")));
        assert!(!inserted.extra.contains_key("fen"));
    }

    #[test]
    fn test_insert_from_start_position() {
        let mut game = Game::from_records("S", Vec::new());
        game.insert_new_move(&pos("S"), "A", Extra::new(), "a").unwrap();
        assert_eq!(notations(game.payload()), vec!["a"]);

        game.insert_new_move(&pos("S"), "B", Extra::new(), "b").unwrap();
        assert_eq!(notations(game.payload()), vec!["a"]);
        assert_eq!(notations(&game.payload()[0].variations[0]), vec!["b"]);
    }

    #[test]
    fn test_failed_insert_leaves_game_untouched() {
        let mut game = Game::from_records("S", vec![MoveRecord::new("a", "A")]);
        let before = game.payload().to_vec();

        let err = game
            .insert_new_move(&pos("Z"), "B", Extra::new(), "b")
            .unwrap_err();
        assert!(matches!(err, GameError::PositionNotFound(_)));
        assert_eq!(game.payload(), before.as_slice());
        assert_eq!(game.tree().list(game.tree().mainline()).len(), 1);
    }

    #[test]
    fn test_delete_removes_whole_variation() {
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("a", "A")
                .with_variation(vec![
                    MoveRecord::new("b", "B"),
                    MoveRecord::new("c", "C").with_variation(vec![
                        MoveRecord::new("d", "D"),
                        MoveRecord::new("e", "E"),
                    ]),
                    MoveRecord::new("f", "F"),
                ])
                .with_variation(vec![MoveRecord::new("g", "G")])],
        );

        game.delete_variation(&pos("D")).unwrap();
        let groups = &game.payload()[0].variations;
        assert_eq!(notations(&groups[0]), vec!["b", "c", "f"]);
        assert!(groups[0][1].variations.is_empty());
        assert_eq!(notations(&groups[1]), vec!["g"]);
        assert!(!game.position_exists(&pos("E")));

        game.delete_variation(&pos("F")).unwrap();
        let groups = &game.payload()[0].variations;
        assert_eq!(groups.len(), 1);
        assert_eq!(notations(&groups[0]), vec!["g"]);
    }

    #[test]
    fn test_delete_on_mainline_is_noop() {
        let records = vec![
            MoveRecord::new("a", "A").with_variation(vec![MoveRecord::new("b", "B")]),
        ];
        let mut game = Game::from_records("S", records.clone());

        game.delete_variation(&pos("A")).unwrap();
        assert_eq!(game.payload(), records.as_slice());
    }

    #[test]
    fn test_remove_remaining_moves() {
        let mut game = Game::from_records(
            "S",
            vec![
                MoveRecord::new("a", "A").with_variation(vec![
                    MoveRecord::new("x", "X"),
                    MoveRecord::new("y", "Y"),
                ]),
                MoveRecord::new("b", "B"),
                MoveRecord::new("c", "C"),
            ],
        );

        game.remove_remaining_moves(&pos("X")).unwrap();
        assert_eq!(notations(&game.payload()[0].variations[0]), vec!["x"]);
        assert_eq!(notations(game.payload()), vec!["a", "b", "c"]);

        game.remove_remaining_moves(&pos("A")).unwrap();
        assert_eq!(notations(game.payload()), vec!["a"]);
        assert_eq!(game.payload()[0].variations.len(), 1);

        game.remove_remaining_moves(&pos("S")).unwrap();
        assert!(game.payload().is_empty());
    }

    #[test]
    fn test_add_comment_updates_payload() {
        let mut game = Game::from_records("S", vec![MoveRecord::new("a", "A")]);

        game.add_comment(&pos("A"), "only move").unwrap();
        assert_eq!(game.payload()[0].comment.as_deref(), Some("only move"));

        assert!(matches!(
            game.add_comment(&pos("S"), "start"),
            Err(GameError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_resync_is_idempotent() {
        let mut game = Game::from_records(
            "S",
            vec![MoveRecord::new("a", "A").with_variation(vec![MoveRecord::new("b", "B")])],
        );
        game.add_comment(&pos("B"), "note").unwrap();

        let first = game.payload().to_vec();
        game.sync();
        assert_eq!(game.payload(), first.as_slice());
    }

    #[test]
    fn test_labels_and_positions() {
        let game = Game::from_records(
            "S w - - 0 1",
            vec![
                MoveRecord::new("e4", "E4 b - - 0 1")
                    .with_variation(vec![MoveRecord::new("d4", "D4 b - - 0 1")]),
                MoveRecord::new("e5", "E5 w - - 0 2"),
            ],
        );

        let labels: Vec<(String, String)> = game
            .labelled_positions()
            .into_iter()
            .map(|(label, p)| (label, p.board_placement().to_string()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("e4".to_string(), "E4".to_string()),
                ("e4 d4".to_string(), "D4".to_string()),
                ("e5".to_string(), "E5".to_string()),
            ]
        );

        assert_eq!(game.mainline_index(&pos("E5")).unwrap(), Some(1));
        assert_eq!(game.mainline_index(&pos("D4")).unwrap(), None);
        assert_eq!(game.mainline_index(&pos("S")).unwrap(), None);
        assert_eq!(game.game_position(&pos("E5")).unwrap().as_str(), "E5 w - - 0 2");
        assert_eq!(game.game_position(&pos("S")).unwrap().as_str(), "S w - - 0 1");
    }

    const CARO_KANN: &str = r#"[Event "Rated Blitz game"]
[Date "2019.11.01"]
[Round "-"]
[White "AggressiveSpinach"]
[Black "parciful"]
[Result "0-1"]

1. e4 c6 (1... c5 2. Nf3 Nc6 (2... d6 3. d3 (3. d4)) 3. d4 cxd4 4. Nxd4) 2. d4 d5 0-1"#;

    #[test]
    fn test_pgn_promote_inside_analysis_branch() {
        let mut game = Game::from_pgn(CARO_KANN).unwrap();
        let after_d4 = pos("rnbqkbnr/pp2pppp/3p4/2p5/3PP3/5N2/PPP2PPP/RNBQKB1R b KQkq d3 0 3");

        assert_eq!(
            game.promote_variation(&after_d4).unwrap(),
            PromotionOutcome::Promoted
        );
        assert_eq!(
            game.pgn_content(),
            r#"[Event "Rated Blitz game"]
[Date "2019.11.01"]
[Round "-"]
[White "AggressiveSpinach"]
[Black "parciful"]
[Result "0-1"]

1. e4 c6 (1... c5 2. Nf3 Nc6 (2... d6 3. d4 (3. d3)) 3. d4 cxd4 4. Nxd4) 2. d4 d5"#
        );
    }

    #[test]
    fn test_pgn_recorded_mainline_is_protected() {
        let mut game = Game::from_pgn(CARO_KANN).unwrap();
        let after_c5 = pos("rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let before = game.render();

        assert_eq!(
            game.promote_variation(&after_c5).unwrap(),
            PromotionOutcome::Skipped(SkipReason::MainlineProtected)
        );
        assert_eq!(game.render(), before);
    }

    #[test]
    fn test_pgn_promote_then_insert() {
        init_logging();
        let mut game = Game::from_pgn(
            "[Event \"Rated Blitz game\"]\n\n1. e4 c6 (1... c5 2. Nf3 Nc6 (2... d6 3. d4 (3. d3)) 3. d4 cxd4 4. Nxd4) 2. d4 d5 3. e5 Bf5 *",
        )
        .unwrap();

        let after_d3 = pos("rnbqkbnr/pp2pppp/3p4/2p5/4P3/3P1N2/PPP2PPP/RNBQKB1R b KQkq - 0 3");
        game.promote_variation(&after_d3).unwrap();
        assert_eq!(
            game.render(),
            "1. e4 c6 (1... c5 2. Nf3 Nc6 (2... d6 3. d3 (3. d4)) 3. d4 cxd4 4. Nxd4) 2. d4 d5 3. e5 Bf5"
        );

        let mut squares = Extra::new();
        squares.insert("from".to_string(), json!("h7"));
        squares.insert("to".to_string(), json!("h6"));
        let rendered = game
            .insert_new_move(
                &after_d3,
                "rnbqkbnr/pp2ppp1/3p3p/2p5/4P3/3P1N2/PPP2PPP/RNBQKB1R w KQkq - 0 4",
                squares,
                "h6",
            )
            .unwrap();
        assert_eq!(
            rendered,
            "1. e4 c6 (1... c5 2. Nf3 Nc6 (2... d6 3. d3 (3. d4) 3... h6) 3. d4 cxd4 4. Nxd4) 2. d4 d5 3. e5 Bf5"
        );
    }

    #[test]
    fn test_pgn_insert_branch_and_append() {
        let mut game = Game::from_pgn("1. e4 e5 *").unwrap();
        let after_e4 = pos("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
        let after_e5 = pos("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");

        let rendered = game
            .insert_new_move(
                &after_e5,
                "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
                Extra::new(),
                "Nf3",
            )
            .unwrap();
        assert_eq!(rendered, "1. e4 e5 2. Nf3");

        let rendered = game
            .insert_new_move(
                &after_e4,
                "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
                Extra::new(),
                "c5",
            )
            .unwrap();
        assert_eq!(rendered, "1. e4 e5 (1... c5) 2. Nf3");
    }

    #[test]
    fn test_pgn_comment_and_delete() {
        let mut game = Game::from_pgn("1. e4 c6 (1... c5 2. Nf3) 2. d4 *").unwrap();
        let after_e4 = pos("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
        let after_nf3 = pos("rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");

        game.add_comment(&after_e4, "best by test").unwrap();
        assert_eq!(
            game.render(),
            "1. e4 { best by test } 1... c6 (1... c5 2. Nf3) 2. d4"
        );

        let rendered = game.delete_variation(&after_nf3).unwrap();
        assert_eq!(rendered, "1. e4 { best by test } 1... c6 2. d4");
    }

    #[test]
    fn test_pgn_comment_survives_reparse() {
        let mut game = Game::from_pgn("1. e4 c6 (1... c5 2. Nf3) 2. d4 *").unwrap();
        let after_e4 = pos("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");

        game.add_comment(&after_e4, "best by test").unwrap();
        let reparsed = Game::from_pgn(&game.pgn_content()).unwrap();
        assert_eq!(reparsed.payload(), game.payload());
    }

    #[test]
    fn test_add_comment_rejects_closing_brace() {
        let mut game = Game::from_pgn("1. e4 e5 *").unwrap();
        let after_e4 = pos("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
        let before = game.payload().to_vec();

        let err = game.add_comment(&after_e4, "a } 1. d4 { b").unwrap_err();
        assert!(matches!(err, GameError::InvalidComment(_)));
        assert_eq!(game.payload(), before.as_slice());
        assert_eq!(game.render(), "1. e4 e5");
    }

    #[test]
    fn test_payload_json_round_trip() {
        let json = json!({
            "fen": "S w - - 0 1",
            "white": "AggressiveSpinach",
            "black": "parciful",
            "moves": [
                {"m": "e4", "fen": "E w", "from": "e2", "to": "e4",
                 "variations": [[{"m": "d4", "fen": "D w"}]]}
            ]
        })
        .to_string();

        let mut game = Game::from_payload_json(&json).unwrap();
        assert_eq!(game.metadata().black(), Some("parciful"));
        assert_eq!(game.start_position().as_str(), "S w - - 0 1");
        assert_eq!(
            game.promote_variation(&pos("D")).unwrap(),
            PromotionOutcome::Skipped(SkipReason::MainlineProtected)
        );

        let exported: Value = serde_json::from_str(&game.payload_json().unwrap()).unwrap();
        assert_eq!(exported["fen"], json!("S w - - 0 1"));
        assert_eq!(exported["white"], json!("AggressiveSpinach"));
        assert_eq!(exported["moves"][0]["from"], json!("e2"));
        assert_eq!(exported["moves"][0]["variations"][0][0]["m"], json!("d4"));
    }

    #[test]
    fn test_payload_json_defaults_to_initial_position() {
        let game = Game::from_payload_json(r#"{"moves": []}"#).unwrap();
        assert_eq!(game.start_position(), &Position::initial());
        assert!(matches!(
            Game::from_payload_json("not json"),
            Err(GameError::Json(_))
        ));
    }

    #[test]
    fn test_display_label() {
        let game = Game::from_pgn(CARO_KANN).unwrap();
        assert_eq!(
            game.to_string(),
            "AggressiveSpinach-parciful-2019.11.01-Rated Blitz game--"
        );
    }
}
