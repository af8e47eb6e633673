use crate::codec::PgnCodecOptions;
use crate::comment::split_commands;
use crate::error::{ErrorAccumulator, GameError};
use crate::position::Position;
use crate::record::MoveRecord;
use crate::types::Metadata;

use pgn_reader::{Outcome, RawComment, RawTag, SanPlus, Skip, Visitor};
use serde_json::Value;
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};
use std::ops::ControlFlow;

/// Streaming PGN visitor (pgn-reader) that builds the nested move records.
///
/// Every SAN is played on a `shakmaty` board so each record carries the FEN
/// it produces. A variation is an alternative to the move just played: it is
/// replayed from the position before that move and stored in that move's
/// `variations`.
pub struct TreeVisitor {
    options: PgnCodecOptions,
}

/// Decoded content of one game, before header lines are attached.
#[derive(Debug)]
pub struct DecodedGame {
    pub metadata: Metadata,
    pub start_position: Position,
    pub moves: Vec<MoveRecord>,
    pub parse_error: Option<String>,
}

pub struct MovetextState {
    metadata: Metadata,
    start_position: Position,
    castling_mode: CastlingMode,
    lines: Vec<Line>,
    outcome: Option<String>,
    diagnostics: ErrorAccumulator,
    /// Chunks of a comment too long for the reader's buffer.
    pending_comment: Vec<u8>,
}

struct Line {
    moves: Vec<MoveRecord>,
    board: Chess,
    before_last: Option<Chess>,
    broken: bool,
}

impl Line {
    fn new(board: Chess) -> Self {
        Self {
            moves: Vec::new(),
            board,
            before_last: None,
            broken: false,
        }
    }

    fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new(Chess::default())
        }
    }

    fn attach(&mut self, variation: Vec<MoveRecord>) {
        if variation.is_empty() {
            return;
        }
        if let Some(anchor) = self.moves.last_mut() {
            anchor.variations.push(variation);
        }
    }
}

impl TreeVisitor {
    pub fn new(options: PgnCodecOptions) -> Self {
        Self { options }
    }

    fn castling_mode(tags: &Metadata) -> CastlingMode {
        match tags.get("Variant") {
            Some(variant) if variant.eq_ignore_ascii_case("chess960") => CastlingMode::Chess960,
            _ => CastlingMode::Standard,
        }
    }

    fn start_board(tags: &Metadata, mode: CastlingMode) -> Result<Chess, GameError> {
        let Some(fen) = tags.get("FEN") else {
            return Ok(Chess::default());
        };

        let fen = Fen::from_ascii(fen.trim().as_bytes())
            .map_err(|e| GameError::Codec(format!("invalid FEN tag '{fen}': {e}")))?;
        fen.into_position(mode)
            .map_err(|e| GameError::Codec(format!("illegal FEN tag position: {e}")))
    }

    fn fen_of(board: &Chess) -> Position {
        Position::new(Fen::from_position(board, EnPassantMode::Legal).to_string())
    }

    fn set_comment(&self, record: &mut MoveRecord, raw: &str) {
        let text = if self.options.comment_commands {
            let parts = split_commands(raw);
            if let Some(clk) = parts.clk {
                record.extra.insert("clk".to_string(), Value::from(clk));
            }
            if let Some(eval) = parts.eval {
                record.extra.insert("eval".to_string(), Value::from(eval));
            }
            parts.text
        } else {
            Some(raw.trim().to_string()).filter(|t| !t.is_empty())
        };

        if let Some(text) = text {
            record.comment = Some(match record.comment.take() {
                Some(existing) => format!("{existing} {text}"),
                None => text,
            });
        }
    }
}

impl Visitor for TreeVisitor {
    type Tags = Metadata;
    type Movetext = MovetextState;
    type Output = Result<DecodedGame, GameError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Metadata::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.insert(
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let castling_mode = Self::castling_mode(&tags);
        let board = match Self::start_board(&tags, castling_mode) {
            Ok(board) => board,
            Err(e) => return ControlFlow::Break(Err(e)),
        };

        ControlFlow::Continue(MovetextState {
            metadata: tags,
            start_position: Self::fen_of(&board),
            castling_mode,
            lines: vec![Line::new(board)],
            outcome: None,
            diagnostics: ErrorAccumulator::default(),
            pending_comment: Vec::new(),
        })
    }

    fn begin_variation(
        &mut self,
        movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        let start = movetext
            .lines
            .last()
            .filter(|parent| !parent.broken)
            .and_then(|parent| parent.before_last.clone());

        let line = match start {
            Some(board) => Line::new(board),
            None => {
                if movetext.lines.last().is_some_and(|parent| !parent.broken) {
                    log::warn!("variation without a preceding move; skipping it");
                    movetext.diagnostics.push("variation without a preceding move");
                }
                Line::broken()
            }
        };
        movetext.lines.push(line);
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, movetext: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        if movetext.lines.len() > 1
            && let Some(line) = movetext.lines.pop()
            && let Some(parent) = movetext.lines.last_mut()
        {
            parent.attach(line.moves);
        }
        ControlFlow::Continue(())
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        let mode = movetext.castling_mode;
        let Some(line) = movetext.lines.last_mut() else {
            return ControlFlow::Continue(());
        };
        if line.broken {
            return ControlFlow::Continue(());
        }

        match san.san.to_move(&line.board) {
            Ok(m) => {
                let mut record = MoveRecord::new(san.to_string(), Position::default());
                if let UciMove::Normal { from, to, .. } = m.to_uci(mode) {
                    record
                        .extra
                        .insert("from".to_string(), Value::from(from.to_string()));
                    record
                        .extra
                        .insert("to".to_string(), Value::from(to.to_string()));
                }

                let before = line.board.clone();
                line.board.play_unchecked(m);
                record.position = Self::fen_of(&line.board);
                line.before_last = Some(before);
                line.moves.push(record);
            }
            Err(e) => {
                let msg = format!("illegal move {san}: {e}");
                log::warn!("{msg}; skipping the rest of the line");
                movetext.diagnostics.push(&msg);
                line.broken = true;
            }
        }

        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        movetext.pending_comment.extend_from_slice(comment.as_bytes());
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let mut bytes = std::mem::take(&mut movetext.pending_comment);
        bytes.extend_from_slice(comment.as_bytes());
        let raw = String::from_utf8_lossy(&bytes);

        match movetext.lines.last_mut() {
            Some(line) if !line.broken => match line.moves.last_mut() {
                Some(record) => self.set_comment(record, &raw),
                None => log::debug!("dropping comment before the first move of a line"),
            },
            _ => {}
        }

        ControlFlow::Continue(())
    }

    fn outcome(
        &mut self,
        movetext: &mut Self::Movetext,
        outcome: Outcome,
    ) -> ControlFlow<Self::Output> {
        movetext.outcome = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, mut movetext: Self::Movetext) -> Self::Output {
        while movetext.lines.len() > 1 {
            movetext.diagnostics.push("unterminated variation");
            if let Some(line) = movetext.lines.pop()
                && let Some(parent) = movetext.lines.last_mut()
            {
                parent.attach(line.moves);
            }
        }

        if let Some(outcome) = movetext.outcome.take() {
            movetext.metadata.insert("Result", outcome);
        }

        Ok(DecodedGame {
            metadata: movetext.metadata,
            start_position: movetext.start_position,
            moves: movetext
                .lines
                .pop()
                .map(|line| line.moves)
                .unwrap_or_default(),
            parse_error: movetext.diagnostics.take(),
        })
    }
}
