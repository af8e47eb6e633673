//! Conversion between notation text and nested move records.

use crate::error::{GameError, Result};
use crate::position::Position;
use crate::record::MoveRecord;
use crate::render::render_movetext;
use crate::types::Metadata;
use crate::visitor::TreeVisitor;

use pgn_reader::Reader;
use regex::Regex;
use std::sync::LazyLock;

static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[\w+ ".+?"\]"#).expect("header pattern is valid"));

/// Everything a [`Game`](crate::Game) needs from the input text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedGame {
    /// Tag pair lines exactly as they appeared, in input order.
    pub header_lines: Vec<String>,
    pub metadata: Metadata,
    pub start_position: Position,
    pub moves: Vec<MoveRecord>,
    /// Non-fatal problems met while decoding, joined with `"; "`.
    pub parse_error: Option<String>,
}

pub trait NotationCodec {
    fn parse(&self, text: &str) -> Result<ParsedGame>;

    /// Movetext for `moves`, without header lines.
    fn render(&self, moves: &[MoveRecord]) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgnCodecOptions {
    /// Move `[%clk ...]` / `[%eval ...]` comment commands into the `clk` and
    /// `eval` extra fields, and back again when rendering.
    pub comment_commands: bool,
}

impl Default for PgnCodecOptions {
    fn default() -> Self {
        Self {
            comment_commands: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PgnCodec {
    options: PgnCodecOptions,
}

impl PgnCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PgnCodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PgnCodecOptions {
        &self.options
    }
}

impl NotationCodec for PgnCodec {
    fn parse(&self, text: &str) -> Result<ParsedGame> {
        let mut reader = Reader::new(text.as_bytes());
        let mut visitor = TreeVisitor::new(self.options);

        let decoded = reader
            .read_game(&mut visitor)?
            .ok_or_else(|| GameError::Codec("no game found in input".to_string()))??;

        if let Some(diagnostics) = &decoded.parse_error {
            log::warn!("game decoded with errors: {diagnostics}");
        }

        Ok(ParsedGame {
            header_lines: header_lines(text),
            metadata: decoded.metadata,
            start_position: decoded.start_position,
            moves: decoded.moves,
            parse_error: decoded.parse_error,
        })
    }

    fn render(&self, moves: &[MoveRecord]) -> String {
        render_movetext(moves, &self.options)
    }
}

/// Tag pair lines of the leading header section, verbatim.
pub fn header_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty())
        .take_while(|line| line.starts_with('[') || line.is_empty())
        .flat_map(|line| HEADER_LINE.find_iter(line))
        .map(|m| m.as_str().to_string())
        .collect()
}
