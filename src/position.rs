use serde::{Deserialize, Serialize};
use std::fmt;

/// Side to move, as read from the second field of a position descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

/// A board/position descriptor (normally a FEN string), kept verbatim.
///
/// Lookups only ever compare the piece placement field, so two descriptors
/// that differ in side to move, castling rights, en passant square or clocks
/// still describe the "same board".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    /// Standard chess starting position.
    pub fn initial() -> Self {
        Self::new("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
    }

    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn board_placement(&self) -> &str {
        self.field(0).unwrap_or("")
    }

    /// Anything other than `w` in the second field counts as Black.
    pub fn side_to_move(&self) -> Side {
        match self.field(1) {
            Some("w") => Side::White,
            _ => Side::Black,
        }
    }

    /// Full move counter (sixth field), if the descriptor carries one.
    pub fn fullmove_number(&self) -> Option<u32> {
        self.field(5)?.parse().ok()
    }

    pub fn same_board(&self, other: &Position) -> bool {
        self.board_placement() == other.board_placement()
    }

    fn field(&self, index: usize) -> Option<&str> {
        self.0.split_whitespace().nth(index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Position {
    fn from(descriptor: &str) -> Self {
        Self::new(descriptor)
    }
}

impl From<String> for Position {
    fn from(descriptor: String) -> Self {
        Self(descriptor)
    }
}
