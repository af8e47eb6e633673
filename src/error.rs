use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// No move anywhere under the searched scope produces the given board.
    #[error("position not found: {0}")]
    PositionNotFound(String),

    /// The move at the given position is the last one of its line.
    #[error("last move in variation or last move in the game: {0}")]
    EndOfLine(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Comment text that cannot be written back inside `{ }`.
    #[error("invalid comment: {0}")]
    InvalidComment(String),

    #[error("invalid path pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T, E = GameError> = std::result::Result<T, E>;

/// Non-fatal diagnostics met while one game is decoded, reported together
/// once the game is done.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator {
    messages: Vec<String>,
}

impl ErrorAccumulator {
    pub fn push(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// All messages joined with `"; "`, or `None` when nothing went wrong.
    pub fn take(&mut self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.messages).join("; "))
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
