mod codec;
mod comment;
mod config;
mod error;
mod game;
mod locator;
mod position;
mod reader;
mod record;
mod render;
mod tree;
mod types;
mod visitor;

pub use codec::{NotationCodec, ParsedGame, PgnCodec, PgnCodecOptions, header_lines};
pub use config::{GameConfig, PromotionGuard};
pub use error::{ErrorAccumulator, GameError, Result};
pub use game::{Game, PromotionOutcome, SkipReason};
pub use locator::PositionLocator;
pub use position::{Position, Side};
pub use reader::{
    CompressionMode, expand_paths, open_pgn_file, open_pgn_file_with, open_pgn_files,
};
pub use record::MoveRecord;
pub use tree::{
    Extra, ListId, MoveList, MoveNode, MoveTree, NodeId, Variation, VariationGroup, VariationId,
};
pub use types::Metadata;
