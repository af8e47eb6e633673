use crate::types::Metadata;

/// When a variation may be promoted over a line that sits directly on the
/// mainline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromotionGuard {
    /// A game with a recorded Black player is a finished game; its mainline
    /// is the authoritative record and may not be replaced.
    #[default]
    BlackPlayerPresent,
    /// Analysis board: every promotion is allowed.
    AnalysisMode,
    /// The mainline is never replaced, whatever the metadata says.
    ProtectMainline,
}

impl PromotionGuard {
    /// Whether promoting over an anchor on the mainline is refused.
    pub fn protects_mainline(self, metadata: &Metadata) -> bool {
        match self {
            Self::BlackPlayerPresent => metadata.has_black_player(),
            Self::AnalysisMode => false,
            Self::ProtectMainline => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameConfig {
    pub promotion_guard: PromotionGuard,
}

impl GameConfig {
    pub fn analysis() -> Self {
        Self {
            promotion_guard: PromotionGuard::AnalysisMode,
        }
    }
}
