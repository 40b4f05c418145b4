use std::time::Instant;

/// One RGBA camera frame. Consumed by a single pipeline pass and dropped.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    #[allow(dead_code)]
    pub timestamp: Instant,
}

/// A single (label, score) pair from the classifier output, as produced by
/// top-K extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

/// The object the player is currently hunting. Set at round start and
/// read-only for the rest of the round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetEmoji {
    pub name: String,
    pub glyph: String,
    #[allow(dead_code)]
    pub asset_path: String,
}

impl TargetEmoji {
    pub fn new(name: &str, glyph: &str) -> Self {
        TargetEmoji {
            name: name.to_string(),
            glyph: glyph.to_string(),
            asset_path: format!("img/emojis/game/{name}.svg"),
        }
    }
}

/// Feedback emitted by the game core. The UI/speech layer consumes these;
/// the core never calls into it directly.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// First top guess of the round, spoken exactly once.
    InitialGuess { label: String },
    /// The target showed up in the top-2 guesses.
    MatchFound { target: TargetEmoji, attempts: u32 },
    /// Attempt ceiling reached without a match.
    RoundExhausted { attempts: u32 },
    /// Full top-K list for this frame. Only emitted in debug mode.
    TopPredictions(Vec<Prediction>),
}
