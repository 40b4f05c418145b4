use thiserror::Error;

/// Failure modes of a single pipeline pass.
///
/// `FrameUnavailable` is recoverable (skip the pass, try again next tick).
/// The others abort the round: a frame that cannot be cropped will stay too
/// small, and a broken classifier fails identically on retry.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no camera frame available this tick")]
    FrameUnavailable,

    #[error("frame {width}x{height} is smaller than the required {required}x{required} crop")]
    FrameTooSmall {
        width: u32,
        height: u32,
        required: u32,
    },

    #[error("frame buffer size mismatch: got {got}, expected {expected}")]
    FrameBufferMismatch { got: usize, expected: usize },

    #[error("classifier failed: {0:#}")]
    Classifier(anyhow::Error),

    #[error("label table has {labels} entries but the model emits {scores} scores")]
    LabelCountMismatch { labels: usize, scores: usize },
}

impl PipelineError {
    /// Whether the game loop may simply skip this pass and keep running.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::FrameUnavailable)
    }
}
