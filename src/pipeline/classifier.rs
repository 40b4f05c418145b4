use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

/// Input port the scavenger model expects the frame tensor on.
const INPUT_NODE_NAME: &str = "input";
/// Output port carrying the per-label score vector.
const OUTPUT_NODE_NAME: &str = "final_result";

/// Seam between the game loop and the trained model.
///
/// The call is synchronous from the caller's point of view; the loop never
/// has more than one prediction in flight.
pub trait ScavengerModel: Send + 'static {
    /// Map a (1, S, S, 3) preprocessed tensor to one score per known label.
    fn predict(&mut self, input: Array4<f32>) -> Result<Vec<f32>>;
}

/// Production classifier backed by an ONNX Runtime session.
pub struct OrtClassifier {
    session: Session,
}

impl OrtClassifier {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load ORT session from {}", model_path.display())
            })?;

        Ok(Self { session })
    }
}

impl ScavengerModel for OrtClassifier {
    fn predict(&mut self, input: Array4<f32>) -> Result<Vec<f32>> {
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![INPUT_NODE_NAME => tensor])
            .context("failed to run scavenger model")?;

        let scores = outputs
            .get(OUTPUT_NODE_NAME)
            .ok_or_else(|| anyhow!("model has no output named {OUTPUT_NODE_NAME:?}"))?
            .try_extract_array::<f32>()
            .context("failed to extract score vector")?;

        Ok(scores.iter().copied().collect())
    }
}
