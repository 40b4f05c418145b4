use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};

use crate::error::PipelineError;

/// Ordered mapping from classifier output index to human-readable label.
///
/// The model emits one score per index, so the table length must match the
/// model's output width exactly. The table ships as a newline-delimited
/// sidecar file next to the model.
#[derive(Clone, Debug)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read label table {}", path.display()))?;

        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if labels.is_empty() {
            return Err(anyhow!("label table {} is empty", path.display()));
        }

        Ok(LabelTable { labels })
    }

    #[allow(dead_code)]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LabelTable {
            labels: names.into_iter().map(Into::into).collect(),
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Ensure a raw score vector lines up with this table one-to-one.
    pub fn check_scores(&self, scores: &[f32]) -> Result<(), PipelineError> {
        if scores.len() != self.labels.len() {
            return Err(PipelineError::LabelCountMismatch {
                labels: self.labels.len(),
                scores: scores.len(),
            });
        }
        Ok(())
    }
}
