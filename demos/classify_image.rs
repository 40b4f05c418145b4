#[allow(dead_code)]
#[path = "../src/error.rs"]
mod error;
#[path = "../src/labels.rs"]
mod labels;
#[allow(dead_code)]
#[path = "../src/model_download.rs"]
mod model_download;
#[allow(dead_code)]
#[path = "../src/pipeline/mod.rs"]
mod pipeline;
#[allow(dead_code)]
#[path = "../src/types.rs"]
mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use labels::LabelTable;
use pipeline::{OrtClassifier, ScavengerModel};
use types::Frame;

fn main() -> Result<()> {
    env_logger::init();

    let mut image_paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if image_paths.is_empty() {
        image_paths = demo_images()?;
    }

    if image_paths.is_empty() {
        anyhow::bail!("no test images found; pass paths or drop files into demo/");
    }

    let model_path = model_download::default_model_path();
    let label_table_path = model_download::default_label_table_path();
    model_download::ensure_model_ready(&model_path, &label_table_path)?;

    let mut model = OrtClassifier::new(&model_path)?;
    let labels = LabelTable::from_file(&label_table_path)?;

    println!(
        "classifying {} images with {}",
        image_paths.len(),
        model_path.display()
    );

    for path in image_paths {
        let frame = load_frame(&path)?;
        let input = pipeline::crop_and_normalize(&frame, pipeline::VIDEO_PIXELS)
            .with_context(|| format!("failed to preprocess {}", path.display()))?;
        let scores = model
            .predict(input)
            .with_context(|| format!("failed to classify {}", path.display()))?;
        labels.check_scores(&scores)?;

        println!("{}:", path.display());
        for prediction in pipeline::top_k(&scores, &labels, pipeline::TOP_K) {
            println!("  {:.5}: {}", prediction.score, prediction.label);
        }
    }

    Ok(())
}

fn load_frame(path: &PathBuf) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let rgba = image.into_raw();

    Ok(Frame {
        rgba,
        width,
        height,
        timestamp: std::time::Instant::now(),
    })
}

fn demo_images() -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir("demo").context("failed to read demo directory")? {
        let entry = entry?;
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if ["png", "jpg", "jpeg"]
                .iter()
                .any(|v| ext.eq_ignore_ascii_case(v))
            {
                images.push(path);
            }
        }
    }
    images.sort();
    Ok(images)
}
