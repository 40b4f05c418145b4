use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    ScavengerModel,
    LabelTable,
}

impl ArtifactKind {
    fn label(&self) -> &'static str {
        match self {
            ArtifactKind::ScavengerModel => "scavenger model",
            ArtifactKind::LabelTable => "label table",
        }
    }
}

const SCAVENGER_MODEL_FILENAME: &str = "scavenger_mobilenet.onnx";
const SCAVENGER_MODEL_URL: &str = "https://raw.githubusercontent.com/emoji-scavenger/emoji-scavenger-rs/main/models/scavenger_mobilenet.onnx";
const LABEL_TABLE_FILENAME: &str = "scavenger_labels.txt";
const LABEL_TABLE_URL: &str = "https://raw.githubusercontent.com/emoji-scavenger/emoji-scavenger-rs/main/models/scavenger_labels.txt";

pub fn default_model_path() -> PathBuf {
    PathBuf::from("models").join(SCAVENGER_MODEL_FILENAME)
}

pub fn default_label_table_path() -> PathBuf {
    PathBuf::from("models").join(LABEL_TABLE_FILENAME)
}

#[derive(Clone, Debug)]
pub enum DownloadEvent {
    AlreadyPresent {
        artifact: ArtifactKind,
    },
    Started {
        artifact: ArtifactKind,
        total: Option<u64>,
    },
    Progress {
        artifact: ArtifactKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        artifact: ArtifactKind,
    },
}

/// Make sure both the model and its label table exist on disk, downloading
/// whichever is missing. Shows a progress bar on the terminal.
pub fn ensure_model_ready(model_path: &Path, label_table_path: &Path) -> anyhow::Result<()> {
    ensure_artifact_ready(ArtifactKind::ScavengerModel, SCAVENGER_MODEL_URL, model_path)?;
    ensure_artifact_ready(ArtifactKind::LabelTable, LABEL_TABLE_URL, label_table_path)
}

fn ensure_artifact_ready(artifact: ArtifactKind, url: &str, dest: &Path) -> anyhow::Result<()> {
    let mut progress: Option<ProgressBar> = None;
    let mut on_event = |event: DownloadEvent| match &event {
        DownloadEvent::AlreadyPresent { artifact } => {
            log::info!("{} already present at {}", artifact.label(), dest.display());
        }
        DownloadEvent::Started { total, .. } => {
            progress = Some(create_progress_bar(*total));
        }
        DownloadEvent::Progress { downloaded, .. } => {
            if let Some(pb) = progress.as_ref() {
                pb.set_position(*downloaded);
            }
        }
        DownloadEvent::Finished { artifact } => {
            if let Some(pb) = progress.take() {
                pb.finish_with_message(format!("{} ready", artifact.label()));
            }
        }
    };

    if dest.exists() {
        on_event(DownloadEvent::AlreadyPresent { artifact });
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    download_to_path(artifact, url, dest, &mut on_event)
}

fn download_to_path<F>(
    artifact: ArtifactKind,
    url: &str,
    dest: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(DownloadEvent),
{
    log::info!(
        "downloading {} from {url} to {}",
        artifact.label(),
        dest.display()
    );

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to start {} download", artifact.label()))?
        .error_for_status()
        .with_context(|| format!("{} download returned error status", artifact.label()))?;

    let total_size = response.content_length();
    on_event(DownloadEvent::Started {
        artifact,
        total: total_size,
    });

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading download bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing download to disk")?;
        downloaded += bytes_read as u64;
        on_event(DownloadEvent::Progress {
            artifact,
            downloaded,
            total: total_size,
        });
    }

    file.sync_all()
        .context("failed to flush download to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp file {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(DownloadEvent::Finished { artifact });
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap()
            .progress_chars("=>-");
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style =
                ProgressStyle::with_template("{spinner:.green} downloading model").unwrap();
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}
