mod error;
mod game;
mod labels;
mod model_download;
mod pipeline;
mod session;
mod types;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    run()
}

#[cfg(feature = "camera-nokhwa")]
fn run() -> Result<()> {
    use anyhow::Context;
    use crossbeam_channel::{bounded, unbounded};
    use std::thread;

    use crate::{
        game::RoundPhase,
        labels::LabelTable,
        pipeline::OrtClassifier,
        session::GameSession,
        types::{GameEvent, TargetEmoji},
    };

    let mut target_name = "tv".to_string();
    let mut debug_mode = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--debug" => debug_mode = true,
            name => target_name = name.to_string(),
        }
    }
    let target = TargetEmoji::new(&target_name, glyph_for(&target_name));

    let model_path = model_download::default_model_path();
    let label_table_path = model_download::default_label_table_path();
    model_download::ensure_model_ready(&model_path, &label_table_path)?;

    let model = OrtClassifier::new(&model_path)?;
    let labels = LabelTable::from_file(&label_table_path)?;

    let cameras = pipeline::available_cameras()?;
    let device = cameras.first().context("no camera available")?;
    log::info!("capturing from {}", device.label);

    let (frame_tx, frame_rx) = bounded(1);
    let _stream = pipeline::start_camera_stream(device.index.clone(), frame_tx)?;

    let (events_tx, events_rx) = unbounded();
    let mut session = GameSession::new(model, labels, events_tx).with_debug(debug_mode);
    session.start_round(target.clone());

    println!("Find {} {} before your guesses run out!", target.glyph, target.name);

    // Stand-in for the UI/speech layer: narrate the emitted events.
    let narrator = thread::spawn(move || {
        for event in events_rx {
            match event {
                GameEvent::InitialGuess { label } => {
                    println!("I see something that looks like a {label}...");
                }
                GameEvent::MatchFound { target, attempts } => {
                    println!(
                        "You found {} {} in {attempts} guesses!",
                        target.glyph, target.name
                    );
                }
                GameEvent::RoundExhausted { attempts } => {
                    println!("Out of guesses after {attempts} tries. Better luck next time!");
                }
                GameEvent::TopPredictions(top) => {
                    for p in &top {
                        println!("  {:.5}: {}", p.score, p.label);
                    }
                }
            }
        }
    });

    let outcome = session.run(frame_rx)?;
    if outcome == RoundPhase::Searching {
        log::info!("round stopped before an outcome was reached");
    }

    let _ = narrator.join();
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn run() -> Result<()> {
    anyhow::bail!("built without camera support; rebuild with --features camera-nokhwa")
}

#[cfg(feature = "camera-nokhwa")]
fn glyph_for(name: &str) -> &'static str {
    match name {
        "tv" => "📺",
        "cat" => "🐱",
        "dog" => "🐶",
        "shoe" => "👟",
        "banana" => "🍌",
        "cup" => "☕",
        "book" => "📖",
        "hand" => "✋",
        _ => "❓",
    }
}
