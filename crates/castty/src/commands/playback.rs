use std::path::PathBuf;

use castty_playback::{PlaybackOptions, PlaybackStatus};
use clap::ArgMatches;
use tracing::{error, info, warn};

use super::window_spawn;

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let cast_path = matches
        .get_one::<String>("cast-file")
        .map(PathBuf::from)
        .ok_or("cast file argument is required")?;
    if !cast_path.is_file() {
        let message = format!("cast file not found: {}", cast_path.display());
        eprintln!("❌ {message}");
        return Err(message.into());
    }

    let speed = matches.get_one::<f64>("speed").copied().unwrap_or(1.0);
    let max_delay = matches.get_one::<f64>("max-delay").copied().unwrap_or(5.0);
    let play_in_terminal = matches.get_flag("play-in-terminal");

    if !play_in_terminal {
        info!(event = "cli.playback_started", cast_file = %cast_path.display(), mode = "spawn_window");
        if window_spawn::spawn_playback_window(&cast_path, speed, max_delay) {
            return Ok(());
        }
        warn!(event = "cli.playback_window_spawn_failed");
        println!("No terminal emulator found; playing inline.");
    } else {
        info!(event = "cli.playback_started", cast_file = %cast_path.display(), mode = "inline");
    }

    let recording = match castty_playback::load(&cast_path) {
        Ok(recording) => recording,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {e}", cast_path.display());
            error!(event = "cli.playback_load_failed", error = %e);
            return Err(e.into());
        }
    };

    match castty_playback::run(&recording, PlaybackOptions { speed, max_delay }) {
        Ok(PlaybackStatus::Completed) => {
            println!("✅ Playback finished: {}", cast_path.display());
            info!(event = "cli.playback_completed");
            Ok(())
        }
        Ok(PlaybackStatus::Interrupted) => {
            println!("Playback interrupted.");
            info!(event = "cli.playback_interrupted");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Playback failed: {e}");
            error!(event = "cli.playback_failed", error = %e);
            Err(e.into())
        }
    }
}
