use std::path::{Path, PathBuf};

use castty_protocol::{SessionId, SessionMetadata};
use castty_recorder::RecordOptions;
use clap::ArgMatches;
use tracing::{error, info};

fn resolve_shell(matches: &ArgMatches) -> PathBuf {
    if let Some(shell) = matches.get_one::<String>("shell") {
        return PathBuf::from(shell);
    }
    std::env::var("SHELL")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/bin/sh"))
}

fn resolve_output(matches: &ArgMatches) -> PathBuf {
    if let Some(output) = matches.get_one::<String>("output") {
        return PathBuf::from(output);
    }
    let name = chrono::Local::now().format("recording_%Y%m%d_%H%M%S.cast").to_string();
    PathBuf::from(name)
}

fn session_id() -> SessionId {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
    SessionId::new(stamp)
}

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let shell_path = resolve_shell(matches);
    let output_path = resolve_output(matches);
    let monitor_enabled = matches.get_flag("monitor");

    let mut config = castty_config::load_user_config().unwrap_or_else(|e| {
        eprintln!("Warning: could not load ~/.castty/config.toml: {e}. Using defaults.");
        castty_config::MonitorConfig::default()
    });
    config = castty_config::apply_cli_overrides(
        config,
        matches.get_one::<String>("monitor-host").cloned(),
        matches.get_one::<u16>("monitor-port").copied(),
        matches.get_one::<usize>("monitor-buffer-size").copied(),
    );

    if monitor_enabled {
        if let Err(e) = config.validate() {
            eprintln!("❌ Invalid monitor configuration: {e}");
            return Err(e.into());
        }
    }

    let term_name = std::env::var("TERM").unwrap_or_else(|_| "xterm-256color".to_string());
    let shell_name = shell_path.display().to_string();
    let command = shell_name.clone();

    info!(
        event = "cli.record_started",
        shell = shell_name,
        output = %output_path.display(),
        monitor = monitor_enabled
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run_with_runtime(
        &shell_path,
        &output_path,
        shell_name.clone(),
        term_name,
        command,
        monitor_enabled,
        config,
    ));

    match result {
        Ok(()) => {
            println!("✅ Recording saved to {}", output_path.display());
            info!(event = "cli.record_completed", output = %output_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Recording failed: {e}");
            error!(event = "cli.record_failed", error = %e);
            Err(e.into())
        }
    }
}

/// Drives the recording session on the tokio runtime so the monitor's hub and
/// axum servers run on the worker pool while the (synchronous, blocking)
/// recorder loop owns this task until the shell exits.
async fn run_with_runtime(
    shell_path: &Path,
    cast_path: &Path,
    shell_name: String,
    term_name: String,
    command: String,
    monitor_enabled: bool,
    config: castty_config::MonitorConfig,
) -> Result<(), castty_recorder::RecorderError> {
    let hub = if monitor_enabled {
        let terminal_size = castty_core::TerminalController::current_size();
        let metadata = SessionMetadata {
            session_id: session_id(),
            start_wall_time: chrono::Utc::now().timestamp(),
            shell_command: command.clone(),
            recording_path: cast_path.display().to_string(),
        };
        let hub = castty_recorder::hub::spawn(metadata, terminal_size, config.buffer_size);
        castty_recorder::monitor::serve(hub.clone(), &config.host, config.port, config.push_port()).await;
        info!(
            event = "cli.monitor_serving",
            host = config.host,
            page_port = config.port,
            push_port = config.push_port()
        );
        Some(hub)
    } else {
        None
    };

    let opts = RecordOptions {
        shell_path,
        cast_path,
        shell_name,
        term_name,
        command,
        hub,
    };
    castty_recorder::run(opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_output_defaults_to_timestamped_cast_file() {
        let matches = crate::cli::build_cli().get_matches_from(["castty", "record"]);
        let (_, sub) = matches.subcommand().unwrap();
        let path = resolve_output(sub);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("recording_"));
        assert!(name.ends_with(".cast"));
    }

    #[test]
    fn resolve_shell_honors_explicit_flag() {
        let matches = crate::cli::build_cli().get_matches_from(["castty", "record", "--shell", "/bin/zsh"]);
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(resolve_shell(sub), PathBuf::from("/bin/zsh"));
    }
}
