use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{info, warn};

/// Attempts to open a new terminal window re-invoking this same binary with
/// `--play-in-terminal`, trying platform-appropriate emulators in turn.
/// Returns `true` once a window launches; the caller falls back to inline
/// playback when every candidate is absent.
pub fn spawn_playback_window(cast_path: &Path, speed: f64, max_delay: f64) -> bool {
    let exe = match std::env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            warn!(event = "cli.window_spawn.exe_path_failed", error = %e);
            return false;
        }
    };

    for candidate in candidates(&exe, cast_path, speed, max_delay) {
        let Some((program, args)) = candidate.split_first() else {
            continue;
        };
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!(event = "cli.window_spawn.launched", terminal = program, pid = child.id());
                return true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(event = "cli.window_spawn.failed", terminal = program, error = %e);
                continue;
            }
        }
    }
    false
}

fn candidates(exe: &Path, cast_path: &Path, speed: f64, max_delay: f64) -> Vec<Vec<String>> {
    let exe_str = exe.display().to_string();
    let cast_str = cast_path.display().to_string();

    if cfg!(target_os = "macos") {
        let inner = format!(
            "{exe_str} playback --play-in-terminal {cast_str} --speed {speed} --max-delay {max_delay}"
        );
        let applescript =
            format!("tell application \"Terminal\"\nactivate\ndo script \"{}\"\nend tell", inner.replace('"', "\\\""));
        return vec![
            vec!["osascript".into(), "-e".into(), applescript],
            vec!["open".into(), "-a".into(), "Terminal".into(), exe_str],
        ];
    }

    let inner_args = vec![
        "playback".to_string(),
        "--play-in-terminal".to_string(),
        cast_str,
        "--speed".to_string(),
        speed.to_string(),
        "--max-delay".to_string(),
        max_delay.to_string(),
    ];

    let with_exe = |mut prefix: Vec<String>| {
        prefix.push(exe_str.clone());
        prefix.extend(inner_args.clone());
        prefix
    };

    vec![
        with_exe(vec!["gnome-terminal".into(), "--".into()]),
        with_exe(vec!["konsole".into(), "-e".into()]),
        with_exe(vec!["xterm".into(), "-e".into()]),
        with_exe(vec!["x-terminal-emulator".into(), "-e".into()]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_candidates_cover_the_common_emulators() {
        let candidates = candidates(Path::new("/usr/bin/castty"), Path::new("/tmp/a.cast"), 1.0, 5.0);
        if !cfg!(target_os = "macos") {
            let programs: Vec<&str> = candidates.iter().map(|c| c[0].as_str()).collect();
            assert!(programs.contains(&"gnome-terminal"));
            assert!(programs.contains(&"xterm"));
        }
    }
}
