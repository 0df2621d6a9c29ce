use std::io::Write;
use std::os::fd::BorrowedFd;

use castty_core::TerminalController;
use castty_protocol::{Event, EventKind};
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{info, warn};

use crate::cast_reader::CastRecording;
use crate::errors::PlaybackError;

/// Slices longer waits into chunks this small so a control byte is never
/// more than one slice away from being observed.
const SLEEP_SLICE_MS: u16 = 100;

const CTRL_C: u8 = 0x03;
const SPACE: u8 = 0x20;
const TAB: u8 = 0x09;

#[derive(Debug, Clone, Copy)]
pub struct PlaybackOptions {
    pub speed: f64,
    pub max_delay: f64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            max_delay: 5.0,
        }
    }
}

/// How a playback run ended. Interruption is a normal, non-error outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Completed,
    Interrupted,
}

enum ControlSignal {
    None,
    Abort,
    TogglePause,
    EnterSkip,
}

/// Replays `recording` to the controlling terminal under raw mode, honoring
/// the pause/skip/abort controls read from stdin. Acquires and releases the
/// terminal controller itself so callers never have to juggle raw-mode state.
pub fn run(recording: &CastRecording, opts: PlaybackOptions) -> Result<PlaybackStatus, PlaybackError> {
    if opts.speed <= 0.0 {
        return Err(PlaybackError::InvalidOptions {
            message: "speed must be > 0".to_string(),
        });
    }
    if opts.max_delay <= 0.0 {
        return Err(PlaybackError::InvalidOptions {
            message: "max_delay must be > 0".to_string(),
        });
    }

    let terminal = TerminalController::enable_raw_mode()?;
    let status = drive(recording, opts);
    drop(terminal);
    status
}

fn drive(recording: &CastRecording, opts: PlaybackOptions) -> Result<PlaybackStatus, PlaybackError> {
    set_title("castty playback");

    let mut paused = false;
    let mut skipping = false;
    let mut last_t = 0.0f64;

    for event in &recording.events {
        let mut delay = (event.t - last_t) / opts.speed;
        if delay.is_sign_negative() || delay.is_nan() {
            delay = 0.0;
        }
        delay = delay.min(opts.max_delay);
        last_t = event.t;

        if !skipping {
            match wait_with_controls(delay, &mut paused) {
                ControlSignal::Abort => {
                    set_title("castty playback: interrupted");
                    return Ok(PlaybackStatus::Interrupted);
                }
                ControlSignal::EnterSkip => {
                    skipping = true;
                    paused = false;
                    set_title("castty playback: skipping");
                }
                ControlSignal::TogglePause | ControlSignal::None => {}
            }
        } else if let ControlSignal::Abort = poll_controls_nonblocking(&mut paused, &mut skipping) {
            set_title("castty playback: interrupted");
            return Ok(PlaybackStatus::Interrupted);
        }

        if skipping && is_skip_target(event) {
            skipping = false;
            paused = true;
            set_title("castty playback: paused");
        }

        display_event(event)?;
    }

    set_title("castty playback: done");
    Ok(PlaybackStatus::Completed)
}

fn is_skip_target(event: &Event) -> bool {
    match event.kind {
        EventKind::Input => true,
        EventKind::Marker => event.payload.starts_with("activity_resumed_after_"),
        _ => false,
    }
}

fn display_event(event: &Event) -> Result<(), PlaybackError> {
    match event.kind {
        EventKind::Output => write_all(1, event.payload.as_bytes())?,
        EventKind::Error => write_all(2, event.payload.as_bytes())?,
        EventKind::Resize => {
            if let Some((rows, cols)) = Event::parse_resize_payload(&event.payload) {
                let escape = format!("\x1b[8;{};{}t", rows, cols);
                write_all(1, escape.as_bytes())?;
            } else {
                warn!(event = "playback.malformed_resize_skipped", payload = %event.payload);
            }
        }
        EventKind::Input | EventKind::Marker => {}
    }
    Ok(())
}

/// Sleeps `seconds`, broken into slices so controls stay responsive; returns
/// as soon as a control byte changes the playback state.
fn wait_with_controls(seconds: f64, paused: &mut bool) -> ControlSignal {
    let mut remaining_ms = (seconds * 1000.0).round().max(0.0) as u64;

    loop {
        if *paused {
            match read_control_byte(SLEEP_SLICE_MS) {
                Some(CTRL_C) => return ControlSignal::Abort,
                Some(SPACE) => {
                    *paused = false;
                    return ControlSignal::TogglePause;
                }
                Some(TAB) => return ControlSignal::EnterSkip,
                _ => continue,
            }
        }

        let slice = remaining_ms.min(SLEEP_SLICE_MS as u64);
        match read_control_byte(slice as u16) {
            Some(CTRL_C) => return ControlSignal::Abort,
            Some(SPACE) => {
                *paused = true;
            }
            Some(TAB) => return ControlSignal::EnterSkip,
            _ => {}
        }

        if remaining_ms <= SLEEP_SLICE_MS as u64 {
            return ControlSignal::None;
        }
        remaining_ms -= SLEEP_SLICE_MS as u64;
    }
}

/// During skip mode there's no delay budget to slice, but stdin still needs a
/// zero-cost peek each event so abort/pause remain responsive.
fn poll_controls_nonblocking(paused: &mut bool, skipping: &mut bool) -> ControlSignal {
    match read_control_byte(0) {
        Some(CTRL_C) => ControlSignal::Abort,
        Some(SPACE) => {
            *paused = true;
            *skipping = false;
            ControlSignal::TogglePause
        }
        _ => ControlSignal::None,
    }
}

fn read_control_byte(timeout_ms: u16) -> Option<u8> {
    let stdin_fd = unsafe { BorrowedFd::borrow_raw(0) };
    let mut fds = [PollFd::new(stdin_fd, PollFlags::POLLIN)];
    let timeout = PollTimeout::from(timeout_ms);
    match poll(&mut fds, timeout) {
        Ok(n) if n > 0 => {
            let mut byte = [0u8; 1];
            let n = unsafe { libc::read(0, byte.as_mut_ptr().cast(), 1) };
            if n == 1 {
                Some(byte[0])
            } else {
                None
            }
        }
        _ => None,
    }
}

fn write_all(fd: i32, mut data: &[u8]) -> Result<(), PlaybackError> {
    while !data.is_empty() {
        let n = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
        if n < 0 {
            let errno = nix::errno::Errno::last();
            if errno == nix::errno::Errno::EINTR || errno == nix::errno::Errno::EAGAIN {
                continue;
            }
            return Err(PlaybackError::Io(std::io::Error::from(errno)));
        }
        data = &data[n as usize..];
    }
    Ok(())
}

/// Status is surfaced via OSC title-set sequences on stderr so the primary
/// output stream (what's actually being played back) stays undisturbed.
fn set_title(text: &str) {
    let sequence = format!("\x1b]0;{text}\x07\x1b]2;{text}\x07");
    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(sequence.as_bytes());
    let _ = stderr.flush();
    info!(event = "playback.status_changed", status = %text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use castty_protocol::CastHeader;

    fn recording_with(events: Vec<Event>) -> CastRecording {
        CastRecording {
            header: CastHeader::new(80, 24, 0, "/bin/sh", "/bin/sh", "xterm"),
            events,
        }
    }

    #[test]
    fn rejects_non_positive_speed() {
        let recording = recording_with(vec![]);
        let err = run(&recording, PlaybackOptions { speed: 0.0, max_delay: 5.0 }).unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn rejects_non_positive_max_delay() {
        let recording = recording_with(vec![]);
        let err = run(
            &recording,
            PlaybackOptions {
                speed: 1.0,
                max_delay: -1.0,
            },
        )
        .unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn marker_is_skip_target_only_when_activity_resumed() {
        let resumed = Event::new(0.0, EventKind::Marker, "activity_resumed_after_3s");
        let other = Event::new(0.0, EventKind::Marker, "broadcast_dropped");
        assert!(is_skip_target(&resumed));
        assert!(!is_skip_target(&other));
    }

    #[test]
    fn input_events_are_skip_targets() {
        let event = Event::new(0.0, EventKind::Input, "x");
        assert!(is_skip_target(&event));
    }
}
