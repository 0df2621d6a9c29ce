use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::Path;

use castty_core::{CastWriter, EventClock};
use castty_protocol::{CastHeader, Event, EventKind};
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{SigSet, Signal};
use tracing::{info, warn};

use castty_core::TerminalController;

use crate::errors::RecorderError;
use crate::hub::HubHandle;
use crate::pty::PtyHost;

/// Poll timeout so periodic bookkeeping (child-exit check) runs even when
/// every stream is idle.
const POLL_TIMEOUT_MS: u16 = 100;
const READ_CHUNK: usize = 4096;

pub struct RecordOptions<'a> {
    pub shell_path: &'a Path,
    pub cast_path: &'a Path,
    pub shell_name: String,
    pub term_name: String,
    pub command: String,
    pub hub: Option<HubHandle>,
}

/// Runs one recording session to completion: spawns the child under a pty,
/// relays bytes in both directions, tees output to the cast file and the
/// broadcast hub, and restores the terminal on every exit path.
pub fn run(opts: RecordOptions<'_>) -> Result<(), RecorderError> {
    validate_shell(opts.shell_path)?;

    let (rows, cols) = TerminalController::current_size();
    let terminal = TerminalController::enable_raw_mode()?;
    let mut pty = PtyHost::spawn(opts.shell_path, rows, cols)?;
    info!(event = "recorder.pty_spawned", pid = pty.child_pid().as_raw());

    let clock = EventClock::start();
    let header = CastHeader::new(
        cols as u32,
        rows as u32,
        clock.session_start_wall_time(),
        opts.command.clone(),
        opts.shell_name,
        opts.term_name,
    );
    let mut writer = CastWriter::create(opts.cast_path, &header)?;

    // SIGWINCH/SIGCHLD/SIGINT are handled by polling (current_size() each
    // tick, try_wait() each tick, sigint_pending() each tick) rather than
    // asynchronous handlers, so block them to prevent the default actions
    // (SIGINT's default disposition terminates the process) from
    // interrupting the poll loop. A SIGINT delivered to the recorder must be
    // forwarded to the child rather than killing the recorder.
    let mut blocked = SigSet::empty();
    blocked.add(Signal::SIGWINCH);
    blocked.add(Signal::SIGCHLD);
    blocked.add(Signal::SIGINT);
    let _ = blocked.thread_block();

    let result = drive_loop(&mut pty, &clock, &mut writer, opts.hub.as_ref());

    let exit_code = pty.try_wait().ok().flatten();
    info!(event = "recorder.child_reaped", exit_code = ?exit_code);

    if let Some(hub) = &opts.hub {
        hub.publish(Event::new(clock.now(), EventKind::Marker, "session_ended"));
    }
    writer.close()?;
    drop(terminal);
    info!(event = "recorder.session_closed", cast_path = %opts.cast_path.display());

    result
}

fn drive_loop(
    pty: &mut PtyHost,
    clock: &EventClock,
    writer: &mut CastWriter,
    hub: Option<&HubHandle>,
) -> Result<(), RecorderError> {
    // Captured once as raw integers (not `BorrowedFd`s) so this loop can
    // still call `pty.resize()` (`&mut self`) without fighting the borrow
    // checker over an outstanding immutable borrow of the pty's fds.
    let master_raw = pty.master_fd().as_raw_fd();
    let stderr_raw = pty.stderr_fd().as_raw_fd();

    let mut buf = [0u8; READ_CHUNK];
    let mut last_size = (0u16, 0u16);

    loop {
        if let Some(code) = pty.try_wait()? {
            info!(event = "recorder.child_exited", code = code);
            break;
        }

        if sigint_pending() {
            match pty.forward_signal(Signal::SIGINT) {
                Ok(()) => info!(event = "recorder.sigint_forwarded"),
                Err(e) => warn!(event = "recorder.sigint_forward_failed", error = %e),
            }
        }

        let current_size = TerminalController::current_size();
        if current_size != last_size {
            if last_size != (0, 0) {
                pty.resize(current_size.0, current_size.1)?;
                let event = Event::resize(clock.now(), current_size.0, current_size.1);
                append_event(writer, hub, event)?;
            }
            last_size = current_size;
        }

        // SAFETY: each `BorrowedFd` below is scoped to this single poll/read
        // pass and borrows a fd owned by `pty` or inherited from the process
        // (0/1/2), none of which are closed while this loop runs.
        let (stdin_fd, stdout_fd, stderr_out_fd, master_fd, stderr_fd) = unsafe {
            (
                BorrowedFd::borrow_raw(0),
                BorrowedFd::borrow_raw(1),
                BorrowedFd::borrow_raw(2),
                BorrowedFd::borrow_raw(master_raw),
                BorrowedFd::borrow_raw(stderr_raw),
            )
        };

        let mut fds = [
            PollFd::new(stdin_fd, PollFlags::POLLIN),
            PollFd::new(master_fd, PollFlags::POLLIN),
            PollFd::new(stderr_fd, PollFlags::POLLIN),
        ];
        let timeout = PollTimeout::from(POLL_TIMEOUT_MS);
        match poll(&mut fds, timeout) {
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(RecorderError::PtyError(format!("poll failed: {e}"))),
        }

        if readable(&fds[0]) {
            match raw_read(stdin_fd, &mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    write_all_retry(master_fd, &buf[..n])?;
                    let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                    append_event(writer, hub, Event::new(clock.now(), EventKind::Input, text))?;
                }
                Err(e) if e == nix::errno::Errno::EAGAIN || e == nix::errno::Errno::EINTR => {}
                Err(e) => warn!(event = "recorder.stdin_read_failed", error = %e),
            }
        }

        if readable(&fds[1]) {
            match raw_read(master_fd, &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    write_all_retry(stdout_fd, &buf[..n])?;
                    let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                    append_event(writer, hub, Event::new(clock.now(), EventKind::Output, text))?;
                }
                Err(e) if e == nix::errno::Errno::EAGAIN || e == nix::errno::Errno::EINTR => {}
                Err(e) => {
                    warn!(event = "recorder.master_read_failed", error = %e);
                    break;
                }
            }
        }

        if readable(&fds[2]) {
            match raw_read(stderr_fd, &mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    write_all_retry(stderr_out_fd, &buf[..n])?;
                    let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                    append_event(writer, hub, Event::new(clock.now(), EventKind::Error, text))?;
                }
                Err(e) if e == nix::errno::Errno::EAGAIN || e == nix::errno::Errno::EINTR => {}
                Err(e) => warn!(event = "recorder.stderr_read_failed", error = %e),
            }
        }
    }

    Ok(())
}

/// The shell must exist and be directly executable — a non-executable or
/// missing path fails fast rather than producing an opaque fork/exec error.
fn validate_shell(path: &Path) -> Result<(), RecorderError> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path).map_err(|_| RecorderError::ShellNotExecutable {
        path: path.display().to_string(),
    })?;
    if !meta.is_file() || meta.permissions().mode() & 0o111 == 0 {
        return Err(RecorderError::ShellNotExecutable {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Non-blocking check-and-consume for a pending, blocked `SIGINT`. A zero
/// timeout makes `sigtimedwait` return immediately: `SIGINT` if one was
/// pending, or `EAGAIN` if not.
fn sigint_pending() -> bool {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        let timeout = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        libc::sigtimedwait(&set, std::ptr::null_mut(), &timeout) == libc::SIGINT
    }
}

fn readable(fd: &PollFd) -> bool {
    fd.revents()
        .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
}

fn append_event(writer: &mut CastWriter, hub: Option<&HubHandle>, event: Event) -> Result<(), RecorderError> {
    writer.append(&event)?;
    if let Some(hub) = hub {
        hub.publish(event);
    }
    Ok(())
}

fn raw_read(fd: BorrowedFd<'_>, buf: &mut [u8]) -> Result<usize, nix::errno::Errno> {
    let n = unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(nix::errno::Errno::last())
    } else {
        Ok(n as usize)
    }
}

fn write_all_retry(fd: BorrowedFd<'_>, mut data: &[u8]) -> Result<(), RecorderError> {
    while !data.is_empty() {
        let n = unsafe { libc::write(fd.as_raw_fd(), data.as_ptr().cast(), data.len()) };
        if n < 0 {
            let errno = nix::errno::Errno::last();
            if errno == nix::errno::Errno::EINTR || errno == nix::errno::Errno::EAGAIN {
                continue;
            }
            return Err(RecorderError::PtyError(format!("write failed: {errno}")));
        }
        data = &data[n as usize..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_shell() {
        let err = validate_shell(Path::new("/no/such/shell")).unwrap_err();
        assert_eq!(err.error_code(), "shell_not_executable");
    }

    #[test]
    fn rejects_non_executable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notashell");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        let err = validate_shell(&path).unwrap_err();
        assert_eq!(err.error_code(), "shell_not_executable");
    }

    #[test]
    fn accepts_bin_sh() {
        let sh = Path::new("/bin/sh");
        if sh.exists() {
            assert!(validate_shell(sh).is_ok());
        }
    }

    #[test]
    fn sigint_pending_sees_a_blocked_self_raised_signal() {
        let mut blocked = SigSet::empty();
        blocked.add(Signal::SIGINT);
        let _ = blocked.thread_block();

        assert!(!sigint_pending());
        let _ = nix::sys::signal::raise(Signal::SIGINT);
        assert!(sigint_pending());
        assert!(!sigint_pending(), "sigtimedwait must consume the pending signal");

        let _ = blocked.thread_unblock();
    }
}
