use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::path::Path;

use nix::libc;
use nix::pty::{openpty, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::sys::termios;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, execv, fork, pipe, setsid, ForkResult, Pid};

use crate::errors::RecorderError;

/// A forked child attached to a freshly allocated pty, with its stderr
/// wired to a second, independent pipe rather than merged into the pty.
///
/// The separate stderr channel is what lets the recorder tag output events
/// as `o` or `e` without a terminal-escape heuristic: anything the child
/// writes to fd 2 arrives on `stderr_fd`, everything else arrives on the
/// pty master.
pub struct PtyHost {
    master: OwnedFd,
    stderr_read: OwnedFd,
    child: Pid,
    rows: u16,
    cols: u16,
}

impl PtyHost {
    /// Allocate a pty sized `rows`x`cols`, fork, and exec `shell_path` as a
    /// session leader attached to the pty's slave side. The parent retains
    /// the pty master and the read end of the stderr pipe.
    pub fn spawn(shell_path: &Path, rows: u16, cols: u16) -> Result<Self, RecorderError> {
        let winsize = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let pty =
            openpty(Some(&winsize), None).map_err(|e| RecorderError::PtyError(format!("openpty failed: {e}")))?;
        let (stderr_read, stderr_write) =
            pipe().map_err(|e| RecorderError::PtyError(format!("stderr pipe failed: {e}")))?;

        let shell_cstr = CString::new(shell_path.as_os_str().as_encoded_bytes()).map_err(|_| {
            RecorderError::ShellNotExecutable {
                path: shell_path.display().to_string(),
            }
        })?;

        let slave_fd = pty.slave.as_raw_fd();
        let stderr_write_fd = stderr_write.as_raw_fd();
        let master_fd = pty.master.as_raw_fd();
        let stderr_read_fd = stderr_read.as_raw_fd();

        // SAFETY: between fork and exec the child touches only
        // async-signal-safe calls (setsid, dup2, close, execv) and never
        // returns into the caller's Rust frame on success.
        match unsafe { fork() }.map_err(|e| RecorderError::ChildError(e.to_string()))? {
            ForkResult::Child => {
                let _ = setsid();
                unsafe {
                    libc::dup2(slave_fd, libc::STDIN_FILENO);
                    libc::dup2(slave_fd, libc::STDOUT_FILENO);
                    libc::dup2(stderr_write_fd, libc::STDERR_FILENO);
                }
                let _ = close(master_fd);
                let _ = close(stderr_read_fd);
                if slave_fd > 2 {
                    let _ = close(slave_fd);
                }
                if stderr_write_fd > 2 {
                    let _ = close(stderr_write_fd);
                }
                let argv = [shell_cstr.clone()];
                let _ = execv(&shell_cstr, &argv);
                // execv only returns on failure; there is no sane path back
                // into the parent's control flow from here.
                std::process::exit(127);
            }
            ForkResult::Parent { child } => {
                drop(pty.slave);
                drop(stderr_write);
                Ok(PtyHost {
                    master: pty.master,
                    stderr_read,
                    child,
                    rows,
                    cols,
                })
            }
        }
    }

    pub fn master_fd(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }

    pub fn stderr_fd(&self) -> BorrowedFd<'_> {
        self.stderr_read.as_fd()
    }

    pub fn child_pid(&self) -> Pid {
        self.child
    }

    pub fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    /// Apply a new window size to the pty and record it for `size()`. The
    /// child discovers the change via SIGWINCH, which the kernel raises
    /// automatically on `TIOCSWINSZ`.
    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<(), RecorderError> {
        let winsize = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let res = unsafe { libc::ioctl(self.master.as_raw_fd(), libc::TIOCSWINSZ, &winsize) };
        if res != 0 {
            return Err(RecorderError::PtyError("TIOCSWINSZ failed".into()));
        }
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }

    /// Snapshot the pty's current line discipline flags so the recorder can
    /// notice and log a raw/cooked mode flip without decoding the child's
    /// own tty traffic.
    pub fn line_discipline(&self) -> Result<LineDiscipline, RecorderError> {
        let term = termios::tcgetattr(&self.master)
            .map_err(|e| RecorderError::PtyError(format!("tcgetattr failed: {e}")))?;
        Ok(LineDiscipline {
            canonical: term.local_flags.contains(termios::LocalFlags::ICANON),
            echo: term.local_flags.contains(termios::LocalFlags::ECHO),
        })
    }

    /// Forward a signal to the whole foreground process group, since the
    /// child is its own session and process group leader.
    pub fn forward_signal(&self, sig: Signal) -> Result<(), RecorderError> {
        kill(Pid::from_raw(-self.child.as_raw()), sig)
            .map_err(|e| RecorderError::PtyError(format!("kill failed: {e}")))
    }

    /// Non-blocking poll for child exit. Returns `None` while still running.
    pub fn try_wait(&self) -> Result<Option<i32>, RecorderError> {
        match waitpid(self.child, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Ok(Some(code)),
            Ok(WaitStatus::Signaled(_, sig, _)) => Ok(Some(128 + sig as i32)),
            Ok(_) => Ok(None),
            Err(nix::errno::Errno::ECHILD) => Ok(Some(0)),
            Err(e) => Err(RecorderError::PtyError(format!("waitpid failed: {e}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDiscipline {
    pub canonical: bool,
    pub echo: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn spawn_true_exits_cleanly() {
        let shell = PathBuf::from("/bin/true");
        if !shell.exists() {
            return;
        }
        let host = PtyHost::spawn(&shell, 24, 80).expect("spawn");
        assert_eq!(host.size(), (24, 80));
        let mut tries = 0;
        loop {
            if host.try_wait().expect("wait").is_some() {
                break;
            }
            tries += 1;
            assert!(tries < 1000, "child never exited");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    #[test]
    fn line_discipline_reports_echo_by_default() {
        let shell = PathBuf::from("/bin/cat");
        if !shell.exists() {
            return;
        }
        let host = PtyHost::spawn(&shell, 24, 80).expect("spawn");
        let disc = host.line_discipline().expect("line discipline");
        assert!(disc.echo);
        let _ = host.forward_signal(Signal::SIGKILL);
    }
}
