use std::os::fd::BorrowedFd;

use nix::libc;
use nix::sys::termios::{self, Termios};

use crate::error::CoreError;

/// Puts the calling process's stdin into raw mode for the duration of a
/// recording or playback session and restores the original mode on drop,
/// even on panic. Shared by the recorder and playback engine since only one
/// of them owns the foreground terminal at a time.
pub struct TerminalController {
    original: Termios,
}

impl TerminalController {
    pub fn enable_raw_mode() -> Result<Self, CoreError> {
        let stdin_fd = unsafe { BorrowedFd::borrow_raw(0) };
        let original = termios::tcgetattr(stdin_fd)
            .map_err(|e| CoreError::Terminal(format!("tcgetattr failed: {e}")))?;

        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        // ISIG stays off: Ctrl+C must arrive as raw byte 0x03 so the recorder
        // can forward it as input and the playback engine can treat it as the
        // abort control, instead of raising SIGINT with default disposition.
        termios::tcsetattr(stdin_fd, termios::SetArg::TCSANOW, &raw)
            .map_err(|e| CoreError::Terminal(format!("tcsetattr failed: {e}")))?;

        Ok(TerminalController { original })
    }

    /// Current size of the controlling terminal, falling back to 80x24 if
    /// stdout isn't a tty (piped output, CI runs).
    pub fn current_size() -> (u16, u16) {
        unsafe {
            let mut winsize: libc::winsize = std::mem::zeroed();
            if libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut winsize) == 0
                && winsize.ws_col > 0
                && winsize.ws_row > 0
            {
                (winsize.ws_row, winsize.ws_col)
            } else {
                (24, 80)
            }
        }
    }
}

impl Drop for TerminalController {
    fn drop(&mut self) {
        let stdin_fd = unsafe { BorrowedFd::borrow_raw(0) };
        let _ = termios::tcsetattr(stdin_fd, termios::SetArg::TCSANOW, &self.original);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_size_never_returns_zero() {
        let (rows, cols) = TerminalController::current_size();
        assert!(rows > 0);
        assert!(cols > 0);
    }
}
