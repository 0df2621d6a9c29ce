#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("shell '{path}' is not an executable regular file")]
    ShellNotExecutable { path: String },

    #[error("failed to fork/exec child: {0}")]
    ChildError(String),

    #[error("pty operation failed: {0}")]
    PtyError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] castty_protocol::ProtocolError),

    #[error(transparent)]
    Core(#[from] castty_core::CoreError),

    #[error("recording interrupted")]
    Interrupted,
}

impl RecorderError {
    pub fn error_code(&self) -> &'static str {
        match self {
            RecorderError::ShellNotExecutable { .. } => "shell_not_executable",
            RecorderError::ChildError(_) => "child_error",
            RecorderError::PtyError(_) => "pty_error",
            RecorderError::Io(_) => "io_error",
            RecorderError::Protocol(_) => "protocol_error",
            RecorderError::Core(_) => "core_error",
            RecorderError::Interrupted => "interrupted",
        }
    }

    /// Locally-recovered errors (malformed viewer traffic, a failed viewer
    /// write) never reach this type — the hub swallows those at the source.
    /// Everything constructible here is surfaced to the user.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, RecorderError::Interrupted)
    }
}
