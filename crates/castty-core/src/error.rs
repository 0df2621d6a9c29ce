/// Errors owned by the Cast Writer and Replay Buffer — the recording-side
/// primitives that don't themselves know about PTYs or sockets.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("cast writer is closed")]
    WriterClosed,

    #[error("terminal control failed: {0}")]
    Terminal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] castty_protocol::ProtocolError),
}

impl CoreError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::WriterClosed => "writer_closed",
            CoreError::Terminal(_) => "terminal_error",
            CoreError::Io(_) => "io_error",
            CoreError::Protocol(_) => "protocol_error",
        }
    }

    pub fn is_user_error(&self) -> bool {
        matches!(self, CoreError::Io(_) | CoreError::Terminal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_closed_has_stable_code() {
        assert_eq!(CoreError::WriterClosed.error_code(), "writer_closed");
        assert!(!CoreError::WriterClosed.is_user_error());
    }
}
