#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("cannot open cast file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] castty_protocol::ProtocolError),

    #[error(transparent)]
    Core(#[from] castty_core::CoreError),

    #[error("invalid playback options: {message}")]
    InvalidOptions { message: String },

    #[error("playback interrupted")]
    Interrupted,
}

impl PlaybackError {
    pub fn error_code(&self) -> &'static str {
        match self {
            PlaybackError::Io(_) => "io_error",
            PlaybackError::Protocol(_) => "protocol_error",
            PlaybackError::Core(_) => "core_error",
            PlaybackError::InvalidOptions { .. } => "invalid_options",
            PlaybackError::Interrupted => "interrupted",
        }
    }

    pub fn is_user_error(&self) -> bool {
        !matches!(self, PlaybackError::Interrupted)
    }
}
