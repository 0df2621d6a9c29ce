/// Errors from parsing or serializing wire data: cast file lines and
/// push-protocol messages. Does not cover socket/transport failures — those
/// belong to the crate that owns the socket.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed cast header: {message}")]
    InvalidHeader { message: String },

    #[error("unsupported cast version {version} (expected 2)")]
    UnsupportedVersion { version: i64 },

    #[error("malformed event line: {line}")]
    MalformedEvent { line: String },

    #[error("unknown event kind: {kind}")]
    UnknownEventKind { kind: String },

    #[error("malformed viewer message: {0}")]
    MalformedMessage(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Stable identifier for log correlation and CLI exit diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProtocolError::InvalidHeader { .. } => "invalid_header",
            ProtocolError::UnsupportedVersion { .. } => "unsupported_version",
            ProtocolError::MalformedEvent { .. } => "malformed_event",
            ProtocolError::UnknownEventKind { .. } => "unknown_event_kind",
            ProtocolError::MalformedMessage(_) => "malformed_message",
            ProtocolError::Json(_) => "json_error",
            ProtocolError::Io(_) => "io_error",
        }
    }

    /// Whether this error should be surfaced to the user as-is, rather than
    /// just logged and recovered from locally.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidHeader { .. } | ProtocolError::UnsupportedVersion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_errors_are_user_facing() {
        let err = ProtocolError::UnsupportedVersion { version: 1 };
        assert!(err.is_user_error());
        assert_eq!(err.error_code(), "unsupported_version");
    }

    #[test]
    fn malformed_event_is_locally_recovered() {
        let err = ProtocolError::MalformedEvent {
            line: "not json".into(),
        };
        assert!(!err.is_user_error());
        assert_eq!(err.error_code(), "malformed_event");
    }
}
