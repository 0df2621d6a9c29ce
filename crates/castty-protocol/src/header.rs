use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

pub const CAST_VERSION: u32 = 2;

/// Environment fields recorded in the cast header. Only `SHELL` and `TERM`
/// are interpreted by the core; no other environment variable is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastEnv {
    #[serde(rename = "SHELL")]
    pub shell: String,
    #[serde(rename = "TERM")]
    pub term: String,
}

/// The single header line that must open every cast file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastHeader {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub timestamp: i64,
    pub command: String,
    pub env: CastEnv,
}

impl CastHeader {
    pub fn new(
        width: u32,
        height: u32,
        timestamp: i64,
        command: impl Into<String>,
        shell: impl Into<String>,
        term: impl Into<String>,
    ) -> Self {
        Self {
            version: CAST_VERSION,
            width,
            height,
            timestamp,
            command: command.into(),
            env: CastEnv {
                shell: shell.into(),
                term: term.into(),
            },
        }
    }

    /// Parse and validate the first line of a cast file. A malformed header
    /// or an unsupported version is fatal for the reader.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let header: CastHeader =
            serde_json::from_str(line).map_err(|e| ProtocolError::InvalidHeader {
                message: e.to_string(),
            })?;
        if header.version != CAST_VERSION {
            return Err(ProtocolError::UnsupportedVersion {
                version: header.version as i64,
            });
        }
        Ok(header)
    }

    pub fn to_line(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let header = CastHeader::new(80, 24, 1_700_000_000, "/bin/zsh", "/bin/zsh", "xterm-256color");
        let line = header.to_line().unwrap();
        let back = CastHeader::parse(&line).unwrap();
        assert_eq!(back.version, 2);
        assert_eq!(back.width, 80);
        assert_eq!(back.env.shell, "/bin/zsh");
    }

    #[test]
    fn rejects_wrong_version() {
        let line = r#"{"version":1,"width":80,"height":24,"timestamp":0,"command":"sh","env":{"SHELL":"sh","TERM":"xterm"}}"#;
        let err = CastHeader::parse(line).unwrap_err();
        assert_eq!(err.error_code(), "unsupported_version");
        assert!(err.is_user_error());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = CastHeader::parse("{not json").unwrap_err();
        assert_eq!(err.error_code(), "invalid_header");
    }
}
