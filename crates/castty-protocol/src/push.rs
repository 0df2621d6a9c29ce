use serde::{Deserialize, Serialize};

use crate::session::SessionMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSize {
    pub width: u32,
    pub height: u32,
}

/// One replay-buffer entry as shipped to a viewer in a `terminal_sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEvent {
    pub timestamp: f64,
    pub event_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferInfo {
    pub total_events: u64,
    pub showing_recent: usize,
    pub sync_time: f64,
}

/// Messages sent from the monitor front-end to a connected viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "terminal_sync")]
    TerminalSync {
        session_metadata: SessionMetadata,
        terminal_size: TerminalSize,
        recent_output: Vec<OutputEvent>,
        buffer_info: BufferInfo,
    },
    #[serde(rename = "terminal_data")]
    TerminalData {
        timestamp: f64,
        event_type: String,
        data: String,
    },
    #[serde(rename = "session_event")]
    SessionEvent { event: String },
}

/// Messages a viewer may send. Only `client_hello` is a recognized shape;
/// everything else (and anything malformed) is accepted and ignored per the
/// push protocol's design — viewers have no meaningful commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "client_hello")]
    ClientHello {
        #[serde(default)]
        client_name: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;

    #[test]
    fn terminal_data_serializes_with_tag() {
        let msg = ServerMessage::TerminalData {
            timestamp: 1.5,
            event_type: "o".to_string(),
            data: "hi".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"terminal_data""#));
    }

    #[test]
    fn terminal_sync_round_trips() {
        let msg = ServerMessage::TerminalSync {
            session_metadata: SessionMetadata {
                session_id: SessionId::new("abc"),
                start_wall_time: 0,
                shell_command: "/bin/sh".into(),
                recording_path: "out.cast".into(),
            },
            terminal_size: TerminalSize {
                width: 80,
                height: 24,
            },
            recent_output: vec![],
            buffer_info: BufferInfo {
                total_events: 0,
                showing_recent: 0,
                sync_time: 0.0,
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        match back {
            ServerMessage::TerminalSync { buffer_info, .. } => {
                assert_eq!(buffer_info.total_events, 0);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn client_hello_parses() {
        let json = r#"{"type":"client_hello","client_name":"web"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        matches!(msg, ClientMessage::ClientHello { .. });
    }

    #[test]
    fn unknown_client_message_is_ignored_not_rejected() {
        let json = r#"{"type":"some_future_command","foo":1}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        matches!(msg, ClientMessage::Unknown);
    }
}
