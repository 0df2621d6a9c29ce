use std::io::{BufRead, BufReader};
use std::path::Path;

use castty_protocol::{CastHeader, Event};
use tracing::warn;

use crate::errors::PlaybackError;

/// A fully loaded cast file: a validated header plus its event stream.
/// Malformed event lines are dropped at load time with a warning; a
/// malformed or unsupported header is fatal, per the playback engine's
/// error-propagation policy.
pub struct CastRecording {
    pub header: CastHeader,
    pub events: Vec<Event>,
}

pub fn load(path: &Path) -> Result<CastRecording, PlaybackError> {
    let file = std::fs::File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let header_line = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => {
                return Err(PlaybackError::Protocol(castty_protocol::ProtocolError::InvalidHeader {
                    message: "cast file is empty".to_string(),
                }));
            }
        }
    };
    let header = CastHeader::parse(&header_line)?;

    let mut events = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match castty_protocol::parse_event_line(&line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(event = "playback.malformed_event_skipped", error = %e, line = %line),
        }
    }

    Ok(CastRecording { header, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn loads_header_and_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.cast");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"version":2,"width":80,"height":24,"timestamp":0,"command":"/bin/sh","env":{{"SHELL":"/bin/sh","TERM":"xterm"}}}}"#).unwrap();
        writeln!(f, r#"[0.0,"o","hello"]"#).unwrap();
        writeln!(f, r#"[0.1,"o","world"]"#).unwrap();

        let recording = load(&path).unwrap();
        assert_eq!(recording.header.width, 80);
        assert_eq!(recording.events.len(), 2);
    }

    #[test]
    fn skips_malformed_event_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.cast");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"version":2,"width":80,"height":24,"timestamp":0,"command":"/bin/sh","env":{{"SHELL":"/bin/sh","TERM":"xterm"}}}}"#).unwrap();
        writeln!(f, "not an event").unwrap();
        writeln!(f, r#"[0.1,"o","ok"]"#).unwrap();

        let recording = load(&path).unwrap();
        assert_eq!(recording.events.len(), 1);
        assert_eq!(recording.events[0].payload, "ok");
    }

    #[test]
    fn rejects_malformed_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.cast");
        std::fs::write(&path, "not json\n").unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.is_user_error());
    }
}
