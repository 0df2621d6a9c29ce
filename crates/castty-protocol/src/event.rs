use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::ProtocolError;

/// The kind of a single cast event. `E` (stderr) is a documented extension
/// over the standard asciicast v2 kind set; third-party readers must ignore
/// kinds they don't recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Output,
    Error,
    Input,
    Resize,
    Marker,
}

impl EventKind {
    pub fn as_char(self) -> char {
        match self {
            EventKind::Output => 'o',
            EventKind::Error => 'e',
            EventKind::Input => 'i',
            EventKind::Resize => 'r',
            EventKind::Marker => 'm',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'o' => Some(EventKind::Output),
            'e' => Some(EventKind::Error),
            'i' => Some(EventKind::Input),
            'r' => Some(EventKind::Resize),
            'm' => Some(EventKind::Marker),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_char().to_string())
    }
}

/// One recorded observation: `(t, kind, payload)`. `t` is seconds since
/// session start; `payload` is already UTF-8 (replacement applied upstream
/// for ill-formed child bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub t: f64,
    pub kind: EventKind,
    pub payload: String,
}

impl Event {
    pub fn new(t: f64, kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            t,
            kind,
            payload: payload.into(),
        }
    }

    /// Build a resize payload of exactly `"<rows>,<cols>"`, per the wire format.
    pub fn resize(t: f64, rows: u16, cols: u16) -> Self {
        Self::new(t, EventKind::Resize, format!("{},{}", rows, cols))
    }

    /// Parse a resize payload back into `(rows, cols)`.
    pub fn parse_resize_payload(payload: &str) -> Option<(u16, u16)> {
        let (rows, cols) = payload.split_once(',')?;
        Some((rows.parse().ok()?, cols.parse().ok()?))
    }
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.t)?;
        seq.serialize_element(&self.kind.as_char().to_string())?;
        seq.serialize_element(&self.payload)?;
        seq.end()
    }
}

struct EventVisitor;

impl<'de> Visitor<'de> for EventVisitor {
    type Value = Event;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an array [t, kind, payload]")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Event, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let t: f64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let kind_str: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let payload: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;

        let kind_char = kind_str
            .chars()
            .next()
            .ok_or_else(|| de::Error::custom("empty event kind"))?;
        let kind = EventKind::from_char(kind_char)
            .ok_or_else(|| de::Error::custom(format!("unknown event kind: {}", kind_str)))?;

        Ok(Event { t, kind, payload })
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Event, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(EventVisitor)
    }
}

/// Parse one non-empty cast-file line into an `Event`.
///
/// Distinguishes an unknown-kind error from a structurally malformed line so
/// callers can apply the spec's "skip with warning" policy uniformly.
pub fn parse_event_line(line: &str) -> Result<Event, ProtocolError> {
    serde_json::from_str(line).map_err(|_| ProtocolError::MalformedEvent {
        line: line.to_string(),
    })
}

pub fn write_event_line(event: &Event) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_output_event() {
        let event = Event::new(1.234, EventKind::Output, "hello\n");
        let line = write_event_line(&event).unwrap();
        assert_eq!(line, r#"[1.234,"o","hello\n"]"#);
        let back = parse_event_line(&line).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn resize_payload_round_trips() {
        let event = Event::resize(2.0, 40, 120);
        assert_eq!(event.payload, "40,120");
        assert_eq!(Event::parse_resize_payload(&event.payload), Some((40, 120)));
    }

    #[test]
    fn malformed_line_is_locally_recoverable() {
        let err = parse_event_line("not an event").unwrap_err();
        assert!(!err.is_user_error());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = parse_event_line(r#"[0.1,"z","x"]"#).unwrap_err();
        assert_eq!(err.error_code(), "malformed_event");
    }

    #[test]
    fn empty_kind_string_is_rejected() {
        let err = parse_event_line(r#"[0.1,"","x"]"#).unwrap_err();
        assert_eq!(err.error_code(), "malformed_event");
    }
}
