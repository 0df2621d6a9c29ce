use std::collections::VecDeque;

use castty_protocol::{BufferInfo, EventKind, OutputEvent};

/// One retained output observation: only `o`/`e` events are ever pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEntry {
    pub wall_time: f64,
    pub kind: EventKind,
    pub payload: String,
}

/// Bounded FIFO of the most recent output events, used to catch up a
/// newly-attached viewer. Written only by the recorder's hub-drain task;
/// `snapshot()` is taken at `attach` time.
pub struct ReplayBuffer {
    entries: VecDeque<ReplayEntry>,
    capacity: usize,
    total_events: u64,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            total_events: 0,
        }
    }

    /// O(1): append, evicting the oldest entry once at capacity.
    pub fn push(&mut self, entry: ReplayEntry) {
        debug_assert!(matches!(entry.kind, EventKind::Output | EventKind::Error));
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.total_events += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    /// Copy of the last `min(capacity, 100)` entries, plus the counters a
    /// `terminal_sync` message needs.
    pub fn snapshot(&self, sync_time: f64) -> (Vec<ReplayEntry>, BufferInfo) {
        let window = self.capacity.min(100);
        let showing = window.min(self.entries.len());
        let recent: Vec<ReplayEntry> = self
            .entries
            .iter()
            .rev()
            .take(showing)
            .rev()
            .cloned()
            .collect();
        let info = BufferInfo {
            total_events: self.total_events,
            showing_recent: recent.len(),
            sync_time,
        };
        (recent, info)
    }
}

impl From<&ReplayEntry> for OutputEvent {
    fn from(entry: &ReplayEntry) -> Self {
        OutputEvent {
            timestamp: entry.wall_time,
            event_type: entry.kind.as_char().to_string(),
            data: entry.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(t: f64, payload: &str) -> ReplayEntry {
        ReplayEntry {
            wall_time: t,
            kind: EventKind::Output,
            payload: payload.to_string(),
        }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut buf = ReplayBuffer::new(3);
        buf.push(entry(0.0, "a"));
        buf.push(entry(1.0, "b"));
        buf.push(entry(2.0, "c"));
        buf.push(entry(3.0, "d"));
        assert_eq!(buf.len(), 3);
        let (recent, _) = buf.snapshot(0.0);
        let payloads: Vec<&str> = recent.iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(payloads, vec!["b", "c", "d"]);
    }

    #[test]
    fn snapshot_caps_at_100_even_with_larger_capacity() {
        let mut buf = ReplayBuffer::new(1000);
        for i in 0..250 {
            buf.push(entry(i as f64, "x"));
        }
        let (recent, info) = buf.snapshot(250.0);
        assert_eq!(recent.len(), 100);
        assert_eq!(info.total_events, 250);
        assert_eq!(info.showing_recent, 100);
        // Last 100 of 250 pushes are indices 150..250.
        assert_eq!(recent.first().unwrap().wall_time, 150.0);
        assert_eq!(recent.last().unwrap().wall_time, 249.0);
    }

    #[test]
    fn total_events_counts_beyond_capacity() {
        let mut buf = ReplayBuffer::new(5);
        for i in 0..20 {
            buf.push(entry(i as f64, "x"));
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.total_events(), 20);
    }

    #[test]
    fn preserves_insertion_order() {
        let mut buf = ReplayBuffer::new(10);
        for c in ["a", "b", "c"] {
            buf.push(entry(0.0, c));
        }
        let (recent, _) = buf.snapshot(0.0);
        let payloads: Vec<&str> = recent.iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(payloads, vec!["a", "b", "c"]);
    }
}
