use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic seconds-since-start clock for a single recording or playback
/// session. Backed by `Instant` so wall-clock adjustments (NTP, DST) never
/// corrupt a session's timings.
#[derive(Debug, Clone)]
pub struct EventClock {
    started_at: Instant,
    start_wall_time: i64,
}

impl EventClock {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            start_wall_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
        }
    }

    /// Seconds since session start, millisecond resolution.
    pub fn now(&self) -> f64 {
        let elapsed = self.started_at.elapsed();
        (elapsed.as_millis() as f64) / 1000.0
    }

    /// Absolute Unix start time, recorded once in the cast header.
    pub fn session_start_wall_time(&self) -> i64 {
        self.start_wall_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn now_is_non_negative_and_monotonic() {
        let clock = EventClock::start();
        let t0 = clock.now();
        sleep(Duration::from_millis(20));
        let t1 = clock.now();
        assert!(t0 >= 0.0);
        assert!(t1 >= t0);
    }

    #[test]
    fn session_start_wall_time_is_plausible() {
        let clock = EventClock::start();
        // Anything after 2020-01-01 in Unix seconds.
        assert!(clock.session_start_wall_time() > 1_577_836_800);
    }
}
