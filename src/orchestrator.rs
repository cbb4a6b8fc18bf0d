//! Stream orchestrator: starts the 40ms frame stream on the first sign of
//! activity and stops it after an idle timeout.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Voice,
    NonVoice,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ActivityStats {
    pub stream_starts: u64,
    pub stream_stops: u64,
    pub voice_starts: u64,
    pub non_voice_starts: u64,
}

pub struct StreamOrchestrator {
    active: bool,
    idle_timeout: Duration,
    last_activity: Instant,
    stream_start: Instant,
    stats: ActivityStats,
}

impl StreamOrchestrator {
    pub fn new(idle_timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            active: false,
            idle_timeout,
            last_activity: now,
            stream_start: now,
            stats: ActivityStats::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stats(&self) -> ActivityStats {
        self.stats
    }

    /// Record activity that should keep (or start) the stream running.
    pub fn activity_detected(&mut self, kind: ActivityKind, now: Instant) {
        if !self.active {
            self.start_stream(now);
        }
        self.last_activity = now;
        match kind {
            ActivityKind::Voice => self.stats.voice_starts += 1,
            ActivityKind::NonVoice => self.stats.non_voice_starts += 1,
        }
    }

    pub fn start_stream(&mut self, now: Instant) {
        if self.active {
            return;
        }
        self.active = true;
        self.stream_start = now;
        self.last_activity = now;
        self.stats.stream_starts += 1;
    }

    pub fn should_stop(&self, now: Instant) -> bool {
        self.active && now.duration_since(self.last_activity) >= self.idle_timeout
    }

    pub fn stop_stream(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.stats.stream_stops += 1;
    }

    pub fn current_duration(&self, now: Instant) -> Duration {
        if self.active {
            now.duration_since(self.stream_start)
        } else {
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_starts_on_first_activity() {
        let mut orch = StreamOrchestrator::new(Duration::from_secs(5));
        assert!(!orch.is_active());
        orch.activity_detected(ActivityKind::Voice, Instant::now());
        assert!(orch.is_active());
        assert_eq!(orch.stats().stream_starts, 1);
        assert_eq!(orch.stats().voice_starts, 1);
    }

    #[test]
    fn repeated_activity_does_not_restart_stream() {
        let mut orch = StreamOrchestrator::new(Duration::from_secs(5));
        let now = Instant::now();
        orch.activity_detected(ActivityKind::Voice, now);
        orch.activity_detected(ActivityKind::NonVoice, now);
        assert_eq!(orch.stats().stream_starts, 1);
        assert_eq!(orch.stats().non_voice_starts, 1);
    }

    #[test]
    fn should_stop_after_idle_timeout() {
        let mut orch = StreamOrchestrator::new(Duration::from_millis(10));
        let t0 = Instant::now();
        orch.activity_detected(ActivityKind::Voice, t0);
        assert!(!orch.should_stop(t0));
        let later = t0 + Duration::from_millis(20);
        assert!(orch.should_stop(later));
        orch.stop_stream();
        assert!(!orch.is_active());
        assert_eq!(orch.stats().stream_stops, 1);
    }

    #[test]
    fn stop_stream_is_idempotent_when_inactive() {
        let mut orch = StreamOrchestrator::new(Duration::from_secs(5));
        orch.stop_stream();
        assert_eq!(orch.stats().stream_stops, 0);
    }
}
