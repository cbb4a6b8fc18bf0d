//! Transmission/reception statistics: one atomics-backed struct covering
//! every counter that would otherwise be scattered across the framing,
//! reassembly, and frame-manager modules. No HTTP/metrics-exporter
//! surface — this is a single-peer client, not a gateway.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Stats {
    pub voice_frames_sent: AtomicU64,
    pub control_frames_sent: AtomicU64,
    pub text_frames_sent: AtomicU64,
    pub keepalives_sent: AtomicU64,
    pub frames_dropped: AtomicU64,

    pub cobs_overhead_bytes: AtomicU64,
    pub wire_frames_transmitted: AtomicU64,

    pub reassembly_frames_completed: AtomicU64,
    pub reassembly_errors: AtomicU64,
    pub reassembly_overflows: AtomicU64,

    pub protocol_errors: AtomicU64,
    pub transport_send_errors: AtomicU64,
    pub transport_recv_errors: AtomicU64,
}

/// Point-in-time read-only snapshot, cheap to clone and log.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StatsSnapshot {
    pub voice_frames_sent: u64,
    pub control_frames_sent: u64,
    pub text_frames_sent: u64,
    pub keepalives_sent: u64,
    pub frames_dropped: u64,
    pub cobs_overhead_bytes: u64,
    pub wire_frames_transmitted: u64,
    pub reassembly_frames_completed: u64,
    pub reassembly_errors: u64,
    pub reassembly_overflows: u64,
    pub protocol_errors: u64,
    pub transport_send_errors: u64,
    pub transport_recv_errors: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            voice_frames_sent: load(&self.voice_frames_sent),
            control_frames_sent: load(&self.control_frames_sent),
            text_frames_sent: load(&self.text_frames_sent),
            keepalives_sent: load(&self.keepalives_sent),
            frames_dropped: load(&self.frames_dropped),
            cobs_overhead_bytes: load(&self.cobs_overhead_bytes),
            wire_frames_transmitted: load(&self.wire_frames_transmitted),
            reassembly_frames_completed: load(&self.reassembly_frames_completed),
            reassembly_errors: load(&self.reassembly_errors),
            reassembly_overflows: load(&self.reassembly_overflows),
            protocol_errors: load(&self.protocol_errors),
            transport_send_errors: load(&self.transport_send_errors),
            transport_recv_errors: load(&self.transport_recv_errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = Stats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.voice_frames_sent, 0);
        assert_eq!(snap.reassembly_overflows, 0);
    }

    #[test]
    fn incr_and_add_accumulate() {
        let stats = Stats::new();
        Stats::incr(&stats.voice_frames_sent);
        Stats::incr(&stats.voice_frames_sent);
        Stats::add(&stats.cobs_overhead_bytes, 42);
        let snap = stats.snapshot();
        assert_eq!(snap.voice_frames_sent, 2);
        assert_eq!(snap.cobs_overhead_bytes, 42);
    }
}
