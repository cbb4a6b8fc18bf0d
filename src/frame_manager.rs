//! Audio-driven frame manager: owns the control and text queues, arbitrates
//! between voice, control, text, and keepalive traffic on every 40ms tick,
//! and handles PTT-edge bookkeeping (`PTT_START`/`PTT_STOP` control
//! messages).

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::orchestrator::{ActivityKind, StreamOrchestrator};
use crate::protocol::ProtocolEngine;
use crate::stats::Stats;

/// Whether keepalives are relevant for this session's peer. Matches
/// `config.protocol.target_type`: a modem peer handles its own hang-time
/// and keepalives would be wasted airtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Computer,
    Modem,
}

/// What a single scheduler tick transmitted, for callers that want to log
/// or test tick outcomes without re-deriving it from stats deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Voice(usize),
    Control,
    Text,
    Keepalive,
    Idle,
}

pub struct AudioDrivenFrameManager {
    control_tx: Sender<Vec<u8>>,
    control_rx: Receiver<Vec<u8>>,
    text_tx: Sender<Vec<u8>>,
    text_rx: Receiver<Vec<u8>>,

    voice_active: bool,
    target_type: TargetType,
    keepalive_interval: Duration,
    last_keepalive: Instant,

    /// Tracks whether the continuous stream is considered alive for
    /// idle-timeout purposes; gates keepalive transmission the way
    /// `ContinuousStreamManager` gated the original's outbound stream.
    orchestrator: StreamOrchestrator,

    stats: std::sync::Arc<Stats>,
}

impl AudioDrivenFrameManager {
    pub fn new(
        target_type: TargetType,
        keepalive_interval: Duration,
        idle_timeout: Duration,
        stats: std::sync::Arc<Stats>,
    ) -> Self {
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let (text_tx, text_rx) = crossbeam_channel::unbounded();
        let mut orchestrator = StreamOrchestrator::new(idle_timeout);
        orchestrator.start_stream(Instant::now());
        Self {
            control_tx,
            control_rx,
            text_tx,
            text_rx,
            voice_active: false,
            target_type,
            keepalive_interval,
            last_keepalive: Instant::now(),
            orchestrator,
            stats,
        }
    }

    /// Called on PTT press/release. Emits the literal `PTT_START`/`PTT_STOP`
    /// control frames the original radio firmware expects on the wire.
    pub fn set_voice_active(&mut self, active: bool, protocol: &ProtocolEngine) {
        if active == self.voice_active {
            return;
        }
        self.voice_active = active;
        if active {
            self.orchestrator.activity_detected(ActivityKind::Voice, Instant::now());
        }
        let marker: &[u8] = if active { b"PTT_START" } else { b"PTT_STOP" };
        match protocol.create_control_frames(marker) {
            Ok(frames) => {
                for frame in frames {
                    let _ = self.control_tx.send(frame);
                }
            }
            Err(err) => warn!(%err, "failed to build PTT control frame"),
        }
    }

    pub fn queue_text_message(&mut self, protocol: &ProtocolEngine, text: &str) {
        self.orchestrator.activity_detected(ActivityKind::NonVoice, Instant::now());
        match protocol.create_text_frames(text) {
            Ok(frames) => {
                for frame in frames {
                    let _ = self.text_tx.send(frame);
                }
            }
            Err(err) => warn!(%err, "failed to build text frame"),
        }
    }

    pub fn queue_control_message(&mut self, protocol: &ProtocolEngine, data: &[u8]) {
        self.orchestrator.activity_detected(ActivityKind::NonVoice, Instant::now());
        match protocol.create_control_frames(data) {
            Ok(frames) => {
                for frame in frames {
                    let _ = self.control_tx.send(frame);
                }
            }
            Err(err) => warn!(%err, "failed to build control frame"),
        }
    }

    /// One 40ms scheduling decision. Voice preempts unconditionally while
    /// `opus_packet` is `Some` (i.e. PTT held and a frame is ready); else
    /// control drains before text, then keepalive if due, else the slot
    /// is dead air. `send` is the caller's wire transmit function so this
    /// module stays decoupled from the actual socket.
    pub fn tick(
        &mut self,
        protocol: &mut ProtocolEngine,
        opus_packet: Option<&[u8]>,
        now: Instant,
        mut send: impl FnMut(&[u8]) -> bool,
    ) -> TickOutcome {
        if self.orchestrator.should_stop(now) {
            self.orchestrator.stop_stream();
            debug!("continuous stream stopped after idle timeout");
        }

        if let Some(opus) = opus_packet {
            self.orchestrator.activity_detected(ActivityKind::Voice, now);
            return self.process_voice(protocol, opus, &mut send);
        }

        // PTT still held but this tick had no OPUS packet (encode error or
        // wrong-size output): the slot stays voice's, not control/text's.
        if self.voice_active {
            return TickOutcome::Idle;
        }

        if let Ok(frame) = self.control_rx.try_recv() {
            if send(&frame) {
                Stats::incr(&self.stats.control_frames_sent);
                debug!(bytes = frame.len(), "CONTROL frame sent");
            }
            return TickOutcome::Control;
        }

        if let Ok(frame) = self.text_rx.try_recv() {
            if send(&frame) {
                Stats::incr(&self.stats.text_frames_sent);
                debug!(bytes = frame.len(), "TEXT frame sent");
            }
            return TickOutcome::Text;
        }

        if self.target_type == TargetType::Computer && !self.voice_active && self.orchestrator.is_active() {
            if now.duration_since(self.last_keepalive) >= self.keepalive_interval {
                self.last_keepalive = now;
                let payload = format!("KEEPALIVE:{}", chrono::Utc::now().timestamp());
                match protocol.create_control_frames(payload.as_bytes()) {
                    Ok(frames) => {
                        if let Some(frame) = frames.first() {
                            if send(frame) {
                                Stats::incr(&self.stats.keepalives_sent);
                                debug!("KEEPALIVE sent");
                            }
                        }
                        return TickOutcome::Keepalive;
                    }
                    Err(err) => warn!(%err, "failed to build keepalive frame"),
                }
            }
        }

        TickOutcome::Idle
    }

    fn process_voice(
        &mut self,
        protocol: &mut ProtocolEngine,
        opus_packet: &[u8],
        send: &mut impl FnMut(&[u8]) -> bool,
    ) -> TickOutcome {
        match protocol.create_audio_frames(opus_packet) {
            Ok(frames) => {
                let mut sent = 0;
                for frame in &frames {
                    if send(frame) {
                        sent += 1;
                        Stats::incr(&self.stats.voice_frames_sent);
                    }
                }
                debug!(sent, total = frames.len(), "VOICE frame(s) sent");
                TickOutcome::Voice(sent)
            }
            Err(err) => {
                warn!(%err, "voice frame transmission error");
                TickOutcome::Idle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationIdentifier;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    fn protocol() -> ProtocolEngine {
        ProtocolEngine::new(
            StationIdentifier::new("W1ABC").unwrap(),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            0,
            Arc::new(Stats::new()),
        )
    }

    #[test]
    fn control_drains_before_text() {
        let stats = Arc::new(Stats::new());
        let mut fm =
            AudioDrivenFrameManager::new(TargetType::Computer, Duration::from_secs(5), Duration::from_secs(5), stats);
        let proto = protocol();
        fm.queue_text_message(&proto, "hi");
        fm.queue_control_message(&proto, b"PING");

        let mut proto_mut = protocol();
        let outcome = fm.tick(&mut proto_mut, None, Instant::now(), |_| true);
        assert_eq!(outcome, TickOutcome::Control);
    }

    #[test]
    fn voice_preempts_control_and_text() {
        let stats = Arc::new(Stats::new());
        let mut fm =
            AudioDrivenFrameManager::new(TargetType::Computer, Duration::from_secs(5), Duration::from_secs(5), stats);
        let proto = protocol();
        fm.queue_control_message(&proto, b"PING");

        let mut proto_mut = protocol();
        let opus = [0u8; crate::headers::rtp::OPUS_PAYLOAD_SIZE];
        let outcome = fm.tick(&mut proto_mut, Some(&opus), Instant::now(), |_| true);
        assert!(matches!(outcome, TickOutcome::Voice(_)));
    }

    #[test]
    fn modem_target_never_sends_keepalives() {
        let stats = Arc::new(Stats::new());
        let mut fm = AudioDrivenFrameManager::new(
            TargetType::Modem,
            Duration::from_millis(0),
            Duration::from_secs(5),
            stats.clone(),
        );
        let mut proto_mut = protocol();
        let outcome = fm.tick(&mut proto_mut, None, Instant::now(), |_| true);
        assert_eq!(outcome, TickOutcome::Idle);
        assert_eq!(stats.snapshot().keepalives_sent, 0);
    }

    #[test]
    fn computer_target_sends_keepalive_after_interval_elapses() {
        let stats = Arc::new(Stats::new());
        let mut fm = AudioDrivenFrameManager::new(
            TargetType::Computer,
            Duration::from_millis(0),
            Duration::from_secs(5),
            stats.clone(),
        );
        let mut proto_mut = protocol();
        let outcome = fm.tick(&mut proto_mut, None, Instant::now(), |_| true);
        assert_eq!(outcome, TickOutcome::Keepalive);
        assert_eq!(stats.snapshot().keepalives_sent, 1);
    }

    #[test]
    fn keepalives_stop_once_idle_timeout_elapses() {
        let stats = Arc::new(Stats::new());
        let mut fm = AudioDrivenFrameManager::new(
            TargetType::Computer,
            Duration::from_millis(0),
            Duration::from_millis(10),
            stats.clone(),
        );
        let mut proto_mut = protocol();
        let t0 = Instant::now();
        let first = fm.tick(&mut proto_mut, None, t0, |_| true);
        assert_eq!(first, TickOutcome::Keepalive);

        let later = t0 + Duration::from_millis(50);
        let second = fm.tick(&mut proto_mut, None, later, |_| true);
        assert_eq!(second, TickOutcome::Idle);
        assert_eq!(stats.snapshot().keepalives_sent, 1);
    }

    #[test]
    fn ptt_press_and_release_emit_control_markers() {
        let stats = Arc::new(Stats::new());
        let mut fm =
            AudioDrivenFrameManager::new(TargetType::Computer, Duration::from_secs(5), Duration::from_secs(5), stats);
        let proto = protocol();
        fm.set_voice_active(true, &proto);
        fm.set_voice_active(false, &proto);

        let mut proto_mut = protocol();
        let first = fm.tick(&mut proto_mut, None, Instant::now(), |_| true);
        let second = fm.tick(&mut proto_mut, None, Instant::now(), |_| true);
        assert_eq!(first, TickOutcome::Control);
        assert_eq!(second, TickOutcome::Control);
    }
}
