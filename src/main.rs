//! interlocutor main: wires configuration, the protocol engine, and the
//! three real-time threads — audio/TX, RX, and UI — that keep the
//! station running until shutdown.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use interlocutor::chat::{ChatInputOutcome, ChatManager};
use interlocutor::commands::CommandDispatcher;
use interlocutor::config::Config;
use interlocutor::frame_manager::AudioDrivenFrameManager;
use interlocutor::headers::ip::IpHeaderBuilder;
use interlocutor::net::transport::{self, NetworkReceiver, NetworkTransmitter};
use interlocutor::protocol::{self, ProtocolEngine};
use interlocutor::station::StationIdentifier;
use interlocutor::stats::Stats;
use interlocutor::ui::{self, UiEvent, UiIntent};

const TICK_PERIOD: Duration = Duration::from_millis(40);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = Config::parse();

    if cfg.create_config {
        info!("--create-config is not implemented by this build; use CLI flags directly");
        return Ok(());
    }
    if cfg.list_audio || cfg.test_audio || cfg.setup_audio {
        info!("audio device enumeration/self-test is out of scope for this build");
        return Ok(());
    }

    match run(cfg) {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(%err, "fatal error");
            std::process::exit(1);
        }
    }
}

fn run(cfg: Config) -> Result<()> {
    let station = StationIdentifier::new(&cfg.callsign).context("invalid callsign")?;
    let dest_ip: Ipv4Addr = cfg.dest_ip.parse().context("invalid destination IP")?;
    let source_ip = IpHeaderBuilder::detect_local_ip(dest_ip);

    info!(%station, %source_ip, %dest_ip, "starting interlocutor");

    let stats = Arc::new(Stats::new());
    let protocol = Arc::new(Mutex::new(ProtocolEngine::new(station.clone(), source_ip, dest_ip, 0, stats.clone())));

    let socket = transport::bind(cfg.listen_port)?;
    let dest_addr = std::net::SocketAddr::new(dest_ip.into(), cfg.dest_port);
    let transmitter = Arc::new(NetworkTransmitter::new(Arc::new(socket.try_clone()?), dest_addr, stats.clone()));
    let (receiver, rx_frames) = NetworkReceiver::spawn(socket, stats.clone());

    let frame_manager = Arc::new(Mutex::new(AudioDrivenFrameManager::new(
        cfg.target_type(),
        cfg.keepalive_interval(),
        cfg.idle_timeout(),
        stats.clone(),
    )));

    let shutdown = Arc::new(AtomicBool::new(false));
    let ptt_active = Arc::new(AtomicBool::new(false));
    let (ui_tx, ui_rx) = ui::channel();

    let render_handle = spawn_ui_render_thread(ui_rx, shutdown.clone());
    let rx_handle = spawn_rx_thread(rx_frames, stats.clone(), ui_tx.clone(), shutdown.clone());
    let tx_handle = spawn_tx_thread(
        cfg.chat_only,
        frame_manager.clone(),
        protocol.clone(),
        transmitter,
        shutdown.clone(),
        ptt_active.clone(),
    );
    run_ui_loop(frame_manager, protocol, station, ui_tx, shutdown.clone(), ptt_active);

    shutdown.store(true, Ordering::SeqCst);
    receiver.shutdown();
    let _ = rx_handle.join();
    let _ = tx_handle.join();
    let _ = render_handle.join();

    let snapshot = stats.snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => info!(stats = %json, "shutdown complete"),
        Err(err) => {
            warn!(%err, "failed to serialize stats snapshot");
            info!(?snapshot, "shutdown complete");
        }
    }
    Ok(())
}

fn spawn_tx_thread(
    chat_only: bool,
    frame_manager: Arc<Mutex<AudioDrivenFrameManager>>,
    protocol: Arc<Mutex<ProtocolEngine>>,
    transmitter: Arc<NetworkTransmitter>,
    shutdown: Arc<AtomicBool>,
    ptt_active: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    #[cfg(feature = "audio-device")]
    if !chat_only {
        return spawn_tx_thread_with_audio(frame_manager, protocol, transmitter, shutdown, ptt_active);
    }
    #[cfg(not(feature = "audio-device"))]
    let _ = chat_only;

    spawn_tx_thread_headless(frame_manager, protocol, transmitter, shutdown)
}

/// Timer-driven scheduler loop used in `--chat-only` mode or builds
/// without the `audio-device` feature: no PCM ever arrives, so the tick
/// is paced by a plain sleep loop instead of the capture callback.
fn spawn_tx_thread_headless(
    frame_manager: Arc<Mutex<AudioDrivenFrameManager>>,
    protocol: Arc<Mutex<ProtocolEngine>>,
    transmitter: Arc<NetworkTransmitter>,
    shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("ov-tx".into())
        .spawn(move || run_headless_tick_loop(&frame_manager, &protocol, &transmitter, &shutdown))
        .expect("failed to spawn TX thread")
}

/// Plain 40ms-cadence sleep loop driving the scheduler when no PCM
/// callback is available to pace it (headless builds, `--chat-only`,
/// or as a fallback if audio capture fails to start).
fn run_headless_tick_loop(
    frame_manager: &Arc<Mutex<AudioDrivenFrameManager>>,
    protocol: &Arc<Mutex<ProtocolEngine>>,
    transmitter: &Arc<NetworkTransmitter>,
    shutdown: &Arc<AtomicBool>,
) {
    let mut next_tick = Instant::now();
    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= next_tick {
            let mut fm = frame_manager.lock().expect("frame manager lock poisoned");
            let mut proto = protocol.lock().expect("protocol lock poisoned");
            fm.tick(&mut proto, None, now, |frame| transmitter.send_frame(frame));
            next_tick += TICK_PERIOD;
        } else {
            std::thread::sleep(next_tick - now);
        }
    }
}

/// Audio-driven scheduler: the cpal capture callback calls `on_frame`
/// once per 40ms PCM frame, and the tick happens right there. This
/// thread just keeps the `Capture` (and therefore its stream) alive
/// until shutdown.
#[cfg(feature = "audio-device")]
fn spawn_tx_thread_with_audio(
    frame_manager: Arc<Mutex<AudioDrivenFrameManager>>,
    protocol: Arc<Mutex<ProtocolEngine>>,
    transmitter: Arc<NetworkTransmitter>,
    shutdown: Arc<AtomicBool>,
    ptt_active: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    use interlocutor::audio::{Capture, OpusCodec, SAMPLE_RATE};

    std::thread::Builder::new()
        .name("ov-tx".into())
        .spawn(move || {
            let codec = Mutex::new(match OpusCodec::new(SAMPLE_RATE, 1) {
                Ok(c) => c,
                Err(err) => {
                    error!(%err, "failed to initialize OPUS codec, falling back to silent ticks");
                    return;
                }
            });

            let on_frame_fm = frame_manager.clone();
            let on_frame_proto = protocol.clone();
            let on_frame_ptt = ptt_active.clone();
            let on_frame_tx = transmitter.clone();

            let capture = Capture::start(SAMPLE_RATE, 1, move |pcm: &[i16]| {
                let opus_packet = if on_frame_ptt.load(Ordering::Relaxed) {
                    let mut buf = [0u8; interlocutor::headers::rtp::OPUS_PAYLOAD_SIZE];
                    match codec.lock().expect("codec lock poisoned").encode(pcm, &mut buf) {
                        Ok(n) if n == buf.len() => Some(buf),
                        Ok(n) => {
                            warn!(got = n, expected = buf.len(), "unexpected OPUS packet size, dropping frame");
                            None
                        }
                        Err(err) => {
                            warn!(%err, "OPUS encode failed");
                            None
                        }
                    }
                } else {
                    None
                };

                let mut fm = on_frame_fm.lock().expect("frame manager lock poisoned");
                let mut proto = on_frame_proto.lock().expect("protocol lock poisoned");
                fm.tick(&mut proto, opus_packet.as_ref().map(|b| b.as_slice()), Instant::now(), |frame| {
                    on_frame_tx.send_frame(frame)
                });
            });

            match capture {
                Ok(_capture) => {
                    while !shutdown.load(Ordering::SeqCst) {
                        std::thread::sleep(Duration::from_millis(100));
                    }
                }
                Err(err) => {
                    error!(%err, "failed to start audio capture, running headless");
                    run_headless_tick_loop(&frame_manager, &protocol, &transmitter, &shutdown);
                }
            }
        })
        .expect("failed to spawn TX thread")
}

fn spawn_rx_thread(
    rx_frames: crossbeam_channel::Receiver<Vec<u8>>,
    stats: Arc<Stats>,
    ui_tx: crossbeam_channel::Sender<UiEvent>,
    shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("ov-rx-dispatch".into())
        .spawn(move || {
            let mut reassembler = interlocutor::framing::Reassembler::new();
            while !shutdown.load(Ordering::SeqCst) {
                let Ok(wire_frame) = rx_frames.recv_timeout(Duration::from_millis(250)) else {
                    continue;
                };
                handle_inbound_frame(&wire_frame, &mut reassembler, &stats, &ui_tx);
            }
        })
        .expect("failed to spawn RX dispatch thread")
}

fn handle_inbound_frame(
    wire_frame: &[u8],
    reassembler: &mut interlocutor::framing::Reassembler,
    stats: &Stats,
    ui_tx: &crossbeam_channel::Sender<UiEvent>,
) {
    let parsed = match protocol::parse_wire_frame(wire_frame) {
        Ok(p) => p,
        Err(err) => {
            warn!(%err, "dropping malformed wire frame");
            Stats::incr(&stats.protocol_errors);
            return;
        }
    };

    let frames = match reassembler.add_payload(&parsed.payload) {
        Ok(frames) => frames,
        Err(err @ interlocutor::error::ReassemblyError::Overflow(_)) => {
            warn!(%err, "reassembly error");
            Stats::incr(&stats.reassembly_errors);
            Stats::incr(&stats.reassembly_overflows);
            return;
        }
        Err(err) => {
            warn!(%err, "reassembly error");
            Stats::incr(&stats.reassembly_errors);
            return;
        }
    };
    Stats::add(&stats.frames_dropped, reassembler.take_empty_frames_dropped());

    for frame in frames {
        let mut with_delimiter = frame;
        with_delimiter.push(0);
        match interlocutor::cobs::decode(&with_delimiter) {
            Ok(ip_packet) => {
                Stats::incr(&stats.reassembly_frames_completed);
                dispatch_ip_packet(&parsed.station, &ip_packet, stats, ui_tx);
            }
            Err(err) => {
                warn!(%err, "COBS decode error");
                Stats::incr(&stats.protocol_errors);
            }
        }
    }
}

fn dispatch_ip_packet(
    from: &StationIdentifier,
    ip_packet: &[u8],
    stats: &Stats,
    ui_tx: &crossbeam_channel::Sender<UiEvent>,
) {
    let Ok(ip_header) = interlocutor::headers::ip::parse_header(ip_packet) else {
        Stats::incr(&stats.protocol_errors);
        return;
    };
    let udp_bytes = &ip_packet[interlocutor::headers::ip::HEADER_SIZE..];
    let Some(udp_header) = interlocutor::headers::udp::parse_header(udp_bytes) else {
        Stats::incr(&stats.protocol_errors);
        return;
    };
    let payload = &udp_bytes[interlocutor::headers::udp::HEADER_SIZE..];

    match protocol::classify_port(udp_header.dest_port) {
        Ok(protocol::DecodedClass::Text) => {
            let text = String::from_utf8_lossy(payload).into_owned();
            let _ = ui_tx.send(UiEvent::TextReceived { from: from.clone(), text });
        }
        Ok(protocol::DecodedClass::Control) => {
            if payload.starts_with(b"KEEPALIVE") {
                // Keepalives are expected traffic, not surfaced to the UI
                // to avoid spamming it.
            } else {
                let _ = ui_tx.send(UiEvent::ControlReceived { from: from.clone(), data: payload.to_vec() });
            }
        }
        Ok(protocol::DecodedClass::Audio) => {
            let _ = ui_tx.send(UiEvent::StatusLine(format!(
                "VOICE received from {from} ({} bytes, playout not wired in this build)",
                payload.len()
            )));
        }
        Err(err) => {
            warn!(%err, "unknown destination port");
            Stats::incr(&stats.protocol_errors);
        }
    }
    let _ = ip_header;
}

/// Drains `UiEvent`s and renders them as log lines. Stands in for a real
/// UI (terminal chat view, web bridge) the way `ui::spawn_stdin_reader`
/// stands in for real input — this build's "renderer" is `tracing`.
fn spawn_ui_render_thread(
    ui_rx: crossbeam_channel::Receiver<UiEvent>,
    shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("ov-ui-render".into())
        .spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                let Ok(event) = ui_rx.recv_timeout(Duration::from_millis(250)) else {
                    continue;
                };
                match event {
                    UiEvent::TextReceived { from, text } => info!(%from, %text, "TEXT received"),
                    UiEvent::ControlReceived { from, data } => info!(%from, data = ?data, "CONTROL received"),
                    UiEvent::CommandResult(result) if result.is_error() => {
                        warn!(error = ?result.error, "command error")
                    }
                    UiEvent::CommandResult(result) => info!(summary = %result.summary, "command result"),
                    UiEvent::StatusLine(line) => info!("{line}"),
                }
            }
        })
        .expect("failed to spawn UI render thread")
}

fn run_ui_loop(
    frame_manager: Arc<Mutex<AudioDrivenFrameManager>>,
    protocol: Arc<Mutex<ProtocolEngine>>,
    _station: StationIdentifier,
    ui_tx: crossbeam_channel::Sender<UiEvent>,
    shutdown: Arc<AtomicBool>,
    ptt_active: Arc<AtomicBool>,
) {
    let intents = ui::spawn_stdin_reader();
    let mut chat = ChatManager::new();
    let dispatcher = CommandDispatcher::new();

    info!("ready — type a message and press enter to queue it as text");
    while !shutdown.load(Ordering::SeqCst) {
        let Ok(intent) = intents.recv_timeout(Duration::from_millis(250)) else {
            continue;
        };
        match intent {
            UiIntent::Shutdown => break,
            UiIntent::SetPtt(active) => {
                ptt_active.store(active, Ordering::Relaxed);
                let proto = protocol.lock().expect("protocol lock poisoned");
                frame_manager.lock().expect("frame manager lock poisoned").set_voice_active(active, &proto);
                for flushed in chat.set_ptt_active(active) {
                    queue_text(&frame_manager, &proto, &flushed);
                }
            }
            UiIntent::ChatLine(line) => {
                if let Some(result) = dispatcher.dispatch(&line) {
                    let _ = ui_tx.send(UiEvent::CommandResult(result));
                    continue;
                }
                match chat.handle_input(&line) {
                    ChatInputOutcome::Empty => {}
                    ChatInputOutcome::Buffered { pending_count, .. } => {
                        let _ = ui_tx.send(UiEvent::StatusLine(format!(
                            "message buffered until PTT release ({pending_count} pending)"
                        )));
                    }
                    ChatInputOutcome::Queued { message } => {
                        let proto = protocol.lock().expect("protocol lock poisoned");
                        queue_text(&frame_manager, &proto, &message);
                    }
                }
            }
        }
    }
}

fn queue_text(frame_manager: &Arc<Mutex<AudioDrivenFrameManager>>, protocol: &ProtocolEngine, text: &str) {
    frame_manager.lock().expect("frame manager lock poisoned").queue_text_message(protocol, text);
}
