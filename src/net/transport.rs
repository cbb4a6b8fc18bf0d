//! UDP transport: a fire-and-forget sender used directly from the
//! audio/TX thread, and a dedicated receive thread that blocks on
//! `recv_from` with a timeout so it can observe shutdown requests.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::stats::Stats;

const RECV_POLL_TIMEOUT: Duration = Duration::from_millis(250);

pub struct NetworkTransmitter {
    socket: Arc<UdpSocket>,
    dest: std::net::SocketAddr,
    stats: Arc<Stats>,
}

impl NetworkTransmitter {
    pub fn new(socket: Arc<UdpSocket>, dest: std::net::SocketAddr, stats: Arc<Stats>) -> Self {
        Self { socket, dest, stats }
    }

    /// Send one wire frame. Best-effort: a send error is logged and
    /// counted, never propagated, matching the audio thread's real-time
    /// budget — there is no time to retry within a 40ms tick.
    pub fn send_frame(&self, frame: &[u8]) -> bool {
        match self.socket.send_to(frame, self.dest) {
            Ok(n) if n == frame.len() => {
                Stats::incr(&self.stats.wire_frames_transmitted);
                true
            }
            Ok(n) => {
                warn!(sent = n, expected = frame.len(), "short UDP send");
                Stats::incr(&self.stats.transport_send_errors);
                false
            }
            Err(err) => {
                warn!(%err, "UDP send failed");
                Stats::incr(&self.stats.transport_send_errors);
                false
            }
        }
    }
}

pub struct NetworkReceiver {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl NetworkReceiver {
    /// Spawn the receive thread. `socket` should already be bound to the
    /// local listen address; frames arrive on the returned channel as
    /// raw wire-frame bytes for the caller to hand to `protocol::parse_wire_frame`.
    pub fn spawn(socket: UdpSocket, stats: Arc<Stats>) -> (Self, Receiver<Vec<u8>>) {
        socket
            .set_read_timeout(Some(RECV_POLL_TIMEOUT))
            .expect("setting a finite read timeout cannot fail");

        let (tx, rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = shutdown.clone();

        let handle = std::thread::Builder::new()
            .name("ov-rx".into())
            .spawn(move || receive_loop(socket, tx, stats, thread_shutdown))
            .expect("failed to spawn receive thread");

        (Self { shutdown, handle: Some(handle) }, rx)
    }

    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for NetworkReceiver {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn receive_loop(socket: UdpSocket, tx: Sender<Vec<u8>>, stats: Arc<Stats>, shutdown: Arc<AtomicBool>) {
    let mut buf = [0u8; 2048];
    while !shutdown.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                debug!(bytes = n, %from, "UDP datagram received");
                if tx.send(buf[..n].to_vec()).is_err() {
                    break; // receiver side dropped, nothing left to do
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock || err.kind() == std::io::ErrorKind::TimedOut => {
                continue;
            }
            Err(err) => {
                warn!(%err, "UDP receive failed");
                Stats::incr(&stats.transport_recv_errors);
            }
        }
    }
}

pub fn bind(listen_port: u16) -> Result<UdpSocket, TransportError> {
    UdpSocket::bind(("0.0.0.0", listen_port)).map_err(TransportError::BindFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn send_frame_reports_success_on_loopback() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let listen_addr = listener.local_addr().unwrap();
        let sender_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
        let stats = Arc::new(Stats::new());
        let tx = NetworkTransmitter::new(sender_socket, listen_addr, stats.clone());

        assert!(tx.send_frame(b"hello"));
        assert_eq!(stats.snapshot().wire_frames_transmitted, 1);

        let mut buf = [0u8; 16];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn receiver_forwards_datagrams_to_channel() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr: SocketAddr = socket.local_addr().unwrap();
        let stats = Arc::new(Stats::new());
        let (receiver, rx) = NetworkReceiver::spawn(socket, stats);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"ping", addr).unwrap();

        let frame = rx.recv_timeout(Duration::from_secs(2)).expect("frame arrives");
        assert_eq!(frame, b"ping");
        receiver.shutdown();
    }
}
