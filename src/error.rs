//! Error taxonomy for the frame engine, split by subsystem the way
//! `server/control/src/errors.rs` splits control-plane errors: one flat
//! `thiserror` enum per concern, application code bridges to `anyhow` at
//! the thread/task boundary.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallsignError {
    #[error("invalid character '{0}' in callsign")]
    InvalidCharacter(char),
    #[error("callsign is empty")]
    Empty,
    #[error("encoded callsign exceeds 6-byte field (value {0:#x})")]
    TooLong(u64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CobsError {
    #[error("COBS stream truncated mid-block")]
    Truncated,
    #[error("unexpected zero byte before COBS terminator")]
    UnexpectedZero,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("OPUS payload must be exactly {expected} bytes, got {got}")]
    ProtocolViolation { expected: usize, got: usize },
    #[error("datagram too large for IPv4 ({0} bytes)")]
    DatagramTooLarge(usize),
    #[error("malformed IPv4 header: {0}")]
    MalformedIp(&'static str),
    #[error("malformed UDP header: {0}")]
    MalformedUdp(&'static str),
    #[error("unknown destination port {0}")]
    UnknownPort(u16),
    #[error(transparent)]
    Cobs(#[from] CobsError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyError {
    #[error("reassembly buffer exceeded safety ceiling of {0} bytes, buffer cleared")]
    Overflow(usize),
    #[error("empty COBS frame between two delimiters")]
    EmptyFrame,
    #[error("expected {expected}-byte frame payload, got {got}")]
    InvalidPayloadSize { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to bind UDP socket: {0}")]
    BindFailed(#[source] std::io::Error),
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),
    #[error("receive failed: {0}")]
    RecvFailed(#[source] std::io::Error),
}
