pub mod transport;

pub use transport::{NetworkReceiver, NetworkTransmitter};
