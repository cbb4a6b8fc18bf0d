//! CLI configuration, a derive-based `clap::Parser` struct. Flags behind
//! out-of-scope functionality (GPIO pins, audio device enumeration/test
//! modes, YAML config files) are still parsed and stored — their
//! handlers are stubs, not rejected input.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "interlocutor", about = "Opulent Voice digital radio endpoint")]
pub struct Config {
    /// This station's callsign, base-40 encoded on the wire.
    pub callsign: String,

    /// Destination IP address for outbound Opulent Voice frames.
    #[arg(short = 'i', long = "ip", default_value = "192.168.1.100")]
    pub dest_ip: String,

    /// Destination UDP port (base port; audio/text/control use adjacent ports).
    #[arg(short = 'p', long = "port", default_value_t = 57372)]
    pub dest_port: u16,

    /// Local UDP port this station listens on for inbound frames.
    #[arg(short = 'l', long = "listen-port", default_value_t = 57372)]
    pub listen_port: u16,

    /// Target type: "computer" enables keepalives, "modem" relies on the
    /// modem's own hang-time behavior.
    #[arg(long = "target-type", default_value = "computer")]
    pub target_type: String,

    /// Keepalive interval in seconds (only sent when target-type=computer).
    #[arg(long = "keepalive-interval", default_value_t = 5.0)]
    pub keepalive_interval_secs: f64,

    /// Idle timeout before the continuous stream stops, in seconds.
    #[arg(long = "idle-timeout", default_value_t = 5.0)]
    pub idle_timeout_secs: f64,

    /// GPIO pin for the push-to-talk button. Out of scope here (no GPIO
    /// backend); stored so the flag is accepted, not rejected.
    #[arg(long = "ptt-pin")]
    pub ptt_pin: Option<u32>,

    /// GPIO pin for the transmit LED. Out of scope here, see `ptt_pin`.
    #[arg(long = "led-pin")]
    pub led_pin: Option<u32>,

    /// Path to a YAML configuration file. Parsing is out of scope; CLI
    /// flags are the only supported configuration surface.
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// Write a template YAML configuration file and exit. Out of scope;
    /// the flag is accepted and logs a message explaining the limitation.
    #[arg(long = "create-config")]
    pub create_config: bool,

    /// Run in text-chat-only mode: never start the audio capture/playout
    /// pipeline. Control/text/keepalive scheduling is unaffected.
    #[arg(long = "chat-only")]
    pub chat_only: bool,

    /// List available audio input/output devices and exit. Requires the
    /// `audio-device` feature; out of scope for headless builds.
    #[arg(long = "list-audio")]
    pub list_audio: bool,

    /// Run a short audio device self-test and exit. Out of scope here.
    #[arg(long = "test-audio")]
    pub test_audio: bool,

    /// Interactively choose audio devices and exit. Out of scope here.
    #[arg(long = "setup-audio")]
    pub setup_audio: bool,

    /// Increase log verbosity (debug-level).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Suppress all but warning/error log output.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Config {
    pub fn keepalive_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.keepalive_interval_secs.max(0.0))
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.idle_timeout_secs.max(0.0))
    }

    pub fn target_type(&self) -> crate::frame_manager::TargetType {
        match self.target_type.to_ascii_lowercase().as_str() {
            "modem" => crate::frame_manager::TargetType::Modem,
            _ => crate::frame_manager::TargetType::Computer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Config::command().debug_assert();
    }

    #[test]
    fn parses_minimal_args() {
        let cfg = Config::parse_from(["interlocutor", "W1ABC"]);
        assert_eq!(cfg.callsign, "W1ABC");
        assert_eq!(cfg.dest_port, 57372);
        assert!(!cfg.chat_only);
    }

    #[test]
    fn modem_target_type_parses_case_insensitively() {
        let cfg = Config::parse_from(["interlocutor", "W1ABC", "--target-type", "MODEM"]);
        assert_eq!(cfg.target_type(), crate::frame_manager::TargetType::Modem);
    }
}
