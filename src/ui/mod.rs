//! UI boundary. Rendering (terminal chat display, web UI/WebSocket
//! bridge) is out of scope — this module only defines the channel types
//! the engine needs to talk to *some* UI, plus a minimal stdin line
//! reader good enough to drive `ChatManager`/`CommandDispatcher`
//! end to end without pulling in a TUI/GUI dependency.

use std::io::BufRead;

use crossbeam_channel::{Receiver, Sender};

use crate::station::StationIdentifier;

/// Events the engine emits for the UI to render.
#[derive(Debug, Clone)]
pub enum UiEvent {
    TextReceived { from: StationIdentifier, text: String },
    ControlReceived { from: StationIdentifier, data: Vec<u8> },
    CommandResult(crate::commands::CommandResult),
    StatusLine(String),
}

/// Intents the UI sends into the engine.
#[derive(Debug, Clone)]
pub enum UiIntent {
    ChatLine(String),
    SetPtt(bool),
    Shutdown,
}

pub fn channel() -> (Sender<UiEvent>, Receiver<UiEvent>) {
    crossbeam_channel::unbounded()
}

/// Reads lines from stdin and turns them into [`UiIntent::ChatLine`],
/// recognizing a bare `quit`/`exit` line as a shutdown request. Spawns
/// its own thread since `stdin().lock().lines()` blocks.
pub fn spawn_stdin_reader() -> Receiver<UiIntent> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("ov-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let trimmed = line.trim();
                let intent = match trimmed {
                    "quit" | "exit" => UiIntent::Shutdown,
                    _ => UiIntent::ChatLine(line),
                };
                let is_shutdown = matches!(intent, UiIntent::Shutdown);
                if tx.send(intent).is_err() || is_shutdown {
                    break;
                }
            }
        })
        .expect("failed to spawn stdin reader thread");
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_event_channel_round_trips() {
        let (tx, rx) = channel();
        tx.send(UiEvent::StatusLine("hi".into())).unwrap();
        match rx.recv().unwrap() {
            UiEvent::StatusLine(s) => assert_eq!(s, "hi"),
            _ => panic!("unexpected variant"),
        }
    }
}
