//! Keyboard controls
//!
//! Reads one key per line from stdin and feeds the same queue as the
//! remote. End of input stops the service.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use deckpilot_protocol::Command;
use tracing::{debug, warn};

use crate::input::HostInput;

/// Map one input line to an input
///
/// An empty line (bare Enter) selects.
pub fn parse_key(line: &str) -> Option<HostInput> {
    let key = line.trim().to_ascii_lowercase();
    let input = match key.as_str() {
        "up" | "k" => HostInput::Command(Command::Up),
        "down" | "j" => HostInput::Command(Command::Down),
        "" | "select" | "enter" => HostInput::Command(Command::Select),
        "f" | "esc" | "escape" => HostInput::ToggleFullscreen,
        "q" | "quit" => HostInput::Quit,
        _ => return None,
    };
    Some(input)
}

/// Forward keys from `reader` until EOF or `q`
pub fn forward_keys<R: BufRead>(reader: R, inputs: &Sender<HostInput>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Keyboard read failed");
                break;
            }
        };

        match parse_key(&line) {
            Some(input) => {
                debug!(?input, "Key");
                if inputs.send(input).is_err() || input == HostInput::Quit {
                    return;
                }
            }
            None => warn!(key = %line.trim(), "Unknown key"),
        }
    }

    let _ = inputs.send(HostInput::Quit);
}

/// Read keys from stdin on a background thread
pub fn spawn_stdin(inputs: Sender<HostInput>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("deckpilot-keys".to_string())
        .spawn(move || forward_keys(std::io::stdin().lock(), &inputs))
}
