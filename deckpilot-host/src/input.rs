//! Inputs consumed by the navigation runtime
//!
//! Wireless commands, keyboard keys and link status changes all arrive on
//! one unbounded queue and are processed strictly in receipt order.

use deckpilot_core::session::LinkReport;
use deckpilot_protocol::Command;

/// Link status shown by the display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    Disconnected,
    Connected,
    /// Still retrying after this many consecutive failures
    Unreachable { failures: u32 },
}

impl LinkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Disconnected => "Disconnected",
            LinkStatus::Connected => "Connected",
            LinkStatus::Unreachable { .. } => "Unreachable",
        }
    }
}

impl From<LinkReport> for LinkStatus {
    fn from(report: LinkReport) -> Self {
        match report {
            LinkReport::Connected => LinkStatus::Connected,
            LinkReport::Lost => LinkStatus::Disconnected,
            LinkReport::Unreachable { failures } => LinkStatus::Unreachable { failures },
        }
    }
}

/// One item on the input queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInput {
    /// A navigation command from the remote or the keyboard
    Command(Command),
    Link(LinkStatus),
    /// Flip the display's fullscreen flag; navigation is untouched
    ToggleFullscreen,
    Quit,
}
