//! Remote commands and their notification tokens
//!
//! The controller publishes one short ASCII token per notification. The
//! closed token set is `Ready`, `UP`, `DOWN` and `SELECT`; `Ready` is only
//! ever the initial characteristic value and never reaches navigation.

/// Discrete command produced by the button decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Short press on the UP button
    Up,
    /// Short press on the DOWN button
    Down,
    /// Long press on either button
    Select,
}

/// A value carried by the command characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// Presence sentinel written before the first command
    Ready,
    /// A decoded button command
    Command(Command),
}

/// Reasons a payload is not a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TokenError {
    /// Payload had no bytes (or only whitespace)
    Empty,
    /// Payload was not valid UTF-8
    NotUtf8,
    /// Payload was text outside the token set
    Unknown,
}

// Wire tokens
const TOKEN_READY: &str = "Ready";
const TOKEN_UP: &str = "UP";
const TOKEN_DOWN: &str = "DOWN";
const TOKEN_SELECT: &str = "SELECT";

/// Longest token in the set
pub const MAX_TOKEN_LEN: usize = 6;

impl Command {
    /// Wire token for this command
    pub const fn token(self) -> &'static str {
        match self {
            Command::Up => TOKEN_UP,
            Command::Down => TOKEN_DOWN,
            Command::Select => TOKEN_SELECT,
        }
    }

    /// Wire token as notification bytes
    pub const fn as_bytes(self) -> &'static [u8] {
        self.token().as_bytes()
    }

    /// Returns the signed list/slide movement for this command
    ///
    /// `Select` does not move a cursor and returns 0.
    pub fn step(&self) -> i8 {
        match self {
            Command::Up => -1,
            Command::Down => 1,
            Command::Select => 0,
        }
    }
}

impl Notification {
    /// Wire token for this notification
    pub const fn token(self) -> &'static str {
        match self {
            Notification::Ready => TOKEN_READY,
            Notification::Command(cmd) => cmd.token(),
        }
    }

    /// Parse a notification payload
    ///
    /// Surrounding ASCII whitespace and trailing NUL padding are ignored;
    /// some central stacks hand the characteristic value back zero-padded.
    pub fn parse(payload: &[u8]) -> Result<Self, TokenError> {
        let text = core::str::from_utf8(payload).map_err(|_| TokenError::NotUtf8)?;
        let text = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
        if text.is_empty() {
            return Err(TokenError::Empty);
        }

        match text {
            TOKEN_READY => Ok(Notification::Ready),
            TOKEN_UP => Ok(Notification::Command(Command::Up)),
            TOKEN_DOWN => Ok(Notification::Command(Command::Down)),
            TOKEN_SELECT => Ok(Notification::Command(Command::Select)),
            _ => Err(TokenError::Unknown),
        }
    }

    /// The command carried by this notification, if any
    pub fn command(self) -> Option<Command> {
        match self {
            Notification::Ready => None,
            Notification::Command(cmd) => Some(cmd),
        }
    }
}

impl From<Command> for Notification {
    fn from(cmd: Command) -> Self {
        Notification::Command(cmd)
    }
}
