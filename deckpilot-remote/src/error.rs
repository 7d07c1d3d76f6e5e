//! Remote error type

/// Errors surfaced by the remote loop
///
/// Only boot-time radio setup and GPIO reads are reported; link loss and
/// failed notifications are handled inside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteError<P, R> {
    /// Reading a button pin failed
    Pin(P),
    /// The radio rejected the initial characteristic value
    Radio(R),
}
