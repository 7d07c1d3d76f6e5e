//! Link session reducers
//!
//! Radio callbacks on the controller and connection results on the host are
//! turned into event streams and folded by explicit reducers. The reducers
//! decide what to do next; the caller performs the I/O.

pub mod backoff;
pub mod controller;
pub mod host;

pub use backoff::Backoff;
pub use controller::{
    ConnectionState, ControllerSession, Route, SessionAction, SessionEvent, SessionStats,
};
pub use host::{HostAction, HostEvent, HostLinkState, HostSession, LinkReport};
