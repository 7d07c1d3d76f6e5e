//! Embassy runner for the remote loop
//!
//! Drives [`Remote::tick`] from an embassy-time ticker. Board crates spawn
//! this from their executor task after constructing the pins and radio.

use embassy_time::{Duration, Instant, Ticker};

use deckpilot_core::timing::TICK_INTERVAL_MS;
use deckpilot_hal::{GattServer, InputPin};

use crate::error::RemoteError;
use crate::remote::Remote;

/// Boot the remote and tick it forever
///
/// Only returns if a button pin or the initial radio setup fails.
pub async fn run<U, D, G, P>(mut remote: Remote<U, D, G>) -> RemoteError<P, G::Error>
where
    U: InputPin<Error = P>,
    D: InputPin<Error = P>,
    G: GattServer,
{
    let start = Instant::now();

    if let Err(e) = remote.boot(0) {
        return e;
    }

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));

    loop {
        ticker.next().await;

        let now_ms = start.elapsed().as_millis();
        if let Err(e) = remote.tick(now_ms) {
            return e;
        }
    }
}
