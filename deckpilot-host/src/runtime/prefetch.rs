//! Background conversion of the slide after the one shown
//!
//! A single worker thread takes requests from a one-slot channel. A new
//! request replaces one the worker has not picked up yet, so a burst of
//! slide changes converts at most the slide in flight plus the latest.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::cache::{Presentation, SlideCache};
use crate::render::SlideConverter;

struct Request {
    presentation: Presentation,
    slide: usize,
}

/// Handle to the prefetch worker; joins it on drop
pub struct Prefetcher {
    requests: Option<Sender<Request>>,
    pending: Receiver<Request>,
    worker: Option<JoinHandle<()>>,
}

impl Prefetcher {
    pub fn spawn<C>(cache: Arc<SlideCache<C>>) -> io::Result<Self>
    where
        C: SlideConverter + 'static,
    {
        let (tx, rx) = bounded::<Request>(1);
        let pending = rx.clone();

        let worker = thread::Builder::new()
            .name("deckpilot-prefetch".to_string())
            .spawn(move || {
                for Request {
                    presentation,
                    slide,
                } in rx.iter()
                {
                    if cache.contains(&presentation.id, slide) {
                        continue;
                    }
                    match cache.get_slide(&presentation, slide) {
                        Ok(_) => debug!(slide, "Prefetched slide"),
                        Err(e) => debug!(slide, error = %e, "Prefetch failed"),
                    }
                }
                debug!("Prefetch worker stopped");
            })?;

        Ok(Self {
            requests: Some(tx),
            pending,
            worker: Some(worker),
        })
    }

    /// Queue `slide` for conversion, replacing a request still waiting
    pub fn request(&self, presentation: &Presentation, slide: usize) {
        let Some(tx) = &self.requests else {
            return;
        };

        let mut request = Request {
            presentation: presentation.clone(),
            slide,
        };
        loop {
            match tx.try_send(request) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    if let Ok(stale) = self.pending.try_recv() {
                        debug!(slide = stale.slide, "Dropped stale prefetch");
                    }
                    request = back;
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!("Prefetch worker is gone");
                    return;
                }
            }
        }
    }

    /// Drop any waiting request and join the worker
    ///
    /// A conversion already in flight runs to completion first.
    pub fn shutdown(&mut self) {
        while self.pending.try_recv().is_ok() {}
        self.requests = None;

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Prefetch worker panicked");
            }
        }
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
