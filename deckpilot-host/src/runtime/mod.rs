//! Navigation runtime
//!
//! The consumer side of the input queue. It owns the navigation state, the
//! library listing and the display surface, and applies inputs strictly in
//! receipt order. Rendering blocks this thread; inputs queue up meanwhile
//! and every one of them is processed.
//!
//! Link status changes only update the indicator and the fullscreen toggle
//! only reaches the surface. Neither touches navigation.

mod prefetch;

use std::sync::Arc;

use crossbeam_channel::Receiver;
use deckpilot_core::navigation::{
    DeckCatalog, DeckUnavailable, Mode, NavigationState, Transition,
};
use deckpilot_protocol::Command;
use tracing::{debug, error, info, warn};

use crate::cache::{Presentation, SlideCache};
use crate::error::CacheError;
use crate::input::{HostInput, LinkStatus};
use crate::library::Library;
use crate::render::SlideConverter;
use crate::surface::{DisplaySurface, Frame, ListingRow, Scene};

pub use prefetch::Prefetcher;

/// Status bar text after a conversion failure
pub const SLIDE_ERROR_STATUS: &str = "Error displaying slide";

/// Borrowed view of the library used while a command is applied
struct Catalog<'a, C> {
    library: &'a mut Library,
    cache: &'a SlideCache<C>,
    opened: &'a mut Option<Presentation>,
    failure: &'a mut Option<String>,
}

impl<C: SlideConverter> DeckCatalog for Catalog<'_, C> {
    fn deck_count(&self) -> usize {
        self.library.len()
    }

    fn open_deck(&mut self, index: usize) -> Result<usize, DeckUnavailable> {
        let Some(entry) = self.library.get(index) else {
            return Err(DeckUnavailable);
        };

        let reason = match self.cache.load(&entry.path) {
            Ok(presentation) if presentation.page_count > 0 => {
                let page_count = presentation.page_count;
                *self.opened = Some(presentation);
                return Ok(page_count);
            }
            Ok(_) => "presentation has no slides".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(deck = %entry.name, %reason, "Failed to open presentation");
        self.library.flag(index);
        *self.failure = Some(reason);
        Err(DeckUnavailable)
    }
}

/// Consumer of the input queue
pub struct Runtime<C, S> {
    library: Library,
    cache: Arc<SlideCache<C>>,
    surface: S,
    navigation: NavigationState,
    presentation: Option<Presentation>,
    scene: Scene,
    status: String,
    link: LinkStatus,
    prefetch: Option<Prefetcher>,
}

impl<C, S> Runtime<C, S>
where
    C: SlideConverter + 'static,
    S: DisplaySurface,
{
    pub fn new(library: Library, cache: Arc<SlideCache<C>>, surface: S) -> Self {
        Self {
            library,
            cache,
            surface,
            navigation: NavigationState::new(),
            presentation: None,
            scene: Scene::Listing {
                rows: Vec::new(),
                cursor: 0,
            },
            status: String::new(),
            link: LinkStatus::default(),
            prefetch: None,
        }
    }

    /// Convert the following slide in the background after each slide shown
    pub fn with_prefetch(mut self, enabled: bool) -> Self {
        self.prefetch = None;
        if enabled {
            match Prefetcher::spawn(self.cache.clone()) {
                Ok(prefetcher) => self.prefetch = Some(prefetcher),
                Err(e) => warn!(error = %e, "Failed to spawn prefetch worker"),
            }
        }
        self
    }

    /// Scan the library and show the listing
    pub fn start(&mut self) {
        self.rescan();
        self.status = match self.library.len() {
            0 => "No presentations found".to_string(),
            n => format!("Found {n} presentations"),
        };
        info!(
            dir = %self.library.dir().display(),
            decks = self.library.len(),
            "{}",
            self.status
        );
        self.show_listing();
    }

    /// Process inputs until `Quit` or until every sender is gone
    pub fn run(&mut self, inputs: &Receiver<HostInput>) {
        self.start();

        while let Ok(input) = inputs.recv() {
            if !self.apply(input) {
                info!("Quit requested");
                return;
            }
        }
        info!("Input queue closed");
    }

    /// Apply one input; returns false on `Quit`
    pub fn apply(&mut self, input: HostInput) -> bool {
        match input {
            HostInput::Command(cmd) => self.handle_command(cmd),
            HostInput::Link(status) => {
                if status != self.link {
                    info!(link = status.label(), "Link indicator changed");
                    self.link = status;
                    self.present();
                }
            }
            HostInput::ToggleFullscreen => {
                let fullscreen = self.surface.toggle_fullscreen();
                info!(fullscreen, "Toggled fullscreen");
                self.present();
            }
            HostInput::Quit => return false,
        }
        true
    }

    fn handle_command(&mut self, cmd: Command) {
        let mut failure = None;
        let transition = {
            let mut catalog = Catalog {
                library: &mut self.library,
                cache: &self.cache,
                opened: &mut self.presentation,
                failure: &mut failure,
            };
            self.navigation.handle(cmd, &mut catalog)
        };
        debug!(command = cmd.token(), ?transition, "Applied command");

        match transition {
            Transition::Unchanged => {}
            Transition::CursorMoved { cursor } => {
                if let Some(deck) = self.library.get(cursor) {
                    self.status = format!("Selected: {}", deck.name);
                }
                self.show_listing();
            }
            Transition::DeckOpened { deck, page_count } => {
                let name = self
                    .library
                    .get(deck)
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                info!(deck = %name, page_count, "Starting presentation");
                self.status = format!("Starting: {name}");
                self.show_slide();
            }
            Transition::SlideChanged { slide } => {
                debug!(slide, "Slide changed");
                self.show_slide();
            }
            Transition::DeckClosed { cursor } => {
                info!(cursor, "Presentation ended");
                let closed = self.presentation.take();
                self.rescan();
                // Keep the highlight on the closed deck if the listing shifted
                if let Some(index) = closed.and_then(|p| self.library.position(p.path())) {
                    self.navigation.select(index, self.library.len());
                }
                self.status = "Presentation ended".to_string();
                self.show_listing();
            }
            Transition::DeckUnavailable { deck } => {
                let reason = failure.unwrap_or_else(|| "unavailable".to_string());
                warn!(deck, %reason, "Presentation unavailable");
                self.presentation = None;
                self.status = format!("Error loading presentation: {reason}");
                self.show_listing();
            }
        }
    }

    /// Show the open deck's current slide
    ///
    /// A modified source is reloaded once and the slide index clamped to
    /// the new page count before retrying.
    fn show_slide(&mut self) {
        let mut reloaded = false;

        loop {
            let (Some(open), Some(presentation)) =
                (self.navigation.open_deck(), self.presentation.clone())
            else {
                self.lose_deck("no presentation loaded".to_string());
                return;
            };

            match self.cache.get_slide(&presentation, open.slide) {
                Ok(image) => {
                    self.status = format!("Slide {} of {}", open.slide + 1, open.page_count);
                    self.scene = Scene::Slide {
                        image,
                        index: open.slide,
                        count: open.page_count,
                    };
                    self.present();
                    self.prefetch_after(&presentation, open.slide);
                    return;
                }
                Err(CacheError::ConversionFailure { index, source }) => {
                    error!(index, error = %source, "Error displaying slide");
                    self.status = SLIDE_ERROR_STATUS.to_string();
                    self.scene = Scene::Placeholder {
                        index,
                        count: open.page_count,
                        message: source.to_string(),
                    };
                    self.present();
                    return;
                }
                Err(CacheError::PresentationChanged { path }) if !reloaded => {
                    reloaded = true;
                    info!(path = %path.display(), "Presentation changed on disk, reloading");
                    match self.cache.load(&path) {
                        Ok(fresh) => {
                            let page_count = fresh.page_count;
                            self.presentation = Some(fresh);
                            if let Transition::DeckUnavailable { .. } =
                                self.navigation.deck_reloaded(page_count)
                            {
                                self.lose_deck("presentation has no slides".to_string());
                                return;
                            }
                        }
                        Err(e) => {
                            self.lose_deck(e.to_string());
                            return;
                        }
                    }
                }
                Err(e) => {
                    self.lose_deck(e.to_string());
                    return;
                }
            }
        }
    }

    /// The open deck cannot be shown any more; flag it and list again
    fn lose_deck(&mut self, reason: String) {
        let deck = self.navigation.deck_lost();
        warn!(?deck, %reason, "Presentation unavailable, back to listing");

        if let Some(presentation) = self.presentation.take() {
            self.cache.invalidate(&presentation.id);
            self.library.flag_path(presentation.path());
        }

        self.rescan();
        self.status = format!("Presentation unavailable: {reason}");
        self.show_listing();
    }

    fn prefetch_after(&self, presentation: &Presentation, slide: usize) {
        let Some(prefetcher) = &self.prefetch else {
            return;
        };
        let next = slide + 1;
        if next < presentation.page_count && !self.cache.contains(&presentation.id, next) {
            prefetcher.request(presentation, next);
        }
    }

    fn rescan(&mut self) {
        if let Err(e) = self.library.scan() {
            warn!(
                dir = %self.library.dir().display(),
                error = %e,
                "Failed to scan presentations"
            );
        }
        self.navigation.catalog_changed(self.library.len());
    }

    fn show_listing(&mut self) {
        let rows = self
            .library
            .decks()
            .iter()
            .map(|d| ListingRow {
                name: d.name.clone(),
                flagged: d.flagged,
            })
            .collect();
        self.scene = Scene::Listing {
            rows,
            cursor: self.navigation.cursor(),
        };
        self.present();
    }

    fn present(&mut self) {
        let frame = Frame {
            scene: self.scene.clone(),
            status: self.status.clone(),
            link: self.link,
        };
        if let Err(e) = self.surface.present(&frame) {
            warn!(error = %e, "Failed to present frame");
        }
    }

    pub fn mode(&self) -> Mode {
        self.navigation.mode()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn presentation(&self) -> Option<&Presentation> {
        self.presentation.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn link(&self) -> LinkStatus {
        self.link
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Stop the prefetch worker, waiting for a conversion in flight
    pub fn shutdown(&mut self) {
        if let Some(mut prefetcher) = self.prefetch.take() {
            prefetcher.shutdown();
        }
    }
}
