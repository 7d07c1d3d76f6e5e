//! Navigation state and transitions
//!
//! | Mode       | Command   | Effect                              |
//! |------------|-----------|-------------------------------------|
//! | Listing    | Up/Down   | cursor moves by one, clamped        |
//! | Listing    | Select    | open highlighted deck at slide 0    |
//! | Fullscreen | Up/Down   | slide moves by one, clamped         |
//! | Fullscreen | Select    | close the deck, back to the listing |
//!
//! Indices clamp at the ends; they never wrap.

use deckpilot_protocol::Command;

use super::catalog::DeckCatalog;

/// View mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Listing,
    Fullscreen,
}

/// An open deck
///
/// Invariant: `page_count > 0` and `slide < page_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OpenDeck {
    /// Position of the deck in the listing
    pub deck: usize,
    pub slide: usize,
    pub page_count: usize,
}

impl OpenDeck {
    /// Check if the last slide is shown
    pub fn at_end(&self) -> bool {
        self.slide + 1 == self.page_count
    }
}

/// Observable result of one transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Nothing changed (clamped move, select on empty list)
    Unchanged,
    CursorMoved { cursor: usize },
    DeckOpened { deck: usize, page_count: usize },
    SlideChanged { slide: usize },
    DeckClosed { cursor: usize },
    /// The highlighted deck could not be opened; still listing
    DeckUnavailable { deck: usize },
}

/// Navigation state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    cursor: usize,
    open: Option<OpenDeck>,
}

impl NavigationState {
    /// Start in the listing with the cursor on the first deck
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view mode
    pub fn mode(&self) -> Mode {
        if self.open.is_some() {
            Mode::Fullscreen
        } else {
            Mode::Listing
        }
    }

    /// List cursor (kept while a deck is open)
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The open deck, in fullscreen mode
    pub fn open_deck(&self) -> Option<OpenDeck> {
        self.open
    }

    /// Apply one command
    pub fn handle<C: DeckCatalog>(&mut self, cmd: Command, catalog: &mut C) -> Transition {
        match self.open {
            None => self.handle_listing(cmd, catalog),
            Some(deck) => self.handle_fullscreen(cmd, deck),
        }
    }

    fn handle_listing<C: DeckCatalog>(&mut self, cmd: Command, catalog: &mut C) -> Transition {
        let count = catalog.deck_count();
        if count == 0 {
            return Transition::Unchanged;
        }
        // The catalog may have shrunk since the last command
        self.cursor = self.cursor.min(count - 1);

        match cmd {
            Command::Up | Command::Down => {
                let next = step_clamped(self.cursor, cmd, count);
                if next == self.cursor {
                    Transition::Unchanged
                } else {
                    self.cursor = next;
                    Transition::CursorMoved { cursor: next }
                }
            }
            Command::Select => match catalog.open_deck(self.cursor) {
                Ok(page_count) if page_count > 0 => {
                    self.open = Some(OpenDeck {
                        deck: self.cursor,
                        slide: 0,
                        page_count,
                    });
                    Transition::DeckOpened {
                        deck: self.cursor,
                        page_count,
                    }
                }
                _ => Transition::DeckUnavailable { deck: self.cursor },
            },
        }
    }

    fn handle_fullscreen(&mut self, cmd: Command, mut deck: OpenDeck) -> Transition {
        match cmd {
            Command::Up | Command::Down => {
                let next = step_clamped(deck.slide, cmd, deck.page_count);
                if next == deck.slide {
                    return Transition::Unchanged;
                }
                deck.slide = next;
                self.open = Some(deck);
                Transition::SlideChanged { slide: next }
            }
            Command::Select => {
                self.open = None;
                Transition::DeckClosed {
                    cursor: self.cursor,
                }
            }
        }
    }

    /// The open deck disappeared; fall back to the listing
    ///
    /// Returns the listing position of the lost deck.
    pub fn deck_lost(&mut self) -> Option<usize> {
        self.open.take().map(|deck| deck.deck)
    }

    /// The listing was rescanned; keep the cursor inside it
    pub fn catalog_changed(&mut self, count: usize) {
        self.cursor = self.cursor.min(count.saturating_sub(1));
    }

    /// Put the listing cursor on `index`, clamped to `count` decks
    ///
    /// Used after a rescan to follow a deck that moved in the listing.
    /// Ignored while a deck is open; returns whether the cursor moved.
    pub fn select(&mut self, index: usize, count: usize) -> bool {
        if self.open.is_some() {
            return false;
        }
        let cursor = index.min(count.saturating_sub(1));
        let moved = cursor != self.cursor;
        self.cursor = cursor;
        moved
    }

    /// The open deck was reloaded with a new page count
    ///
    /// The current slide is clamped. A deck that reloads empty is treated
    /// as lost.
    pub fn deck_reloaded(&mut self, page_count: usize) -> Transition {
        let Some(mut deck) = self.open else {
            return Transition::Unchanged;
        };

        if page_count == 0 {
            self.open = None;
            return Transition::DeckUnavailable { deck: deck.deck };
        }

        deck.page_count = page_count;
        deck.slide = deck.slide.min(page_count - 1);
        self.open = Some(deck);
        Transition::SlideChanged { slide: deck.slide }
    }
}

/// Move an index by one in the command's direction, clamped to `[0, len)`
fn step_clamped(index: usize, cmd: Command, len: usize) -> usize {
    match cmd.step() {
        s if s < 0 => index.saturating_sub(1),
        s if s > 0 => (index + 1).min(len.saturating_sub(1)),
        _ => index,
    }
}
