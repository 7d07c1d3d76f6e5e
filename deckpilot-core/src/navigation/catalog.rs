//! Deck catalog seam
//!
//! Navigation only needs to know how many decks are listed and how many
//! pages a deck has once opened. Scanning directories and parsing files is
//! the host's business.

/// A deck could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeckUnavailable;

/// Source of the listed decks
pub trait DeckCatalog {
    /// Number of decks in the listing
    fn deck_count(&self) -> usize;

    /// Load a deck's metadata and return its page count
    fn open_deck(&mut self, index: usize) -> Result<usize, DeckUnavailable>;
}
