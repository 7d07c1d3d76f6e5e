//! Presentation directory listing

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::render::DeckFormat;

/// One listed deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckEntry {
    /// File name shown in the listing
    pub name: String,
    pub path: PathBuf,
    pub format: DeckFormat,
    /// Set when the deck failed to open
    pub flagged: bool,
}

/// Sorted `.pptx` / `.pdf` files of one directory
#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
    decks: Vec<DeckEntry>,
}

impl Library {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            decks: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-read the directory
    ///
    /// Flags survive a rescan for files that are still present. A missing
    /// or unreadable directory leaves the library empty.
    pub fn scan(&mut self) -> io::Result<usize> {
        let flagged: HashSet<PathBuf> = self
            .decks
            .iter()
            .filter(|d| d.flagged)
            .map(|d| d.path.clone())
            .collect();
        self.decks.clear();

        let entries = fs::read_dir(&self.dir)?;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(format) = DeckFormat::from_path(&path) else {
                continue;
            };
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!(path = %path.display(), "Skipping non UTF-8 file name");
                continue;
            };

            self.decks.push(DeckEntry {
                name: name.to_string(),
                flagged: flagged.contains(&path),
                path,
                format,
            });
        }

        self.decks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(self.decks.len())
    }

    /// Mark a deck as failing to open
    pub fn flag(&mut self, index: usize) {
        if let Some(deck) = self.decks.get_mut(index) {
            deck.flagged = true;
        }
    }

    /// Mark a deck by path; returns false if it is no longer listed
    pub fn flag_path(&mut self, path: &Path) -> bool {
        match self.decks.iter_mut().find(|d| d.path == path) {
            Some(deck) => {
                deck.flagged = true;
                true
            }
            None => false,
        }
    }

    /// Listing position of the deck at `path`
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.decks.iter().position(|d| d.path == path)
    }

    pub fn get(&self, index: usize) -> Option<&DeckEntry> {
        self.decks.get(index)
    }

    pub fn decks(&self) -> &[DeckEntry] {
        &self.decks
    }

    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_with(name: &str, files: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "deckpilot-library-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("nested.pdf")).unwrap();
        for file in files {
            fs::write(dir.join(file), b"deck").unwrap();
        }
        dir
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = dir_with("scan", &["b.pdf", "notes.txt", "a.pptx", "C.PDF", "old.ppt"]);
        let mut library = Library::new(&dir);

        assert_eq!(library.scan().unwrap(), 3);
        let names: Vec<_> = library.decks().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["C.PDF", "a.pptx", "b.pdf"]);
        assert_eq!(library.get(1).unwrap().format, DeckFormat::Pptx);
    }

    #[test]
    fn test_flags_survive_rescan() {
        let dir = dir_with("flags", &["a.pdf", "b.pdf"]);
        let mut library = Library::new(&dir);
        library.scan().unwrap();

        library.flag(1);
        assert!(library.flag_path(&dir.join("a.pdf")));
        fs::remove_file(dir.join("a.pdf")).unwrap();
        fs::write(dir.join("c.pdf"), b"deck").unwrap();

        library.scan().unwrap();
        let flags: Vec<_> = library
            .decks()
            .iter()
            .map(|d| (d.name.as_str(), d.flagged))
            .collect();
        assert_eq!(flags, [("b.pdf", true), ("c.pdf", false)]);
        assert!(!library.flag_path(&dir.join("a.pdf")));
    }

    #[test]
    fn test_position_follows_rescan() {
        let dir = dir_with("position", &["b.pdf", "c.pdf"]);
        let mut library = Library::new(&dir);
        library.scan().unwrap();
        assert_eq!(library.position(&dir.join("c.pdf")), Some(1));

        fs::write(dir.join("a.pdf"), b"deck").unwrap();
        library.scan().unwrap();
        assert_eq!(library.position(&dir.join("c.pdf")), Some(2));
        assert_eq!(library.position(&dir.join("gone.pdf")), None);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let mut library = Library::new("/nonexistent/deckpilot/decks");
        assert!(library.scan().is_err());
        assert!(library.is_empty());
    }
}
