//! Slide cache
//!
//! Rasterised slides are cached per (presentation identity, slide index).
//! A presentation's identity includes its modification time, so an edited
//! file never serves stale slides. Entries are evicted least recently used
//! first once either the entry count or the byte ceiling is exceeded.
//!
//! The map lock is only held for lookup and insert/evict. Conversion runs
//! unlocked, so two threads missing on the same key may both convert it;
//! the second insert replaces the first.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::render::{DeckFormat, RenderSize, SlideConverter, SlideImage};

/// Which file, as of which modification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PresentationId {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Deck metadata returned by [`SlideCache::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub id: PresentationId,
    pub format: DeckFormat,
    pub page_count: usize,
}

impl Presentation {
    pub fn path(&self) -> &Path {
        &self.id.path
    }
}

/// Eviction ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub max_bytes: usize,
}

impl From<&CacheConfig> for CacheLimits {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
        }
    }
}

type Key = (PresentationId, usize);

struct Entry {
    image: Arc<SlideImage>,
    last_access: u64,
}

#[derive(Default)]
struct Entries {
    map: HashMap<Key, Entry>,
    bytes: usize,
    clock: u64,
}

impl Entries {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn hit(&mut self, key: &Key) -> Option<Arc<SlideImage>> {
        let now = self.tick();
        let entry = self.map.get_mut(key)?;
        entry.last_access = now;
        Some(entry.image.clone())
    }

    fn insert(&mut self, key: Key, image: Arc<SlideImage>) {
        let last_access = self.tick();
        self.bytes += image.byte_size();
        if let Some(old) = self.map.insert(key, Entry { image, last_access }) {
            self.bytes -= old.image.byte_size();
        }
    }

    /// Drop least recently used entries until within limits; a single
    /// entry larger than the byte ceiling is kept
    fn evict(&mut self, limits: CacheLimits) {
        while self.map.len() > 1
            && (self.map.len() > limits.max_entries || self.bytes > limits.max_bytes)
        {
            let Some(oldest) = self
                .map
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            if let Some(entry) = self.map.remove(&oldest) {
                self.bytes -= entry.image.byte_size();
                debug!(path = %oldest.0.path.display(), index = oldest.1, "Evicted slide");
            }
        }
    }

    fn remove_where(&mut self, mut stale: impl FnMut(&PresentationId) -> bool) -> usize {
        let before = self.map.len();
        let mut freed = 0;
        self.map.retain(|(id, _), entry| {
            let is_stale = stale(id);
            if is_stale {
                freed += entry.image.byte_size();
            }
            !is_stale
        });
        self.bytes -= freed;
        before - self.map.len()
    }
}

/// Lazily populated slide cache in front of a [`SlideConverter`]
pub struct SlideCache<C> {
    converter: C,
    size: RenderSize,
    limits: CacheLimits,
    entries: Mutex<Entries>,
}

impl<C: SlideConverter> SlideCache<C> {
    pub fn new(converter: C, size: RenderSize, limits: CacheLimits) -> Self {
        Self {
            converter,
            size,
            limits,
            entries: Mutex::new(Entries::default()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read a deck's identity and page count
    ///
    /// Entries for older versions of the same file are dropped.
    pub fn load(&self, path: &Path) -> Result<Presentation, CacheError> {
        let unavailable = |source: io::Error| CacheError::PresentationUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let format = DeckFormat::from_path(path).ok_or_else(|| {
            unavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a .pptx or .pdf file",
            ))
        })?;
        let modified = modified_time(path).map_err(unavailable)?;

        let page_count =
            self.converter
                .page_count(path, format)
                .map_err(|source| CacheError::OpenFailure {
                    path: path.to_path_buf(),
                    source,
                })?;

        let id = PresentationId {
            path: path.to_path_buf(),
            modified,
        };
        let dropped = self
            .entries()
            .remove_where(|old| old.path == id.path && old.modified != id.modified);
        if dropped > 0 {
            debug!(path = %path.display(), dropped, "Dropped slides of an older version");
        }

        info!(path = %path.display(), page_count, "Loaded presentation");
        Ok(Presentation {
            id,
            format,
            page_count,
        })
    }

    /// Fetch one slide, converting it on a miss
    pub fn get_slide(
        &self,
        presentation: &Presentation,
        index: usize,
    ) -> Result<Arc<SlideImage>, CacheError> {
        if index >= presentation.page_count {
            return Err(CacheError::SlideOutOfRange {
                index,
                page_count: presentation.page_count,
            });
        }

        let id = &presentation.id;
        let key = (id.clone(), index);

        match modified_time(&id.path) {
            Ok(modified) if modified != id.modified => {
                self.invalidate(id);
                return Err(CacheError::PresentationChanged {
                    path: id.path.clone(),
                });
            }
            Ok(_) => {}
            Err(source) => {
                // Still servable from cache until invalidated
                if let Some(image) = self.entries().hit(&key) {
                    warn!(
                        path = %id.path.display(),
                        index,
                        "Source unavailable, serving cached slide"
                    );
                    return Ok(image);
                }
                return Err(CacheError::PresentationUnavailable {
                    path: id.path.clone(),
                    source,
                });
            }
        }

        if let Some(image) = self.entries().hit(&key) {
            debug!(path = %id.path.display(), index, "Cache hit");
            return Ok(image);
        }

        debug!(path = %id.path.display(), index, "Cache miss, converting");
        let image = self
            .converter
            .render_page(&id.path, presentation.format, index, self.size)
            .map(Arc::new)
            .map_err(|source| CacheError::ConversionFailure { index, source })?;

        let mut entries = self.entries();
        entries.insert(key, image.clone());
        entries.evict(self.limits);
        Ok(image)
    }

    /// Drop every cached slide of one presentation version
    pub fn invalidate(&self, id: &PresentationId) -> usize {
        let dropped = self.entries().remove_where(|cached| cached == id);
        info!(path = %id.path.display(), dropped, "Invalidated presentation");
        dropped
    }

    pub fn contains(&self, id: &PresentationId, index: usize) -> bool {
        self.entries().map.contains_key(&(id.clone(), index))
    }

    pub fn len(&self) -> usize {
        self.entries().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total pixel bytes held
    pub fn bytes(&self) -> usize {
        self.entries().bytes
    }

    pub fn render_size(&self) -> RenderSize {
        self.size
    }
}

fn modified_time(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use proptest::prelude::*;
    use std::fs::File;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Renders `width x 1` images, counting conversions
    struct CountingConverter {
        pages: usize,
        width: u32,
        broken_page: Option<usize>,
        renders: Arc<AtomicUsize>,
    }

    impl CountingConverter {
        fn new(pages: usize) -> (Self, Arc<AtomicUsize>) {
            let renders = Arc::new(AtomicUsize::new(0));
            let converter = Self {
                pages,
                width: 4,
                broken_page: None,
                renders: renders.clone(),
            };
            (converter, renders)
        }
    }

    impl SlideConverter for CountingConverter {
        fn page_count(&self, _source: &Path, _format: DeckFormat) -> Result<usize, ConvertError> {
            Ok(self.pages)
        }

        fn render_page(
            &self,
            _source: &Path,
            _format: DeckFormat,
            page: usize,
            _size: RenderSize,
        ) -> Result<SlideImage, ConvertError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            if self.broken_page == Some(page) {
                return Err(ConvertError::MissingOutput(PathBuf::from("page.png")));
            }
            Ok(SlideImage::filled(self.width, 1, [page as u8, 0, 0]))
        }
    }

    /// Fresh directory containing `talk.pdf`
    fn deck_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "deckpilot-cache-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("talk.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    fn size() -> RenderSize {
        RenderSize {
            width: 4,
            height: 1,
        }
    }

    fn limits(max_entries: usize, max_bytes: usize) -> CacheLimits {
        CacheLimits {
            max_entries,
            max_bytes,
        }
    }

    #[test]
    fn test_second_get_is_a_hit() {
        let path = deck_file("hit");
        let (converter, renders) = CountingConverter::new(3);
        let cache = SlideCache::new(converter, size(), limits(8, 1024));

        let deck = cache.load(&path).unwrap();
        assert_eq!(deck.page_count, 3);
        assert_eq!(deck.format, DeckFormat::Pdf);

        let first = cache.get_slide(&deck, 1).unwrap();
        let second = cache.get_slide(&deck, 1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(cache.bytes(), 12);
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let path = deck_file("range");
        let (converter, renders) = CountingConverter::new(2);
        let cache = SlideCache::new(converter, size(), limits(8, 1024));
        let deck = cache.load(&path).unwrap();

        assert!(matches!(
            cache.get_slide(&deck, 2),
            Err(CacheError::SlideOutOfRange {
                index: 2,
                page_count: 2
            })
        ));
        assert_eq!(renders.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_evicts_least_recently_used_by_count() {
        let path = deck_file("lru");
        let (converter, renders) = CountingConverter::new(5);
        let cache = SlideCache::new(converter, size(), limits(2, 1024));
        let deck = cache.load(&path).unwrap();

        cache.get_slide(&deck, 0).unwrap();
        cache.get_slide(&deck, 1).unwrap();
        cache.get_slide(&deck, 0).unwrap();
        cache.get_slide(&deck, 2).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&deck.id, 0));
        assert!(!cache.contains(&deck.id, 1));
        assert!(cache.contains(&deck.id, 2));

        cache.get_slide(&deck, 1).unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_evicts_by_bytes() {
        let path = deck_file("bytes");
        let (converter, _) = CountingConverter::new(4);
        // 12 bytes per slide
        let cache = SlideCache::new(converter, size(), limits(10, 30));
        let deck = cache.load(&path).unwrap();

        for index in 0..4 {
            cache.get_slide(&deck, index).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.bytes(), 24);
    }

    #[test]
    fn test_keeps_single_oversize_entry() {
        let path = deck_file("oversize");
        let (converter, _) = CountingConverter::new(2);
        let cache = SlideCache::new(converter, size(), limits(10, 5));
        let deck = cache.load(&path).unwrap();

        cache.get_slide(&deck, 0).unwrap();
        assert_eq!(cache.len(), 1);
        cache.get_slide(&deck, 1).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&deck.id, 1));
    }

    #[test]
    fn test_deleted_source_serves_cached_slides_only() {
        let path = deck_file("deleted");
        let (converter, _) = CountingConverter::new(3);
        let cache = SlideCache::new(converter, size(), limits(8, 1024));
        let deck = cache.load(&path).unwrap();

        cache.get_slide(&deck, 0).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(cache.get_slide(&deck, 0).is_ok());
        assert!(matches!(
            cache.get_slide(&deck, 1),
            Err(CacheError::PresentationUnavailable { .. })
        ));
        assert!(matches!(
            cache.load(&path),
            Err(CacheError::PresentationUnavailable { .. })
        ));

        cache.invalidate(&deck.id);
        assert!(cache.get_slide(&deck, 0).is_err());
    }

    #[test]
    fn test_modified_source_is_detected() {
        let path = deck_file("modified");
        let (converter, renders) = CountingConverter::new(3);
        let cache = SlideCache::new(converter, size(), limits(8, 1024));
        let deck = cache.load(&path).unwrap();
        cache.get_slide(&deck, 0).unwrap();

        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(deck.id.modified + Duration::from_secs(60))
            .unwrap();
        drop(file);

        assert!(matches!(
            cache.get_slide(&deck, 0),
            Err(CacheError::PresentationChanged { .. })
        ));
        assert!(cache.is_empty());

        let reloaded = cache.load(&path).unwrap();
        assert_ne!(reloaded.id, deck.id);
        cache.get_slide(&reloaded, 0).unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_conversion_failure_is_per_slide() {
        let path = deck_file("broken");
        let (mut converter, _) = CountingConverter::new(3);
        converter.broken_page = Some(1);
        let cache = SlideCache::new(converter, size(), limits(8, 1024));
        let deck = cache.load(&path).unwrap();

        assert!(matches!(
            cache.get_slide(&deck, 1),
            Err(CacheError::ConversionFailure { index: 1, .. })
        ));
        assert!(cache.get_slide(&deck, 2).is_ok());
        assert!(!cache.contains(&deck.id, 1));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = deck_file("ext").with_extension("key");
        let (converter, _) = CountingConverter::new(1);
        let cache = SlideCache::new(converter, size(), limits(8, 1024));
        assert!(matches!(
            cache.load(&path),
            Err(CacheError::PresentationUnavailable { .. })
        ));
    }

    proptest! {
        #[test]
        fn test_limits_hold_for_any_access_order(
            accesses in proptest::collection::vec(0usize..10, 1..60),
            max_entries in 1usize..6,
        ) {
            let path = deck_file("prop");
            let (converter, _) = CountingConverter::new(10);
            let cache = SlideCache::new(converter, size(), limits(max_entries, 40));
            let deck = cache.load(&path).unwrap();

            for index in accesses {
                let image = cache.get_slide(&deck, index).unwrap();
                prop_assert_eq!(image.pixel(0, 0)[0], index as u8);
                prop_assert!(cache.len() <= max_entries);
                prop_assert!(cache.bytes() <= 40);
                prop_assert!(cache.contains(&deck.id, index));
            }
        }
    }
}
