//! Slideshow session: the image set, the current position and playback state,
//! backed by a look-ahead cache.
//!
//! Navigation is cyclic. When an image cannot be decoded the session keeps
//! moving in the direction of travel until it finds one that can.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{
    next_preset, SlideshowConfig, CACHE_SIZE_PRESETS, DEFAULT_CACHE_SIZE, DEFAULT_SPEED_MS,
    SPEED_PRESETS_MS,
};
use crate::error::{CacheError, SessionError};
use crate::models::{new_shuffle_seed, Direction, ImageSet};
use crate::prefetch::{DisplayImage, FileDecoder, ImageDecoder, LookaheadCache, SurfaceSize};

/// An image ready to be put on screen.
#[derive(Debug, Clone)]
pub struct Shown {
    pub index: usize,
    pub path: PathBuf,
    pub image: Arc<DisplayImage>,
}

pub struct SlideshowSession {
    images: ImageSet,
    position: usize,
    direction: Direction,
    cache: LookaheadCache,
    shuffle: bool,
    playing: bool,
    speed: Duration,
}

impl SlideshowSession {
    /// Session decoding files from disk.
    pub fn new(config: &SlideshowConfig) -> Self {
        Self::with_decoder(config, Arc::new(FileDecoder))
    }

    pub fn with_decoder(config: &SlideshowConfig, decoder: Arc<dyn ImageDecoder>) -> Self {
        let (width, height) = config.surface;
        let cache = LookaheadCache::new(decoder, SurfaceSize::new(width, height), config.cache_size)
            .with_prefetch_interval(config.prefetch_interval)
            .with_stop_timeout(config.stop_timeout);

        Self {
            images: ImageSet::default(),
            position: 0,
            direction: Direction::Forward,
            cache,
            shuffle: config.shuffle,
            playing: false,
            speed: Duration::from_millis(config.speed_ms),
        }
    }

    /// Installs a new image set and starts prefetching from its first image.
    pub fn load(&mut self, paths: Vec<PathBuf>) -> Result<(), SessionError> {
        if paths.is_empty() {
            return Err(SessionError::NoImages);
        }

        let mut images = ImageSet::new(paths);
        if self.shuffle {
            images.shuffle(new_shuffle_seed());
        }
        info!(count = images.len(), shuffle = self.shuffle, "Loaded images");

        self.cache.set_sources(images.paths().to_vec());
        self.images = images;
        self.position = 0;
        self.direction = Direction::Forward;
        self.cache.start_prefetch()?;
        Ok(())
    }

    /// Stops playback and prefetching and forgets the current image set.
    pub fn unload(&mut self) {
        self.playing = false;
        self.cache.stop_prefetch();
        self.cache.set_sources(Vec::new());
        self.images = ImageSet::default();
        self.position = 0;
        debug!("Unloaded image set");
    }

    /// Shows the current image, skipping forward past undecodable ones.
    pub fn show_current(&mut self) -> Result<Shown, SessionError> {
        self.show_from(self.position, self.direction)
    }

    pub fn next(&mut self) -> Result<Shown, SessionError> {
        self.step(Direction::Forward)
    }

    pub fn previous(&mut self) -> Result<Shown, SessionError> {
        self.step(Direction::Backward)
    }

    /// Drops the cached copy of the current image and decodes it again.
    pub fn reload_current(&mut self) -> Result<Shown, SessionError> {
        if self.images.is_empty() {
            return Err(SessionError::NoImages);
        }
        self.cache.invalidate(self.position);
        self.show_current()
    }

    fn step(&mut self, direction: Direction) -> Result<Shown, SessionError> {
        let start = self
            .images
            .step(self.position, direction)
            .ok_or(SessionError::NoImages)?;
        self.direction = direction;
        self.show_from(start, direction)
    }

    fn show_from(&mut self, start: usize, direction: Direction) -> Result<Shown, SessionError> {
        let len = self.images.len();
        if len == 0 {
            return Err(SessionError::NoImages);
        }

        let mut index = start;
        for _ in 0..len {
            self.position = index;
            self.cache.set_position(index as i64);

            match self.cache.get(index) {
                Ok(image) => {
                    let path = self.images.get(index).cloned().unwrap_or_default();
                    return Ok(Shown { index, path, image });
                }
                Err(CacheError::Decode { source, .. }) => {
                    warn!(
                        index,
                        path = ?source.path(),
                        error = %source,
                        "Skipping image that failed to decode"
                    );
                    index = self.images.step(index, direction).unwrap_or(index);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SessionError::AllFailed { attempts: len })
    }

    /// Switches between shuffled and path order, keeping the current image selected.
    ///
    /// Returns the new shuffle state. Without images the state is left unchanged.
    pub fn toggle_shuffle(&mut self) -> bool {
        if self.images.is_empty() {
            return self.shuffle;
        }

        self.shuffle = !self.shuffle;
        let current = self.images.get(self.position).cloned();
        if self.shuffle {
            self.images.shuffle(new_shuffle_seed());
        } else {
            self.images.unshuffle();
        }

        self.position = current
            .and_then(|path| self.images.index_of(&path))
            .unwrap_or(0);
        // Indices now point at different files.
        self.cache.set_sources(self.images.paths().to_vec());
        self.cache.set_position(self.position as i64);

        info!(shuffle = self.shuffle, "Toggled shuffle");
        self.shuffle
    }

    pub fn toggle_playback(&mut self) -> bool {
        self.playing = !self.playing;
        info!(playing = self.playing, "Toggled slideshow");
        self.playing
    }

    pub fn is_playing(&self) -> bool {
        self.playing && !self.images.is_empty()
    }

    pub fn set_speed(&mut self, speed_ms: u64) {
        self.speed = Duration::from_millis(speed_ms.max(1));
        debug!(speed_ms, "Slideshow speed changed");
    }

    pub fn speed(&self) -> Duration {
        self.speed
    }

    /// Moves to the next slide delay preset. Returns the new delay in milliseconds.
    pub fn cycle_speed(&mut self) -> u64 {
        let current = u64::try_from(self.speed.as_millis()).unwrap_or(u64::MAX);
        let speed_ms = next_preset(&SPEED_PRESETS_MS, current).unwrap_or(DEFAULT_SPEED_MS);
        self.set_speed(speed_ms);
        speed_ms
    }

    /// Changes the look-ahead window size. Returns how many entries were evicted.
    pub fn set_cache_size(&mut self, cache_size: usize) -> usize {
        self.cache.resize(cache_size)
    }

    /// Moves to the next cache size preset. Returns the new size and how many
    /// entries were evicted.
    pub fn cycle_cache_size(&mut self) -> (usize, usize) {
        let cache_size =
            next_preset(&CACHE_SIZE_PRESETS, self.cache.cache_size()).unwrap_or(DEFAULT_CACHE_SIZE);
        (cache_size, self.set_cache_size(cache_size))
    }

    pub fn set_surface(&self, width: u32, height: u32) {
        self.cache.surface().set(width, height);
    }

    /// `"3/10 - name.jpg"` for the current image.
    pub fn status_line(&self) -> Option<String> {
        let path = self.images.get(self.position)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(format!(
            "{}/{} - {}",
            self.position + 1,
            self.images.len(),
            name
        ))
    }

    /// Active modes, e.g. `"Slideshow Shuffle"`; empty when neither is on.
    pub fn mode_line(&self) -> String {
        let mut modes = Vec::new();
        if self.is_playing() {
            modes.push("Slideshow");
        }
        if self.shuffle {
            modes.push("Shuffle");
        }
        modes.join(" ")
    }

    /// Bytes held by decoded images in the cache.
    pub fn cache_memory_bytes(&self) -> usize {
        self.cache.memory_bytes()
    }

    pub fn cache_line(&self) -> String {
        format!(
            "Cache: {}/{}",
            self.cache.entry_count(),
            self.cache.cleanup_threshold()
        )
    }

    /// Stops the prefetch worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.playing = false;
        self.cache.stop_prefetch();
    }
}

#[cfg(test)]
impl SlideshowSession {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current_path(&self) -> Option<&std::path::Path> {
        self.images.get(self.position).map(PathBuf::as_path)
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn cache(&self) -> &LookaheadCache {
        &self.cache
    }
}

impl Drop for SlideshowSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefetch::test_support::{paths, wait_until, StubDecoder};
    use std::path::Path;

    fn config() -> SlideshowConfig {
        SlideshowConfig {
            cache_size: 2,
            surface: (840, 640),
            prefetch_interval: Duration::from_millis(5),
            ..Default::default()
        }
    }

    fn session_with(decoder: Arc<StubDecoder>, paths: Vec<PathBuf>) -> SlideshowSession {
        let mut session = SlideshowSession::with_decoder(&config(), decoder);
        session.load(paths).unwrap();
        session
    }

    #[test]
    fn test_load_empty_is_error() {
        let mut session = SlideshowSession::with_decoder(&config(), StubDecoder::new());
        assert!(matches!(session.load(Vec::new()), Err(SessionError::NoImages)));
        assert!(matches!(session.show_current(), Err(SessionError::NoImages)));
        assert!(matches!(session.next(), Err(SessionError::NoImages)));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut session = session_with(StubDecoder::new(), paths(3));

        assert_eq!(session.show_current().unwrap().index, 0);
        assert_eq!(session.previous().unwrap().index, 2);
        assert_eq!(session.next().unwrap().index, 0);
        assert_eq!(session.next().unwrap().index, 1);
        assert_eq!(session.cache().position(), 1);
    }

    #[test]
    fn test_shown_carries_path() {
        let files = paths(2);
        let mut session = session_with(StubDecoder::new(), files.clone());
        let shown = session.next().unwrap();
        assert_eq!(shown.path, files[1]);
        assert_eq!(session.current_path(), Some(files[1].as_path()));
    }

    #[test]
    fn test_failed_image_is_skipped_forward() {
        let files = vec![
            PathBuf::from("/img/a.png"),
            PathBuf::from("/img/bad.png"),
            PathBuf::from("/img/c.png"),
        ];
        let mut session = session_with(StubDecoder::new(), files);

        let shown = session.next().unwrap();
        assert_eq!(shown.index, 2);
        assert_eq!(session.position(), 2);
    }

    #[test]
    fn test_failed_image_is_skipped_backward() {
        let files = vec![
            PathBuf::from("/img/a.png"),
            PathBuf::from("/img/b.png"),
            PathBuf::from("/img/bad.png"),
        ];
        let mut session = session_with(StubDecoder::new(), files);

        // 0 -> 2 (bad) -> 1
        let shown = session.previous().unwrap();
        assert_eq!(shown.index, 1);
    }

    #[test]
    fn test_all_images_failing() {
        let files = vec![PathBuf::from("/img/bad1.png"), PathBuf::from("/img/bad2.png")];
        let mut session = session_with(StubDecoder::new(), files);
        assert!(matches!(
            session.show_current(),
            Err(SessionError::AllFailed { attempts: 2 })
        ));
    }

    #[test]
    fn test_reload_decodes_again() {
        let decoder = StubDecoder::new();
        let mut session = session_with(decoder.clone(), paths(1));
        session.show_current().unwrap();
        assert!(wait_until(|| session.cache().contains(0)));

        let before = decoder.calls();
        session.reload_current().unwrap();
        assert!(decoder.calls() > before);
    }

    #[test]
    fn test_toggle_shuffle_keeps_current_image() {
        let mut session = session_with(StubDecoder::new(), paths(30));
        session.next().unwrap();
        session.next().unwrap();
        let current = session.current_path().map(Path::to_path_buf);

        assert!(session.toggle_shuffle());
        assert!(session.is_shuffled());
        assert_eq!(session.current_path().map(Path::to_path_buf), current);
        assert_eq!(session.cache().position(), session.position());

        assert!(!session.toggle_shuffle());
        assert_eq!(session.position(), 2);
        assert_eq!(session.current_path().map(Path::to_path_buf), current);
    }

    #[test]
    fn test_toggle_shuffle_without_images_is_noop() {
        let mut session = SlideshowSession::with_decoder(&config(), StubDecoder::new());
        assert!(!session.toggle_shuffle());
        assert!(!session.is_shuffled());
    }

    #[test]
    fn test_load_applies_shuffle() {
        let mut session = SlideshowSession::with_decoder(
            &SlideshowConfig {
                shuffle: true,
                ..config()
            },
            StubDecoder::new(),
        );
        let files = paths(40);
        session.load(files.clone()).unwrap();
        assert!(session.is_shuffled());

        let mut seen: Vec<PathBuf> = (0..40)
            .map(|_| session.next().unwrap().path)
            .collect();
        assert_ne!(seen, {
            let mut rotated = files.clone();
            rotated.rotate_left(1);
            rotated
        });
        seen.sort();
        assert_eq!(seen, files);
    }

    #[test]
    fn test_playback_and_speed() {
        let mut session = SlideshowSession::with_decoder(&config(), StubDecoder::new());
        assert_eq!(session.speed(), Duration::from_millis(3000));

        session.toggle_playback();
        // Nothing to play without images.
        assert!(!session.is_playing());

        session.load(paths(2)).unwrap();
        assert!(session.is_playing());
        session.set_speed(500);
        assert_eq!(session.speed(), Duration::from_millis(500));
        assert_eq!(session.mode_line(), "Slideshow");

        assert!(!session.toggle_playback());
        assert_eq!(session.mode_line(), "");
    }

    #[test]
    fn test_status_lines() {
        let mut session = session_with(StubDecoder::new(), paths(10));
        session.next().unwrap();
        session.next().unwrap();

        assert_eq!(session.status_line().as_deref(), Some("3/10 - 002_400x300.png"));
        assert!(session.cache_line().starts_with("Cache: "));
        assert!(session.cache_line().ends_with("/4"));
    }

    #[test]
    fn test_cycle_speed_walks_presets() {
        let mut session = SlideshowSession::with_decoder(&config(), StubDecoder::new());
        assert_eq!(session.cycle_speed(), 5000);
        assert_eq!(session.cycle_speed(), 10000);
        assert_eq!(session.cycle_speed(), 500);
        assert_eq!(session.speed(), Duration::from_millis(500));

        session.set_speed(1200);
        assert_eq!(session.cycle_speed(), 3000);
    }

    #[test]
    fn test_cycle_cache_size_walks_presets() {
        let mut session = session_with(StubDecoder::new(), paths(10));
        session.shutdown();

        assert_eq!(session.cycle_cache_size().0, 5);
        assert_eq!(session.cache().cache_size(), 5);
        assert_eq!(session.cycle_cache_size().0, 10);
        assert_eq!(session.cycle_cache_size().0, 20);
        assert_eq!(session.cycle_cache_size().0, 50);
        assert_eq!(session.cycle_cache_size().0, 5);
        assert_eq!(session.cache_line(), format!("Cache: {}/10", session.cache().entry_count()));
    }

    #[test]
    fn test_cache_memory_bytes_tracks_shown_images() {
        let mut session = session_with(StubDecoder::new(), paths(3));
        session.shutdown();

        // Every stub image has the same size.
        let shown = session.show_current().unwrap();
        let entries = session.cache().entry_count();
        assert!(entries >= 1);
        assert_eq!(session.cache_memory_bytes(), entries * shown.image.memory_bytes());
    }

    #[test]
    fn test_set_cache_size_trims() {
        let mut session = session_with(StubDecoder::new(), paths(10));
        session.cache().resize(10);
        for _ in 0..4 {
            session.next().unwrap();
        }
        session.shutdown();

        session.set_cache_size(1);
        assert_eq!(
            session.cache().cached_indices().into_iter().collect::<Vec<_>>(),
            vec![4]
        );
    }

    #[test]
    fn test_unload_resets() {
        let mut session = session_with(StubDecoder::new(), paths(5));
        session.toggle_playback();
        session.unload();

        assert!(session.is_empty());
        assert!(!session.is_playing());
        assert!(!session.cache().is_prefetching());
        assert_eq!(session.cache().entry_count(), 0);
        assert!(session.status_line().is_none());
    }
}
