//! Runtime configuration for the slideshow.
//!
//! Defaults can be overridden through `SLIDESHOW_*` environment variables.

use std::time::Duration;

use tracing::warn;

/// Images kept around the current position by default.
pub const DEFAULT_CACHE_SIZE: usize = 10;

/// Default delay between slides in milliseconds.
pub const DEFAULT_SPEED_MS: u64 = 3000;

/// Surface used before the viewport reports a real size.
pub const DEFAULT_SURFACE: (u32, u32) = (1920, 1080);

/// Pause between prefetch sweeps.
pub const PREFETCH_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on how long stopping the prefetch worker may wait for it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Slide delays offered by the speed menu.
pub const SPEED_PRESETS_MS: [u64; 5] = [500, 1000, 3000, 5000, 10000];

/// Cache sizes offered by the cache menu.
pub const CACHE_SIZE_PRESETS: [usize; 4] = [5, 10, 20, 50];

#[derive(Debug, Clone, PartialEq)]
pub struct SlideshowConfig {
    /// Number of images in the look-ahead window.
    pub cache_size: usize,
    /// Delay between slides while playing.
    pub speed_ms: u64,
    /// Start with a shuffled order.
    pub shuffle: bool,
    /// Initial display surface (width, height).
    pub surface: (u32, u32),
    /// Pause between prefetch sweeps.
    pub prefetch_interval: Duration,
    /// Bounded wait when stopping the prefetch worker.
    pub stop_timeout: Duration,
    /// Descend into subdirectories when scanning a folder.
    pub recursive: bool,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            speed_ms: DEFAULT_SPEED_MS,
            shuffle: false,
            surface: DEFAULT_SURFACE,
            prefetch_interval: PREFETCH_INTERVAL,
            stop_timeout: STOP_TIMEOUT,
            recursive: true,
        }
    }
}

impl SlideshowConfig {
    /// Defaults overlaid with any valid `SLIDESHOW_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("SLIDESHOW_CACHE_SIZE") {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => config.cache_size = size,
                _ => warn!(value = %raw, "Ignoring invalid SLIDESHOW_CACHE_SIZE"),
            }
        }

        if let Some(raw) = lookup("SLIDESHOW_SPEED_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.speed_ms = ms,
                _ => warn!(value = %raw, "Ignoring invalid SLIDESHOW_SPEED_MS"),
            }
        }

        if let Some(raw) = lookup("SLIDESHOW_SHUFFLE") {
            config.shuffle = parse_flag(&raw);
        }

        if let Some(raw) = lookup("SLIDESHOW_SURFACE") {
            match parse_surface(&raw) {
                Some(surface) => config.surface = surface,
                None => warn!(value = %raw, "Ignoring invalid SLIDESHOW_SURFACE"),
            }
        }

        config
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// The preset after `current`, wrapping to the first one.
///
/// `current` need not be a preset itself; the next larger preset is chosen.
pub fn next_preset<T: Copy + PartialOrd>(presets: &[T], current: T) -> Option<T> {
    presets
        .iter()
        .copied()
        .find(|preset| *preset > current)
        .or_else(|| presets.first().copied())
}

/// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
pub fn parse_surface(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let w = w.trim().parse::<u32>().ok()?;
    let h = h.trim().parse::<u32>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}
