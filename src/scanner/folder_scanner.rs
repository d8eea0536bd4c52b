//! Folder scanner for discovering slideshow images.
//!
//! - Recursive directory walk using walkdir
//! - Image detection by file extension
//! - Progress reporting over a channel while the walk runs on a blocking task

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File extensions treated as images (lowercase).
pub const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// How many files are processed between progress messages.
const PROGRESS_EVERY: usize = 50;

/// Configuration for the folder scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to scan directories recursively.
    pub recursive: bool,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

/// Progress information sent during scanning.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanProgress {
    /// Scanning has started; `total` files will be examined.
    Started { path: PathBuf, total: usize },
    /// Periodic update while walking.
    Progress { percent: f32, found: usize },
    /// Scanning completed.
    Completed { found: usize },
}

impl ScanProgress {
    /// One-line description for status displays.
    pub fn message(&self) -> String {
        match self {
            Self::Started { path, total } => {
                format!("Searching {} files in {} for images...", total, path.display())
            }
            Self::Progress { percent, found } => {
                format!("Found {} images... {:.0}%", found, percent)
            }
            Self::Completed { found } => format!("Loaded {} images!", found),
        }
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scanner that collects image paths from a folder.
pub struct FolderScanner {
    config: ScanConfig,
}

impl FolderScanner {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scans `dir` on a blocking task, streaming progress over the returned receiver.
    pub fn scan_with_progress(
        &self,
        dir: PathBuf,
    ) -> (
        mpsc::Receiver<ScanProgress>,
        task::JoinHandle<Result<Vec<PathBuf>>>,
    ) {
        let config = self.config.clone();
        let (tx, rx) = mpsc::channel(100);

        let handle = task::spawn_blocking(move || {
            discover_images(&dir, &config, |progress| {
                let _ = tx.blocking_send(progress);
            })
        });

        (rx, handle)
    }
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn walker(dir: &Path, config: &ScanConfig) -> WalkDir {
    let walker = WalkDir::new(dir).follow_links(config.follow_symlinks);
    if config.recursive {
        walker
    } else {
        walker.max_depth(1)
    }
}

/// Walks `dir` twice: once to count files, once to collect images.
fn discover_images<F>(dir: &Path, config: &ScanConfig, mut report: F) -> Result<Vec<PathBuf>>
where
    F: FnMut(ScanProgress),
{
    if !dir.is_dir() {
        bail!("Not a directory: {:?}", dir);
    }
    info!("Starting scan of {:?}", dir);

    let total = walker(dir, config)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .count();
    report(ScanProgress::Started {
        path: dir.to_path_buf(),
        total,
    });

    let mut images = Vec::new();
    let mut processed = 0;

    for entry in walker(dir, config).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        if is_image_path(entry.path()) {
            images.push(entry.into_path());
        }

        processed += 1;
        if processed % PROGRESS_EVERY == 0 && total > 0 {
            report(ScanProgress::Progress {
                percent: (processed as f32 / total as f32 * 100.0).min(100.0),
                found: images.len(),
            });
        }
    }

    images.sort();
    debug!(processed, found = images.len(), "Walk finished");
    report(ScanProgress::Progress {
        percent: 100.0,
        found: images.len(),
    });
    report(ScanProgress::Completed {
        found: images.len(),
    });
    info!("Scan complete: {} images", images.len());

    Ok(images)
}
