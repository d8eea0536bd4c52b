use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Navigation direction through the image set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn offset(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Ordered list of image paths for one slideshow session.
///
/// The set is only ever replaced or permuted as a whole; indices wrap around.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    paths: Vec<PathBuf>,
}

impl ImageSet {
    /// Creates a set in path order.
    pub fn new(mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PathBuf> {
        self.paths.get(index)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    /// Wraps any signed index into `0..len`. `None` for an empty set.
    pub fn wrap(&self, index: i64) -> Option<usize> {
        if self.paths.is_empty() {
            return None;
        }
        Some(index.rem_euclid(self.paths.len() as i64) as usize)
    }

    /// The index one step from `index` in `direction`, wrapping at both ends.
    pub fn step(&self, index: usize, direction: Direction) -> Option<usize> {
        self.wrap(index as i64 + direction.offset())
    }

    /// Reorders the set by a seeded hash of each path.
    pub fn shuffle(&mut self, seed: u64) {
        self.paths.sort_by(|a, b| {
            let rank_a = shuffle_rank_for_path(seed, a);
            let rank_b = shuffle_rank_for_path(seed, b);
            rank_a.cmp(&rank_b).then_with(|| a.cmp(b))
        });
    }

    /// Restores path order.
    pub fn unshuffle(&mut self) {
        self.paths.sort();
    }
}

pub fn new_shuffle_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e3779b97f4a7c15)
}

fn shuffle_rank_for_path(seed: u64, path: &Path) -> u64 {
    xxh3_64_with_seed(path.to_string_lossy().as_bytes(), seed)
}
