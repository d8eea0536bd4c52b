//! Error types for decoding, the look-ahead cache and the slideshow session.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a source file into a display-ready image.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read image {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("GIF has no frames: {path:?}")]
    NoFrames { path: PathBuf },
}

impl DecodeError {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. } | Self::Image { path, .. } | Self::NoFrames { path } => path,
        }
    }
}

/// Errors surfaced by [`crate::prefetch::LookaheadCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no images loaded")]
    Empty,
    #[error("index {index} out of range for {len} images")]
    OutOfRange { index: usize, len: usize },
    #[error("image {index} could not be decoded")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },
    #[error("failed to spawn prefetch worker")]
    Spawn(#[source] std::io::Error),
}

/// Errors surfaced by [`crate::session::SlideshowSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no images found")]
    NoImages,
    #[error("none of the {attempts} images could be displayed")]
    AllFailed { attempts: usize },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_path() {
        let err = DecodeError::NoFrames {
            path: PathBuf::from("/test/empty.gif"),
        };
        assert_eq!(err.path(), &PathBuf::from("/test/empty.gif"));
        assert!(err.to_string().contains("empty.gif"));
    }

    #[test]
    fn test_cache_error_source_chain() {
        let err = CacheError::Decode {
            index: 3,
            source: DecodeError::NoFrames {
                path: PathBuf::from("a.gif"),
            },
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("GIF has no frames: \"a.gif\""));
    }

    #[test]
    fn test_session_error_from_cache() {
        let err: SessionError = CacheError::Empty.into();
        assert!(matches!(err, SessionError::Cache(CacheError::Empty)));
        assert_eq!(err.to_string(), "no images loaded");
    }
}
