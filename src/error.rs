use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VisualizerError>;

#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("map size must be a positive integer, got {0}")]
    InvalidMapSize(usize),

    #[error("could not encode image: {0}")]
    Encode(#[from] image::ImageError),
}

impl VisualizerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
