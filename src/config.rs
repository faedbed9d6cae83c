use std::{
    mem,
    path::{Path, PathBuf},
};

use crate::{
    error::{Result, VisualizerError},
    render::CHANNELS,
};

pub const DEFAULT_MAP_SIZE: usize = 256;
pub const DEFAULT_OUTPUT_DIR: &str = "after_convert";

/// Settings for a [`BinaryVisualizer`](crate::visualizer::BinaryVisualizer).
///
/// `map_size` is both the dimension of the count matrix and of the output
/// image. It is also the exclusive upper bound on the byte values that get
/// counted, so anything below 256 drops pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisualizerConfig {
    pub map_size: usize,
    pub output_dir: PathBuf,
}

impl VisualizerConfig {
    pub fn new(map_size: usize) -> Self {
        Self {
            map_size,
            ..Default::default()
        }
    }

    pub fn with_output_dir<P>(mut self, dir: P) -> Self
    where
        P: AsRef<Path>,
    {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_map_size(self.map_size)
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// A map size is usable when it is positive, fits an image dimension and
/// both the count matrix and the RGB buffer can be allocated.
pub(crate) fn validate_map_size(map_size: usize) -> Result<()> {
    let cells = map_size.checked_mul(map_size);
    let fits = map_size > 0
        && u32::try_from(map_size).is_ok()
        && cells.and_then(|n| n.checked_mul(CHANNELS)).is_some()
        && cells
            .and_then(|n| n.checked_mul(mem::size_of::<u64>()))
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
    if !fits {
        return Err(VisualizerError::InvalidMapSize(map_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VisualizerConfig::default();
        assert_eq!(config.map_size, 256);
        assert_eq!(config.output_dir, PathBuf::from("after_convert"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_map_size_rejected() {
        let config = VisualizerConfig::new(0);
        assert!(matches!(
            config.validate(),
            Err(VisualizerError::InvalidMapSize(0))
        ));
    }

    #[test]
    fn test_oversized_map_size_rejected() {
        for map_size in [usize::MAX / 2, u32::MAX as usize, usize::MAX] {
            assert!(matches!(
                VisualizerConfig::new(map_size).validate(),
                Err(VisualizerError::InvalidMapSize(n)) if n == map_size
            ));
        }
        assert!(VisualizerConfig::new(1).validate().is_ok());
        assert!(VisualizerConfig::new(4096).validate().is_ok());
    }

    #[test]
    fn test_builder_keeps_map_size() {
        let config = VisualizerConfig::new(16).with_output_dir("out");
        assert_eq!(config.map_size, 16);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }
}
