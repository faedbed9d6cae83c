pub mod config;
pub mod error;
pub mod reader;
pub mod render;
pub mod table;
pub mod visualizer;

pub use config::VisualizerConfig;
pub use error::{Result, VisualizerError};
pub use table::CooccurrenceTable;
pub use visualizer::BinaryVisualizer;
