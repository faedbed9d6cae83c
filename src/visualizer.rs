use std::{
    collections::HashSet,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use image::RgbImage;
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::{
    config::VisualizerConfig,
    error::{Result, VisualizerError},
    render::{encode_png, render_image},
    reader::ByteReader,
    table::CooccurrenceTable,
};

/// Turns files into byte-pair co-occurrence images.
///
/// Every call builds its own table, so one visualizer can be shared between
/// threads.
#[derive(Default)]
pub struct BinaryVisualizer {
    config: VisualizerConfig,
}

impl BinaryVisualizer {
    pub fn new(config: VisualizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn visualize_bytes(&self, bytes: &[u8]) -> Result<RgbImage> {
        let mut table = CooccurrenceTable::new(self.config.map_size)?;
        table.parse(bytes);
        finish(&table)
    }

    pub fn visualize_reader<R: Read>(&self, source: R) -> Result<RgbImage> {
        let mut table = CooccurrenceTable::new(self.config.map_size)?;
        table.accumulate(source)?;
        finish(&table)
    }

    /// Renders `input` and writes it as a PNG to `destination`.
    ///
    /// The image is encoded in memory and moved into place in one step, so
    /// `destination` either holds the complete image or is left untouched.
    pub fn render_file<P, Q>(&self, input: P, destination: Q) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let mut table = CooccurrenceTable::new(self.config.map_size)?;
        self.render_with(&mut table, input.as_ref(), destination.as_ref())
    }

    /// Writes `<output_dir>/<output_name>.png` and returns its path.
    pub fn generate_visualization<P>(&self, input: P, output_name: &str) -> Result<PathBuf>
    where
        P: AsRef<Path>,
    {
        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir).map_err(|err| VisualizerError::io(dir, err))?;
        let destination = dir.join(format!("{output_name}.png"));
        self.render_file(input, &destination)?;
        Ok(destination)
    }

    /// Renders every regular file below `input_dir` into `output_dir`.
    ///
    /// Artifacts are named after the path relative to `input_dir`, with
    /// separators replaced by `_`. When two files flatten to the same name the
    /// later one gets a `-1`, `-2`, ... suffix. Files are processed in sorted
    /// order and the first failure aborts the run.
    pub fn render_dir<P, Q>(&self, input_dir: P, output_dir: Q) -> Result<Vec<PathBuf>>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let input_dir = input_dir.as_ref();
        let output_dir = output_dir.as_ref();
        let mut files = Vec::new();
        collect_files(&mut files, input_dir)?;
        files.sort();
        std::fs::create_dir_all(output_dir).map_err(|err| VisualizerError::io(output_dir, err))?;
        let mut table = CooccurrenceTable::new(self.config.map_size)?;
        let mut written = Vec::with_capacity(files.len());
        let mut used = HashSet::with_capacity(files.len());
        for path in files {
            let name = unique_name(&mut used, artifact_name(input_dir, &path));
            let destination = output_dir.join(format!("{name}.png"));
            self.render_with(&mut table, &path, &destination)?;
            table.clear();
            written.push(destination);
        }
        Ok(written)
    }

    fn render_with(
        &self,
        table: &mut CooccurrenceTable,
        input: &Path,
        destination: &Path,
    ) -> Result<()> {
        debug!("Rendering {input:?} -> {destination:?}");
        let bytes = ByteReader::open(input)?;
        render_bytes(table, bytes, input, destination)
    }
}

fn render_bytes<I>(
    table: &mut CooccurrenceTable,
    bytes: I,
    input: &Path,
    destination: &Path,
) -> Result<()>
where
    I: IntoIterator<Item = io::Result<u8>>,
{
    table.accumulate_bytes(bytes).map_err(|err| match err {
        VisualizerError::Read(source) => VisualizerError::io(input, source),
        other => other,
    })?;
    let png = encode_png(&finish(table)?)?;
    write_atomic(destination, &png)
}

fn finish(table: &CooccurrenceTable) -> Result<RgbImage> {
    if table.total() == 0 && table.dropped() == 0 {
        warn!("Input has fewer than two bytes, rendering a blank image");
    } else if table.dropped() > 0 {
        warn!(
            "Skipped {} pairs outside the {n}x{n} map",
            table.dropped(),
            n = table.map_size()
        );
    }
    render_image(table)
}

fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| VisualizerError::io(dir, err))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|err| VisualizerError::io(tmp.path(), err))?;
    tmp.persist(destination)
        .map_err(|err| VisualizerError::io(destination, err.error))?;
    Ok(())
}

fn collect_files(files: &mut Vec<PathBuf>, dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|err| VisualizerError::io(dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| VisualizerError::io(dir, err))?;
        let path = entry.path();
        let metadata = entry
            .metadata()
            .map_err(|err| VisualizerError::io(&path, err))?;
        if metadata.is_dir() {
            collect_files(files, &path)?;
        } else if metadata.is_file() {
            files.push(path);
        } else {
            debug!("Ignoring {path:?}");
        }
    }
    Ok(())
}

fn artifact_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("_")
}

fn unique_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{name}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::FailAfter;

    #[test]
    fn test_visualize_bytes_scenario() {
        let image = BinaryVisualizer::default()
            .visualize_bytes(&[0, 0, 0])
            .unwrap();
        assert_eq!(image.dimensions(), (256, 256));
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_reader_matches_bytes() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 256) as u8).collect();
        let vis = BinaryVisualizer::new(VisualizerConfig::new(64)).unwrap();
        let a = vis.visualize_bytes(&data).unwrap();
        let b = vis.visualize_reader(&data[..]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config() {
        assert!(BinaryVisualizer::new(VisualizerConfig::new(0)).is_err());
    }

    #[test]
    fn test_artifact_name() {
        let root = Path::new("/data/in");
        assert_eq!(
            artifact_name(root, Path::new("/data/in/sub/a.exe")),
            "sub_a.exe"
        );
        assert_eq!(artifact_name(root, Path::new("/data/in/b")), "b");
    }

    #[test]
    fn test_unique_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_name(&mut used, "a_b".to_owned()), "a_b");
        assert_eq!(unique_name(&mut used, "a_b".to_owned()), "a_b-1");
        assert_eq!(unique_name(&mut used, "a_b-1".to_owned()), "a_b-1-1");
        assert_eq!(unique_name(&mut used, "a_b".to_owned()), "a_b-2");
    }

    #[test]
    fn test_read_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.png");
        let mut table = CooccurrenceTable::new(256).unwrap();
        let bytes = ByteReader::new(FailAfter::new(&[1, 2, 3, 4]));
        let input = Path::new("input.bin");
        let err = render_bytes(&mut table, bytes, input, &dest).unwrap_err();
        assert!(matches!(
            err,
            VisualizerError::Io { ref path, .. } if path == input
        ));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_visualize_reader_propagates_read_error() {
        let err = BinaryVisualizer::default()
            .visualize_reader(FailAfter::new(&[0, 0, 0]))
            .unwrap_err();
        assert!(matches!(err, VisualizerError::Read(_)));
    }

    #[test]
    fn test_write_atomic_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.png");
        write_atomic(&dest, b"first").unwrap();
        write_atomic(&dest, b"second").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
