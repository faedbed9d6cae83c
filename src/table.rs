use std::io::{self, Read};

use crate::{
    config::validate_map_size,
    error::{Result, VisualizerError},
    reader::ByteReader,
};

/// Byte-pair co-occurrence counts.
///
/// Cell `(x, y)` counts how often byte `x` was immediately followed by byte
/// `y`. Storage is one flat row-major buffer indexed `y * map_size + x`, the
/// same layout the rendered image uses.
pub struct CooccurrenceTable {
    map_size: usize,
    dots: Vec<u64>,
    max: u64,
    dropped: u64,
    prev: Option<u8>,
}

impl CooccurrenceTable {
    pub fn new(map_size: usize) -> Result<Self> {
        validate_map_size(map_size)?;
        Ok(Self {
            map_size,
            dots: vec![0; map_size * map_size],
            max: 0,
            dropped: 0,
            prev: None,
        })
    }

    pub fn map_size(&self) -> usize {
        self.map_size
    }

    pub fn clear(&mut self) {
        self.max = 0;
        self.dropped = 0;
        self.prev = None;
        self.dots.fill(0);
    }

    /// Counts every adjacent pair of `bytes`.
    ///
    /// Continues from whatever was pushed before, so splitting a stream over
    /// several calls gives the same counts as one call.
    pub fn parse(&mut self, bytes: &[u8]) {
        let Some((&last, _)) = bytes.split_last() else {
            return;
        };
        if let (Some(prev), Some(&first)) = (self.prev, bytes.first()) {
            self.count(prev, first);
        }
        for window in bytes.windows(2) {
            self.count(window[0], window[1]);
        }
        self.prev = Some(last);
    }

    pub fn push(&mut self, byte: u8) {
        if let Some(prev) = self.prev {
            self.count(prev, byte);
        }
        self.prev = Some(byte);
    }

    /// Drains `source` into the table. On a read error the table is left
    /// cleared.
    pub fn accumulate<R: Read>(&mut self, source: R) -> Result<()> {
        self.accumulate_bytes(ByteReader::new(source))
    }

    /// Same as [`accumulate`](Self::accumulate), for an already opened byte
    /// stream such as [`ByteReader::open`].
    pub fn accumulate_bytes<I>(&mut self, bytes: I) -> Result<()>
    where
        I: IntoIterator<Item = io::Result<u8>>,
    {
        for byte in bytes {
            match byte {
                Ok(byte) => self.push(byte),
                Err(err) => {
                    self.clear();
                    return Err(VisualizerError::Read(err));
                }
            }
        }
        Ok(())
    }

    fn count(&mut self, xb: u8, yb: u8) {
        let x = xb as usize;
        let y = yb as usize;
        if x >= self.map_size || y >= self.map_size {
            self.dropped += 1;
            return;
        }
        let cell = &mut self.dots[y * self.map_size + x];
        *cell = cell.saturating_add(1);
        if *cell > self.max {
            self.max = *cell;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> u64 {
        if x >= self.map_size || y >= self.map_size {
            return 0;
        }
        self.dots[y * self.map_size + x]
    }

    /// Row-major counts, row `y` holding every pair whose second byte is `y`.
    pub fn cells(&self) -> &[u64] {
        &self.dots
    }

    pub fn total(&self) -> u64 {
        self.dots.iter().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.max
    }

    /// Pairs skipped because a byte was outside the map.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.max == 0
    }

    /// Largest `ln(count)` over the non-zero cells, or `1.0` when every cell
    /// is zero.
    pub fn max_log(&self) -> f64 {
        if self.max == 0 {
            1.0
        } else {
            (self.max as f64).ln()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::FailAfter;

    fn table(map_size: usize, bytes: &[u8]) -> CooccurrenceTable {
        let mut table = CooccurrenceTable::new(map_size).unwrap();
        table.parse(bytes);
        table
    }

    #[test]
    fn test_counts_adjacent_pairs() {
        let t = table(256, &[1, 2, 1, 2, 1, 2]);
        assert_eq!(t.get(1, 2), 3);
        assert_eq!(t.get(2, 1), 2);
        assert_eq!(t.total(), 5);
        assert_eq!(t.max_count(), 3);
    }

    #[test]
    fn test_sum_is_len_minus_one() {
        let data: Vec<u8> = (0..5000u32).map(|i| ((i * 31 + 7) % 251) as u8).collect();
        let t = table(256, &data);
        assert_eq!(t.total(), data.len() as u64 - 1);
        assert_eq!(t.dropped(), 0);
    }

    #[test]
    fn test_degenerate_inputs() {
        for bytes in [&[][..], &[42][..]] {
            let t = table(256, bytes);
            assert!(t.is_empty());
            assert_eq!(t.total(), 0);
            assert_eq!(t.max_log(), 1.0);
        }
    }

    #[test]
    fn test_small_map_drops_pairs() {
        let t = table(2, &[0, 1, 5, 1, 0, 5, 5, 0]);
        // kept: (0,1), (1,0); dropped: (1,5), (5,1), (0,5), (5,5), (5,0)
        assert_eq!(t.get(0, 1), 1);
        assert_eq!(t.get(1, 0), 1);
        assert_eq!(t.total(), 2);
        assert_eq!(t.dropped(), 5);
        assert_eq!(t.cells().len(), 4);
        assert_eq!(t.max_count(), 1);
        assert_eq!(t.get(5, 1), 0);
    }

    #[test]
    fn test_dropped_pairs_do_not_move_max() {
        let t = table(2, &[5, 5, 5, 5, 0, 1]);
        assert_eq!(t.max_count(), 1);
        assert_eq!(t.max_log(), 0.0);
    }

    #[test]
    fn test_push_matches_parse() {
        let data = b"hello, co-occurrence world";
        let whole = table(256, data);
        let mut pushed = CooccurrenceTable::new(256).unwrap();
        for &b in data.iter() {
            pushed.push(b);
        }
        let mut split = CooccurrenceTable::new(256).unwrap();
        split.parse(&data[..7]);
        split.parse(&data[7..]);
        assert_eq!(whole.cells(), pushed.cells());
        assert_eq!(whole.cells(), split.cells());
    }

    #[test]
    fn test_accumulate_from_reader() {
        let mut t = CooccurrenceTable::new(256).unwrap();
        t.accumulate(&[0u8, 0, 0][..]).unwrap();
        assert_eq!(t.get(0, 0), 2);
        assert_eq!(t.max_log(), 2f64.ln());
    }

    #[test]
    fn test_clear() {
        let mut t = table(256, &[9, 9, 9]);
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.total(), 0);
        t.parse(&[1]);
        assert_eq!(t.total(), 0);
    }

    #[test]
    fn test_zero_map_size() {
        assert!(CooccurrenceTable::new(0).is_err());
    }

    #[test]
    fn test_oversized_map_size() {
        for map_size in [usize::MAX / 2, u32::MAX as usize, usize::MAX] {
            assert!(matches!(
                CooccurrenceTable::new(map_size),
                Err(VisualizerError::InvalidMapSize(n)) if n == map_size
            ));
        }
    }

    #[test]
    fn test_read_error_clears_table() {
        let mut t = table(256, &[4, 4, 4]);
        let err = t.accumulate(FailAfter::new(&[1, 2, 1, 2])).unwrap_err();
        assert!(matches!(err, VisualizerError::Read(_)));
        assert!(t.is_empty());
        assert_eq!(t.total(), 0);
        assert_eq!(t.dropped(), 0);
        // no pending byte from the failed stream
        t.push(1);
        assert_eq!(t.total(), 0);
    }
}
