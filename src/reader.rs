use std::{
    fs::File,
    io::{self, BufReader, Bytes, Read},
    path::Path,
};

use crate::error::{Result, VisualizerError};

/// Reads the whole file into memory.
pub fn read_bytes<P>(path: P) -> Result<Vec<u8>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    std::fs::read(path).map_err(|err| VisualizerError::io(path, err))
}

/// Buffered byte-by-byte view over a source, in source order.
pub struct ByteReader<R: Read> {
    bytes: Bytes<BufReader<R>>,
}

impl<R: Read> ByteReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            bytes: BufReader::new(source).bytes(),
        }
    }
}

impl ByteReader<File> {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| VisualizerError::io(path, err))?;
        Ok(Self::new(file))
    }
}

impl<R: Read> Iterator for ByteReader<R> {
    type Item = io::Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.bytes.next()
    }
}

/// Source that yields `data` and then fails every read.
#[cfg(test)]
pub(crate) struct FailAfter {
    data: Vec<u8>,
    pos: usize,
}

#[cfg(test)]
impl FailAfter {
    pub(crate) fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
        }
    }
}

#[cfg(test)]
impl Read for FailAfter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() {
            return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
