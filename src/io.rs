//! Bounded I/O utilities for safe file reading.
//!
//! Files over `max_file_size` are rejected before any read. Files over
//! `max_read_bytes` are rejected rather than read in part.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Resource limits for I/O operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IOLimits {
    pub max_read_bytes: u64,
    pub max_file_size: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_read_bytes: 100 * 1024 * 1024, // 100MB
            max_file_size: 1024 * 1024 * 1024, // 1GB
        }
    }
}

/// A bounded reader that limits the amount of data read.
pub struct BoundedReader<R> {
    inner: R,
    bytes_read: u64,
    limit: u64,
}

impl<R: Read> BoundedReader<R> {
    pub fn new(reader: R, limit: u64) -> Self {
        Self {
            inner: reader,
            bytes_read: 0,
            limit,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl<R: Read> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.bytes_read >= self.limit {
            return Ok(0); // EOF
        }

        let remaining = self.limit - self.bytes_read;
        let max_to_read = std::cmp::min(buf.len() as u64, remaining) as usize;
        let n = self.inner.read(&mut buf[..max_to_read])?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

/// Safe file reader with resource limits.
pub struct SafeFileReader {
    file: File,
    size: u64,
    limits: IOLimits,
}

impl SafeFileReader {
    /// Open a file, rejecting it when it exceeds `max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: IOLimits) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size,
            max_file = limits.max_file_size,
            max_read = limits.max_read_bytes,
            "Opened file"
        );

        if size > limits.max_file_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "File too large: {} bytes (limit: {})",
                    size, limits.max_file_size
                ),
            ));
        }

        Ok(Self { file, size, limits })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn limits(&self) -> &IOLimits {
        &self.limits
    }

    /// Read the whole file from the start.
    ///
    /// Fails with `InvalidData` when the contents exceed `max_read_bytes`,
    /// including growth since the file was opened.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let limit = self.limits.max_read_bytes;
        if self.size > limit {
            debug!(size = self.size, limit, "File exceeds read limit");
            return Err(read_limit_error(self.size, limit));
        }
        self.file.seek(SeekFrom::Start(0))?;
        // One byte past the limit detects a file that grew after open
        let mut reader = BoundedReader::new(&mut self.file, limit.saturating_add(1));
        let mut data = Vec::with_capacity(self.size as usize);
        reader.read_to_end(&mut data)?;
        if data.len() as u64 > limit {
            return Err(read_limit_error(data.len() as u64, limit));
        }
        Ok(data)
    }
}

fn read_limit_error(size: u64, limit: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("File exceeds read limit: {} bytes (limit: {})", size, limit),
    )
}

/// Read a whole file under `limits`.
pub fn read_file(path: impl AsRef<Path>, limits: IOLimits) -> io::Result<Vec<u8>> {
    SafeFileReader::open(path, limits)?.read_all()
}
