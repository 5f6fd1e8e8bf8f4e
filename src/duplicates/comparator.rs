//! Byte-for-byte content comparison of same-length files.
//!
//! # Overview
//!
//! Two candidate files are read in lockstep, one chunk at a time, and compared
//! chunk by chunk. The first mismatching chunk ends the comparison. The chunk
//! size only affects throughput; any size of at least one byte yields the
//! same answer.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::duplicates::ContentComparator;
//! use std::path::Path;
//!
//! let comparator = ContentComparator::default();
//! if comparator.equal(Path::new("a.bin"), Path::new("b.bin")) {
//!     println!("identical");
//! }
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sysinfo::System;

/// Default number of bytes read per comparison step.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Upper bound for the adaptive chunk size.
pub const ADAPTIVE_CHUNK_CEILING: usize = 5120;

/// How the comparison chunk size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSize {
    /// A fixed number of bytes per step.
    Fixed(usize),
    /// Derived from available memory, see [`adaptive_chunk_size`].
    Adaptive,
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::Fixed(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkSize {
    /// Map a configured byte count to a chunk size. `0` selects adaptive sizing.
    #[must_use]
    pub fn from_bytes(bytes: u64) -> Self {
        if bytes == 0 {
            Self::Adaptive
        } else {
            Self::Fixed(usize::try_from(bytes).unwrap_or(usize::MAX))
        }
    }

    /// Resolve to a concrete byte count, never below one.
    #[must_use]
    pub fn resolve(self) -> usize {
        match self {
            Self::Fixed(n) => n.max(1),
            Self::Adaptive => adaptive_chunk_size(),
        }
    }
}

/// Chunk size derived from memory: `min(available / 10, 5120)`, at least 1.
#[must_use]
pub fn adaptive_chunk_size() -> usize {
    let mut system = System::new();
    system.refresh_memory();
    let available = system.available_memory();
    let size = (available / 10).min(ADAPTIVE_CHUNK_CEILING as u64);
    let size = usize::try_from(size).unwrap_or(ADAPTIVE_CHUNK_CEILING).max(1);
    log::debug!(
        "Adaptive chunk size: {} bytes ({} bytes available)",
        size,
        available
    );
    size
}

/// Errors raised while comparing two files.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// A file could not be opened or inspected.
    #[error("Failed to open {path}: {source}")]
    Open {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading from a file failed mid-comparison.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Compares file contents in fixed-size chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentComparator {
    chunk_size: usize,
}

impl Default for ContentComparator {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ContentComparator {
    /// Create a comparator reading `chunk_size` bytes per step (minimum 1).
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Create a comparator from a [`ChunkSize`] setting.
    #[must_use]
    pub fn with_chunk_size(chunk_size: ChunkSize) -> Self {
        Self::new(chunk_size.resolve())
    }

    /// Bytes read per comparison step.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Return true if both paths hold byte-identical content.
    ///
    /// A path is never equal to itself. I/O failures count as "not equal".
    #[must_use]
    pub fn equal(&self, a: &Path, b: &Path) -> bool {
        match self.try_equal(a, b) {
            Ok(equal) => equal,
            Err(e) => {
                log::debug!("Comparison failed, treating as different: {}", e);
                false
            }
        }
    }

    /// Fallible form of [`equal`](Self::equal).
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] if either file cannot be inspected or read.
    pub fn try_equal(&self, a: &Path, b: &Path) -> Result<bool, CompareError> {
        if a == b {
            return Ok(false);
        }

        let len_a = std::fs::metadata(a).map_err(|e| open_error(a, e))?.len();
        let len_b = std::fs::metadata(b).map_err(|e| open_error(b, e))?.len();
        if len_a != len_b {
            return Ok(false);
        }

        let mut file_a = File::open(a).map_err(|e| open_error(a, e))?;
        let mut file_b = File::open(b).map_err(|e| open_error(b, e))?;

        streams_equal(&mut file_a, &mut file_b, len_a, self.chunk_size).map_err(|e| match e {
            StreamError::A(source) => CompareError::Read {
                path: a.to_path_buf(),
                source,
            },
            StreamError::B(source) => CompareError::Read {
                path: b.to_path_buf(),
                source,
            },
        })
    }
}

fn open_error(path: &Path, source: io::Error) -> CompareError {
    CompareError::Open {
        path: path.to_path_buf(),
        source,
    }
}

/// Which side of a stream comparison failed.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// The first stream failed.
    #[error("first stream: {0}")]
    A(#[source] io::Error),
    /// The second stream failed.
    #[error("second stream: {0}")]
    B(#[source] io::Error),
}

/// Compare two readers that both claim to hold `len` bytes.
///
/// Runs `ceil(len / chunk_size)` steps. Short reads are retried until the
/// chunk is full or the stream ends, and only the bytes actually read are
/// compared, so a stream that ends early never matches a complete one.
///
/// # Errors
///
/// Returns [`StreamError`] if a read fails.
pub fn streams_equal<A: Read, B: Read>(
    a: &mut A,
    b: &mut B,
    len: u64,
    chunk_size: usize,
) -> Result<bool, StreamError> {
    let chunk_size = chunk_size.max(1);
    let iterations = len.div_ceil(chunk_size as u64);
    let mut buf_a = vec![0u8; chunk_size];
    let mut buf_b = vec![0u8; chunk_size];
    let mut total: u64 = 0;

    for _ in 0..iterations {
        let n_a = read_chunk(a, &mut buf_a).map_err(StreamError::A)?;
        let n_b = read_chunk(b, &mut buf_b).map_err(StreamError::B)?;

        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        total += n_a as u64;
        if n_a < chunk_size {
            // Both hit EOF together; equal only if the declared length was reached.
            return Ok(total == len);
        }
    }

    Ok(true)
}

/// Fill `buf` from `reader`, stopping at EOF. Returns the bytes read.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
