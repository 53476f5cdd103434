use std::io;
use thiserror::Error;

/// Every failure the pak codec can surface.
///
/// A failed read or write produces exactly one of these; the archive it was
/// operating on must be treated as unusable afterwards.
#[derive(Error, Debug)]
pub enum PakError {
    #[error("stream {0} is not available")]
    IoUnavailable(&'static str),
    #[error("short read: wanted {expected} bytes at offset {offset:#x}")]
    ShortRead { expected: usize, offset: u64 },
    #[error("short write: wanted {expected} bytes at offset {offset:#x}")]
    ShortWrite { expected: usize, offset: u64 },
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("not enough memory: {0}")]
    OutOfMemory(String),
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),
    #[error("manifest format error: {0}")]
    ManifestFormat(String),
    #[error("invalid asset path: {0}")]
    InvalidPath(String),
    #[error("payload of embedded asset '{0}' was not loaded")]
    MissingPayload(String),
    #[error("asset table holds {count} entries, the header sector fits {max}")]
    TableOverflow { count: usize, max: usize },
    #[error("archive offset {0:#x} does not fit a 32-bit field")]
    TooLarge(u64),
    #[error("asset #{index}: {source}")]
    Asset {
        index:  usize,
        #[source]
        source: Box<PakError>,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PakError {
    /// Wrap `self` with the index of the asset that was being processed.
    pub fn at_asset(self, index: usize) -> Self {
        PakError::Asset { index, source: Box::new(self) }
    }

    /// The innermost error, with any asset context peeled off.
    pub fn root(&self) -> &PakError {
        match self {
            PakError::Asset { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type PakResult<T> = Result<T, PakError>;

/// Reserve exactly `len` bytes, reporting allocation failure as an error.
pub(crate) fn alloc_buffer(len: usize, what: &str) -> PakResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| PakError::OutOfMemory(format!("{what} ({len} bytes)")))?;
    buf.resize(len, 0);
    Ok(buf)
}
