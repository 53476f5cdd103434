//! Payload compression.
//!
//! Compressed pak payloads are zlib streams (deflate with the two-byte zlib
//! header and Adler-32 trailer).  The codec never infers sizes on its own:
//! callers hand it a capacity hint for compression and a hard bound for
//! decompression, both derived from the asset header.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::trace;

use crate::error::{PakError, PakResult};

/// Level used when nothing else is configured.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Compress `data`.  The output starts with `capacity_hint` bytes
    /// reserved and grows if the stream turns out larger.
    fn compress(&self, data: &[u8], level: u32, capacity_hint: usize) -> PakResult<Vec<u8>>;

    /// Decompress `data`, refusing to produce more than `bound` bytes.
    fn decompress(&self, data: &[u8], bound: usize) -> PakResult<Vec<u8>>;
}

pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str { "zlib" }

    fn compress(&self, data: &[u8], level: u32, capacity_hint: usize) -> PakResult<Vec<u8>> {
        let mut out = Vec::new();
        out.try_reserve_exact(capacity_hint)
            .map_err(|_| PakError::OutOfMemory(format!("compression buffer ({capacity_hint} bytes)")))?;

        let mut encoder = ZlibEncoder::new(out, Compression::new(level.min(MAX_COMPRESSION_LEVEL)));
        encoder.write_all(data)?;
        let out = encoder.finish()?;
        trace!(input = data.len(), output = out.len(), level, "zlib compress");
        Ok(out)
    }

    fn decompress(&self, data: &[u8], bound: usize) -> PakResult<Vec<u8>> {
        let mut out = Vec::new();
        out.try_reserve_exact(bound)
            .map_err(|_| PakError::OutOfMemory(format!("decompression buffer ({bound} bytes)")))?;

        // One byte past the bound is enough to tell "fits" from "overflows".
        let limit = bound as u64 + 1;
        ZlibDecoder::new(data)
            .take(limit)
            .read_to_end(&mut out)
            .map_err(|e| match e.kind() {
                io::ErrorKind::OutOfMemory => PakError::OutOfMemory(e.to_string()),
                _ => PakError::CorruptPayload(format!("corrupted compressed data: {e}")),
            })?;

        if out.len() > bound {
            return Err(PakError::OutOfMemory(format!(
                "decompressed data exceeds the {bound}-byte buffer"
            )));
        }
        trace!(input = data.len(), output = out.len(), "zlib decompress");
        Ok(out)
    }
}
