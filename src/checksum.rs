//! The two integrity values stored for every embedded payload.
//!
//! - CRC-32 (IEEE), seeded from zero on every call.
//! - The legacy additive checksum: the sum of all bytes read as `i8`,
//!   accumulated in an `i32` that wraps on overflow.

use crc32fast::Hasher;

pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Sum of `data` as signed bytes, wrapping in 32 bits.
pub fn additive_checksum(data: &[u8]) -> i32 {
    data.iter()
        .fold(0i32, |acc, &b| acc.wrapping_add(i32::from(b as i8)))
}

/// Both checksums of one byte range, in the form they are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksums {
    pub crc:      u32,
    pub additive: u32,
}

impl Checksums {
    pub fn of(data: &[u8]) -> Self {
        Self {
            crc:      crc32(data),
            additive: additive_checksum(data) as u32,
        }
    }
}
