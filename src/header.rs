//! Fixed-size archive records: the leading pak header, the content header
//! at [`CONTENT_SECTOR`] and the closing data sentinel.
//!
//! All fields are little-endian `u32` words.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{PakError, PakResult};

/// Offset of the content header.
pub const CONTENT_SECTOR: u64 = 0x7D000;
/// Offset of the first payload.
pub const DATA_SECTOR: u64 = 0xF0_0000;

/// ASCII `PAKS`.
pub const PAK_MAGIC: u32 = 0x534B_4150;
/// ASCII `FILS`.
pub const CONTENT_FIRST_MAGIC: u32 = 0x534C_4946;
/// ASCII `FILZ`.
pub const CONTENT_SECOND_MAGIC: u32 = 0x5A4C_4946;
/// ASCII `FILE`.
pub const DATA_MAGIC: u32 = 0x454C_4946;

pub const PAK_HEADER_SIZE: usize = 40;
pub const CONTENT_HEADER_SIZE: usize = 12;
pub const DATA_HEADER_SIZE: usize = 4;

// ── PakHeader ────────────────────────────────────────────────────────────────

/// The 40-byte record at offset 0.  Rewritten last on every write, once the
/// final file size is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakHeader {
    pub header_magic:         u32,
    pub reserved:             u32,
    pub paklib_version:       u32,
    pub locale:               u32,
    pub assets_count:         u32,
    pub used_assets_count:    u32,
    pub deleted_assets_count: u32,
    pub file_size:            u32,
    pub team_version:         u32,
    pub header_sign:          u32,
}

impl Default for PakHeader {
    fn default() -> Self {
        Self {
            header_magic:         PAK_MAGIC,
            reserved:             0,
            paklib_version:       0,
            locale:               0,
            assets_count:         0,
            used_assets_count:    0,
            deleted_assets_count: 0,
            file_size:            0,
            team_version:         0,
            header_sign:          0,
        }
    }
}

impl PakHeader {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.header_magic)?;
        writer.write_u32::<LittleEndian>(self.reserved)?;
        writer.write_u32::<LittleEndian>(self.paklib_version)?;
        writer.write_u32::<LittleEndian>(self.locale)?;
        writer.write_u32::<LittleEndian>(self.assets_count)?;
        writer.write_u32::<LittleEndian>(self.used_assets_count)?;
        writer.write_u32::<LittleEndian>(self.deleted_assets_count)?;
        writer.write_u32::<LittleEndian>(self.file_size)?;
        writer.write_u32::<LittleEndian>(self.team_version)?;
        writer.write_u32::<LittleEndian>(self.header_sign)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> PakResult<Self> {
        let header = Self {
            header_magic:         reader.read_u32::<LittleEndian>()?,
            reserved:             reader.read_u32::<LittleEndian>()?,
            paklib_version:       reader.read_u32::<LittleEndian>()?,
            locale:               reader.read_u32::<LittleEndian>()?,
            assets_count:         reader.read_u32::<LittleEndian>()?,
            used_assets_count:    reader.read_u32::<LittleEndian>()?,
            deleted_assets_count: reader.read_u32::<LittleEndian>()?,
            file_size:            reader.read_u32::<LittleEndian>()?,
            team_version:         reader.read_u32::<LittleEndian>()?,
            header_sign:          reader.read_u32::<LittleEndian>()?,
        };
        if header.header_magic == 0 {
            return Err(PakError::InvalidHeader("pak header magic is zero".into()));
        }
        Ok(header)
    }

    pub fn to_bytes(&self) -> [u8; PAK_HEADER_SIZE] {
        let mut buf = [0u8; PAK_HEADER_SIZE];
        // A fixed-size slice of exactly the record size cannot run short.
        let _ = self.write(&mut buf[..]);
        buf
    }
}

// ── ContentHeader ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHeader {
    pub first_magic:  u32,
    pub second_magic: u32,
    pub assets_count: u32,
}

impl Default for ContentHeader {
    fn default() -> Self {
        Self {
            first_magic:  CONTENT_FIRST_MAGIC,
            second_magic: CONTENT_SECOND_MAGIC,
            assets_count: 0,
        }
    }
}

impl ContentHeader {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.first_magic)?;
        writer.write_u32::<LittleEndian>(self.second_magic)?;
        writer.write_u32::<LittleEndian>(self.assets_count)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> PakResult<Self> {
        let first_magic = reader.read_u32::<LittleEndian>()?;
        let second_magic = reader.read_u32::<LittleEndian>()?;
        if first_magic != CONTENT_FIRST_MAGIC || second_magic != CONTENT_SECOND_MAGIC {
            return Err(PakError::InvalidHeader(format!(
                "content header magic {first_magic:#010x}/{second_magic:#010x}, expected FILS/FILZ"
            )));
        }
        Ok(Self {
            first_magic,
            second_magic,
            assets_count: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; CONTENT_HEADER_SIZE] {
        let mut buf = [0u8; CONTENT_HEADER_SIZE];
        let _ = self.write(&mut buf[..]);
        buf
    }
}

// ── DataHeader ───────────────────────────────────────────────────────────────

/// Sentinel closing the archive after the last payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataHeader {
    pub magic: u32,
}

impl Default for DataHeader {
    fn default() -> Self {
        Self { magic: DATA_MAGIC }
    }
}

impl DataHeader {
    pub fn to_bytes(&self) -> [u8; DATA_HEADER_SIZE] {
        self.magic.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; DATA_HEADER_SIZE]) -> PakResult<Self> {
        let magic = u32::from_le_bytes(bytes);
        if magic != DATA_MAGIC {
            return Err(PakError::InvalidHeader(format!(
                "data sentinel {magic:#010x}, expected FILE"
            )));
        }
        Ok(Self { magic })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magics_spell_their_names() {
        assert_eq!(&PAK_MAGIC.to_le_bytes(), b"PAKS");
        assert_eq!(&CONTENT_FIRST_MAGIC.to_le_bytes(), b"FILS");
        assert_eq!(&CONTENT_SECOND_MAGIC.to_le_bytes(), b"FILZ");
        assert_eq!(&DataHeader::default().to_bytes(), b"FILE");
    }

    #[test]
    fn pak_header_field_order() {
        let header = PakHeader {
            assets_count: 3,
            file_size: 0x0102_0304,
            header_sign: 0xAABB_CCDD,
            ..PakHeader::default()
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"PAKS");
        assert_eq!(&bytes[16..20], &3u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[36..40], &0xAABB_CCDDu32.to_le_bytes());
        assert_eq!(PakHeader::read(&bytes[..]).unwrap(), header);
    }

    #[test]
    fn zero_pak_magic_is_invalid() {
        let bytes = [0u8; PAK_HEADER_SIZE];
        assert!(matches!(PakHeader::read(&bytes[..]), Err(PakError::InvalidHeader(_))));
    }

    #[test]
    fn content_header_checks_both_magics() {
        let mut bytes = ContentHeader { assets_count: 9, ..Default::default() }.to_bytes();
        assert_eq!(ContentHeader::read(&bytes[..]).unwrap().assets_count, 9);

        bytes[4] = b'X';
        assert!(matches!(ContentHeader::read(&bytes[..]), Err(PakError::InvalidHeader(_))));
    }
}
