//! Asset records: the 620-byte on-disk header, the payload and the pair of
//! them as exposed to callers.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{PakError, PakResult};
use crate::path::{decode_path, encode_path, PATH_CAPACITY};

pub const ASSET_HEADER_SIZE: usize = 27 * 4 + PATH_CAPACITY * 2;

/// Magic stamped on assets created through [`Asset::new`].  Archives read
/// from disk keep whatever they carry.
pub const DEFAULT_ASSET_MAGIC: u32 = 0x0000_0001;

// ── AssetHeader ──────────────────────────────────────────────────────────────

/// One asset's on-disk header.
///
/// Flag words (`is_*`) stay raw `u32` so unknown non-zero values survive a
/// rewrite.  The three decompressed-length fields are kept independently and
/// never checked against each other.  `asset_type`, `asset_value`,
/// `crc_identity` and the `reserved*` words have no known meaning and are
/// carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHeader {
    pub prefix:                    u32,
    pub magic:                     u32,
    pub embedded_data_offset:      u32,
    pub embedded_data_length:      u32,
    pub data_decompressed_length:  u32,
    pub is_data_compressed:        u32,
    pub data_decompressed_length0: u32,
    pub reserved0:                 u32,
    pub data_decompressed_length1: u32,
    pub reserved1:                 [u32; 5],
    pub is_asset_deleted:          u32,
    /// Absolute offset of this header's own slot.
    pub asset_offset:              u32,
    pub is_asset_embedded:         u32,
    pub asset_type:                u64,
    pub asset_value:               u64,
    pub crc_decompressed:          u32,
    pub crc_embedded:              u32,
    pub crc_identity:              u32,
    pub checksum_decompressed:     u32,
    pub checksum_embedded:         u32,
    pub reserved2:                 u32,
    pub path:                      [u16; PATH_CAPACITY],
}

impl Default for AssetHeader {
    fn default() -> Self {
        Self {
            prefix:                    0,
            magic:                     0,
            embedded_data_offset:      0,
            embedded_data_length:      0,
            data_decompressed_length:  0,
            is_data_compressed:        0,
            data_decompressed_length0: 0,
            reserved0:                 0,
            data_decompressed_length1: 0,
            reserved1:                 [0; 5],
            is_asset_deleted:          0,
            asset_offset:              0,
            is_asset_embedded:         0,
            asset_type:                0,
            asset_value:               0,
            crc_decompressed:          0,
            crc_embedded:              0,
            crc_identity:              0,
            checksum_decompressed:     0,
            checksum_embedded:         0,
            reserved2:                 0,
            path:                      [0; PATH_CAPACITY],
        }
    }
}

impl AssetHeader {
    pub fn is_compressed(&self) -> bool { self.is_data_compressed != 0 }
    pub fn is_embedded(&self) -> bool { self.is_asset_embedded != 0 }
    pub fn is_deleted(&self) -> bool { self.is_asset_deleted != 0 }

    pub fn path(&self) -> PakResult<String> {
        decode_path(&self.path)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.prefix)?;
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.embedded_data_offset)?;
        writer.write_u32::<LittleEndian>(self.embedded_data_length)?;
        writer.write_u32::<LittleEndian>(self.data_decompressed_length)?;
        writer.write_u32::<LittleEndian>(self.is_data_compressed)?;
        writer.write_u32::<LittleEndian>(self.data_decompressed_length0)?;
        writer.write_u32::<LittleEndian>(self.reserved0)?;
        writer.write_u32::<LittleEndian>(self.data_decompressed_length1)?;
        for word in self.reserved1 {
            writer.write_u32::<LittleEndian>(word)?;
        }
        writer.write_u32::<LittleEndian>(self.is_asset_deleted)?;
        writer.write_u32::<LittleEndian>(self.asset_offset)?;
        writer.write_u32::<LittleEndian>(self.is_asset_embedded)?;
        writer.write_u64::<LittleEndian>(self.asset_type)?;
        writer.write_u64::<LittleEndian>(self.asset_value)?;
        writer.write_u32::<LittleEndian>(self.crc_decompressed)?;
        writer.write_u32::<LittleEndian>(self.crc_embedded)?;
        writer.write_u32::<LittleEndian>(self.crc_identity)?;
        writer.write_u32::<LittleEndian>(self.checksum_decompressed)?;
        writer.write_u32::<LittleEndian>(self.checksum_embedded)?;
        writer.write_u32::<LittleEndian>(self.reserved2)?;
        for unit in self.path {
            writer.write_u16::<LittleEndian>(unit)?;
        }
        Ok(())
    }

    /// Decode a header.  A zero magic marks a corrupt table and is rejected.
    pub fn read<R: Read>(mut reader: R) -> PakResult<Self> {
        let mut header = Self {
            prefix:                    reader.read_u32::<LittleEndian>()?,
            magic:                     reader.read_u32::<LittleEndian>()?,
            embedded_data_offset:      reader.read_u32::<LittleEndian>()?,
            embedded_data_length:      reader.read_u32::<LittleEndian>()?,
            data_decompressed_length:  reader.read_u32::<LittleEndian>()?,
            is_data_compressed:        reader.read_u32::<LittleEndian>()?,
            data_decompressed_length0: reader.read_u32::<LittleEndian>()?,
            reserved0:                 reader.read_u32::<LittleEndian>()?,
            data_decompressed_length1: reader.read_u32::<LittleEndian>()?,
            ..Self::default()
        };
        reader.read_u32_into::<LittleEndian>(&mut header.reserved1)?;
        header.is_asset_deleted      = reader.read_u32::<LittleEndian>()?;
        header.asset_offset          = reader.read_u32::<LittleEndian>()?;
        header.is_asset_embedded     = reader.read_u32::<LittleEndian>()?;
        header.asset_type            = reader.read_u64::<LittleEndian>()?;
        header.asset_value           = reader.read_u64::<LittleEndian>()?;
        header.crc_decompressed      = reader.read_u32::<LittleEndian>()?;
        header.crc_embedded          = reader.read_u32::<LittleEndian>()?;
        header.crc_identity          = reader.read_u32::<LittleEndian>()?;
        header.checksum_decompressed = reader.read_u32::<LittleEndian>()?;
        header.checksum_embedded     = reader.read_u32::<LittleEndian>()?;
        header.reserved2             = reader.read_u32::<LittleEndian>()?;
        reader.read_u16_into::<LittleEndian>(&mut header.path)?;

        if header.magic == 0 {
            return Err(PakError::InvalidHeader("invalid asset header read (zero magic)".into()));
        }
        Ok(header)
    }

    pub fn to_bytes(&self) -> [u8; ASSET_HEADER_SIZE] {
        let mut buf = [0u8; ASSET_HEADER_SIZE];
        let _ = self.write(&mut buf[..]);
        buf
    }
}

// ── AssetPayload ─────────────────────────────────────────────────────────────

/// An asset's bytes, tagged with which form they are in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPayload {
    /// The logical content.  Compressed on write if the header asks for it.
    Decompressed(Vec<u8>),
    /// Bytes exactly as stored on disk for a compressed asset.  Written back
    /// verbatim.
    Embedded(Vec<u8>),
}

impl AssetPayload {
    pub fn bytes(&self) -> &[u8] {
        match self {
            AssetPayload::Decompressed(b) | AssetPayload::Embedded(b) => b,
        }
    }
}

// ── Asset ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Asset {
    pub header:  AssetHeader,
    payload:     Option<AssetPayload>,
    modified:    bool,
}

impl Asset {
    /// A new embedded asset holding `data`.  When `compressed` is set the
    /// payload is deflated on write.
    pub fn new(path: &str, data: Vec<u8>, compressed: bool) -> PakResult<Self> {
        let header = AssetHeader {
            magic: DEFAULT_ASSET_MAGIC,
            is_data_compressed: u32::from(compressed),
            is_asset_embedded: 1,
            path: encode_path(path)?,
            ..AssetHeader::default()
        };
        let mut asset = Self::from_header(header);
        asset.set_data(data)?;
        Ok(asset)
    }

    pub(crate) fn from_header(header: AssetHeader) -> Self {
        Self { header, payload: None, modified: false }
    }

    pub(crate) fn with_payload(mut self, payload: AssetPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut AssetHeader, Option<&AssetPayload>) {
        (&mut self.header, self.payload.as_ref())
    }

    pub fn path(&self) -> PakResult<String> {
        self.header.path()
    }

    pub fn payload(&self) -> Option<&AssetPayload> {
        self.payload.as_ref()
    }

    /// The loaded bytes in whatever form they are held.
    pub fn data(&self) -> Option<&[u8]> {
        self.payload.as_ref().map(AssetPayload::bytes)
    }

    /// The logical content, when it is held uncompressed.
    pub fn decompressed(&self) -> Option<&[u8]> {
        match &self.payload {
            Some(AssetPayload::Decompressed(b)) => Some(b),
            _ => None,
        }
    }

    /// Replace the content and mark the asset as patched.
    pub fn set_data(&mut self, data: Vec<u8>) -> PakResult<()> {
        let len = u32::try_from(data.len()).map_err(|_| PakError::TooLarge(data.len() as u64))?;
        self.header.data_decompressed_length = len;
        self.header.data_decompressed_length0 = len;
        self.header.data_decompressed_length1 = len;
        self.payload = Some(AssetPayload::Decompressed(data));
        self.modified = true;
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}
