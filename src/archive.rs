//! High-level [`PakArchive`] API: read a pak into an in-memory asset table,
//! patch it, write it back.
//!
//! ```no_run
//! use paklib::archive::{PakArchive, ReadOptions, WriteOptions};
//! use paklib::asset::Asset;
//!
//! let mut pak = PakArchive::new();
//! pak.insert(Asset::new("ui/readme.txt", b"Hello, pak!".to_vec(), true)?)?;
//! pak.save("res.pak", &WriteOptions::default())?;
//!
//! let opts = ReadOptions { include_payloads: true, decompress: true, ..Default::default() };
//! let pak = PakArchive::open("res.pak", &opts)?;
//! assert_eq!(pak.asset("ui/readme.txt").unwrap().data(), Some(&b"Hello, pak!"[..]));
//! # Ok::<(), paklib::error::PakError>(())
//! ```
//!
//! # Layout
//!
//! | Offset | Record |
//! |--------|--------|
//! | `0` | [`PakHeader`], 40 B |
//! | [`CONTENT_SECTOR`] | [`ContentHeader`], 12 B |
//! | `CONTENT_SECTOR + 12 + k * 620` | header slot of asset *k* |
//! | [`DATA_SECTOR`] | payloads back to back, in table order |
//! | end | [`DataHeader`] sentinel |

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::asset::{Asset, AssetHeader, AssetPayload, ASSET_HEADER_SIZE};
use crate::checksum::Checksums;
use crate::codec::{Codec, ZlibCodec, MAX_COMPRESSION_LEVEL};
use crate::error::{alloc_buffer, PakError, PakResult};
use crate::header::{
    ContentHeader, DataHeader, PakHeader, CONTENT_HEADER_SIZE, CONTENT_SECTOR, DATA_HEADER_SIZE,
    DATA_SECTOR, PAK_HEADER_SIZE,
};
use crate::io_stream::ByteStream;
use crate::path::encode_path;
use crate::table::AssetTable;

/// Most header slots that fit between the content header and the data sector.
pub const MAX_ASSETS: usize =
    (DATA_SECTOR - CONTENT_SECTOR - CONTENT_HEADER_SIZE as u64) as usize / ASSET_HEADER_SIZE;

// ── Options ──────────────────────────────────────────────────────────────────

/// Configuration for [`PakArchive::open`] / [`PakArchive::read_from`].
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Load embedded payloads, not just the header table.
    pub include_payloads: bool,
    /// Inflate compressed payloads.  Off by default: payloads come back
    /// exactly as stored on disk.
    pub decompress:       bool,
    /// Recompute CRC-32 and the additive checksum of every loaded payload
    /// and fail on mismatch.
    pub verify_checksums: bool,
}

impl ReadOptions {
    pub fn with_payloads() -> Self {
        Self { include_payloads: true, ..Self::default() }
    }
}

/// Configuration for [`PakArchive::save`] / [`PakArchive::write_to`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compression_level: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { compression_level: MAX_COMPRESSION_LEVEL }
    }
}

// ── PakArchive ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PakArchive {
    header:  PakHeader,
    content: ContentHeader,
    assets:  AssetTable,
}

impl Default for PakArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl PakArchive {
    pub fn new() -> Self {
        Self {
            header:  PakHeader::default(),
            content: ContentHeader::default(),
            assets:  AssetTable::new(),
        }
    }

    // ── Read ─────────────────────────────────────────────────────────────────

    pub fn open<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> PakResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), ?opts, "opening pak");
        Self::read_from(BufReader::new(File::open(path)?), opts)
    }

    /// Read a whole archive.  Any failure aborts the read; no partially
    /// populated archive is ever returned.
    pub fn read_from<R: Read + Seek>(reader: R, opts: &ReadOptions) -> PakResult<Self> {
        let mut stream = ByteStream::from_source(reader);
        stream.set_reader_cursor(SeekFrom::Start(0))?;

        let mut buf = [0u8; PAK_HEADER_SIZE];
        stream.read(&mut buf, None)?;
        let header = PakHeader::read(&buf[..])?;

        stream.set_reader_cursor(SeekFrom::Start(CONTENT_SECTOR))?;
        let mut buf = [0u8; CONTENT_HEADER_SIZE];
        stream.read(&mut buf, None)?;
        let content = ContentHeader::read(&buf[..])?;

        let stream_len = stream.source_len()?;
        if opts.verify_checksums {
            verify_sentinel(&mut stream, &header, stream_len)?;
        }

        let count = content.assets_count as usize;
        debug!(count, file_size = header.file_size, stream_len, "reading asset table");

        let mut assets = AssetTable::with_capacity(count.min(MAX_ASSETS));
        for index in 0..count {
            let (path, asset) = read_asset(&mut stream, stream_len, opts)
                .map_err(|e| e.at_asset(index))?;
            if assets.insert(path.clone(), asset).is_some() {
                warn!(index, path = %path, "duplicate asset path, keeping the later entry");
            }
        }

        let mut archive = Self { header, content, assets };
        if archive.assets.len() != count {
            archive.sync_counts();
        }
        Ok(archive)
    }

    // ── Write ────────────────────────────────────────────────────────────────

    /// Write to a temporary file next to `path` and rename it into place, so
    /// a failed write leaves any existing archive at `path` untouched.
    pub fn save<P: AsRef<Path>>(&mut self, path: P, opts: &WriteOptions) -> PakResult<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), assets = self.assets.len(), "saving pak");
        self.check_writable()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        self.write_to(BufWriter::new(staged.as_file_mut()), opts)?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| PakError::Io(e.error))?;
        Ok(())
    }

    /// Fail early on anything `write_to` would reject before touching the sink.
    fn check_writable(&self) -> PakResult<()> {
        let count = self.assets.len();
        if count > MAX_ASSETS {
            return Err(PakError::TableOverflow { count, max: MAX_ASSETS });
        }
        for (index, (path, asset)) in self.assets.iter().enumerate() {
            if asset.header.is_embedded() && asset.payload().is_none() {
                return Err(PakError::MissingPayload(path.to_owned()).at_asset(index));
            }
        }
        Ok(())
    }

    /// Lay the table out into `writer`, refreshing every asset's offsets and
    /// checksums, and hand the writer back once flushed.
    pub fn write_to<W: Write + Seek>(&mut self, writer: W, opts: &WriteOptions) -> PakResult<W> {
        self.check_writable()?;
        let count = self.assets.len();

        let mut stream = ByteStream::from_sink(writer);
        stream.set_writer_cursor(SeekFrom::Start(0))?;

        self.content.assets_count = count as u32;
        stream.set_writer_cursor(SeekFrom::Start(CONTENT_SECTOR))?;
        stream.write(&self.content.to_bytes(), None)?;

        let mut data_offset = DATA_SECTOR;
        for (index, (path, asset)) in self.assets.iter_mut().enumerate() {
            write_asset(&mut stream, path, asset, &mut data_offset, opts)
                .map_err(|e| e.at_asset(index))?;
        }

        // The sentinel closes the payload region.
        stream.set_writer_cursor(SeekFrom::Start(data_offset))?;
        stream.write(&DataHeader::default().to_bytes(), None)?;

        self.header.assets_count = count as u32;
        self.header.used_assets_count = count as u32;
        self.header.deleted_assets_count = 0;
        self.header.file_size = to_u32(stream.writer_cursor()?)?;

        stream.set_writer_cursor(SeekFrom::Start(0))?;
        stream.write(&self.header.to_bytes(), None)?;
        stream.flush()?;

        debug!(assets = count, file_size = self.header.file_size, "pak written");
        let (_, sink) = stream.into_parts();
        sink.ok_or(PakError::IoUnavailable("sink"))
    }

    // ── Table access ─────────────────────────────────────────────────────────

    pub fn header(&self) -> &PakHeader {
        &self.header
    }

    pub fn content_header(&self) -> &ContentHeader {
        &self.content
    }

    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    pub fn asset(&self, path: &str) -> Option<&Asset> {
        self.assets.get(path)
    }

    pub fn asset_mut(&mut self, path: &str) -> Option<&mut Asset> {
        self.assets.get_mut(path)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Asset)> {
        self.assets.iter_mut()
    }

    /// Add or replace an asset under its own path.
    pub fn insert(&mut self, asset: Asset) -> PakResult<Option<Asset>> {
        let path = asset.path()?;
        let previous = self.assets.insert(path, asset);
        self.sync_counts();
        Ok(previous)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn sync_counts(&mut self) {
        let count = self.assets.len() as u32;
        self.header.assets_count = count;
        self.content.assets_count = count;
    }

    // ── Extraction ───────────────────────────────────────────────────────────

    /// Write every loaded payload below `dest`, creating directories as
    /// needed.  Returns the number of files written.
    pub fn extract_all<P: AsRef<Path>>(&self, dest: P) -> PakResult<usize> {
        let dest = dest.as_ref();
        let mut written = 0;
        for (path, asset) in self.assets.iter() {
            let Some(data) = asset.data() else {
                trace!(path = %path, "no payload loaded, skipping");
                continue;
            };
            let target = dest.join(sanitize_path(path)?);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            File::create(&target)?.write_all(data)?;
            written += 1;
        }
        Ok(written)
    }
}

// ── Asset I/O ────────────────────────────────────────────────────────────────

/// Read the header at the reader cursor (its slot), then its payload if
/// requested.  Leaves the cursor at the next slot.
fn read_asset<R: Read + Seek, W>(
    stream:     &mut ByteStream<R, W>,
    stream_len: u64,
    opts:       &ReadOptions,
) -> PakResult<(String, Asset)> {
    let slot = stream.reader_cursor()?;
    let mut buf = [0u8; ASSET_HEADER_SIZE];
    stream.read(&mut buf, None)?;
    let header = AssetHeader::read(&buf[..])?;
    let path = header.path()?;
    trace!(
        slot,
        path = %path,
        offset = header.embedded_data_offset,
        length = header.embedded_data_length,
        compressed = header.is_compressed(),
        "asset header"
    );

    let asset = Asset::from_header(header);
    if !(opts.include_payloads && asset.header.is_embedded()) {
        return Ok((path, asset));
    }
    let payload = read_payload(stream, &asset.header, stream_len, opts)?;
    Ok((path, asset.with_payload(payload)))
}

fn read_payload<R: Read + Seek, W>(
    stream:     &mut ByteStream<R, W>,
    header:     &AssetHeader,
    stream_len: u64,
    opts:       &ReadOptions,
) -> PakResult<AssetPayload> {
    let offset = u64::from(header.embedded_data_offset);
    let length = header.embedded_data_length as usize;
    // Bound the allocation by what the stream can actually hold.
    if offset + length as u64 > stream_len {
        return Err(PakError::ShortRead { expected: length, offset });
    }
    let mut raw = alloc_buffer(length, "embedded buffer")?;
    stream.read(&mut raw, Some(SeekFrom::Start(offset)))?;

    if opts.verify_checksums {
        verify(&raw, header.crc_embedded, header.checksum_embedded, "embedded")?;
    }
    if !header.is_compressed() {
        return Ok(AssetPayload::Decompressed(raw));
    }
    if !opts.decompress {
        return Ok(AssetPayload::Embedded(raw));
    }

    // Small buffers may inflate when "compressed"; size for the larger side.
    let bound = header.embedded_data_length.max(header.data_decompressed_length) as usize;
    let data = ZlibCodec.decompress(&raw, bound)?;
    if opts.verify_checksums {
        verify(&data, header.crc_decompressed, header.checksum_decompressed, "decompressed")?;
    }
    Ok(AssetPayload::Decompressed(data))
}

/// The `FILE` sentinel must sit in the last four bytes `file_size` covers.
fn verify_sentinel<R: Read + Seek, W>(
    stream:     &mut ByteStream<R, W>,
    header:     &PakHeader,
    stream_len: u64,
) -> PakResult<()> {
    let end = u64::from(header.file_size);
    if end > stream_len || end < DATA_SECTOR + DATA_HEADER_SIZE as u64 {
        return Err(PakError::InvalidHeader(format!(
            "file size {end:#x} does not fit a {stream_len:#x}-byte stream"
        )));
    }
    let mut buf = [0u8; DATA_HEADER_SIZE];
    stream.read(&mut buf, Some(SeekFrom::Start(end - DATA_HEADER_SIZE as u64)))?;
    DataHeader::from_bytes(buf)?;
    Ok(())
}

fn verify(data: &[u8], crc: u32, additive: u32, what: &str) -> PakResult<()> {
    let sums = Checksums::of(data);
    if sums.crc != crc {
        return Err(PakError::CorruptPayload(format!(
            "{what} CRC {:08x}, header says {crc:08x}", sums.crc
        )));
    }
    if sums.additive != additive {
        return Err(PakError::CorruptPayload(format!(
            "{what} checksum {:08x}, header says {additive:08x}", sums.additive
        )));
    }
    Ok(())
}

/// Write one asset: payload at `data_offset`, then its header back at the
/// slot the writer cursor was on.  Advances `data_offset` past the payload.
fn write_asset<R, W: Write + Seek>(
    stream:      &mut ByteStream<R, W>,
    path:        &str,
    asset:       &mut Asset,
    data_offset: &mut u64,
    opts:        &WriteOptions,
) -> PakResult<()> {
    let header_origin = stream.set_writer_cursor(SeekFrom::Start(*data_offset))?;
    asset.header.asset_offset = to_u32(header_origin)?;
    // The table key is authoritative for the stored path.
    asset.header.path = encode_path(path)?;

    let written = write_payload(stream, path, asset, opts)?;

    stream.set_writer_cursor(SeekFrom::Start(header_origin))?;
    stream.write(&asset.header.to_bytes(), None)?;

    trace!(path = %path, slot = header_origin, offset = *data_offset, written, "asset written");
    *data_offset += written;
    Ok(())
}

/// Emit the payload at the writer cursor and refresh the header's embedded
/// offset, length and both checksum pairs.  Returns the bytes written.
fn write_payload<R, W: Write + Seek>(
    stream: &mut ByteStream<R, W>,
    path:   &str,
    asset:  &mut Asset,
    opts:   &WriteOptions,
) -> PakResult<u64> {
    let (header, payload) = asset.parts_mut();
    if !header.is_embedded() {
        return Ok(0);
    }
    let payload = payload.ok_or_else(|| PakError::MissingPayload(path.to_owned()))?;
    header.embedded_data_offset = to_u32(stream.writer_cursor()?)?;

    let (decompressed, embedded) = match payload {
        AssetPayload::Decompressed(data) => {
            let decompressed = Checksums::of(data);
            if header.is_compressed() {
                let hint = data.len().max(header.embedded_data_length as usize);
                let packed = ZlibCodec.compress(data, opts.compression_level, hint)?;
                trace!(path = %path, codec = ZlibCodec.name(), packed = packed.len(), "payload compressed");
                stream.write(&packed, None)?;
                header.embedded_data_length = to_u32(packed.len() as u64)?;
                (decompressed, Checksums::of(&packed))
            } else {
                stream.write(data, None)?;
                header.embedded_data_length = to_u32(data.len() as u64)?;
                (decompressed, decompressed)
            }
        }
        AssetPayload::Embedded(raw) => {
            stream.write(raw, None)?;
            header.embedded_data_length = to_u32(raw.len() as u64)?;
            let embedded = Checksums::of(raw);
            if header.is_compressed() {
                // The logical bytes were never inflated; keep what the header had.
                let kept = Checksums {
                    crc:      header.crc_decompressed,
                    additive: header.checksum_decompressed,
                };
                (kept, embedded)
            } else {
                (embedded, embedded)
            }
        }
    };

    header.crc_decompressed = decompressed.crc;
    header.checksum_decompressed = decompressed.additive;
    header.crc_embedded = embedded.crc;
    header.checksum_embedded = embedded.additive;
    Ok(u64::from(header.embedded_data_length))
}

fn to_u32(offset: u64) -> PakResult<u32> {
    u32::try_from(offset).map_err(|_| PakError::TooLarge(offset))
}

/// Turn an archive path into a relative filesystem path.  Both separators
/// are accepted; anything that would escape the destination is rejected.
fn sanitize_path(path: &str) -> PakResult<PathBuf> {
    let mut out = PathBuf::new();
    for part in path.split(['/', '\\']).filter(|p| !p.is_empty() && *p != ".") {
        let part = Path::new(part);
        if !matches!(part.components().next(), Some(Component::Normal(_)))
            || part.components().count() != 1
        {
            return Err(PakError::InvalidPath(format!("'{path}' escapes the destination")));
        }
        out.push(part);
    }
    if out.as_os_str().is_empty() {
        return Err(PakError::InvalidPath(format!("'{path}' has no file name")));
    }
    Ok(out)
}
