//! Text manifest of asset CRCs: one `path:crc\n` line per asset, the CRC
//! being the eight-hex-digit CRC-32 of the embedded payload.
//!
//! Parsing is strict: a record cut off inside the path or the CRC, a path
//! that is not UTF-8, or a CRC field that does not parse as hex fails the
//! whole manifest.  Legacy producers padded the CRC with spaces
//! (`printf("%8x")`); leading spaces inside the eight-byte field are
//! accepted.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::error::{PakError, PakResult};
use crate::table::AssetTable;

pub const CRC_FIELD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub path: String,
    pub crc:  u32,
}

/// Entries in source order, unique by path.  A repeated path overwrites the
/// earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    by_path: HashMap<String, usize>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per asset, carrying its embedded CRC.
    pub fn from_table(table: &AssetTable) -> Self {
        let mut manifest = Self::new();
        for (path, asset) in table.iter() {
            manifest.insert(path.to_owned(), asset.header.crc_embedded);
        }
        manifest
    }

    pub fn insert(&mut self, path: String, crc: u32) {
        if let Some(&i) = self.by_path.get(&path) {
            self.entries[i].crc = crc;
            return;
        }
        self.by_path.insert(path.clone(), self.entries.len());
        self.entries.push(ManifestEntry { path, crc });
    }

    pub fn get(&self, path: &str) -> Option<u32> {
        self.by_path.get(path).map(|&i| self.entries[i].crc)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Wire format ──────────────────────────────────────────────────────────

    pub fn parse(bytes: &[u8]) -> PakResult<Self> {
        let mut manifest = Self::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let rest = &bytes[offset..];
            let colon = rest.iter().position(|&b| b == b':').ok_or_else(|| {
                PakError::ManifestFormat(format!(
                    "unexpected eof when parsing a path at byte {offset}"
                ))
            })?;
            let raw_path = &rest[..colon];
            if raw_path.contains(&b'\n') {
                return Err(PakError::ManifestFormat(format!(
                    "line break inside a path at byte {offset}"
                )));
            }
            let path = std::str::from_utf8(raw_path)
                .map_err(|_| PakError::ManifestFormat(format!(
                    "path at byte {offset} is not valid UTF-8"
                )))?
                .to_owned();
            if path.is_empty() {
                return Err(PakError::ManifestFormat(format!("empty path at byte {offset}")));
            }

            let field_start = colon + 1;
            let field = rest.get(field_start..field_start + CRC_FIELD_LEN).ok_or_else(|| {
                PakError::ManifestFormat(format!("unexpected eof in the crc of '{path}'"))
            })?;
            let crc = parse_crc(field)
                .ok_or_else(|| PakError::ManifestFormat(format!("invalid crc for '{path}'")))?;

            let mut consumed = field_start + CRC_FIELD_LEN;
            match rest.get(consumed) {
                None => {}
                Some(b'\n') => consumed += 1,
                Some(&b) => {
                    return Err(PakError::ManifestFormat(format!(
                        "expected a line break after the crc of '{path}', found {b:#04x}"
                    )))
                }
            }

            manifest.insert(path, crc);
            offset += consumed;
        }
        Ok(manifest)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> PakResult<()> {
        for entry in &self.entries {
            if entry.path.contains([':', '\n']) {
                return Err(PakError::ManifestFormat(format!(
                    "'{}' cannot be written: paths may not contain ':' or line breaks",
                    entry.path.escape_debug()
                )));
            }
            writeln!(writer, "{}:{:08x}", entry.path, entry.crc)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> PakResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn parse_crc(field: &[u8]) -> Option<u32> {
    let text = std::str::from_utf8(field).ok()?.trim_start_matches(' ');
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(text, 16).ok()
}
