//! Asset path transcoding between the on-disk UTF-16 field and `String`.

use crate::error::{PakError, PakResult};

/// Capacity of the path field, in UTF-16 code units.
pub const PATH_CAPACITY: usize = 256;

/// Decode a path field up to its first NUL (or the whole field if full).
pub fn decode_path(units: &[u16; PATH_CAPACITY]) -> PakResult<String> {
    let len = units.iter().position(|&u| u == 0).unwrap_or(PATH_CAPACITY);
    String::from_utf16(&units[..len])
        .map_err(|_| PakError::InvalidPath("path is not valid UTF-16".into()))
}

/// Encode `path` into a zero-padded path field.
pub fn encode_path(path: &str) -> PakResult<[u16; PATH_CAPACITY]> {
    if path.is_empty() {
        return Err(PakError::InvalidPath("empty path".into()));
    }
    if path.contains('\0') {
        return Err(PakError::InvalidPath(format!("'{}' contains NUL", path.escape_debug())));
    }

    let mut units = [0u16; PATH_CAPACITY];
    let mut len = 0;
    for unit in path.encode_utf16() {
        if len == PATH_CAPACITY {
            return Err(PakError::InvalidPath(format!(
                "'{path}' is longer than {PATH_CAPACITY} UTF-16 code units"
            )));
        }
        units[len] = unit;
        len += 1;
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ascii_paths_survive() {
        let path = "data/텍스처/ünïcode_😀.dds";
        let units = encode_path(path).unwrap();
        assert_eq!(decode_path(&units).unwrap(), path);
    }

    #[test]
    fn tail_is_zeroed() {
        let units = encode_path("a/b").unwrap();
        assert_eq!(&units[..3], &[b'a' as u16, b'/' as u16, b'b' as u16]);
        assert!(units[3..].iter().all(|&u| u == 0));
    }

    #[test]
    fn full_field_needs_no_terminator() {
        let path = "x".repeat(PATH_CAPACITY);
        let units = encode_path(&path).unwrap();
        assert_eq!(decode_path(&units).unwrap(), path);

        let too_long = "x".repeat(PATH_CAPACITY + 1);
        assert!(matches!(encode_path(&too_long), Err(PakError::InvalidPath(_))));
    }

    #[test]
    fn unpaired_surrogate_is_rejected() {
        let mut units = [0u16; PATH_CAPACITY];
        units[0] = 0xD800;
        units[1] = b'a' as u16;
        assert!(matches!(decode_path(&units), Err(PakError::InvalidPath(_))));
    }
}
