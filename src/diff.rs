//! Staleness check of a local asset table against a remote manifest.

use crate::asset::Asset;
use crate::manifest::Manifest;
use crate::table::AssetTable;

/// Whether one local asset needs remediation.
pub fn is_stale(path: &str, asset: &Asset, manifest: &Manifest) -> bool {
    manifest.get(path) != Some(asset.header.crc_embedded)
}

/// Local paths that need remediation: absent from the manifest, or whose
/// embedded CRC differs from the manifest's.  Table order.
///
/// Paths that only the manifest knows are not reported here; see
/// [`remote_only`].
pub fn diff(table: &AssetTable, manifest: &Manifest) -> Vec<String> {
    table
        .iter()
        .filter(|(path, asset)| is_stale(path, asset, manifest))
        .map(|(path, _)| path.to_owned())
        .collect()
}

/// Manifest paths with no local asset, in manifest order.
pub fn remote_only(table: &AssetTable, manifest: &Manifest) -> Vec<String> {
    manifest
        .entries()
        .iter()
        .filter(|e| !table.contains(&e.path))
        .map(|e| e.path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, u32)]) -> AssetTable {
        let mut table = AssetTable::new();
        for &(path, crc) in entries {
            let mut asset = Asset::new(path, Vec::new(), false).unwrap();
            asset.header.crc_embedded = crc;
            table.insert(path.to_owned(), asset);
        }
        table
    }

    fn manifest(entries: &[(&str, u32)]) -> Manifest {
        let mut manifest = Manifest::new();
        for &(path, crc) in entries {
            manifest.insert(path.to_owned(), crc);
        }
        manifest
    }

    #[test]
    fn changed_crc_is_stale() {
        let local = table(&[("a", 0x1), ("b", 0x2)]);
        let remote = manifest(&[("a", 0x1), ("b", 0x9)]);
        assert_eq!(diff(&local, &remote), ["b"]);
    }

    #[test]
    fn unknown_to_remote_is_stale() {
        let local = table(&[("a", 0x1)]);
        assert_eq!(diff(&local, &Manifest::new()), ["a"]);
    }

    #[test]
    fn remote_only_paths_are_not_in_diff() {
        let local = table(&[]);
        let remote = manifest(&[("a", 0x1)]);
        assert!(diff(&local, &remote).is_empty());
        assert_eq!(remote_only(&local, &remote), ["a"]);
    }

    #[test]
    fn output_follows_table_order() {
        let local = table(&[("z", 1), ("m", 2), ("a", 3)]);
        let remote = manifest(&[("a", 0), ("m", 0), ("z", 0)]);
        assert_eq!(diff(&local, &remote), ["z", "m", "a"]);
    }
}
