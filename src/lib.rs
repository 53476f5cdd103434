pub mod error;
pub mod io_stream;
pub mod checksum;
pub mod codec;
pub mod path;
pub mod header;
pub mod asset;
pub mod table;
pub mod archive;
pub mod manifest;
pub mod diff;
pub mod update;

pub use error::{PakError, PakResult};
pub use archive::{PakArchive, ReadOptions, WriteOptions};
pub use asset::{Asset, AssetHeader, AssetPayload};
pub use table::AssetTable;
pub use manifest::{Manifest, ManifestEntry};
pub use diff::{diff, remote_only};
