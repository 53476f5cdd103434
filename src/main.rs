use clap::{Parser, Subcommand, ValueEnum};
use paklib::archive::{PakArchive, ReadOptions, WriteOptions};
use paklib::asset::Asset;
use paklib::codec::MAX_COMPRESSION_LEVEL;
use paklib::diff::{diff, remote_only};
use paklib::manifest::Manifest;
use paklib::PakError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "pak", about = "Inspect, build and diff pak asset archives")]
struct Cli {
    /// Log verbosity (RUST_LOG overrides)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn  => "warn",
            LogLevel::Info  => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show archive header fields
    Info {
        input: PathBuf,
    },
    /// List archive contents
    List {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write the path:crc manifest of an archive
    Manifest {
        input: PathBuf,
        /// Defaults to <input>.manifest
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List local assets that are stale against a manifest
    Diff {
        input: PathBuf,
        manifest: PathBuf,
        /// List manifest paths missing locally instead
        #[arg(long)]
        remote_only: bool,
        #[arg(long)]
        json: bool,
    },
    /// Extract every asset into a directory
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Inflate compressed assets instead of dumping them as stored
        #[arg(short, long)]
        decompress: bool,
        /// Check CRC and additive checksum of every payload
        #[arg(long)]
        verify: bool,
    },
    /// Build an archive from a directory tree
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        /// Store assets zlib-compressed
        #[arg(short, long)]
        compress: bool,
        #[arg(short, long, default_value_t = MAX_COMPRESSION_LEVEL)]
        level: u32,
    },
}

#[derive(Serialize)]
struct ListEntry<'a> {
    path:              &'a str,
    embedded:          bool,
    compressed:        bool,
    deleted:           bool,
    offset:            u32,
    stored_size:       u32,
    decompressed_size: u32,
    crc:               String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pak = PakArchive::open(&input, &ReadOptions::default())?;
            let h = pak.header();
            println!("── pak archive ──────────────────────────────────────────");
            println!("  Path            {}", input.display());
            println!("  Magic           {}", hex::encode(h.header_magic.to_le_bytes()));
            println!("  Paklib version  {}", h.paklib_version);
            println!("  Locale          {}", h.locale);
            println!("  Team version    {}", h.team_version);
            println!("  Assets          {} (used {}, deleted {})",
                     h.assets_count, h.used_assets_count, h.deleted_assets_count);
            println!("  File size       {} B", h.file_size);
            println!("  Signature       {:08x}", h.header_sign);
            println!("  Table entries   {}", pak.len());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let pak = PakArchive::open(&input, &ReadOptions::default())?;
            let entries: Vec<ListEntry<'_>> = pak.assets().iter().map(|(path, asset)| {
                let h = &asset.header;
                ListEntry {
                    path,
                    embedded:          h.is_embedded(),
                    compressed:        h.is_compressed(),
                    deleted:           h.is_deleted(),
                    offset:            h.embedded_data_offset,
                    stored_size:       h.embedded_data_length,
                    decompressed_size: h.data_decompressed_length,
                    crc:               hex::encode(h.crc_embedded.to_be_bytes()),
                }
            }).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("Archive: {}", input.display());
                println!("{:<48} {:>12} {:>12} {:>4}  CRC", "Path", "Size", "Stored", "Flag");
                for e in &entries {
                    let flags = format!("{}{}",
                        if e.compressed { "z" } else { "-" },
                        if e.deleted { "d" } else { "-" });
                    println!("{:<48} {:>12} {:>12} {:>4}  {}",
                        e.path, e.decompressed_size, e.stored_size, flags, e.crc);
                }
            }
        }

        // ── Manifest ─────────────────────────────────────────────────────────
        Commands::Manifest { input, output } => {
            let pak = PakArchive::open(&input, &ReadOptions::default())?;
            let output = output.unwrap_or_else(|| default_manifest_path(&input));
            let manifest = Manifest::from_table(pak.assets());
            std::fs::write(&output, manifest.to_bytes()?)?;
            info!(entries = manifest.len(), "manifest written");
            println!("Created: {}", output.display());
        }

        // ── Diff ─────────────────────────────────────────────────────────────
        Commands::Diff { input, manifest, remote_only: only_remote, json } => {
            let pak = PakArchive::open(&input, &ReadOptions::default())?;
            let manifest = Manifest::parse(&std::fs::read(&manifest)?)?;
            let paths = if only_remote {
                remote_only(pak.assets(), &manifest)
            } else {
                diff(pak.assets(), &manifest)
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&paths)?);
            } else {
                for path in &paths {
                    println!("{path}");
                }
            }
            info!(count = paths.len(), "diff complete");
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, decompress, verify } => {
            let opts = ReadOptions {
                include_payloads: true,
                decompress,
                verify_checksums: verify,
            };
            let pak = PakArchive::open(&input, &opts)?;
            let written = pak.extract_all(&output_dir)?;
            println!("Extracted {written} asset(s) to: {}", output_dir.display());
        }

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, input, compress, level } => {
            let mut pak = PakArchive::new();
            for entry in WalkDir::new(&input).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = relative_asset_path(&input, entry.path())?;
                let data = std::fs::read(entry.path())?;
                pak.insert(Asset::new(&rel, data, compress)?)?;
                println!("  packed  {rel}");
            }
            pak.save(&output, &WriteOptions { compression_level: level })?;
            println!("Created: {} ({} assets)", output.display(), pak.len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn default_manifest_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".manifest");
    PathBuf::from(name)
}

/// `root/a/b.txt` → `a/b.txt`, always with forward slashes.  Names that are
/// not valid UTF-8 are rejected rather than renamed.
fn relative_asset_path(root: &Path, file: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let rel = file.strip_prefix(root)?;
    let parts = rel
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                PakError::InvalidPath(format!("{} is not valid UTF-8", file.display()))
            })
        })
        .collect::<Result<Vec<&str>, PakError>>()?;
    Ok(parts.join("/"))
}
