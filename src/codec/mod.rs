// src/codec/mod.rs

//! Plist storage codec
//!
//! Plist files and archive entries may hold either a plain XML document or
//! the same document gzip-compressed. Readers detect which one they got:
//! inflation is attempted first, and only a data-format failure (input is
//! not gzip) falls back to parsing the raw bytes. Stream corruption and
//! allocation failure while inflating are fatal.
//!
//! Writers replace the destination atomically: the document is written to
//! a temporary file in the same directory and renamed over the target.

pub mod archive;

pub use archive::{ArchiveEntry, read_tree_from_archive, read_tree_from_archive_entry};

use crate::error::{Error, Result};
use crate::plist::{Dictionary, xml};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Size of each inflation step
pub const READ_CHUNK: usize = 512;

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Outcome of a failed inflation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecompressError {
    /// Input is not gzip data; parse it as plain text instead
    #[error("data is not gzip compressed")]
    NotCompressed,

    /// Stream corruption or allocation failure
    #[error("{0}")]
    Fatal(String),
}

impl From<DecompressError> for Error {
    fn from(e: DecompressError) -> Self {
        Error::Decompress(e.to_string())
    }
}

/// On-disk encoding of a plist file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    Gzip,
}

/// Check for the gzip magic bytes
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Inflate a gzip buffer
///
/// Output grows one `READ_CHUNK` at a time with fallible reservation, so an
/// allocation failure surfaces as `Fatal` instead of aborting the process.
pub fn decompress(data: &[u8]) -> std::result::Result<Vec<u8>, DecompressError> {
    if !is_gzip(data) {
        return Err(DecompressError::NotCompressed);
    }

    let mut decoder = GzDecoder::new(data);
    let mut chunk = [0u8; READ_CHUNK];
    let mut output = Vec::new();

    loop {
        let have = match decoder.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(classify(e)),
        };
        output.try_reserve(have).map_err(|e| {
            DecompressError::Fatal(format!(
                "out of memory after inflating {} bytes: {}",
                output.len(),
                e
            ))
        })?;
        output.extend_from_slice(&chunk[..have]);
    }

    Ok(output)
}

fn classify(e: io::Error) -> DecompressError {
    match e.kind() {
        // Bad header or corrupt deflate data: not something we can inflate
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => DecompressError::NotCompressed,
        _ => DecompressError::Fatal(format!("gzip stream error: {}", e)),
    }
}

/// Gzip a buffer
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Parse a plain or gzip-compressed plist whose root must be a dictionary
pub fn internalize_bytes(data: &[u8]) -> Result<Dictionary> {
    match decompress(data) {
        Ok(inflated) => {
            debug!("Inflated plist: {} -> {} bytes", data.len(), inflated.len());
            xml::internalize(&inflated)
        }
        Err(DecompressError::NotCompressed) => xml::internalize(data),
        Err(e) => Err(e.into()),
    }
}

/// Serialize a dictionary with the given encoding
pub fn externalize_bytes(dict: &Dictionary, encoding: Encoding) -> Result<Vec<u8>> {
    let document = xml::externalize(dict);
    match encoding {
        Encoding::Plain => Ok(document.into_bytes()),
        Encoding::Gzip => compress(document.as_bytes()),
    }
}

/// Read a plist file (plain or gzip)
pub fn read_tree_from_file(path: impl AsRef<Path>) -> Result<Dictionary> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    internalize_bytes(&data)
}

/// Write a plist file, replacing any existing file atomically
pub fn write_tree_to_file(dict: &Dictionary, path: impl AsRef<Path>, encoding: Encoding) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing {} ({:?})", path.display(), encoding);

    let bytes = externalize_bytes(dict, encoding)?;
    let write_err = |source: io::Error| Error::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&bytes).map_err(write_err)?;

    match fs::metadata(path) {
        Ok(existing) => tmp
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?,
        Err(_) => set_default_permissions(tmp.as_file()).map_err(write_err)?,
    }

    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
