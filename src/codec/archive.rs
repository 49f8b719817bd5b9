// src/codec/archive.rs

//! Plist extraction from archive entries
//!
//! Binary packages carry their metadata (`props.plist`, `files.plist`) as
//! entries of a tar stream. The reader only needs the entry's declared size
//! and a way to pull bytes, so any archive format can plug in through
//! `ArchiveEntry`.

use super::internalize_bytes;
use crate::error::{Error, Result};
use crate::plist::Dictionary;
use std::io::{self, Read};
use tar::Archive;
use tracing::debug;

/// A single entry of an archive being read sequentially
pub trait ArchiveEntry {
    /// Size in bytes declared by the entry header
    fn entry_size(&self) -> u64;

    /// Read up to `buf.len()` bytes of entry data; `Ok(0)` means end of entry
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<'a, R: 'a + Read> ArchiveEntry for tar::Entry<'a, R> {
    fn entry_size(&self) -> u64 {
        self.size()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

/// Read the plist stored in an archive entry
///
/// Exactly `entry_size()` bytes are read; an entry that ends early is an
/// error rather than a truncated document. The data may be plain or gzip.
pub fn read_tree_from_archive_entry<E: ArchiveEntry + ?Sized>(entry: &mut E) -> Result<Dictionary> {
    let declared = entry.entry_size();
    let size = usize::try_from(declared).map_err(|_| {
        Error::InvalidArgument(format!("archive entry too large: {} bytes", declared))
    })?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(size).map_err(|e| {
        Error::Decompress(format!("cannot allocate {} bytes for archive entry: {}", size, e))
    })?;
    buf.resize(size, 0);

    let mut filled = 0;
    while filled < size {
        match entry.read_bytes(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if filled != size {
        return Err(Error::ShortRead {
            expected: size,
            actual: filled,
        });
    }

    internalize_bytes(&buf)
}

/// Scan a tar stream for `name` and read it as a plist
///
/// Entry paths match with or without a leading `./`. Returns `Ok(None)` if
/// the archive has no such entry.
pub fn read_tree_from_archive<R: Read>(reader: R, name: &str) -> Result<Option<Dictionary>> {
    let wanted = name.trim_start_matches("./");
    let mut archive = Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry
            .map_err(|e| Error::ParseError(format!("Failed to read archive entry: {}", e)))?;

        let path = entry
            .path()
            .map_err(|e| Error::ParseError(format!("Invalid path in archive: {}", e)))?
            .to_string_lossy()
            .to_string();

        if path.trim_start_matches("./") == wanted {
            debug!("Reading {} from archive ({} bytes)", path, entry.entry_size());
            return read_tree_from_archive_entry(&mut entry).map(Some);
        }
    }

    Ok(None)
}
