// src/query/persisted.rs

//! Queries against package collections stored on disk
//!
//! Each call loads the file, works on its own in-memory tree and drops it
//! before returning. Callers only ever get independent copies back.

use super::{MatchMode, PACKAGES_KEY, Query, remove_pkg_from_dict};
use crate::codec::{self, Encoding};
use crate::config::Config;
use crate::error::Result;
use crate::plist::Dictionary;
use std::path::Path;
use tracing::{debug, info, warn};

/// Find a package by name in the collection stored at `path`
///
/// Returns `Ok(None)` when the file loads but holds no such package.
pub fn find_pkg_dict_from_plist_by_name(
    path: impl AsRef<Path>,
    pkgname: &str,
) -> Result<Option<Dictionary>> {
    let path = path.as_ref();
    let collection = codec::read_tree_from_file(path).inspect_err(|e| {
        debug!("cannot load {} looking for {}: {}", path.display(), pkgname, e);
    })?;

    Ok(Query::default()
        .find_pkg_in_dict(&collection, PACKAGES_KEY, pkgname, MatchMode::ByName)
        .cloned())
}

/// Remove a package by name from the collection stored at `path`
///
/// The file is rewritten only when a record was actually removed; returns
/// whether that happened.
pub fn remove_pkg_dict_from_plist_by_name(
    path: impl AsRef<Path>,
    pkgname: &str,
    encoding: Encoding,
) -> Result<bool> {
    let path = path.as_ref();
    let mut collection = codec::read_tree_from_file(path).inspect_err(|e| {
        debug!("cannot load {} to remove {}: {}", path.display(), pkgname, e);
    })?;

    if remove_pkg_from_dict(&mut collection, PACKAGES_KEY, pkgname)?.is_none() {
        debug!("{} not found in {}", pkgname, path.display());
        return Ok(false);
    }

    codec::write_tree_to_file(&collection, path, encoding).inspect_err(|e| {
        warn!("failed to write {} after removing {}: {}", path.display(), pkgname, e);
    })?;

    info!("Removed {} from {}", pkgname, path.display());
    Ok(true)
}

/// Load one of a package's metadata plists (`props.plist`, `files.plist`, ...)
pub fn pkg_dict_from_metadata_plist(config: &Config, pkgname: &str, plist: &str) -> Result<Dictionary> {
    let path = config.metadata_plist_path(pkgname, plist);
    debug!("Loading metadata plist {}", path.display());
    codec::read_tree_from_file(&path)
}
