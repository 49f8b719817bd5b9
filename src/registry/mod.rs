// src/registry/mod.rs

//! Installed-packages registry
//!
//! The registry file is loaded lazily on the first `acquire()` and cached
//! while any `RegistryGuard` is alive. Dropping the last guard discards
//! the cache, so the next `acquire()` reads the file again and picks up
//! changes made in between.
//!
//! Guards share one collection. `RegistryGuard::write` hands out mutable
//! access to it and `Registry::store` writes it back to the registry file;
//! changes that are not stored are lost when the last guard goes away.
//!
//! A `Registry` is meant to be owned by one thread and passed by reference
//! to whatever needs it; it is neither `Send` nor `Sync`.

pub mod state;

pub use state::{PkgState, STATE_KEY, get_state, set_state};

use crate::codec::{self, Encoding};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::plist::Dictionary;
use crate::query::{MatchMode, PACKAGES_KEY, Query};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

type SharedCollection = Rc<RefCell<Dictionary>>;

/// Result of looking up an installed package
#[derive(Debug, Clone, PartialEq)]
pub enum InstalledLookup {
    /// Package is unpacked or installed; an independent copy of its record
    Found(Dictionary),
    /// Package was removed but its configuration files remain
    ConfigFilesOnly,
    /// No such package, or it is not installed
    Absent,
}

/// Lazily loaded, use-counted installed-packages collection
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    cache: RefCell<Option<SharedCollection>>,
    uses: Cell<usize>,
}

impl Registry {
    /// Registry at the location given by `config`
    pub fn new(config: &Config) -> Self {
        Self::with_path(config.registry_path())
    }

    /// Registry backed by an explicit file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RefCell::new(None),
            uses: Cell::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live guards
    pub fn uses(&self) -> usize {
        self.uses.get()
    }

    /// Whether the collection is currently cached
    pub fn is_loaded(&self) -> bool {
        self.cache.borrow().is_some()
    }

    /// Borrow the collection, loading it if nothing holds it yet
    ///
    /// A load failure leaves the use count unchanged.
    pub fn acquire(&self) -> Result<RegistryGuard<'_>> {
        let collection = {
            let mut cache = self.cache.borrow_mut();
            match cache.as_ref() {
                Some(collection) => Rc::clone(collection),
                None => {
                    let loaded = Rc::new(RefCell::new(codec::read_tree_from_file(&self.path)?));
                    debug!("Loaded registry from {}", self.path.display());
                    *cache = Some(Rc::clone(&loaded));
                    loaded
                }
            }
        };

        self.uses.set(self.uses.get() + 1);
        Ok(RegistryGuard {
            registry: self,
            collection,
        })
    }

    /// Write the cached collection back to the registry file
    ///
    /// Only valid while a guard is alive; otherwise there is nothing cached
    /// to store.
    pub fn store(&self, encoding: Encoding) -> Result<()> {
        let cache = self.cache.borrow();
        let Some(collection) = cache.as_ref() else {
            return Err(Error::InvalidArgument(format!(
                "registry {} must be acquired before it is stored",
                self.path.display()
            )));
        };

        codec::write_tree_to_file(&collection.borrow(), &self.path, encoding)?;
        info!("Stored registry {}", self.path.display());
        Ok(())
    }

    fn release(&self) {
        let remaining = self.uses.get().saturating_sub(1);
        self.uses.set(remaining);
        if remaining == 0 {
            self.cache.borrow_mut().take();
            debug!("Released registry {}", self.path.display());
        }
    }

    /// Look up an installed package by name or pattern
    pub fn find_installed(&self, identifier: &str, mode: MatchMode) -> Result<InstalledLookup> {
        self.find_installed_with(&Query::default(), identifier, mode)
    }

    /// Same as `find_installed` with a caller-supplied query engine
    ///
    /// Fails if the matching record has no valid `state`.
    pub fn find_installed_with(
        &self,
        query: &Query<'_>,
        identifier: &str,
        mode: MatchMode,
    ) -> Result<InstalledLookup> {
        let registry = self.acquire()?;
        let collection = registry.read();

        let Some(record) = query.find_pkg_in_dict(&collection, PACKAGES_KEY, identifier, mode) else {
            return Ok(InstalledLookup::Absent);
        };

        let lookup = match get_state(record)? {
            PkgState::Unpacked | PkgState::Installed => InstalledLookup::Found(record.clone()),
            PkgState::ConfigFiles => {
                debug!("{} is in config-files state", identifier);
                InstalledLookup::ConfigFilesOnly
            }
            PkgState::NotInstalled => InstalledLookup::Absent,
        };
        Ok(lookup)
    }
}

/// Scoped use of the registry collection; releases on drop
///
/// `read` and `write` follow `RefCell` rules: a `write` while any `read`
/// from any guard is still held panics.
#[derive(Debug)]
pub struct RegistryGuard<'r> {
    registry: &'r Registry,
    collection: SharedCollection,
}

impl RegistryGuard<'_> {
    /// Shared view of the collection
    pub fn read(&self) -> Ref<'_, Dictionary> {
        self.collection.borrow()
    }

    /// Mutable view of the collection, visible to every guard
    pub fn write(&self) -> RefMut<'_, Dictionary> {
        self.collection.borrow_mut()
    }
}

impl Drop for RegistryGuard<'_> {
    fn drop(&mut self) {
        self.registry.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plist::Array;
    use tempfile::{TempDir, tempdir};

    fn record(name: &str, state: &str, provides: &[&str]) -> Dictionary {
        let mut d = Dictionary::new();
        d.set("pkgname", name).unwrap();
        d.set("pkgver", format!("{}-1.0", name)).unwrap();
        d.set(STATE_KEY, state).unwrap();
        if !provides.is_empty() {
            d.set("provides", provides.iter().copied().collect::<Array>())
                .unwrap();
        }
        d
    }

    fn registry_with(records: Vec<Dictionary>) -> (TempDir, Registry) {
        let dir = tempdir().unwrap();
        let config = Config::with_root(dir.path());
        std::fs::create_dir_all(config.meta_dir()).unwrap();

        let mut collection = Dictionary::new();
        collection
            .set(PACKAGES_KEY, records.into_iter().collect::<Array>())
            .unwrap();
        codec::write_tree_to_file(&collection, config.registry_path(), Encoding::Gzip).unwrap();

        (dir, Registry::new(&config))
    }

    #[test]
    fn test_acquire_release_cycle() {
        let (_dir, registry) = registry_with(vec![record("foo", "installed", &[])]);
        assert!(!registry.is_loaded());

        {
            let first = registry.acquire().unwrap();
            let second = registry.acquire().unwrap();
            assert_eq!(registry.uses(), 2);
            assert_eq!(first.read().get_array(PACKAGES_KEY).unwrap().len(), 1);
            drop(second);
            assert_eq!(registry.uses(), 1);
            assert!(registry.is_loaded());
        }

        assert_eq!(registry.uses(), 0);
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_reload_after_full_release() {
        let (_dir, registry) = registry_with(vec![record("foo", "installed", &[])]);

        {
            let guard = registry.acquire().unwrap();
            assert_eq!(guard.read().get_array(PACKAGES_KEY).unwrap().len(), 1);
        }

        let mut updated = Dictionary::new();
        updated
            .set(
                PACKAGES_KEY,
                [record("foo", "installed", &[]), record("bar", "unpacked", &[])]
                    .into_iter()
                    .collect::<Array>(),
            )
            .unwrap();
        codec::write_tree_to_file(&updated, registry.path(), Encoding::Plain).unwrap();

        let guard = registry.acquire().unwrap();
        assert_eq!(guard.read().get_array(PACKAGES_KEY).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_registry_file() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(&Config::with_root(dir.path()));

        assert!(registry.acquire().is_err());
        assert!(registry.find_installed("foo", MatchMode::ByName).is_err());
        assert_eq!(registry.uses(), 0);
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_find_installed_states() {
        let (_dir, registry) = registry_with(vec![
            record("foo", "installed", &[]),
            record("bar", "unpacked", &[]),
            record("baz", "config-files", &[]),
            record("qux", "not-installed", &[]),
        ]);

        match registry.find_installed("foo", MatchMode::ByName).unwrap() {
            InstalledLookup::Found(pkg) => assert_eq!(pkg.get_str("pkgver"), Some("foo-1.0")),
            other => panic!("unexpected lookup result: {:?}", other),
        }
        assert!(matches!(
            registry.find_installed("bar>=1.0", MatchMode::ByPattern).unwrap(),
            InstalledLookup::Found(_)
        ));
        assert_eq!(
            registry.find_installed("baz", MatchMode::ByName).unwrap(),
            InstalledLookup::ConfigFilesOnly
        );
        assert_eq!(
            registry.find_installed("qux", MatchMode::ByName).unwrap(),
            InstalledLookup::Absent
        );
        assert_eq!(
            registry.find_installed("nope", MatchMode::ByName).unwrap(),
            InstalledLookup::Absent
        );

        assert_eq!(registry.uses(), 0);
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_config_files_record_still_in_collection() {
        let (_dir, registry) = registry_with(vec![record("baz", "config-files", &[])]);

        assert_eq!(
            registry.find_installed("baz", MatchMode::ByName).unwrap(),
            InstalledLookup::ConfigFilesOnly
        );

        let guard = registry.acquire().unwrap();
        let collection = guard.read();
        let raw = Query::default()
            .find_pkg_in_dict(&collection, PACKAGES_KEY, "baz", MatchMode::ByName)
            .unwrap();
        assert_eq!(raw.get_str(STATE_KEY), Some("config-files"));
    }

    #[test]
    fn test_found_copy_outlives_release() {
        let (_dir, registry) = registry_with(vec![record("mesa", "installed", &["libGL-7.11"])]);

        let InstalledLookup::Found(mut pkg) = registry.find_installed("libGL", MatchMode::ByName).unwrap() else {
            panic!("libGL should resolve through provides");
        };
        assert!(!registry.is_loaded());

        pkg.set("pkgver", "mesa-0.0").unwrap();
        let guard = registry.acquire().unwrap();
        let collection = guard.read();
        let stored = Query::default()
            .find_pkg_in_dict(&collection, PACKAGES_KEY, "mesa", MatchMode::ByName)
            .unwrap();
        assert_eq!(stored.get_str("pkgver"), Some("mesa-1.0"));
    }

    #[test]
    fn test_missing_state_is_an_error() {
        let mut pkg = Dictionary::new();
        pkg.set("pkgname", "foo").unwrap();
        pkg.set("pkgver", "foo-1.0").unwrap();
        let (_dir, registry) = registry_with(vec![pkg]);

        assert!(matches!(
            registry.find_installed("foo", MatchMode::ByName),
            Err(crate::error::Error::InvalidState(_))
        ));
        assert_eq!(registry.uses(), 0);
    }

    #[test]
    fn test_state_change_is_stored() {
        let (_dir, registry) = registry_with(vec![
            record("foo", "installed", &[]),
            record("bar", "installed", &[]),
        ]);

        {
            let guard = registry.acquire().unwrap();
            {
                let mut collection = guard.write();
                let pkg = Query::default()
                    .find_pkg_in_dict_mut(&mut collection, PACKAGES_KEY, "foo", MatchMode::ByName)
                    .unwrap();
                assert!(get_state(pkg).unwrap().can_transition_to(PkgState::ConfigFiles));
                set_state(pkg, PkgState::ConfigFiles).unwrap();
            }
            registry.store(Encoding::Gzip).unwrap();
        }
        assert!(!registry.is_loaded());

        assert_eq!(
            registry.find_installed("foo", MatchMode::ByName).unwrap(),
            InstalledLookup::ConfigFilesOnly
        );
        assert!(matches!(
            registry.find_installed("bar", MatchMode::ByName).unwrap(),
            InstalledLookup::Found(_)
        ));
    }

    #[test]
    fn test_writes_are_shared_between_guards() {
        let (_dir, registry) = registry_with(vec![record("foo", "installed", &[])]);

        let first = registry.acquire().unwrap();
        let second = registry.acquire().unwrap();
        first
            .write()
            .get_array_mut(PACKAGES_KEY)
            .unwrap()
            .push(record("bar", "unpacked", &[]))
            .unwrap();

        assert_eq!(second.read().get_array(PACKAGES_KEY).unwrap().len(), 2);
    }

    #[test]
    fn test_unstored_changes_are_dropped_on_release() {
        let (_dir, registry) = registry_with(vec![record("foo", "installed", &[])]);

        {
            let guard = registry.acquire().unwrap();
            guard.write().remove(PACKAGES_KEY).unwrap();
            assert!(guard.read().get_array(PACKAGES_KEY).is_none());
        }

        let guard = registry.acquire().unwrap();
        assert_eq!(guard.read().get_array(PACKAGES_KEY).unwrap().len(), 1);
    }

    #[test]
    fn test_store_requires_acquire() {
        let (_dir, registry) = registry_with(vec![record("foo", "installed", &[])]);

        assert!(matches!(
            registry.store(Encoding::Plain),
            Err(Error::InvalidArgument(_))
        ));
    }
}
