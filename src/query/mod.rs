// src/query/mod.rs

//! Package and dependency queries over property trees
//!
//! Every search is a single linear pass over an array and the first match
//! wins; there is no index. Package lookups check a record's `provides`
//! list before its own name, so a package that provides `foo` shadows a
//! later package actually named `foo`.

pub mod persisted;

pub use persisted::{
    find_pkg_dict_from_plist_by_name, pkg_dict_from_metadata_plist,
    remove_pkg_dict_from_plist_by_name,
};

use crate::error::Result;
use crate::plist::{Array, Dictionary, PropertyObject};
use crate::version::{DefaultMatcher, PatternMatcher, pkg_name};
use tracing::debug;

/// Key of the package array in a package collection
pub const PACKAGES_KEY: &str = "packages";

pub const PKGNAME_KEY: &str = "pkgname";
pub const PKGVER_KEY: &str = "pkgver";
pub const PROVIDES_KEY: &str = "provides";

/// How a package record is matched against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Target is a package name, compared with `pkgname`
    ByName,
    /// Target is a pattern, matched against `pkgver`
    ByPattern,
}

/// How a string array entry is matched against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMatch {
    /// Whole-string equality
    Exact,
    /// Entry is `name-version`; its name must equal the target.
    /// An entry without a version ends the scan with no match.
    PkgName,
    /// Entry is a `name-version` matched against the target pattern
    Pattern,
}

/// What `remove_string_from_array` compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    /// Entry is a string equal to the target
    ExactString,
    /// Entry is a `name-version` string whose name equals the target;
    /// an entry without a version ends the scan with no match
    PkgNameInString,
    /// Entry is a package record whose `pkgname` equals the target
    PkgNameInRecord,
}

/// Query engine bound to a pattern grammar
#[derive(Clone, Copy)]
pub struct Query<'m> {
    matcher: &'m dyn PatternMatcher,
}

impl Default for Query<'static> {
    fn default() -> Self {
        Self {
            matcher: &DefaultMatcher,
        }
    }
}

impl<'m> Query<'m> {
    /// Query engine using a custom pattern grammar
    pub fn new(matcher: &'m dyn PatternMatcher) -> Self {
        Self { matcher }
    }

    /// First package record in `array` matching `target`
    pub fn find_pkg_in_array<'a>(
        &self,
        array: &'a Array,
        target: &str,
        mode: MatchMode,
    ) -> Option<&'a Dictionary> {
        array
            .iter()
            .filter_map(PropertyObject::as_dict)
            .find(|record| self.record_matches(record, target, mode))
    }

    /// First package record matching `target` in the array at `dict[key]`
    ///
    /// Returns `None` when `key` is missing or does not hold an array.
    pub fn find_pkg_in_dict<'a>(
        &self,
        dict: &'a Dictionary,
        key: &str,
        target: &str,
        mode: MatchMode,
    ) -> Option<&'a Dictionary> {
        let array = dict.get_array(key)?;
        self.find_pkg_in_array(array, target, mode)
    }

    /// Mutable access to the first package record matching `target` in the
    /// array at `dict[key]`
    ///
    /// Same matching rules as `find_pkg_in_dict`; use it to update a record
    /// in place (for example its install state).
    pub fn find_pkg_in_dict_mut<'a>(
        &self,
        dict: &'a mut Dictionary,
        key: &str,
        target: &str,
        mode: MatchMode,
    ) -> Option<&'a mut Dictionary> {
        let array = dict.get_array_mut(key)?;
        let idx = array.iter().position(|obj| {
            obj.as_dict()
                .is_some_and(|record| self.record_matches(record, target, mode))
        })?;
        array.get_mut(idx)?.as_dict_mut()
    }

    /// Whether `record` provides the virtual package `target`
    ///
    /// By name, a `provides` entry matches when it equals the target or when
    /// its name component (`virt-1.0` → `virt`) does. By pattern, entries
    /// are matched against the target pattern.
    pub fn find_virtual_pkg_in_dict(&self, record: &Dictionary, target: &str, mode: MatchMode) -> bool {
        let Some(provides) = record.get_array(PROVIDES_KEY) else {
            return false;
        };

        match mode {
            MatchMode::ByName => provides.iter().filter_map(PropertyObject::as_str).any(|entry| {
                entry == target || pkg_name(entry) == Some(target)
            }),
            MatchMode::ByPattern => self.find_string_in_array(provides, target, StringMatch::Pattern),
        }
    }

    /// Whether any string in `array` matches `target`
    pub fn find_string_in_array(&self, array: &Array, target: &str, mode: StringMatch) -> bool {
        let position = match mode {
            StringMatch::Exact => first_position(array, |obj| Some(obj.as_str() == Some(target))),
            StringMatch::PkgName => first_position(array, |obj| pkgname_matches(obj, target)),
            StringMatch::Pattern => first_position(array, |obj| {
                Some(obj.as_str().is_some_and(|pkgver| self.matcher.matches(pkgver, target)))
            }),
        };
        position.is_some()
    }

    fn record_matches(&self, record: &Dictionary, target: &str, mode: MatchMode) -> bool {
        if self.find_virtual_pkg_in_dict(record, target, mode) {
            return true;
        }
        match mode {
            MatchMode::ByName => record.get_str(PKGNAME_KEY) == Some(target),
            MatchMode::ByPattern => record
                .get_str(PKGVER_KEY)
                .is_some_and(|pkgver| self.matcher.matches(pkgver, target)),
        }
    }
}

/// Index of the first entry `accept` returns `Some(true)` for
///
/// `accept` returns `None` for an entry that ends the scan with no match.
fn first_position<F>(array: &Array, mut accept: F) -> Option<usize>
where
    F: FnMut(&PropertyObject) -> Option<bool>,
{
    for (idx, obj) in array.iter().enumerate() {
        match accept(obj) {
            Some(true) => return Some(idx),
            Some(false) => {}
            None => {
                debug!("malformed package string at index {}, ending scan", idx);
                return None;
            }
        }
    }
    None
}

/// Compare the name component of a `name-version` string entry
fn pkgname_matches(obj: &PropertyObject, target: &str) -> Option<bool> {
    obj.as_str().and_then(pkg_name).map(|name| name == target)
}

/// Remove the first entry of `array` matching `target`
///
/// Returns the removed object, or `None` with the array untouched when
/// nothing matched. Fails only if the array is immutable.
pub fn remove_string_from_array(
    array: &mut Array,
    target: &str,
    mode: RemoveMode,
) -> Result<Option<PropertyObject>> {
    let position = match mode {
        RemoveMode::ExactString => first_position(array, |obj| Some(obj.as_str() == Some(target))),
        RemoveMode::PkgNameInString => first_position(array, |obj| pkgname_matches(obj, target)),
        RemoveMode::PkgNameInRecord => first_position(array, |obj| {
            Some(obj.as_dict().and_then(|record| record.get_str(PKGNAME_KEY)) == Some(target))
        }),
    };

    match position {
        Some(idx) => array.remove(idx).map(Some),
        None => Ok(None),
    }
}

/// Remove the package record named `pkgname` from the array at `dict[key]`
///
/// Returns `None` when `key` is missing, is not an array, or holds no such
/// package.
pub fn remove_pkg_from_dict(
    dict: &mut Dictionary,
    key: &str,
    pkgname: &str,
) -> Result<Option<PropertyObject>> {
    match dict.get_array_mut(key) {
        Some(array) => remove_string_from_array(array, pkgname, RemoveMode::PkgNameInRecord),
        None => Ok(None),
    }
}
