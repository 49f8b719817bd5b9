// src/plist/mod.rs

//! Property tree object model
//!
//! Package metadata is stored as nested property lists: dictionaries of
//! arrays of dictionaries and strings. This module provides the closed
//! object type, the two container types and their mutators.
//!
//! # Ownership
//!
//! Containers own their children outright. Copies are explicit deep copies
//! via `Clone`, so a record copied out of a query result is independent of
//! the tree it came from.
//!
//! `Dictionary::add_object` and `Array::add_object` consume both the
//! container and the object. On success the container is handed back; on
//! failure **both are dropped** and `Error::InvalidArgument` is returned.
//! A caller must not expect the container to survive a failed add. Use
//! `Dictionary::set` / `Array::push` when the container has to outlive a
//! rejected mutation.

pub mod iter;
pub mod xml;

pub use iter::{
    Flow, array_iter_from_dict, for_each_in_array, for_each_in_dict_array,
    for_each_in_dict_array_reverse,
};

use crate::error::{Error, Result};
use indexmap::IndexMap;

/// A dynamically typed property list node
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyObject {
    Dictionary(Dictionary),
    Array(Array),
    String(String),
    Bool(bool),
    Number(i64),
}

impl PropertyObject {
    /// Human-readable type name, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyObject::Dictionary(_) => "dictionary",
            PropertyObject::Array(_) => "array",
            PropertyObject::String(_) => "string",
            PropertyObject::Bool(_) => "bool",
            PropertyObject::Number(_) => "number",
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PropertyObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            PropertyObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            PropertyObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            PropertyObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyObject::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            PropertyObject::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Unwrap into a dictionary, handing the object back if it is not one
    pub fn into_dict(self) -> std::result::Result<Dictionary, PropertyObject> {
        match self {
            PropertyObject::Dictionary(d) => Ok(d),
            other => Err(other),
        }
    }
}

impl From<Dictionary> for PropertyObject {
    fn from(d: Dictionary) -> Self {
        PropertyObject::Dictionary(d)
    }
}

impl From<Array> for PropertyObject {
    fn from(a: Array) -> Self {
        PropertyObject::Array(a)
    }
}

impl From<String> for PropertyObject {
    fn from(s: String) -> Self {
        PropertyObject::String(s)
    }
}

impl From<&str> for PropertyObject {
    fn from(s: &str) -> Self {
        PropertyObject::String(s.to_string())
    }
}

impl From<bool> for PropertyObject {
    fn from(b: bool) -> Self {
        PropertyObject::Bool(b)
    }
}

impl From<i64> for PropertyObject {
    fn from(n: i64) -> Self {
        PropertyObject::Number(n)
    }
}

/// Ordered string-keyed map of property objects
///
/// Keys are unique and keep their insertion order, so a serialized
/// dictionary is stable across load/store cycles.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: IndexMap<String, PropertyObject>,
    immutable: bool,
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Dictionary {
    /// Create an empty, mutable dictionary
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyObject> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyObject> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyObject)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyObject::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropertyObject::as_bool)
    }

    pub fn get_number(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropertyObject::as_number)
    }

    pub fn get_array(&self, key: &str) -> Option<&Array> {
        self.get(key).and_then(PropertyObject::as_array)
    }

    pub fn get_array_mut(&mut self, key: &str) -> Option<&mut Array> {
        self.get_mut(key).and_then(PropertyObject::as_array_mut)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(PropertyObject::as_dict)
    }

    /// Insert or replace `key`, returning the value it replaced
    pub fn set(
        &mut self,
        key: impl Into<String>,
        obj: impl Into<PropertyObject>,
    ) -> Result<Option<PropertyObject>> {
        let key = key.into();
        self.check_mutable(&key)?;
        Ok(self.entries.insert(key, obj.into()))
    }

    /// Move `obj` into the dictionary under `key`
    ///
    /// Consumes both the dictionary and the object. On failure neither
    /// survives: the dictionary is dropped together with the object.
    pub fn add_object(mut self, key: &str, obj: impl Into<PropertyObject>) -> Result<Self> {
        self.set(key, obj)?;
        Ok(self)
    }

    /// Remove `key`, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Result<Option<PropertyObject>> {
        if self.immutable {
            return Err(Error::InvalidArgument(format!(
                "cannot remove '{}' from an immutable dictionary",
                key
            )));
        }
        Ok(self.entries.shift_remove(key))
    }

    pub fn make_immutable(&mut self) {
        self.immutable = true;
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    fn check_mutable(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "dictionary keys must not be empty".to_string(),
            ));
        }
        if self.immutable {
            return Err(Error::InvalidArgument(format!(
                "cannot set '{}' on an immutable dictionary",
                key
            )));
        }
        Ok(())
    }
}

/// Ordered sequence of property objects
#[derive(Debug, Clone, Default)]
pub struct Array {
    items: Vec<PropertyObject>,
    immutable: bool,
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Array {
    /// Create an empty, mutable array
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PropertyObject> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PropertyObject> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PropertyObject> {
        self.items.iter()
    }

    /// Append an object
    pub fn push(&mut self, obj: impl Into<PropertyObject>) -> Result<()> {
        if self.immutable {
            return Err(Error::InvalidArgument(
                "cannot append to an immutable array".to_string(),
            ));
        }
        self.items.push(obj.into());
        Ok(())
    }

    /// Move `obj` onto the end of the array
    ///
    /// Same contract as `Dictionary::add_object`: on failure the array is
    /// dropped along with the object.
    pub fn add_object(mut self, obj: impl Into<PropertyObject>) -> Result<Self> {
        self.push(obj)?;
        Ok(self)
    }

    /// Remove and return the object at `index`
    pub fn remove(&mut self, index: usize) -> Result<PropertyObject> {
        if self.immutable {
            return Err(Error::InvalidArgument(
                "cannot remove from an immutable array".to_string(),
            ));
        }
        if index >= self.items.len() {
            return Err(Error::InvalidArgument(format!(
                "index {} out of bounds for array of length {}",
                index,
                self.items.len()
            )));
        }
        Ok(self.items.remove(index))
    }

    pub fn make_immutable(&mut self) {
        self.immutable = true;
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }
}

impl<T: Into<PropertyObject>> FromIterator<T> for Array {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
            immutable: false,
        }
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a PropertyObject;
    type IntoIter = std::slice::Iter<'a, PropertyObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
