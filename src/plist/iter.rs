// src/plist/iter.rs

//! Visitor-style iteration over property arrays
//!
//! Visitors return `Flow::Stop` to end a pass early; that is not an error.
//! Any `Err` returned by a visitor ends the pass and is handed back to the
//! caller unchanged.

use super::{Array, Dictionary, PropertyObject};
use crate::error::{Error, Result};
use tracing::debug;

/// Signal returned by a visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Visit each object of `array` in order
pub fn for_each_in_array<F>(array: &Array, mut visitor: F) -> Result<()>
where
    F: FnMut(&PropertyObject) -> Result<Flow>,
{
    for obj in array {
        if visitor(obj)? == Flow::Stop {
            break;
        }
    }
    Ok(())
}

/// Visit each object of the array stored at `dict[key]`
pub fn for_each_in_dict_array<F>(dict: &Dictionary, key: &str, visitor: F) -> Result<()>
where
    F: FnMut(&PropertyObject) -> Result<Flow>,
{
    for_each_in_array(array_at(dict, key)?, visitor)
}

/// Visit the array stored at `dict[key]` from the last object to the first
///
/// Used where entries registered later take precedence.
pub fn for_each_in_dict_array_reverse<F>(dict: &Dictionary, key: &str, mut visitor: F) -> Result<()>
where
    F: FnMut(&PropertyObject) -> Result<Flow>,
{
    for obj in array_at(dict, key)?.iter().rev() {
        if visitor(obj)? == Flow::Stop {
            break;
        }
    }
    Ok(())
}

/// Pull iterator over the array stored at `dict[key]`
pub fn array_iter_from_dict<'a>(
    dict: &'a Dictionary,
    key: &str,
) -> Result<std::slice::Iter<'a, PropertyObject>> {
    Ok(array_at(dict, key)?.iter())
}

fn array_at<'a>(dict: &'a Dictionary, key: &str) -> Result<&'a Array> {
    dict.get_array(key).ok_or_else(|| {
        debug!("invalid key '{}' for dictionary", key);
        Error::InvalidArgument(format!("key '{}' does not hold an array", key))
    })
}
