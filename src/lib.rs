// src/lib.rs

//! Package metadata store and query engine
//!
//! Package metadata is kept as XML property lists: dictionaries, arrays
//! and scalars, stored on disk either plain or gzip-compressed.
//!
//! # Architecture
//!
//! - `plist`: property tree with ownership-transferring mutators and visitors
//! - `codec`: plain-or-gzip plist files and archive entries
//! - `query`: package lookup by name, pattern and virtual provides; removal
//! - `registry`: lazily loaded installed-packages collection with scoped guards
//! - `version`: `name-version` strings, version comparison, pattern matching

pub mod codec;
pub mod config;
mod error;
pub mod plist;
pub mod query;
pub mod registry;
pub mod version;

pub use config::Config;
pub use error::{Error, Result};
pub use plist::{Array, Dictionary, PropertyObject};
