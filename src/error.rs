// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for propdb
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required argument was missing or a container rejected a mutation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unparseable property list document
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The document parsed but its root object is not a dictionary
    #[error("Expected a dictionary at the document root, found {0}")]
    WrongRootType(&'static str),

    /// Archive entry yielded fewer bytes than its header declared
    #[error("Short read from archive entry: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Gzip stream corruption or allocation failure while inflating
    #[error("Decompression failed: {0}")]
    Decompress(String),

    /// Failure reading a plist file
    #[error("Cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failure writing a plist file
    #[error("Cannot write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Package record carries a missing or unknown state
    #[error("Invalid package state: {0}")]
    InvalidState(String),

    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias using propdb's Error type
pub type Result<T> = std::result::Result<T, Error>;
