//! Error types for icstatus
//!
//! Classification itself never fails: missing evidence degrades to the most
//! conservative status. Errors only come from loading, saving and checking
//! profile snapshots and configuration files.

use std::fmt;
use thiserror::Error;

/// Location of a profiled site, used in error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLocation {
    /// Code block name
    pub code_block: String,
    /// Bytecode index within the block
    pub bytecode_index: u32,
}

impl SiteLocation {
    pub fn new(code_block: impl Into<String>, bytecode_index: u32) -> Self {
        Self {
            code_block: code_block.into(),
            bytecode_index,
        }
    }
}

impl fmt::Display for SiteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:bc#{}", self.code_block, self.bytecode_index)
    }
}

/// Main error type for icstatus
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IOError: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Malformed JSON snapshot or configuration
    #[error("JsonError: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Malformed binary snapshot
    #[error("BincodeError: {source}")]
    Bincode {
        #[from]
        source: bincode::Error,
    },

    /// Snapshot parsed but refers to things that do not exist
    #[error("InvalidSnapshot: {0}")]
    InvalidSnapshot(String),

    /// Configuration value out of range
    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),

    /// No code block with this name in the snapshot
    #[error("UnknownCodeBlock: '{0}'")]
    UnknownCodeBlock(String),

    /// No instruction at this bytecode index
    #[error("UnknownInstruction: no instruction at {0}")]
    UnknownInstruction(SiteLocation),
}

impl Error {
    /// Create an invalid-snapshot error for a site
    pub fn invalid_site(location: SiteLocation, message: impl fmt::Display) -> Self {
        Error::InvalidSnapshot(format!("{}: {}", location, message))
    }
}

/// Result type alias for icstatus
pub type Result<T> = std::result::Result<T, Error>;
