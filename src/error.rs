//! Error types for lrfkit operations.

use thiserror::Error;

/// Errors that can occur while loading, laying out or rewriting an LRF book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Not an LRF file")]
    BadMagic,

    #[error("File truncated or corrupt: {0}")]
    BadHeader(String),

    #[error("Unknown object type {type_code:#04x} for object {object}")]
    UnknownObjectType { object: u32, type_code: u16 },

    #[error("Unknown tag {id:#06x} at offset {offset}")]
    UnknownTag { id: u16, offset: usize },

    #[error("Unknown tag {tag:#06x} in object {object}")]
    UnknownObjectTag { object: u32, tag: u16 },

    #[error("Truncated tag {id:#06x} at offset {offset}")]
    Truncated { id: u16, offset: usize },

    #[error("Bad stream in object {object}: {reason}")]
    BadStream { object: u32, reason: String },

    #[error("Block {block} exceeds its fixed height of {max_y}")]
    HeightExceeded { block: u32, max_y: i32 },

    #[error("Object {from} references missing object {to}")]
    DanglingReference { from: u32, to: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Malformed DocInfo: {0}")]
    BadDocInfo(String),
}

impl Error {
    /// Build a `BadStream` error for an object.
    pub(crate) fn bad_stream(object: u32, reason: impl Into<String>) -> Self {
        Error::BadStream {
            object,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
