//! IO abstractions for random-access byte reading.
//!
//! The loader never assumes file-backed storage: anything implementing
//! [`ByteSource`] can back a book, and [`SeekSource`] adapts a caller's
//! `Read + Seek` object.

mod adapter;
mod byte_source;

pub use adapter::SeekSource;
pub use byte_source::{ByteSource, FileSource, MemorySource};
