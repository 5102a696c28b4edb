//! LRF binary format: tags, container, object model and metadata.
//!
//! ```text
//! ┌──────────┬───────────┬─────────┬───────────────────┬──────────────┐
//! │  header  │ thumbnail │ DocInfo │ objects (tagged)  │ object table │
//! └──────────┴───────────┴─────────┴───────────────────┴──────────────┘
//! ```

pub mod container;
pub mod docinfo;
pub mod header;
pub mod objects;
pub mod stream;
pub mod tags;
pub mod writer;

pub use container::{ObjectEntry, ObjectTable};
pub use docinfo::{DocInfo, InfoField};
pub use header::{Binding, Header};
pub use objects::{Object, ObjectBody, ObjectKind};
pub use stream::{ImageEncoding, StreamFlags};
pub use tags::{Tag, TagReader, TagValue, TagWriter};
pub use writer::{LrfObject, LrfWriter, rewrite_metadata};
