//! # lrfkit
//!
//! A reader, paginator and metadata editor for SONY BroadBand eBook (LRF)
//! files.
//!
//! ## Features
//!
//! - Parse the LRF container: header, tagged objects, compressed and
//!   scrambled streams
//! - Read and edit DocInfo metadata and the cover thumbnail, then write the
//!   file back out
//! - Resolve the BookAttr → PageAttr → BlockAttr → TextAttr style cascade
//! - Flow text into lines and pages for any screen size and font metrics
//! - Navigate pages, chapters and in-book links with history
//!
//! ## Quick Start
//!
//! ```no_run
//! use lrfkit::{Book, LoadOptions};
//! use lrfkit::layout::{LayoutConfig, MonospaceMeasurer};
//! use lrfkit::render::Viewer;
//!
//! let book = Book::open("novel.lrf", LoadOptions::default())?;
//! println!("{} by {}", book.title()?, book.authors()?.join(", "));
//!
//! let pages = book.paginate(&LayoutConfig::for_book(&book), &MonospaceMeasurer)?;
//! let mut viewer = Viewer::new(&pages);
//! viewer.next();
//! let screen = viewer.render();
//! # Ok::<(), lrfkit::Error>(())
//! ```
//!
//! ## Editing Metadata
//!
//! ```no_run
//! use lrfkit::{Book, LoadOptions};
//!
//! let mut book = Book::open("novel.lrf", LoadOptions::default())?;
//! book.set_title("A Better Title")?;
//! book.set_authors(&["First Author", "Second Author"])?;
//! book.write_metadata("novel-fixed.lrf")?;
//! # Ok::<(), lrfkit::Error>(())
//! ```

pub mod book;
pub mod error;
pub mod io;
pub mod layout;
pub mod lrf;
pub mod render;
pub mod style;
pub mod toc;
pub(crate) mod util;

pub use book::{Book, CancelFlag, CancelToken, LoadOptions, NeverCancel, Thumbnail};
pub use error::{Error, Result};
pub use layout::{LayoutConfig, Pagination};
pub use lrf::{DocInfo, Header, ImageEncoding, InfoField};
pub use toc::{PageMap, TocEntry, build_toc};
