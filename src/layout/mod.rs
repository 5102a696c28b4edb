//! Text flow and pagination.
//!
//! Layout turns the object graph into [`Pagination`]: fixed-size screens of
//! positioned [`Fragment`]s. Glyph metrics come from a [`TextMeasurer`], so
//! the same book can be paginated for different fonts and screen sizes.
//!
//! ```no_run
//! use lrfkit::{Book, LoadOptions};
//! use lrfkit::layout::{LayoutConfig, MonospaceMeasurer};
//!
//! let book = Book::open("novel.lrf", LoadOptions::default())?;
//! let config = LayoutConfig::for_book(&book);
//! let pages = book.paginate(&config, &MonospaceMeasurer)?;
//! println!("{} pages", pages.total_pages());
//! # Ok::<(), lrfkit::Error>(())
//! ```

mod block;
mod canvas;
mod flow;
mod hyphenate;
mod line;
mod measure;
mod page;
mod paginate;

use std::fmt;

pub use flow::{FlowEnv, flow_text};
pub use hyphenate::{HYPHEN, Hyphenator, Syllabifier};
pub use line::{HotRegion, Line, LineFitResult, LineKind, Run, RunContent};
pub use measure::{CharWidthMeasurer, MonospaceMeasurer, TextMeasurer};
pub use page::{BoxStyle, Chapter, Fragment, Link, Page, Pagination, Rect, Screen};

use crate::book::Book;
use crate::error::Result;
use crate::render::{HeaderProbe, ImageDecoder};
use crate::style::Scale;

/// Layout parameters.
#[derive(Clone)]
pub struct LayoutConfig {
    /// Resolution text sizes are scaled to; `None` uses sizes as stored.
    pub dpi: Option<u16>,
    /// Screen size in pixels; `None` uses the size in the file header.
    pub screen: Option<(u16, u16)>,
    /// Enables hyphenation.
    pub syllabify: Option<Syllabifier>,
    /// An oversized block is placed on a page that has no more than this
    /// much content above it instead of moving on.
    pub image_tolerance: i32,
    /// Chunk size for the character-count fallback breaks.
    pub force_break_chars: usize,
    /// Families tried when a text style names an unknown face.
    pub default_families: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            dpi: None,
            screen: None,
            syllabify: None,
            image_tolerance: 5,
            force_break_chars: 5,
            default_families: vec!["serif".to_string(), "sans-serif".to_string(), "monospace".to_string()],
        }
    }
}

impl fmt::Debug for LayoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutConfig")
            .field("dpi", &self.dpi)
            .field("screen", &self.screen)
            .field("hyphenation", &self.syllabify.is_some())
            .field("image_tolerance", &self.image_tolerance)
            .field("force_break_chars", &self.force_break_chars)
            .field("default_families", &self.default_families)
            .finish()
    }
}

impl LayoutConfig {
    /// Settings matching the device the book was made for.
    ///
    /// The header stores resolution in tenths of a dot per inch.
    pub fn for_book(book: &Book) -> Self {
        let header = book.header();
        Self {
            dpi: (header.dpi > 0).then_some(header.dpi / 10),
            screen: Some((header.width, header.height)),
            ..Self::default()
        }
    }

    pub fn with_syllabifier(mut self, syllabify: Syllabifier) -> Self {
        self.syllabify = Some(syllabify);
        self
    }

    pub(crate) fn scale(&self) -> Scale {
        Scale::new(self.dpi.unwrap_or(0))
    }
}

/// Paginate `book`, reading image sizes from stream headers when the
/// objects do not declare them.
pub fn paginate(book: &Book, config: &LayoutConfig, measurer: &dyn TextMeasurer) -> Result<Pagination> {
    paginate_with(book, config, measurer, &HeaderProbe)
}

/// Paginate with a caller-supplied image decoder.
#[tracing::instrument(skip_all, fields(objects = book.objects().len()))]
pub fn paginate_with(
    book: &Book,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
    images: &dyn ImageDecoder,
) -> Result<Pagination> {
    paginate::Paginator::new(book, config, measurer, images).run()
}
