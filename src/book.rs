//! A loaded LRF book.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::io::{ByteSource, FileSource, MemorySource};
use crate::layout::{self, LayoutConfig, Pagination, TextMeasurer};
use crate::lrf::container::read_object;
use crate::lrf::header::THUMB_HEADER_LEN;
use crate::lrf::objects::{Attrs, LoadContext, Object, ObjectBody, ObjectKind, PageItem, TextElement, decode_object};
use crate::lrf::{DocInfo, Header, ImageEncoding, InfoField, ObjectTable, rewrite_metadata};
use crate::render::{FontProvider, FontRegistry};
use crate::style::{AttrSource, Scale, StyleContext};
use crate::toc::{TocEntry, build_toc};

/// Cooperative cancellation, polled before each object is loaded and each
/// block is laid out.
pub trait CancelToken: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A shareable cancel switch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl CancelToken for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl<F: Fn() -> bool + Send + Sync> CancelToken for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Options fixed for the lifetime of a [`Book`].
#[derive(Clone)]
pub struct LoadOptions {
    /// Stop at the first malformed tag, stream or reference instead of
    /// logging it and carrying on.
    pub strict: bool,
    pub cancel: Arc<dyn CancelToken>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            cancel: Arc::new(NeverCancel),
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("strict", &self.strict)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl LoadOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: impl CancelToken + 'static) -> Self {
        self.cancel = Arc::new(cancel);
        self
    }
}

/// Cover thumbnail bytes and their encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub encoding: ImageEncoding,
    pub data: Vec<u8>,
}

/// A parsed LRF file.
///
/// Objects are kept in an arena in object-table order and refer to each
/// other by id. Metadata edits are held in memory until
/// [`Book::save_metadata`] re-emits the file.
pub struct Book {
    source: Arc<dyn ByteSource>,
    header: Header,
    doc_info: DocInfo,
    thumbnail: Option<Thumbnail>,
    thumbnail_changed: bool,
    table: ObjectTable,
    objects: Vec<Object>,
    index: HashMap<u32, usize>,
    options: LoadOptions,
}

impl fmt::Debug for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Book")
            .field("version", &self.header.version)
            .field("objects", &self.objects.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Book {
    /// Open an LRF file from disk.
    pub fn open(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self> {
        Self::load(FileSource::open(path)?, options)
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>, options: LoadOptions) -> Result<Self> {
        Self::load(MemorySource::new(data), options)
    }

    /// Load from any random-access byte source.
    pub fn load(source: impl ByteSource + 'static, options: LoadOptions) -> Result<Self> {
        Self::from_source(Arc::new(source), options)
    }

    /// Load through positioned reads: the header prefix, thumbnail, DocInfo
    /// and object table, then each object by its table extent.
    #[tracing::instrument(skip_all, fields(len = source.len(), strict = options.strict))]
    pub fn from_source(source: Arc<dyn ByteSource>, options: LoadOptions) -> Result<Self> {
        let file_len = source.len();
        let prefix = source.read_at(0, file_len.min(THUMB_HEADER_LEN as u64) as usize)?;
        let header = Header::parse(&prefix, file_len)?;
        let ctx = LoadContext {
            strict: options.strict,
            xor_key: header.xor_key,
        };

        let thumbnail = if header.has_thumbnail_block() && header.thumbnail_size > 0 {
            let bytes = source.read_at(header.thumbnail_offset(), header.thumbnail_size as usize)?;
            Some(Thumbnail {
                encoding: header
                    .thumbnail_type
                    .unwrap_or_else(|| ImageEncoding::sniff(&bytes)),
                data: bytes,
            })
        } else {
            None
        };

        let doc_block = source.read_at(header.doc_info_offset(), header.compressed_doc_info_size as usize)?;
        let doc_info = match DocInfo::decode(&doc_block) {
            Ok(doc_info) => doc_info,
            Err(err) => {
                ctx.recover(0, err)?;
                DocInfo::new()
            }
        };

        let table = ObjectTable::read(
            source.as_ref(),
            header.object_table_offset,
            header.object_count as usize,
        )?;

        let mut objects = Vec::with_capacity(table.len());
        for entry in table.entries() {
            if options.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let loaded = read_object(source.as_ref(), entry).and_then(|bytes| decode_object(&bytes, entry, &ctx));
            match loaded {
                Ok(object) => objects.push(object),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(err) => {
                    ctx.recover(entry.id, err)?;
                }
            }
        }
        let index: HashMap<u32, usize> = objects.iter().enumerate().map(|(i, o)| (o.id, i)).collect();

        for object in &objects {
            for &to in object.references() {
                if !index.contains_key(&to) {
                    ctx.recover(object.id, Error::DanglingReference { from: object.id, to })?;
                }
            }
        }

        let registry = FontRegistry::global();
        for object in &objects {
            if let ObjectBody::Font { face, .. } = &object.body
                && !face.is_empty()
                && registry.register(face, face)
            {
                tracing::debug!(object = object.id, face = %face, "embedded font registered");
            }
        }

        tracing::debug!(
            version = header.version,
            objects = objects.len(),
            "book loaded"
        );
        Ok(Self {
            source,
            header,
            doc_info,
            thumbnail,
            thumbnail_changed: false,
            table,
            objects,
            index,
            options,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn is_strict(&self) -> bool {
        self.options.strict
    }

    pub fn is_cancelled(&self) -> bool {
        self.options.cancel.is_cancelled()
    }

    pub(crate) fn load_context(&self) -> LoadContext {
        LoadContext {
            strict: self.options.strict,
            xor_key: self.header.xor_key,
        }
    }

    pub fn object_table(&self) -> &ObjectTable {
        &self.table
    }

    /// Loaded objects in object-table order.
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object(&self, id: u32) -> Option<&Object> {
        self.index.get(&id).map(|&i| &self.objects[i])
    }

    /// The root BookAttr object.
    pub fn book_attr(&self) -> Option<&Object> {
        self.object(self.header.root_object_id)
            .filter(|o| o.kind == ObjectKind::BookAttr)
            .or_else(|| self.objects.iter().find(|o| o.kind == ObjectKind::BookAttr))
    }

    /// Page ids in reading order: the root page tree, or every Page object
    /// in table order when there is none.
    pub fn page_ids(&self) -> Vec<u32> {
        let tree = self
            .book_attr()
            .and_then(|attr| match &attr.body {
                ObjectBody::BookAttr(book) => book.page_tree,
                _ => None,
            })
            .and_then(|id| self.object(id));
        if let Some(Object {
            body: ObjectBody::PageTree(pages),
            ..
        }) = tree
        {
            return pages.clone();
        }
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Page)
            .map(|o| o.id)
            .collect()
    }

    /// Book-wide style defaults at `scale`.
    pub fn style_context(&self, scale: Scale) -> StyleContext {
        match self.book_attr() {
            Some(attr) => StyleContext::from_book(attr, self, scale),
            None => StyleContext::new(scale),
        }
    }

    /// Register every embedded font's data with `provider`.
    pub fn register_fonts(&self, provider: &dyn FontProvider) -> Result<usize> {
        let mut count = 0;
        for object in &self.objects {
            let ObjectBody::Font { face, .. } = &object.body else {
                continue;
            };
            let family = FontRegistry::global().family(face).unwrap_or_else(|| face.clone());
            provider.register(&family, object.stream_bytes())?;
            count += 1;
        }
        Ok(count)
    }

    pub fn paginate(&self, config: &LayoutConfig, measurer: &dyn TextMeasurer) -> Result<Pagination> {
        layout::paginate(self, config, measurer)
    }

    pub fn toc(&self) -> Vec<TocEntry> {
        build_toc(self)
    }

    /// Text of every page in reading order, one paragraph per line.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for page in self.page_ids() {
            let Some(ObjectBody::Page { contents, .. }) = self.object(page).map(|o| &o.body) else {
                continue;
            };
            for item in contents {
                if let PageItem::Object(id) = item {
                    self.collect_text(*id, &mut out, 0);
                }
            }
        }
        out
    }

    fn collect_text(&self, id: u32, out: &mut String, depth: usize) {
        // Canvases may nest; guard against reference cycles.
        if depth > 16 {
            return;
        }
        let Some(object) = self.object(id) else {
            return;
        };
        match &object.body {
            ObjectBody::Block { child: Some(child), .. } => self.collect_text(*child, out, depth + 1),
            ObjectBody::Canvas { placements, .. } => {
                for p in placements {
                    self.collect_text(p.object, out, depth + 1);
                }
            }
            ObjectBody::Text { elements, .. } => {
                for element in elements {
                    match element {
                        TextElement::Text(text) => out.push_str(text),
                        TextElement::LineBreak | TextElement::ParagraphEnd => out.push('\n'),
                        _ => {}
                    }
                }
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    // --- Metadata ---

    pub fn doc_info(&self) -> &DocInfo {
        &self.doc_info
    }

    pub fn doc_info_xml(&self) -> &str {
        self.doc_info.xml()
    }

    pub fn set_doc_info_xml(&mut self, xml: impl Into<String>) {
        self.doc_info.set_xml(xml);
    }

    pub fn title(&self) -> Result<String> {
        self.doc_info.title()
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.doc_info.set_title(title)
    }

    pub fn authors(&self) -> Result<Vec<String>> {
        self.doc_info.authors()
    }

    pub fn set_authors<S: AsRef<str>>(&mut self, authors: &[S]) -> Result<()> {
        self.doc_info.set_authors(authors)
    }

    pub fn uid(&self) -> Result<Option<String>> {
        self.doc_info.uid()
    }

    pub fn info(&self, field: InfoField) -> Result<Option<String>> {
        self.doc_info.get(field)
    }

    pub fn set_info(&mut self, field: InfoField, value: &str) -> Result<()> {
        self.doc_info.set(field, value)
    }

    pub fn cover_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }

    pub fn set_cover(&mut self, encoding: ImageEncoding, data: Vec<u8>) {
        self.thumbnail = Some(Thumbnail { encoding, data });
        self.thumbnail_changed = true;
    }

    /// The file bytes with the current metadata written in.
    pub fn save_metadata(&self) -> Result<Vec<u8>> {
        let thumbnail = self
            .thumbnail
            .as_ref()
            .filter(|_| self.thumbnail_changed)
            .map(|t| (t.encoding, t.data.as_slice()));
        let data = self.source.read_at(0, self.source.len() as usize)?;
        rewrite_metadata(&data, &self.doc_info, thumbnail)
    }

    /// Write the file with the current metadata to `path`.
    pub fn write_metadata(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save_metadata()?)?;
        Ok(())
    }
}

impl AttrSource for Book {
    fn attrs_of(&self, id: u32) -> Option<&Attrs> {
        self.object(id).map(|o| &o.attrs)
    }
}
