//! Builders for small in-memory LRF books.

#![allow(dead_code)]

use lrfkit::lrf::tags::{TagWriter, ids};
use lrfkit::lrf::{LrfObject, LrfWriter, ObjectKind, StreamFlags};

pub const BOOK_ATTR: u32 = 1;
pub const PAGE_TREE: u32 = 2;

/// Assembles a book page by page. Object ids are handed out from 100.
pub struct BookBuilder {
    writer: LrfWriter,
    pages: Vec<u32>,
    next_id: u32,
}

impl Default for BookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BookBuilder {
    pub fn new() -> Self {
        let mut writer = LrfWriter::new(800);
        writer.header_mut().xor_key = 42;
        writer.doc_info_mut().set_title("Fixture").unwrap();
        writer.set_root(BOOK_ATTR);
        Self {
            writer,
            pages: Vec::new(),
            next_id: 100,
        }
    }

    pub fn writer(&mut self) -> &mut LrfWriter {
        &mut self.writer
    }

    pub fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add(&mut self, object: LrfObject) -> &mut Self {
        self.writer.add(object);
        self
    }

    /// A Text object whose stream is written by `build`.
    pub fn text(&mut self, build: impl FnOnce(&mut TagWriter)) -> u32 {
        let id = self.alloc();
        let mut stream = TagWriter::new();
        build(&mut stream);
        self.writer
            .add(LrfObject::new(id, ObjectKind::Text).with_stream(StreamFlags(0), stream.into_bytes()));
        id
    }

    /// A Block around `child`; `tags` adds block attributes.
    pub fn block(&mut self, child: u32, tags: impl FnOnce(&mut TagWriter)) -> u32 {
        let id = self.alloc();
        let mut stream = TagWriter::new();
        stream.reference(ids::LINK, child);
        self.writer.add(
            LrfObject::new(id, ObjectKind::Block)
                .with_tags(tags)
                .with_stream(StreamFlags(0), stream.into_bytes()),
        );
        id
    }

    /// A Block holding one paragraph.
    pub fn paragraph(&mut self, text: &str) -> u32 {
        let text_id = self.text(|w| {
            w.empty(ids::P).text(text).empty(ids::P_END);
        });
        self.block(text_id, |_| {})
    }

    pub fn page_attr(&mut self, tags: impl FnOnce(&mut TagWriter)) -> u32 {
        let id = self.alloc();
        self.writer
            .add(LrfObject::new(id, ObjectKind::PageAttr).with_tags(tags));
        id
    }

    /// A Page listing `items` in order, appended to the page tree.
    pub fn page(&mut self, attr: Option<u32>, items: &[u32]) -> u32 {
        self.page_with(attr, |w| {
            for &item in items {
                w.reference(ids::LINK, item);
            }
        })
    }

    /// A Page whose content stream is written by `build`.
    pub fn page_with(&mut self, attr: Option<u32>, build: impl FnOnce(&mut TagWriter)) -> u32 {
        let id = self.alloc();
        let mut stream = TagWriter::new();
        build(&mut stream);
        self.writer.add(
            LrfObject::new(id, ObjectKind::Page)
                .with_tags(|w| {
                    if let Some(attr) = attr {
                        w.reference(ids::LINK, attr);
                    }
                })
                .with_stream(StreamFlags(0), stream.into_bytes()),
        );
        self.pages.push(id);
        id
    }

    pub fn finish(mut self) -> Vec<u8> {
        let pages = self.pages.clone();
        self.writer
            .add(LrfObject::new(BOOK_ATTR, ObjectKind::BookAttr).with_tags(|w| {
                w.reference(ids::CHILD_PAGE_TREE, PAGE_TREE);
            }));
        self.writer
            .add(LrfObject::new(PAGE_TREE, ObjectKind::PageTree).with_tags(|w| {
                w.ids(ids::PAGE_LIST, &pages);
            }));
        self.writer.to_bytes().unwrap()
    }
}

/// `count` five-letter words separated by spaces.
pub fn words(count: usize) -> String {
    (0..count)
        .map(|i| format!("w{i:04}"))
        .collect::<Vec<_>>()
        .join(" ")
}
