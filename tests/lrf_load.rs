//! Loading whole books: header, object arena, streams, TOC and error modes.

mod common;

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{BookBuilder, words};
use lrfkit::io::{ByteSource, MemorySource, SeekSource};
use lrfkit::lrf::objects::content::write_toc_stream;
use lrfkit::lrf::objects::{ObjectBody, TocRecord};
use lrfkit::lrf::tags::ids;
use lrfkit::lrf::{LrfObject, LrfWriter, ObjectKind, StreamFlags};
use lrfkit::{Book, Error, ImageEncoding, LoadOptions};

fn two_object_book(version: u16) -> Vec<u8> {
    let mut writer = LrfWriter::new(version);
    writer.header_mut().xor_key = 42;
    writer.set_root(1);
    writer.add(LrfObject::new(1, ObjectKind::BookAttr).with_tags(|w| {
        w.reference(ids::CHILD_PAGE_TREE, 2);
    }));
    writer.add(LrfObject::new(2, ObjectKind::PageTree).with_tags(|w| {
        w.ids(ids::PAGE_LIST, &[]);
    }));
    writer.to_bytes().unwrap()
}

// ============================================================================
// Header and container
// ============================================================================

#[test]
fn test_header_fields() {
    let bytes = two_object_book(830);
    assert_eq!(&bytes[..8], b"L\0R\0F\0\0\0");
    assert_eq!(&bytes[8..10], &[0x3E, 0x03]);

    let book = Book::from_bytes(bytes, LoadOptions::strict()).unwrap();
    let header = book.header();
    assert_eq!(header.version, 830);
    assert_eq!(header.xor_key, 42);
    assert_eq!(header.root_object_id, 1);
    assert_eq!(header.object_count, 2);
    assert_eq!(book.objects().len(), 2);
    assert!(book.object(2).is_some());
    assert!(book.object(3).is_none());
}

#[test]
fn test_bad_magic() {
    let mut bytes = two_object_book(800);
    bytes[0] = b'X';
    assert!(matches!(
        Book::from_bytes(bytes, LoadOptions::default()),
        Err(Error::BadMagic)
    ));
}

#[test]
fn test_truncated_object_table() {
    let bytes = two_object_book(800);
    let cut = bytes[..bytes.len() - 8].to_vec();
    assert!(matches!(
        Book::from_bytes(cut, LoadOptions::default()),
        Err(Error::BadHeader(_))
    ));
}

#[test]
fn test_open_from_disk() {
    let mut builder = BookBuilder::new();
    let block = builder.paragraph("On disk");
    builder.page(None, &[block]);
    let bytes = builder.finish();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let book = Book::open(file.path(), LoadOptions::strict()).unwrap();
    assert_eq!(book.title().unwrap(), "Fixture");
    assert_eq!(book.page_ids().len(), 1);
    assert_eq!(book.plain_text(), "On disk\n");
}

#[test]
fn test_load_from_seekable_reader() {
    let mut builder = BookBuilder::new();
    let block = builder.paragraph("From a reader");
    builder.page(None, &[block]);
    let source = SeekSource::new(Cursor::new(builder.finish())).unwrap();

    let book = Book::load(source, LoadOptions::strict()).unwrap();
    assert_eq!(book.plain_text(), "From a reader\n");
}

/// Records every positioned read.
struct RecordingSource {
    inner: MemorySource,
    reads: Arc<Mutex<Vec<(u64, usize)>>>,
}

impl ByteSource for RecordingSource {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.reads.lock().unwrap().push((offset, buf.len()));
        self.inner.read_exact_at(offset, buf)
    }
}

#[test]
fn test_objects_are_read_by_extent() {
    let mut builder = BookBuilder::new();
    for i in 0..3 {
        let block = builder.paragraph(&format!("page {i}"));
        builder.page(None, &[block]);
    }
    let bytes = builder.finish();
    let total = bytes.len();
    let reads = Arc::new(Mutex::new(Vec::new()));
    let source = RecordingSource {
        inner: MemorySource::new(bytes),
        reads: reads.clone(),
    };

    let book = Book::load(source, LoadOptions::strict()).unwrap();
    let reads = reads.lock().unwrap().clone();
    assert!(reads.iter().all(|&(_, len)| len < total));
    assert_eq!(reads[0].0, 0);
    for entry in book.object_table().entries() {
        assert!(reads.contains(&(entry.offset as u64, entry.size as usize)));
    }
    assert_eq!(book.plain_text(), "page 0\npage 1\npage 2\n");
}

#[test]
fn test_open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Book::open(dir.path().join("absent.lrf"), LoadOptions::default());
    assert!(matches!(result, Err(Error::Io(_))));
}

// ============================================================================
// Streams
// ============================================================================

#[test]
fn test_compressed_scrambled_text_stream() {
    let text = words(300);
    let mut builder = BookBuilder::new();
    let text_id = builder.alloc();
    let mut stream = lrfkit::lrf::TagWriter::new();
    stream.empty(ids::P).text(&text).empty(ids::P_END);
    builder.add(
        LrfObject::new(text_id, ObjectKind::Text).with_stream(StreamFlags(0x0300), stream.into_bytes()),
    );
    let block = builder.block(text_id, |_| {});
    builder.page(None, &[block]);

    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    assert!(matches!(book.object(text_id).unwrap().body, ObjectBody::Text { .. }));
    assert_eq!(book.plain_text(), format!("{text}\n"));
}

#[test]
fn test_image_stream_encoding_from_flags() {
    let mut builder = BookBuilder::new();
    let id = builder.alloc();
    builder.add(
        LrfObject::new(id, ObjectKind::ImageStream)
            .with_stream(StreamFlags(ImageEncoding::Png.code()), b"\x89PNG\r\n\x1a\n".to_vec()),
    );
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    assert_eq!(
        book.object(id).unwrap().body,
        ObjectBody::ImageStream(ImageEncoding::Png)
    );
}

// ============================================================================
// Strict and lenient loading
// ============================================================================

fn book_with_stray_tag() -> Vec<u8> {
    let mut builder = BookBuilder::new();
    let text = builder.text(|w| {
        w.empty(ids::P).text("kept").empty(ids::P_END);
    });
    // PageList does not belong on a Block.
    let block = builder.block(text, |w| {
        w.ids(ids::PAGE_LIST, &[7]);
    });
    builder.page(None, &[block]);
    builder.finish()
}

#[test]
fn test_stray_tag_is_fatal_only_when_strict() {
    let bytes = book_with_stray_tag();
    let err = Book::from_bytes(bytes.clone(), LoadOptions::strict()).unwrap_err();
    assert!(matches!(err, Error::UnknownObjectTag { tag: ids::PAGE_LIST, .. }));

    let book = Book::from_bytes(bytes, LoadOptions::default()).unwrap();
    assert_eq!(book.plain_text(), "kept\n");
}

#[test]
fn test_cancel_midway() {
    let mut builder = BookBuilder::new();
    for i in 0..5 {
        let block = builder.paragraph(&format!("page {i}"));
        builder.page(None, &[block]);
    }
    let bytes = builder.finish();

    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    let options = LoadOptions::default().with_cancel(move || counter.fetch_add(1, Ordering::Relaxed) >= 3);
    let err = Book::from_bytes(bytes, options).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(polls.load(Ordering::Relaxed), 4);
}

// ============================================================================
// Thumbnail and table of contents
// ============================================================================

#[test]
fn test_thumbnail_requires_version_800() {
    let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0];
    for (version, expected) in [(800, true), (799, false)] {
        let mut writer = LrfWriter::new(version);
        writer.set_thumbnail(ImageEncoding::Jpeg, jpeg.clone());
        let book = Book::from_bytes(writer.to_bytes().unwrap(), LoadOptions::default()).unwrap();
        assert_eq!(book.cover_thumbnail().is_some(), expected, "version {version}");
        if let Some(thumb) = book.cover_thumbnail() {
            assert_eq!(thumb.encoding, ImageEncoding::Jpeg);
            assert_eq!(thumb.data, jpeg);
        }
    }
}

#[test]
fn test_toc_from_toc_object() {
    let mut builder = BookBuilder::new();
    let first = builder.paragraph("Chapter one");
    let page_one = builder.page(None, &[first]);
    let second = builder.paragraph("Chapter two");
    let page_two = builder.page(None, &[second]);

    let toc_id = builder.alloc();
    let records = vec![
        TocRecord { page: page_one, object: first, label: "One".into() },
        TocRecord { page: page_two, object: second, label: "Two".into() },
    ];
    builder.add(LrfObject::new(toc_id, ObjectKind::Toc).with_stream(StreamFlags(0), write_toc_stream(&records)));
    builder.writer().set_toc(toc_id);

    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let toc = book.toc();
    assert_eq!(toc.iter().map(|e| e.label.as_str()).collect::<Vec<_>>(), ["One", "Two"]);
    assert_eq!(toc[1].page, page_two);
    assert_eq!(toc[1].target(), second);
}

#[test]
fn test_toc_falls_back_to_pages() {
    let mut builder = BookBuilder::new();
    let a = builder.paragraph("a");
    let page_a = builder.page(None, &[a]);
    let b = builder.paragraph("b");
    let page_b = builder.page(None, &[b]);

    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let toc = book.toc();
    assert_eq!(toc.len(), 2);
    assert!(toc.iter().all(|e| e.label.is_empty() && e.object == 0));
    assert_eq!(toc[0].target(), page_a);
    assert_eq!(toc[1].target(), page_b);
}
