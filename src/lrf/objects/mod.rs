//! The LRF object model.
//!
//! Every object is read by the same table-driven loop ([`decode_object`]):
//! tags are looked up in the kind's flattened rule map ([`schema`]) and
//! either stored as attributes or handed to a decoder. Stream bodies are
//! decoded and then parsed into a typed [`ObjectBody`] per kind.
//!
//! Objects refer to each other by id only; the [`ObjectTable`] owns them.
//!
//! [`ObjectTable`]: crate::lrf::container::ObjectTable

pub mod button;
pub mod content;
pub mod schema;
pub mod text;

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::lrf::container::{ObjectEntry, object_bytes, parse_object_start};
use crate::lrf::stream::{self, ImageEncoding, StreamFlags};
use crate::lrf::tags::{Tag, TagReader, TagValue, ids, tag_name};
use crate::style::Color;

pub use button::{Button, ButtonAction, StateContent, SubState};
pub use content::{LineStyle, PageItem, Placement, RuledLine, TocRecord};
pub use schema::Action;
pub use text::{Inline, InlineKind, Plot, TextElement};

use button::ButtonBuilder;

/// Object type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ObjectKind {
    PageTree = 0x01,
    Page = 0x02,
    Header = 0x03,
    Footer = 0x04,
    PageAttr = 0x05,
    Block = 0x06,
    BlockAttr = 0x07,
    MiniPage = 0x08,
    BlockList = 0x09,
    Text = 0x0A,
    TextAttr = 0x0B,
    Image = 0x0C,
    Canvas = 0x0D,
    ParagraphAttr = 0x0E,
    ImageStream = 0x11,
    Import = 0x12,
    Button = 0x13,
    Window = 0x14,
    PopUpWindow = 0x15,
    Sound = 0x16,
    SoundStream = 0x17,
    Font = 0x19,
    ObjectInfo = 0x1A,
    BookAttr = 0x1C,
    SimpleText = 0x1D,
    Toc = 0x1E,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 26] = [
        ObjectKind::PageTree,
        ObjectKind::Page,
        ObjectKind::Header,
        ObjectKind::Footer,
        ObjectKind::PageAttr,
        ObjectKind::Block,
        ObjectKind::BlockAttr,
        ObjectKind::MiniPage,
        ObjectKind::BlockList,
        ObjectKind::Text,
        ObjectKind::TextAttr,
        ObjectKind::Image,
        ObjectKind::Canvas,
        ObjectKind::ParagraphAttr,
        ObjectKind::ImageStream,
        ObjectKind::Import,
        ObjectKind::Button,
        ObjectKind::Window,
        ObjectKind::PopUpWindow,
        ObjectKind::Sound,
        ObjectKind::SoundStream,
        ObjectKind::Font,
        ObjectKind::ObjectInfo,
        ObjectKind::BookAttr,
        ObjectKind::SimpleText,
        ObjectKind::Toc,
    ];

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::PageTree => "PageTree",
            ObjectKind::Page => "Page",
            ObjectKind::Header => "Header",
            ObjectKind::Footer => "Footer",
            ObjectKind::PageAttr => "PageAttr",
            ObjectKind::Block => "Block",
            ObjectKind::BlockAttr => "BlockAttr",
            ObjectKind::MiniPage => "MiniPage",
            ObjectKind::BlockList => "BlockList",
            ObjectKind::Text => "Text",
            ObjectKind::TextAttr => "TextAttr",
            ObjectKind::Image => "Image",
            ObjectKind::Canvas => "Canvas",
            ObjectKind::ParagraphAttr => "ParagraphAttr",
            ObjectKind::ImageStream => "ImageStream",
            ObjectKind::Import => "Import",
            ObjectKind::Button => "Button",
            ObjectKind::Window => "Window",
            ObjectKind::PopUpWindow => "PopUpWindow",
            ObjectKind::Sound => "Sound",
            ObjectKind::SoundStream => "SoundStream",
            ObjectKind::Font => "Font",
            ObjectKind::ObjectInfo => "ObjectInfo",
            ObjectKind::BookAttr => "BookAttr",
            ObjectKind::SimpleText => "SimpleText",
            ObjectKind::Toc => "TOC",
        }
    }

    /// Streams that only scramble their first kilobyte.
    pub fn scrambles_prefix_only(self) -> bool {
        matches!(
            self,
            ObjectKind::ImageStream | ObjectKind::Font | ObjectKind::SoundStream
        )
    }
}

/// Attribute values keyed by tag id. Merging is last-writer-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs(BTreeMap<u16, TagValue>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.0.get(&tag)
    }

    pub fn set(&mut self, tag: u16, value: TagValue) {
        self.0.insert(tag, value);
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn int(&self, tag: u16) -> Option<i64> {
        self.get(tag).and_then(TagValue::as_int)
    }

    pub fn color(&self, tag: u16) -> Option<Color> {
        match self.get(tag)? {
            TagValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn string(&self, tag: u16) -> Option<&str> {
        match self.get(tag)? {
            TagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// A reference attribute; id 0 means "none".
    pub fn reference(&self, tag: u16) -> Option<u32> {
        self.get(tag)
            .and_then(TagValue::as_ref_id)
            .filter(|&id| id != 0)
    }

    pub fn tuple(&self, tag: u16) -> Option<&[i64]> {
        self.get(tag).and_then(TagValue::as_tuple)
    }

    pub fn ids(&self, tag: u16) -> Option<&[u32]> {
        match self.get(tag)? {
            TagValue::Ids(v) => Some(v),
            _ => None,
        }
    }

    /// Overlay `other` on top of `self`.
    pub fn merge(&mut self, other: &Attrs) {
        for (tag, value) in &other.0 {
            self.0.insert(*tag, value.clone());
        }
    }

    /// A copy with `other` laid on top.
    pub fn merged(&self, other: &Attrs) -> Attrs {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u16, TagValue)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (u16, TagValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decoded stream content of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamData {
    pub flags: StreamFlags,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub rect: (u16, u16, u16, u16),
    pub size: (u16, u16),
    pub stream: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookAttrs {
    pub page_tree: Option<u32>,
    pub text_attr: Option<u32>,
    pub block_attr: Option<u32>,
    pub page_attr: Option<u32>,
    pub fonts: Vec<u32>,
}

/// Typed body of an object, chosen by its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ObjectBody {
    #[default]
    None,
    PageTree(Vec<u32>),
    Page {
        attr: Option<u32>,
        contents: Vec<PageItem>,
    },
    Block {
        attr: Option<u32>,
        child: Option<u32>,
    },
    Canvas {
        width: i32,
        height: i32,
        placements: Vec<Placement>,
    },
    Text {
        attr: Option<u32>,
        elements: Vec<TextElement>,
    },
    Image(ImageRef),
    ImageStream(ImageEncoding),
    Button(Button),
    Font {
        face: String,
        file: String,
    },
    Toc(Vec<TocRecord>),
    BookAttr(BookAttrs),
}

/// A loaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub id: u32,
    pub kind: ObjectKind,
    pub attrs: Attrs,
    pub stream: Option<StreamData>,
    pub body: ObjectBody,
    references: Vec<u32>,
}

impl Object {
    /// An object built in memory rather than loaded; its references are
    /// taken from the attributes and body.
    pub fn new(id: u32, kind: ObjectKind, attrs: Attrs, body: ObjectBody) -> Self {
        let mut references: Vec<u32> = attrs
            .iter()
            .flat_map(|(_, value)| match value {
                TagValue::Ref(id) => vec![*id],
                TagValue::Ids(list) => list.clone(),
                _ => Vec::new(),
            })
            .chain(body_references(&body))
            .filter(|&id| id != 0)
            .collect();
        references.sort_unstable();
        references.dedup();
        Self {
            id,
            kind,
            attrs,
            stream: None,
            body,
            references,
        }
    }

    /// Decoded stream bytes, or an empty slice.
    pub fn stream_bytes(&self) -> &[u8] {
        self.stream.as_ref().map(|s| s.data.as_slice()).unwrap_or(&[])
    }

    /// Every object id this object refers to (excluding id 0).
    pub fn references(&self) -> &[u32] {
        &self.references
    }

    /// Style object linked from this object (`Link` attribute).
    pub fn style_link(&self) -> Option<u32> {
        match &self.body {
            ObjectBody::Page { attr, .. }
            | ObjectBody::Block { attr, .. }
            | ObjectBody::Text { attr, .. } => *attr,
            _ => self.attrs.reference(ids::LINK),
        }
    }
}

/// Load-time policy shared by every object.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadContext {
    pub strict: bool,
    pub xor_key: u16,
}

impl LoadContext {
    /// Strict mode returns the error; best-effort logs it and continues.
    pub fn recover(&self, object: u32, err: Error) -> Result<()> {
        if self.strict {
            return Err(err);
        }
        match &err {
            Error::UnknownTag { id, offset } => {
                tracing::warn!(object, tag = %tag_name(*id), offset, "unknown tag skipped")
            }
            Error::UnknownObjectTag { tag, .. } => {
                tracing::warn!(object, tag = %tag_name(*tag), "tag not valid for object skipped")
            }
            _ => tracing::warn!(object, error = %err, "recovered from error"),
        }
        Ok(())
    }
}

/// Mutable state while one object's tags are read.
#[derive(Debug)]
pub struct ObjectBuilder {
    pub id: u32,
    pub attrs: Attrs,
    button: Option<ButtonBuilder>,
    references: Vec<u32>,
}

impl ObjectBuilder {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            attrs: Attrs::new(),
            button: None,
            references: Vec::new(),
        }
    }

    /// Record an object id this object refers to.
    pub fn note_reference(&mut self, id: u32) {
        if id != 0 && !self.references.contains(&id) {
            self.references.push(id);
        }
    }

    fn apply(&mut self, kind: ObjectKind, tag: Tag, ctx: &LoadContext) -> Result<()> {
        match schema::lookup(kind, tag.id) {
            Some(Action::Attr) => {
                match &tag.value {
                    TagValue::Ref(id) => self.note_reference(*id),
                    TagValue::Ids(list) => list.iter().for_each(|id| self.note_reference(*id)),
                    _ => {}
                }
                self.attrs.set(tag.id, tag.value);
                Ok(())
            }
            Some(Action::Decode(_, decoder)) => match decoder(self, &tag) {
                Ok(()) => Ok(()),
                Err(err) => ctx.recover(self.id, err),
            },
            Some(Action::Ignore) => Ok(()),
            None => ctx.recover(
                self.id,
                Error::UnknownObjectTag {
                    object: self.id,
                    tag: tag.id,
                },
            ),
        }
    }
}

/// Load one object from the whole file.
pub fn load_object(file: &[u8], entry: &ObjectEntry, ctx: &LoadContext) -> Result<Object> {
    decode_object(object_bytes(file, entry)?, entry, ctx)
}

/// Decode one object from its own bytes, `entry.size` long from `entry.offset`.
pub fn decode_object(bytes: &[u8], entry: &ObjectEntry, ctx: &LoadContext) -> Result<Object> {
    let (id, type_code) = parse_object_start(entry.id, bytes)?;
    if id != entry.id {
        tracing::warn!(object = entry.id, found = id, "object id differs from table entry");
    }
    let kind = ObjectKind::from_code(type_code).ok_or(Error::UnknownObjectType {
        object: entry.id,
        type_code,
    })?;

    let mut builder = ObjectBuilder::new(entry.id);
    let mut raw_stream: Option<&[u8]> = None;
    let mut reader = TagReader::with_base(&bytes[8..], entry.offset as usize + 8);

    loop {
        if reader.is_empty() {
            tracing::warn!(object = entry.id, "object has no ObjectEnd sentinel");
            break;
        }
        let tag = match reader.decode_one() {
            Ok(tag) => tag,
            Err(err @ Error::UnknownTag { .. }) => {
                ctx.recover(entry.id, err)?;
                continue;
            }
            Err(err) => return Err(err),
        };
        match tag.id {
            ids::OBJECT_END => break,
            ids::STREAM_START => {
                let declared = builder.attrs.int(ids::STREAM_SIZE).unwrap_or(0) as usize;
                let len = if declared > reader.remaining() {
                    ctx.recover(
                        entry.id,
                        Error::bad_stream(
                            entry.id,
                            format!(
                                "declared stream size {declared} exceeds the {} bytes left",
                                reader.remaining()
                            ),
                        ),
                    )?;
                    reader.remaining()
                } else {
                    declared
                };
                raw_stream = Some(reader.read_raw(len)?);
                if !end_of_stream(&mut reader, entry.id, ctx)? {
                    break;
                }
            }
            _ => builder.apply(kind, tag, ctx)?,
        }
    }

    let stream = match raw_stream {
        Some(raw) => {
            let flags = StreamFlags(builder.attrs.int(ids::STREAM_FLAGS).unwrap_or(0) as u16);
            match stream::decode(
                entry.id,
                raw,
                flags,
                ctx.xor_key,
                kind.scrambles_prefix_only(),
            ) {
                Ok(data) => Some(StreamData { flags, data }),
                Err(err) => {
                    ctx.recover(entry.id, err)?;
                    Some(StreamData {
                        flags,
                        data: Vec::new(),
                    })
                }
            }
        }
        None => None,
    };

    let body = build_body(kind, &mut builder, stream.as_ref(), ctx)?;
    Ok(Object {
        id: entry.id,
        kind,
        attrs: builder.attrs,
        stream,
        body,
        references: builder.references,
    })
}

/// Consume the `StreamEnd` sentinel after a stream body.
///
/// A missing sentinel is tolerated when the object's extent is used up or
/// `ObjectEnd` follows. Returns `false` when tag reading should stop.
fn end_of_stream(reader: &mut TagReader<'_>, object: u32, ctx: &LoadContext) -> Result<bool> {
    match reader.peek_u16() {
        Some(ids::STREAM_END) => {
            reader.read_u16();
            Ok(true)
        }
        next => {
            tracing::warn!(object, "stream has no StreamEnd sentinel");
            match next {
                None | Some(ids::OBJECT_END) => Ok(true),
                Some(other) => {
                    ctx.recover(
                        object,
                        Error::bad_stream(
                            object,
                            format!("unexpected {} after stream body", tag_name(other)),
                        ),
                    )?;
                    Ok(false)
                }
            }
        }
    }
}

fn build_body(
    kind: ObjectKind,
    builder: &mut ObjectBuilder,
    stream: Option<&StreamData>,
    ctx: &LoadContext,
) -> Result<ObjectBody> {
    let id = builder.id;
    let data = stream.map(|s| s.data.as_slice()).unwrap_or(&[]);
    let attrs = &builder.attrs;

    let body = match kind {
        ObjectKind::PageTree => {
            ObjectBody::PageTree(attrs.ids(ids::PAGE_LIST).map(<[u32]>::to_vec).unwrap_or_default())
        }
        ObjectKind::Page | ObjectKind::MiniPage => ObjectBody::Page {
            attr: attrs.reference(ids::LINK),
            contents: content::parse_page_stream(id, data, ctx)?,
        },
        ObjectKind::Block => ObjectBody::Block {
            attr: attrs.reference(ids::LINK),
            child: content::parse_block_stream(id, data, ctx)?,
        },
        ObjectKind::Canvas | ObjectKind::Header | ObjectKind::Footer => ObjectBody::Canvas {
            width: attrs
                .int(ids::CANVAS_WIDTH)
                .or_else(|| attrs.int(ids::BLOCK_WIDTH))
                .unwrap_or(0) as i32,
            height: attrs
                .int(ids::CANVAS_HEIGHT)
                .or_else(|| attrs.int(ids::BLOCK_HEIGHT))
                .unwrap_or(0) as i32,
            placements: content::parse_canvas_stream(id, data, ctx)?,
        },
        ObjectKind::Text | ObjectKind::SimpleText => ObjectBody::Text {
            attr: attrs.reference(ids::LINK),
            elements: text::parse_text_stream(id, data, ctx)?,
        },
        ObjectKind::Image => {
            let rect = match attrs.tuple(ids::IMAGE_RECT) {
                Some(&[x0, y0, x1, y1]) => (x0 as u16, y0 as u16, x1 as u16, y1 as u16),
                _ => (0, 0, 0, 0),
            };
            let size = match attrs.tuple(ids::IMAGE_SIZE) {
                Some(&[w, h]) => (w as u16, h as u16),
                _ => (rect.2.saturating_sub(rect.0), rect.3.saturating_sub(rect.1)),
            };
            ObjectBody::Image(ImageRef {
                rect,
                size,
                stream: attrs.reference(ids::IMAGE_STREAM),
            })
        }
        ObjectKind::ImageStream => {
            let encoding = match stream.map(|s| s.flags.encoding()) {
                Some(ImageEncoding::Unknown(_)) | None => ImageEncoding::sniff(data),
                Some(known) => known,
            };
            ObjectBody::ImageStream(encoding)
        }
        ObjectKind::Button => ObjectBody::Button(
            builder
                .button
                .take()
                .map(ButtonBuilder::finish)
                .unwrap_or_default(),
        ),
        ObjectKind::Font => ObjectBody::Font {
            face: attrs.string(ids::FONT_FACE_NAME).unwrap_or_default().to_string(),
            file: attrs.string(ids::FONT_FILE_NAME).unwrap_or_default().to_string(),
        },
        ObjectKind::Toc => match content::parse_toc_stream(id, data) {
            Ok(records) => ObjectBody::Toc(records),
            Err(err) => {
                ctx.recover(id, err)?;
                ObjectBody::Toc(Vec::new())
            }
        },
        ObjectKind::BookAttr => ObjectBody::BookAttr(BookAttrs {
            page_tree: attrs.reference(ids::CHILD_PAGE_TREE),
            text_attr: attrs.reference(ids::BOOK_TEXT_ATTR),
            block_attr: attrs.reference(ids::BOOK_BLOCK_ATTR),
            page_attr: attrs.reference(ids::BOOK_PAGE_ATTR),
            fonts: attrs.ids(ids::FONT_LIST).map(<[u32]>::to_vec).unwrap_or_default(),
        }),
        _ => ObjectBody::None,
    };

    for r in body_references(&body) {
        builder.note_reference(r);
    }
    Ok(body)
}

fn body_references(body: &ObjectBody) -> Vec<u32> {
    match body {
        ObjectBody::Page { contents, .. } => contents
            .iter()
            .filter_map(|item| match item {
                PageItem::Object(id) => Some(*id),
                _ => None,
            })
            .collect(),
        ObjectBody::Block { child, .. } => child.iter().copied().collect(),
        ObjectBody::Canvas { placements, .. } => placements.iter().map(|p| p.object).collect(),
        ObjectBody::Text { elements, .. } => elements
            .iter()
            .filter_map(|e| match e {
                TextElement::Open(Inline::CharButton(target)) => Some(*target),
                TextElement::Plot(plot) => Some(plot.image),
                _ => None,
            })
            .collect(),
        ObjectBody::Button(button) => button.references().collect(),
        ObjectBody::Toc(records) => records.iter().flat_map(|r| [r.page, r.object]).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrf::stream::{COMPRESSED, SCRAMBLED};
    use crate::lrf::tags::TagWriter;

    fn frame(id: u32, kind: ObjectKind, body: impl FnOnce(&mut TagWriter)) -> Vec<u8> {
        let mut w = TagWriter::new();
        w.tuple(ids::OBJECT_START, &[id as i64, kind.code() as i64]);
        body(&mut w);
        w.empty(ids::OBJECT_END);
        w.into_bytes()
    }

    fn entry(id: u32, bytes: &[u8]) -> ObjectEntry {
        ObjectEntry {
            id,
            offset: 0,
            size: bytes.len() as u32,
        }
    }

    fn with_stream(w: &mut TagWriter, flags: u16, raw: &[u8]) {
        w.int(ids::STREAM_FLAGS, flags as i64)
            .int(ids::STREAM_SIZE, raw.len() as i64)
            .empty(ids::STREAM_START)
            .raw(raw)
            .empty(ids::STREAM_END);
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ObjectKind::from_code(0x0A), Some(ObjectKind::Text));
        assert_eq!(ObjectKind::from_code(0x1E), Some(ObjectKind::Toc));
        assert_eq!(ObjectKind::from_code(0x0F), None);
        assert_eq!(ObjectKind::Toc.name(), "TOC");
    }

    #[test]
    fn test_load_text_object() {
        let mut stream = TagWriter::new();
        stream.empty(ids::P).text("Hi").empty(ids::P_END);
        let bytes = frame(5, ObjectKind::Text, |w| {
            w.reference(ids::LINK, 9).int(ids::FONT_SIZE, 120);
            with_stream(w, 0, stream.as_bytes());
        });
        let object = load_object(&bytes, &entry(5, &bytes), &LoadContext::default()).unwrap();
        assert_eq!(object.kind, ObjectKind::Text);
        assert_eq!(object.attrs.int(ids::FONT_SIZE), Some(120));
        assert_eq!(object.style_link(), Some(9));
        let ObjectBody::Text { elements, .. } = &object.body else {
            panic!("expected text body");
        };
        assert_eq!(elements.len(), 3);
        assert!(object.references().contains(&9));
    }

    #[test]
    fn test_compressed_scrambled_stream_object() {
        let content = vec![7u8; 3000];
        let flags = StreamFlags(COMPRESSED | SCRAMBLED | 0x12);
        let encoded = stream::encode(&content, flags, 42, true).unwrap();
        let bytes = frame(8, ObjectKind::ImageStream, |w| with_stream(w, flags.0, &encoded));
        let ctx = LoadContext {
            strict: true,
            xor_key: 42,
        };
        let object = load_object(&bytes, &entry(8, &bytes), &ctx).unwrap();
        assert_eq!(object.stream_bytes(), &content[..]);
        assert_eq!(object.body, ObjectBody::ImageStream(ImageEncoding::Png));
    }

    #[test]
    fn test_unknown_type_code() {
        let mut w = TagWriter::new();
        w.tuple(ids::OBJECT_START, &[3, 0x0F]).empty(ids::OBJECT_END);
        let bytes = w.into_bytes();
        assert!(matches!(
            load_object(&bytes, &entry(3, &bytes), &LoadContext::default()),
            Err(Error::UnknownObjectType { object: 3, type_code: 0x0F })
        ));
    }

    #[test]
    fn test_tag_outside_schema() {
        let bytes = frame(4, ObjectKind::TextAttr, |w| {
            w.int(ids::FONT_SIZE, 100).ids(ids::PAGE_LIST, &[1]);
        });
        let lenient = load_object(&bytes, &entry(4, &bytes), &LoadContext::default()).unwrap();
        assert_eq!(lenient.attrs.len(), 1);

        let strict = LoadContext {
            strict: true,
            xor_key: 0,
        };
        assert!(matches!(
            load_object(&bytes, &entry(4, &bytes), &strict),
            Err(Error::UnknownObjectTag { object: 4, tag: ids::PAGE_LIST })
        ));
    }

    #[test]
    fn test_missing_stream_end_before_object_end() {
        let mut w = TagWriter::new();
        w.tuple(ids::OBJECT_START, &[6, ObjectKind::SoundStream.code() as i64])
            .int(ids::STREAM_SIZE, 3)
            .empty(ids::STREAM_START)
            .raw(&[1, 2, 3])
            .empty(ids::OBJECT_END);
        let bytes = w.into_bytes();
        let strict = LoadContext {
            strict: true,
            xor_key: 0,
        };
        let object = load_object(&bytes, &entry(6, &bytes), &strict).unwrap();
        assert_eq!(object.stream_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_missing_stream_end_with_trailing_tags() {
        let mut w = TagWriter::new();
        w.tuple(ids::OBJECT_START, &[6, ObjectKind::SoundStream.code() as i64])
            .int(ids::STREAM_SIZE, 3)
            .empty(ids::STREAM_START)
            .raw(&[1, 2, 3])
            .int(ids::STREAM_FLAGS, 0)
            .empty(ids::OBJECT_END);
        let bytes = w.into_bytes();
        let strict = LoadContext {
            strict: true,
            xor_key: 0,
        };
        assert!(matches!(
            load_object(&bytes, &entry(6, &bytes), &strict),
            Err(Error::BadStream { object: 6, .. })
        ));
        let lenient = load_object(&bytes, &entry(6, &bytes), &LoadContext::default()).unwrap();
        assert_eq!(lenient.stream_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_attrs_merge_last_writer_wins() {
        let base: Attrs = [(ids::FONT_SIZE, TagValue::Int(100)), (ids::FONT_WEIGHT, TagValue::Int(400))]
            .into_iter()
            .collect();
        let over: Attrs = [(ids::FONT_SIZE, TagValue::Int(140))].into_iter().collect();
        let merged = base.merged(&over);
        assert_eq!(merged.int(ids::FONT_SIZE), Some(140));
        assert_eq!(merged.int(ids::FONT_WEIGHT), Some(400));
        assert_eq!(base.int(ids::FONT_SIZE), Some(100));
    }
}
