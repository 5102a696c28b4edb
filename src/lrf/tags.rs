//! LRF tag codec.
//!
//! Every record inside an object body is a *tag*: a little-endian `u16` id
//! whose high byte is `0xF5`, followed by a payload whose shape is fixed by
//! the id. The shapes live in one static table ([`TAG_TABLE`]) shared by the
//! reader and the writer.

use std::fmt;

use crate::error::{Error, Result};
use crate::style::Color;
use crate::util::{decode_utf16le, encode_utf16le};

/// Tag ids, named after the record they introduce.
pub mod ids {
    pub const OBJECT_START: u16 = 0xF500;
    pub const OBJECT_END: u16 = 0xF501;
    pub const OBJECT_INFO_LINK: u16 = 0xF502;
    pub const LINK: u16 = 0xF503;
    pub const STREAM_SIZE: u16 = 0xF504;
    pub const STREAM_START: u16 = 0xF505;
    pub const STREAM_END: u16 = 0xF506;
    pub const ODD_HEADER: u16 = 0xF507;
    pub const EVEN_HEADER: u16 = 0xF508;
    pub const ODD_FOOTER: u16 = 0xF509;
    pub const EVEN_FOOTER: u16 = 0xF50A;
    pub const CONTAINED_OBJECTS: u16 = 0xF50B;

    pub const FONT_SIZE: u16 = 0xF511;
    pub const FONT_WIDTH: u16 = 0xF512;
    pub const FONT_ESCAPEMENT: u16 = 0xF513;
    pub const FONT_ORIENTATION: u16 = 0xF514;
    pub const FONT_WEIGHT: u16 = 0xF515;
    pub const FONT_FACE: u16 = 0xF516;
    pub const TEXT_COLOR: u16 = 0xF517;
    pub const TEXT_BG_COLOR: u16 = 0xF518;
    pub const WORD_SPACE: u16 = 0xF519;
    pub const LETTER_SPACE: u16 = 0xF51A;
    pub const BASELINE_SKIP: u16 = 0xF51B;
    pub const LINE_SPACE: u16 = 0xF51C;
    pub const PAR_INDENT: u16 = 0xF51D;
    pub const PAR_SKIP: u16 = 0xF51E;

    pub const TOP_MARGIN: u16 = 0xF521;
    pub const HEAD_HEIGHT: u16 = 0xF522;
    pub const HEAD_SEP: u16 = 0xF523;
    pub const ODD_SIDE_MARGIN: u16 = 0xF524;
    pub const TEXT_HEIGHT: u16 = 0xF525;
    pub const TEXT_WIDTH: u16 = 0xF526;
    pub const FOOT_SPACE: u16 = 0xF527;
    pub const FOOT_HEIGHT: u16 = 0xF528;
    pub const BG_IMAGE: u16 = 0xF529;
    pub const EMPTY_VIEW: u16 = 0xF52A;
    pub const EVEN_SIDE_MARGIN: u16 = 0xF52C;

    pub const BLOCK_WIDTH: u16 = 0xF531;
    pub const BLOCK_HEIGHT: u16 = 0xF532;
    pub const BLOCK_RULE: u16 = 0xF533;
    pub const BG_COLOR: u16 = 0xF534;
    pub const LAYOUT: u16 = 0xF535;
    pub const FRAME_WIDTH: u16 = 0xF536;
    pub const FRAME_COLOR: u16 = 0xF537;
    pub const FRAME_MODE: u16 = 0xF538;
    pub const TOP_SKIP: u16 = 0xF539;
    pub const SIDE_MARGIN: u16 = 0xF53A;
    pub const FOOT_SKIP: u16 = 0xF53B;
    pub const ALIGN: u16 = 0xF53C;
    pub const COLUMN: u16 = 0xF53D;
    pub const COLUMN_SEP: u16 = 0xF53E;

    pub const MINI_PAGE_HEIGHT: u16 = 0xF541;
    pub const MINI_PAGE_WIDTH: u16 = 0xF542;
    pub const LOCATION_Y: u16 = 0xF546;
    pub const LOCATION_X: u16 = 0xF547;
    pub const PUT_SOUND: u16 = 0xF549;
    pub const IMAGE_RECT: u16 = 0xF54A;
    pub const IMAGE_SIZE: u16 = 0xF54B;
    pub const IMAGE_STREAM: u16 = 0xF54C;
    pub const CANVAS_WIDTH: u16 = 0xF551;
    pub const CANVAS_HEIGHT: u16 = 0xF552;
    pub const STREAM_FLAGS: u16 = 0xF554;
    pub const FONT_FILE_NAME: u16 = 0xF559;
    pub const PAGE_LIST: u16 = 0xF55C;
    pub const FONT_FACE_NAME: u16 = 0xF55D;

    pub const BUTTON_FLAGS: u16 = 0xF561;
    pub const BASE_BUTTON_START: u16 = 0xF562;
    pub const BASE_BUTTON_END: u16 = 0xF563;
    pub const FOCUS_IN_BUTTON_START: u16 = 0xF564;
    pub const FOCUS_IN_BUTTON_END: u16 = 0xF565;
    pub const PUSH_BUTTON_START: u16 = 0xF566;
    pub const PUSH_BUTTON_END: u16 = 0xF567;
    pub const UP_BUTTON_START: u16 = 0xF568;
    pub const UP_BUTTON_END: u16 = 0xF569;
    pub const ACTIONS_START: u16 = 0xF56A;
    pub const ACTIONS_END: u16 = 0xF56B;
    pub const JUMP_TO: u16 = 0xF56C;
    pub const SEND_MESSAGE: u16 = 0xF56D;
    pub const CLOSE_WINDOW: u16 = 0xF56E;
    pub const SOUND_STOP: u16 = 0xF572;
    pub const RULED_LINE: u16 = 0xF573;
    pub const RUBY_ALIGN: u16 = 0xF575;
    pub const RUBY_OVERHANG: u16 = 0xF576;
    pub const EMP_DOTS_POSITION: u16 = 0xF577;
    pub const EMP_DOTS_CODE: u16 = 0xF578;
    pub const EMP_LINE_POSITION: u16 = 0xF579;
    pub const EMP_LINE_TYPE: u16 = 0xF57A;
    pub const CHILD_PAGE_TREE: u16 = 0xF57B;
    pub const PARENT_PAGE_TREE: u16 = 0xF57C;

    pub const ITALIC: u16 = 0xF581;
    pub const ITALIC_END: u16 = 0xF582;
    pub const P: u16 = 0xF5A1;
    pub const P_END: u16 = 0xF5A2;
    pub const CHAR_BUTTON: u16 = 0xF5A7;
    pub const CHAR_BUTTON_END: u16 = 0xF5A8;
    pub const RUBY: u16 = 0xF5A9;
    pub const RUBY_END: u16 = 0xF5AA;
    pub const RUBY_BASE: u16 = 0xF5AB;
    pub const RUBY_BASE_END: u16 = 0xF5AC;
    pub const RUBY_TEXT: u16 = 0xF5AD;
    pub const RUBY_TEXT_END: u16 = 0xF5AE;
    pub const TATE: u16 = 0xF5B3;
    pub const TATE_END: u16 = 0xF5B4;
    pub const NEKASE: u16 = 0xF5B5;
    pub const NEKASE_END: u16 = 0xF5B6;
    pub const SUP: u16 = 0xF5B7;
    pub const SUP_END: u16 = 0xF5B8;
    pub const SUB: u16 = 0xF5B9;
    pub const SUB_END: u16 = 0xF5BA;
    pub const EMP_LINE: u16 = 0xF5C1;
    pub const EMP_LINE_END: u16 = 0xF5C2;
    pub const DRAW_CHAR: u16 = 0xF5C3;
    pub const DRAW_CHAR_END: u16 = 0xF5C4;
    pub const AUTO_SPACING: u16 = 0xF5C8;
    pub const SPACE: u16 = 0xF5CA;
    pub const STRING: u16 = 0xF5CC;
    pub const PLOT: u16 = 0xF5D1;
    pub const CR: u16 = 0xF5D2;
    pub const WAIT: u16 = 0xF5D4;
    pub const PUT_OBJ: u16 = 0xF5D8;
    pub const RUN: u16 = 0xF5D9;
    pub const BOOK_TEXT_ATTR: u16 = 0xF5DA;
    pub const BOOK_BLOCK_ATTR: u16 = 0xF5DB;
    pub const BOOK_PAGE_ATTR: u16 = 0xF5DC;
    pub const FONT_LIST: u16 = 0xF5DD;
}

/// A fixed-width integer inside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    U8,
    U16,
    I16,
    U32,
    I32,
    U64,
}

impl Scalar {
    pub const fn width(self) -> usize {
        match self {
            Scalar::U8 => 1,
            Scalar::U16 | Scalar::I16 => 2,
            Scalar::U32 | Scalar::I32 => 4,
            Scalar::U64 => 8,
        }
    }

    fn read(self, b: &[u8]) -> i64 {
        match self {
            Scalar::U8 => b[0] as i64,
            Scalar::U16 => u16::from_le_bytes([b[0], b[1]]) as i64,
            Scalar::I16 => i16::from_le_bytes([b[0], b[1]]) as i64,
            Scalar::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
            Scalar::I32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
            Scalar::U64 => {
                u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as i64
            }
        }
    }

    fn write(self, value: i64, out: &mut Vec<u8>) {
        match self {
            Scalar::U8 => out.push(value as u8),
            Scalar::U16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
            Scalar::I16 => out.extend_from_slice(&(value as i16).to_le_bytes()),
            Scalar::U32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
            Scalar::I32 => out.extend_from_slice(&(value as i32).to_le_bytes()),
            Scalar::U64 => out.extend_from_slice(&(value as u64).to_le_bytes()),
        }
    }
}

/// Payload layout selected by a tag id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// No payload.
    Empty,
    /// One fixed-width integer.
    Scalar(Scalar),
    /// Four bytes, stored `r g b a` where `a` is transparency.
    Color,
    /// A `u32` object id.
    Ref,
    /// `u16` byte length followed by UTF-16LE text.
    String,
    /// A fixed sequence of integers.
    Tuple(&'static [Scalar]),
    /// `u16` count followed by that many `u32` object ids.
    IdList,
    /// `u16` message type followed by two strings (message, label).
    Message,
    /// `u16` byte length followed by opaque bytes.
    Raw,
}

/// Static description of one tag id.
#[derive(Debug, Clone, Copy)]
pub struct TagInfo {
    pub id: u16,
    pub name: &'static str,
    pub shape: Shape,
}

const fn info(id: u16, name: &'static str, shape: Shape) -> TagInfo {
    TagInfo { id, name, shape }
}

const U16: Shape = Shape::Scalar(Scalar::U16);
const I16: Shape = Shape::Scalar(Scalar::I16);
const U32: Shape = Shape::Scalar(Scalar::U32);

use ids::*;

/// All known tags, sorted by id.
pub static TAG_TABLE: &[TagInfo] = &[
    info(OBJECT_START, "ObjectStart", Shape::Tuple(&[Scalar::U32, Scalar::U16])),
    info(OBJECT_END, "ObjectEnd", Shape::Empty),
    info(OBJECT_INFO_LINK, "ObjectInfoLink", Shape::Ref),
    info(LINK, "Link", Shape::Ref),
    info(STREAM_SIZE, "StreamSize", U32),
    info(STREAM_START, "StreamStart", Shape::Empty),
    info(STREAM_END, "StreamEnd", Shape::Empty),
    info(ODD_HEADER, "OddHeaderId", Shape::Ref),
    info(EVEN_HEADER, "EvenHeaderId", Shape::Ref),
    info(ODD_FOOTER, "OddFooterId", Shape::Ref),
    info(EVEN_FOOTER, "EvenFooterId", Shape::Ref),
    info(CONTAINED_OBJECTS, "ContainedObjectsList", Shape::IdList),
    info(FONT_SIZE, "FontSize", I16),
    info(FONT_WIDTH, "FontWidth", I16),
    info(FONT_ESCAPEMENT, "FontEscapement", I16),
    info(FONT_ORIENTATION, "FontOrientation", I16),
    info(FONT_WEIGHT, "FontWeight", U16),
    info(FONT_FACE, "FontFacename", Shape::String),
    info(TEXT_COLOR, "TextColor", Shape::Color),
    info(TEXT_BG_COLOR, "TextBgColor", Shape::Color),
    info(WORD_SPACE, "WordSpace", I16),
    info(LETTER_SPACE, "LetterSpace", I16),
    info(BASELINE_SKIP, "BaseLineSkip", I16),
    info(LINE_SPACE, "LineSpace", I16),
    info(PAR_INDENT, "ParIndent", I16),
    info(PAR_SKIP, "ParSkip", I16),
    info(TOP_MARGIN, "TopMargin", U16),
    info(HEAD_HEIGHT, "HeadHeight", U16),
    info(HEAD_SEP, "HeadSep", U16),
    info(ODD_SIDE_MARGIN, "OddSideMargin", U16),
    info(TEXT_HEIGHT, "TextHeight", U16),
    info(TEXT_WIDTH, "TextWidth", U16),
    info(FOOT_SPACE, "FootSpace", U16),
    info(FOOT_HEIGHT, "FootHeight", U16),
    info(BG_IMAGE, "BgImage", Shape::Tuple(&[Scalar::U16, Scalar::U32])),
    info(EMPTY_VIEW, "SetEmptyView", U16),
    info(EVEN_SIDE_MARGIN, "EvenSideMargin", U16),
    info(BLOCK_WIDTH, "BlockWidth", U16),
    info(BLOCK_HEIGHT, "BlockHeight", U16),
    info(BLOCK_RULE, "BlockRule", U16),
    info(BG_COLOR, "BgColor", Shape::Color),
    info(LAYOUT, "Layout", U16),
    info(FRAME_WIDTH, "FrameWidth", U16),
    info(FRAME_COLOR, "FrameColor", Shape::Color),
    info(FRAME_MODE, "FrameMode", U16),
    info(TOP_SKIP, "TopSkip", U16),
    info(SIDE_MARGIN, "SideMargin", U16),
    info(FOOT_SKIP, "FootSkip", U16),
    info(ALIGN, "Align", U16),
    info(COLUMN, "Column", U16),
    info(COLUMN_SEP, "ColumnSep", U16),
    info(MINI_PAGE_HEIGHT, "MiniPageHeight", U16),
    info(MINI_PAGE_WIDTH, "MiniPageWidth", U16),
    info(LOCATION_Y, "LocationY", U16),
    info(LOCATION_X, "LocationX", U16),
    info(PUT_SOUND, "PutSound", Shape::Tuple(&[Scalar::U32, Scalar::U32])),
    info(
        IMAGE_RECT,
        "ImageRect",
        Shape::Tuple(&[Scalar::U16, Scalar::U16, Scalar::U16, Scalar::U16]),
    ),
    info(IMAGE_SIZE, "ImageSize", Shape::Tuple(&[Scalar::U16, Scalar::U16])),
    info(IMAGE_STREAM, "ImageStream", Shape::Ref),
    info(CANVAS_WIDTH, "CanvasWidth", U16),
    info(CANVAS_HEIGHT, "CanvasHeight", U16),
    info(STREAM_FLAGS, "StreamFlags", U16),
    info(FONT_FILE_NAME, "FontFileName", Shape::String),
    info(PAGE_LIST, "PageList", Shape::IdList),
    info(FONT_FACE_NAME, "FontFaceName", Shape::String),
    info(BUTTON_FLAGS, "ButtonFlags", U16),
    info(BASE_BUTTON_START, "BaseButtonStart", Shape::Empty),
    info(BASE_BUTTON_END, "BaseButtonEnd", Shape::Empty),
    info(FOCUS_IN_BUTTON_START, "FocusInButtonStart", Shape::Empty),
    info(FOCUS_IN_BUTTON_END, "FocusInButtonEnd", Shape::Empty),
    info(PUSH_BUTTON_START, "PushButtonStart", Shape::Empty),
    info(PUSH_BUTTON_END, "PushButtonEnd", Shape::Empty),
    info(UP_BUTTON_START, "UpButtonStart", Shape::Empty),
    info(UP_BUTTON_END, "UpButtonEnd", Shape::Empty),
    info(ACTIONS_START, "StartActions", Shape::Empty),
    info(ACTIONS_END, "EndActions", Shape::Empty),
    info(JUMP_TO, "JumpTo", Shape::Tuple(&[Scalar::U32, Scalar::U32])),
    info(SEND_MESSAGE, "SendMessage", Shape::Message),
    info(CLOSE_WINDOW, "CloseWindow", Shape::Empty),
    info(SOUND_STOP, "SoundStop", Shape::Empty),
    info(
        RULED_LINE,
        "RuledLine",
        Shape::Tuple(&[Scalar::U16, Scalar::U16, Scalar::U16, Scalar::U32]),
    ),
    info(RUBY_ALIGN, "RubyAlign", U16),
    info(RUBY_OVERHANG, "RubyOverhang", U16),
    info(EMP_DOTS_POSITION, "EmpDotsPosition", U16),
    info(EMP_DOTS_CODE, "EmpDotsCode", Shape::Raw),
    info(EMP_LINE_POSITION, "EmpLinePosition", U16),
    info(EMP_LINE_TYPE, "EmpLineType", U16),
    info(CHILD_PAGE_TREE, "ChildPageTree", Shape::Ref),
    info(PARENT_PAGE_TREE, "ParentPageTree", Shape::Ref),
    info(ITALIC, "Italic", Shape::Empty),
    info(ITALIC_END, "ItalicEnd", Shape::Empty),
    info(P, "P", Shape::Empty),
    info(P_END, "PEnd", Shape::Empty),
    info(CHAR_BUTTON, "CharButton", Shape::Ref),
    info(CHAR_BUTTON_END, "CharButtonEnd", Shape::Empty),
    info(RUBY, "Ruby", Shape::Empty),
    info(RUBY_END, "RubyEnd", Shape::Empty),
    info(RUBY_BASE, "RubyBase", Shape::Empty),
    info(RUBY_BASE_END, "RubyBaseEnd", Shape::Empty),
    info(RUBY_TEXT, "RubyText", Shape::Empty),
    info(RUBY_TEXT_END, "RubyTextEnd", Shape::Empty),
    info(TATE, "Tate", Shape::Empty),
    info(TATE_END, "TateEnd", Shape::Empty),
    info(NEKASE, "Nekase", Shape::Empty),
    info(NEKASE_END, "NekaseEnd", Shape::Empty),
    info(SUP, "Sup", Shape::Empty),
    info(SUP_END, "SupEnd", Shape::Empty),
    info(SUB, "Sub", Shape::Empty),
    info(SUB_END, "SubEnd", Shape::Empty),
    info(EMP_LINE, "EmpLine", Shape::Empty),
    info(EMP_LINE_END, "EmpLineEnd", Shape::Empty),
    info(DRAW_CHAR, "DrawChar", U16),
    info(DRAW_CHAR_END, "DrawCharEnd", Shape::Empty),
    info(AUTO_SPACING, "AutoSpacing", U16),
    info(SPACE, "Space", I16),
    info(STRING, "String", Shape::String),
    info(
        PLOT,
        "Plot",
        Shape::Tuple(&[Scalar::U16, Scalar::U16, Scalar::U32, Scalar::U32]),
    ),
    info(CR, "CR", Shape::Empty),
    info(WAIT, "Wait", U16),
    info(
        PUT_OBJ,
        "PutObj",
        Shape::Tuple(&[Scalar::U16, Scalar::U16, Scalar::U32]),
    ),
    info(RUN, "Run", Shape::Tuple(&[Scalar::U16, Scalar::U32])),
    info(BOOK_TEXT_ATTR, "BookTextAttr", Shape::Ref),
    info(BOOK_BLOCK_ATTR, "BookBlockAttr", Shape::Ref),
    info(BOOK_PAGE_ATTR, "BookPageAttr", Shape::Ref),
    info(FONT_LIST, "FontList", Shape::IdList),
];

/// Look up the static description of a tag id.
pub fn tag_info(id: u16) -> Option<&'static TagInfo> {
    TAG_TABLE
        .binary_search_by_key(&id, |t| t.id)
        .ok()
        .map(|i| &TAG_TABLE[i])
}

/// Human-readable tag name, or the hex id for unknown tags.
pub fn tag_name(id: u16) -> String {
    match tag_info(id) {
        Some(info) => info.name.to_string(),
        None => format!("{id:#06x}"),
    }
}

/// Whether a `u16` read from a text stream is a tag rather than a character.
#[inline]
pub fn is_tag_id(value: u16) -> bool {
    value & 0xFF00 == 0xF500
}

/// Decoded payload of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Empty,
    Int(i64),
    Color(Color),
    Ref(u32),
    Str(String),
    Tuple(Vec<i64>),
    Ids(Vec<u32>),
    Message {
        kind: u16,
        message: String,
        label: String,
    },
    Raw(Vec<u8>),
}

impl TagValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Int(v) => Some(*v),
            TagValue::Ref(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<u32> {
        match self {
            TagValue::Ref(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[i64]> {
        match self {
            TagValue::Tuple(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Empty => Ok(()),
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Color(c) => write!(f, "#{:02x}{:02x}{:02x}/{}", c.r, c.g, c.b, c.a),
            TagValue::Ref(id) => write!(f, "@{id}"),
            TagValue::Str(s) => write!(f, "{s:?}"),
            TagValue::Tuple(v) => write!(f, "{v:?}"),
            TagValue::Ids(v) => write!(f, "{v:?}"),
            TagValue::Message {
                kind,
                message,
                label,
            } => write!(f, "{kind}:{message:?}:{label:?}"),
            TagValue::Raw(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// One decoded tag with its absolute offset (for diagnostics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: u16,
    pub value: TagValue,
    pub offset: usize,
}

impl Tag {
    pub fn name(&self) -> String {
        tag_name(self.id)
    }
}

/// Cursor over a tag stream.
///
/// `base` is the absolute file offset of `data[0]`, reported in errors.
pub struct TagReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> TagReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek the next `u16` without consuming it.
    pub fn peek_u16(&self) -> Option<u16> {
        if self.remaining() < 2 {
            return None;
        }
        Some(u16::from_le_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
        ]))
    }

    /// Read the next `u16` (a character in text streams).
    pub fn read_u16(&mut self) -> Option<u16> {
        let value = self.peek_u16()?;
        self.pos += 2;
        Some(value)
    }

    /// Take `len` raw bytes (stream bodies).
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Truncated {
                id: ids::STREAM_START,
                offset: self.base + self.pos,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Decode one tag.
    ///
    /// An unknown id yields [`Error::UnknownTag`] with the cursor left just
    /// past the id; there is no resync to a later boundary.
    pub fn decode_one(&mut self) -> Result<Tag> {
        let offset = self.base + self.pos;
        let Some(id) = self.read_u16() else {
            return Err(Error::Truncated { id: 0, offset });
        };
        let Some(info) = tag_info(id) else {
            return Err(Error::UnknownTag { id, offset });
        };
        let value = self.decode_payload(id, info.shape, offset)?;
        Ok(Tag { id, value, offset })
    }

    /// Advance past the payload of a tag whose id was already consumed.
    pub fn skip(&mut self, id: u16) -> Result<()> {
        let offset = self.base + self.pos;
        let Some(info) = tag_info(id) else {
            return Ok(());
        };
        let len = self
            .payload_len(info.shape)
            .ok_or(Error::Truncated { id, offset })?;
        if self.remaining() < len {
            return Err(Error::Truncated { id, offset });
        }
        self.pos += len;
        Ok(())
    }

    fn payload_len(&self, shape: Shape) -> Option<usize> {
        let rest = &self.data[self.pos..];
        let u16_at = |at: usize| -> Option<usize> {
            rest.get(at..at + 2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
        };
        Some(match shape {
            Shape::Empty => 0,
            Shape::Scalar(s) => s.width(),
            Shape::Color | Shape::Ref => 4,
            Shape::String | Shape::Raw => 2 + u16_at(0)?,
            Shape::Tuple(parts) => parts.iter().map(|s| s.width()).sum(),
            Shape::IdList => 2 + 4 * u16_at(0)?,
            Shape::Message => {
                let first = u16_at(2)?;
                let second = u16_at(4 + first)?;
                2 + 2 + first + 2 + second
            }
        })
    }

    fn take(&mut self, id: u16, offset: usize, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Truncated { id, offset });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_u16(&mut self, id: u16, offset: usize) -> Result<u16> {
        let b = self.take(id, offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn take_string(&mut self, id: u16, offset: usize) -> Result<String> {
        let len = self.take_u16(id, offset)? as usize;
        let bytes = self.take(id, offset, len)?;
        Ok(decode_utf16le(bytes))
    }

    fn decode_payload(&mut self, id: u16, shape: Shape, offset: usize) -> Result<TagValue> {
        Ok(match shape {
            Shape::Empty => TagValue::Empty,
            Shape::Scalar(s) => TagValue::Int(s.read(self.take(id, offset, s.width())?)),
            Shape::Color => {
                let b = self.take(id, offset, 4)?;
                TagValue::Color(Color::from_le_bytes([b[0], b[1], b[2], b[3]]))
            }
            Shape::Ref => {
                let b = self.take(id, offset, 4)?;
                TagValue::Ref(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            }
            Shape::String => TagValue::Str(self.take_string(id, offset)?),
            Shape::Tuple(parts) => {
                let mut values = Vec::with_capacity(parts.len());
                for part in parts {
                    values.push(part.read(self.take(id, offset, part.width())?));
                }
                TagValue::Tuple(values)
            }
            Shape::IdList => {
                let count = self.take_u16(id, offset)? as usize;
                let bytes = self.take(id, offset, count * 4)?;
                TagValue::Ids(
                    bytes
                        .chunks_exact(4)
                        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            }
            Shape::Message => {
                let kind = self.take_u16(id, offset)?;
                let message = self.take_string(id, offset)?;
                let label = self.take_string(id, offset)?;
                TagValue::Message {
                    kind,
                    message,
                    label,
                }
            }
            Shape::Raw => {
                let len = self.take_u16(id, offset)? as usize;
                TagValue::Raw(self.take(id, offset, len)?.to_vec())
            }
        })
    }
}

impl Iterator for TagReader<'_> {
    type Item = Result<Tag>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            None
        } else {
            Some(self.decode_one())
        }
    }
}

/// Serialises tags; the inverse of [`TagReader`].
#[derive(Debug, Default, Clone)]
pub struct TagWriter {
    buf: Vec<u8>,
}

impl TagWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append raw bytes (stream bodies, literal text).
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append literal text as UTF-16LE characters (text streams).
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.buf.extend(encode_utf16le(text));
        self
    }

    pub fn empty(&mut self, id: u16) -> &mut Self {
        self.tag(id, &TagValue::Empty)
    }

    pub fn int(&mut self, id: u16, value: i64) -> &mut Self {
        self.tag(id, &TagValue::Int(value))
    }

    pub fn reference(&mut self, id: u16, target: u32) -> &mut Self {
        self.tag(id, &TagValue::Ref(target))
    }

    pub fn string(&mut self, id: u16, value: &str) -> &mut Self {
        self.tag(id, &TagValue::Str(value.to_string()))
    }

    pub fn color(&mut self, id: u16, value: Color) -> &mut Self {
        self.tag(id, &TagValue::Color(value))
    }

    pub fn tuple(&mut self, id: u16, values: &[i64]) -> &mut Self {
        self.tag(id, &TagValue::Tuple(values.to_vec()))
    }

    pub fn ids(&mut self, id: u16, values: &[u32]) -> &mut Self {
        self.tag(id, &TagValue::Ids(values.to_vec()))
    }

    /// Append one tag. The value is written according to the id's table
    /// shape; a mismatched value kind writes a zeroed payload of that shape.
    pub fn tag(&mut self, id: u16, value: &TagValue) -> &mut Self {
        self.buf.extend_from_slice(&id.to_le_bytes());
        let Some(info) = tag_info(id) else {
            return self;
        };
        match (info.shape, value) {
            (Shape::Empty, _) => {}
            (Shape::Scalar(s), v) => s.write(v.as_int().unwrap_or(0), &mut self.buf),
            (Shape::Color, TagValue::Color(c)) => self.buf.extend_from_slice(&c.to_le_bytes()),
            (Shape::Ref, v) => {
                let target = v.as_int().unwrap_or(0) as u32;
                self.buf.extend_from_slice(&target.to_le_bytes());
            }
            (Shape::String, TagValue::Str(s)) => self.write_string(s),
            (Shape::Tuple(parts), TagValue::Tuple(values)) => {
                for (i, part) in parts.iter().enumerate() {
                    part.write(values.get(i).copied().unwrap_or(0), &mut self.buf);
                }
            }
            (Shape::IdList, TagValue::Ids(values)) => {
                self.buf
                    .extend_from_slice(&(values.len() as u16).to_le_bytes());
                for v in values {
                    self.buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            (
                Shape::Message,
                TagValue::Message {
                    kind,
                    message,
                    label,
                },
            ) => {
                self.buf.extend_from_slice(&kind.to_le_bytes());
                self.write_string(message);
                self.write_string(label);
            }
            (Shape::Raw, TagValue::Raw(bytes)) => {
                self.buf
                    .extend_from_slice(&(bytes.len() as u16).to_le_bytes());
                self.buf.extend_from_slice(bytes);
            }
            (shape, _) => self.zero_fill(shape),
        }
        self
    }

    fn write_string(&mut self, s: &str) {
        let encoded = encode_utf16le(s);
        self.buf
            .extend_from_slice(&(encoded.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(&encoded);
    }

    fn zero_fill(&mut self, shape: Shape) {
        let len = match shape {
            Shape::Empty => 0,
            Shape::Scalar(s) => s.width(),
            Shape::Color | Shape::Ref => 4,
            Shape::String | Shape::Raw | Shape::IdList => 2,
            Shape::Tuple(parts) => parts.iter().map(|s| s.width()).sum(),
            Shape::Message => 6,
        };
        self.buf.extend(std::iter::repeat_n(0u8, len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in TAG_TABLE.windows(2) {
            assert!(pair[0].id < pair[1].id, "{:#06x} out of order", pair[1].id);
        }
    }

    #[test]
    fn test_decode_scalar_and_ref() {
        let mut w = TagWriter::new();
        w.int(ids::FONT_SIZE, -120).reference(ids::LINK, 77);
        let mut r = TagReader::new(w.as_bytes());
        let size = r.decode_one().unwrap();
        assert_eq!(size.id, ids::FONT_SIZE);
        assert_eq!(size.value, TagValue::Int(-120));
        let link = r.decode_one().unwrap();
        assert_eq!(link.value, TagValue::Ref(77));
        assert_eq!(link.offset, 4);
        assert!(r.is_empty());
    }

    #[test]
    fn test_decode_string_is_byte_length_prefixed() {
        let bytes = [0x16, 0xF5, 0x04, 0x00, b'O', 0x00, b'K', 0x00];
        let tag = TagReader::new(&bytes).decode_one().unwrap();
        assert_eq!(tag.value, TagValue::Str("OK".to_string()));
    }

    #[test]
    fn test_decode_color() {
        let bytes = [0x17, 0xF5, 0x10, 0x20, 0x30, 0x00];
        let tag = TagReader::new(&bytes).decode_one().unwrap();
        let TagValue::Color(c) = tag.value else {
            panic!("expected color");
        };
        assert_eq!((c.r, c.g, c.b), (0x10, 0x20, 0x30));
        assert_eq!(c.display_alpha(), 255);
    }

    #[test]
    fn test_unknown_tag_reports_offset_and_advances_past_id() {
        let bytes = [0x01, 0xF5, 0xFF, 0xF5, 0x01, 0xF5];
        let mut r = TagReader::with_base(&bytes, 100);
        r.decode_one().unwrap();
        match r.decode_one() {
            Err(Error::UnknownTag { id, offset }) => {
                assert_eq!(id, 0xF5FF);
                assert_eq!(offset, 102);
            }
            other => panic!("expected UnknownTag, got {other:?}"),
        }
        assert_eq!(r.decode_one().unwrap().id, ids::OBJECT_END);
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = [0x03, 0xF5, 0x01, 0x00];
        assert!(matches!(
            TagReader::new(&bytes).decode_one(),
            Err(Error::Truncated { id: ids::LINK, .. })
        ));
    }

    #[test]
    fn test_skip_variable_payloads() {
        let mut w = TagWriter::new();
        w.tag(
            ids::SEND_MESSAGE,
            &TagValue::Message {
                kind: 2,
                message: "hi".into(),
                label: "there".into(),
            },
        );
        w.ids(ids::PAGE_LIST, &[1, 2, 3]);
        w.empty(ids::OBJECT_END);

        let bytes = w.into_bytes();
        let mut r = TagReader::new(&bytes);
        let id = r.read_u16().unwrap();
        TagReader::skip(&mut r, id).unwrap();
        let id = r.read_u16().unwrap();
        TagReader::skip(&mut r, id).unwrap();
        assert_eq!(r.decode_one().unwrap().id, ids::OBJECT_END);
    }

    #[test]
    fn test_tuple_and_id_list() {
        let mut w = TagWriter::new();
        w.tuple(ids::IMAGE_RECT, &[0, 0, 600, 800]);
        w.ids(ids::CONTAINED_OBJECTS, &[10, 11]);
        let tags: Vec<Tag> = TagReader::new(w.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tags[0].value, TagValue::Tuple(vec![0, 0, 600, 800]));
        assert_eq!(tags[1].value, TagValue::Ids(vec![10, 11]));
    }

    #[test]
    fn test_is_tag_id() {
        assert!(is_tag_id(0xF5A1));
        assert!(!is_tag_id(u16::from(b'A')));
        assert!(!is_tag_id(0x00F5));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scalar_tags_survive_writer_and_reader(size in any::<i16>(), weight in any::<u16>(), target in any::<u32>()) {
                let mut w = TagWriter::new();
                w.int(ids::FONT_SIZE, size as i64)
                    .int(ids::FONT_WEIGHT, weight as i64)
                    .reference(ids::IMAGE_STREAM, target);
                let tags: Vec<Tag> = TagReader::new(w.as_bytes()).collect::<Result<_>>().unwrap();
                prop_assert_eq!(&tags[0].value, &TagValue::Int(size as i64));
                prop_assert_eq!(&tags[1].value, &TagValue::Int(weight as i64));
                prop_assert_eq!(&tags[2].value, &TagValue::Ref(target));
            }

            #[test]
            fn strings_survive_writer_and_reader(text in "[a-zA-Z0-9 \u{e9}\u{4e2d}]{0,40}") {
                let mut w = TagWriter::new();
                w.string(ids::FONT_FACE, &text);
                let tag = TagReader::new(w.as_bytes()).decode_one().unwrap();
                prop_assert_eq!(tag.value, TagValue::Str(text));
            }
        }
    }
}
