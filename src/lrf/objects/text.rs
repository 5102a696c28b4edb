//! Text streams: UTF-16LE characters interleaved with inline tags.
//!
//! A `u16` whose high byte is `0xF5` starts a tag; anything else is a
//! character. Runs of characters become one [`TextElement::Text`].

use crate::error::{Error, Result};
use crate::lrf::tags::{TagReader, TagValue, ids, is_tag_id};

use super::LoadContext;

/// Inline constructs that open and close around a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineKind {
    Italic,
    Sup,
    Sub,
    EmpLine,
    CharButton,
    Ruby,
    RubyBase,
    RubyText,
    Tate,
    Nekase,
    DrawChar,
}

/// An opened inline construct with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inline {
    Italic,
    Sup,
    Sub,
    EmpLine,
    CharButton(u32),
    Ruby,
    RubyBase,
    RubyText,
    Tate,
    Nekase,
    DrawChar(u16),
}

impl Inline {
    pub fn kind(self) -> InlineKind {
        match self {
            Inline::Italic => InlineKind::Italic,
            Inline::Sup => InlineKind::Sup,
            Inline::Sub => InlineKind::Sub,
            Inline::EmpLine => InlineKind::EmpLine,
            Inline::CharButton(_) => InlineKind::CharButton,
            Inline::Ruby => InlineKind::Ruby,
            Inline::RubyBase => InlineKind::RubyBase,
            Inline::RubyText => InlineKind::RubyText,
            Inline::Tate => InlineKind::Tate,
            Inline::Nekase => InlineKind::Nekase,
            Inline::DrawChar(_) => InlineKind::DrawChar,
        }
    }
}

/// An inline image inside text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plot {
    pub width: u16,
    pub height: u16,
    pub image: u32,
    pub adjust: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextElement {
    ParagraphStart,
    ParagraphEnd,
    Text(String),
    LineBreak,
    /// Attribute override that holds until the end of the paragraph.
    Span(u16, TagValue),
    Open(Inline),
    Close(InlineKind),
    Plot(Plot),
    Space(i16),
}

fn open_tag(id: u16, value: &TagValue) -> Option<Inline> {
    Some(match id {
        ids::ITALIC => Inline::Italic,
        ids::SUP => Inline::Sup,
        ids::SUB => Inline::Sub,
        ids::EMP_LINE => Inline::EmpLine,
        ids::CHAR_BUTTON => Inline::CharButton(value.as_ref_id()?),
        ids::RUBY => Inline::Ruby,
        ids::RUBY_BASE => Inline::RubyBase,
        ids::RUBY_TEXT => Inline::RubyText,
        ids::TATE => Inline::Tate,
        ids::NEKASE => Inline::Nekase,
        ids::DRAW_CHAR => Inline::DrawChar(value.as_int()? as u16),
        _ => return None,
    })
}

fn close_tag(id: u16) -> Option<InlineKind> {
    Some(match id {
        ids::ITALIC_END => InlineKind::Italic,
        ids::SUP_END => InlineKind::Sup,
        ids::SUB_END => InlineKind::Sub,
        ids::EMP_LINE_END => InlineKind::EmpLine,
        ids::CHAR_BUTTON_END => InlineKind::CharButton,
        ids::RUBY_END => InlineKind::Ruby,
        ids::RUBY_BASE_END => InlineKind::RubyBase,
        ids::RUBY_TEXT_END => InlineKind::RubyText,
        ids::TATE_END => InlineKind::Tate,
        ids::NEKASE_END => InlineKind::Nekase,
        ids::DRAW_CHAR_END => InlineKind::DrawChar,
        _ => return None,
    })
}

/// Tags that change text attributes inline.
pub fn is_span_tag(id: u16) -> bool {
    matches!(
        id,
        ids::FONT_SIZE..=ids::PAR_SKIP
            | ids::ALIGN
            | ids::RUBY_ALIGN
            | ids::RUBY_OVERHANG
            | ids::EMP_DOTS_POSITION
            | ids::EMP_DOTS_CODE
            | ids::EMP_LINE_POSITION
            | ids::EMP_LINE_TYPE
    )
}

fn flush(chars: &mut Vec<u16>, out: &mut Vec<TextElement>) {
    if chars.is_empty() {
        return;
    }
    let text = String::from_utf16_lossy(chars);
    chars.clear();
    if let Some(TextElement::Text(prev)) = out.last_mut() {
        prev.push_str(&text);
    } else {
        out.push(TextElement::Text(text));
    }
}

/// Parse a decoded text stream.
pub fn parse_text_stream(object: u32, data: &[u8], ctx: &LoadContext) -> Result<Vec<TextElement>> {
    let mut reader = TagReader::new(data);
    let mut out = Vec::new();
    let mut chars: Vec<u16> = Vec::new();

    while let Some(unit) = reader.peek_u16() {
        if !is_tag_id(unit) {
            reader.read_u16();
            chars.push(unit);
            continue;
        }
        flush(&mut chars, &mut out);
        let tag = match reader.decode_one() {
            Ok(tag) => tag,
            Err(err @ Error::UnknownTag { .. }) => {
                ctx.recover(object, err)?;
                continue;
            }
            Err(err) => return Err(err),
        };
        let element = match tag.id {
            ids::P => TextElement::ParagraphStart,
            ids::P_END => TextElement::ParagraphEnd,
            ids::CR => TextElement::LineBreak,
            ids::STRING => match tag.value {
                TagValue::Str(s) => TextElement::Text(s),
                _ => continue,
            },
            ids::SPACE => TextElement::Space(tag.value.as_int().unwrap_or(0) as i16),
            ids::PLOT => match tag.value.as_tuple() {
                Some(&[width, height, image, adjust]) => TextElement::Plot(Plot {
                    width: width as u16,
                    height: height as u16,
                    image: image as u32,
                    adjust: adjust as u32,
                }),
                _ => continue,
            },
            ids::AUTO_SPACING | ids::WAIT => continue,
            id if is_span_tag(id) => TextElement::Span(id, tag.value),
            id => {
                if let Some(inline) = open_tag(id, &tag.value) {
                    TextElement::Open(inline)
                } else if let Some(kind) = close_tag(id) {
                    TextElement::Close(kind)
                } else {
                    ctx.recover(object, Error::UnknownObjectTag { object, tag: id })?;
                    continue;
                }
            }
        };
        if let TextElement::Text(s) = &element
            && let Some(TextElement::Text(prev)) = out.last_mut()
        {
            prev.push_str(s);
            continue;
        }
        out.push(element);
    }
    if reader.remaining() == 1 {
        tracing::warn!(object, "text stream has an odd trailing byte");
    }
    flush(&mut chars, &mut out);
    Ok(out)
}

/// Plain text of a parsed stream, paragraphs separated by newlines.
pub fn plain_text(elements: &[TextElement]) -> String {
    let mut out = String::new();
    for element in elements {
        match element {
            TextElement::Text(s) => out.push_str(s),
            TextElement::LineBreak => out.push('\n'),
            TextElement::ParagraphEnd => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
    out
}
