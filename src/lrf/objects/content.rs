//! Stream contents of container objects: pages, blocks, canvases and the TOC.

use crate::error::{Error, Result};
use crate::lrf::tags::{TagReader, TagValue, ids};
use crate::style::Color;
use crate::util::decode_utf16le;

use super::LoadContext;

/// Line styles shared by ruled lines, frames and emphasis lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineStyle {
    #[default]
    None,
    Solid,
    Dashed,
    Double,
    Dotted,
}

impl LineStyle {
    pub fn from_code(code: i64) -> Self {
        match code {
            0x10 => LineStyle::Solid,
            0x20 => LineStyle::Dashed,
            0x30 => LineStyle::Double,
            0x40 => LineStyle::Dotted,
            _ => LineStyle::None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            LineStyle::None => 0,
            LineStyle::Solid => 0x10,
            LineStyle::Dashed => 0x20,
            LineStyle::Double => 0x30,
            LineStyle::Dotted => 0x40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuledLine {
    pub length: u16,
    pub style: LineStyle,
    pub width: u16,
    pub color: Color,
}

impl RuledLine {
    fn from_tuple(values: &[i64]) -> Option<Self> {
        let &[length, style, width, color] = values else {
            return None;
        };
        Some(Self {
            length: length as u16,
            style: LineStyle::from_code(style),
            width: width as u16,
            color: Color::from_u32(color as u32),
        })
    }
}

/// One entry in a page's content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Object(u32),
    RuledLine(RuledLine),
    Wait(u16),
}

/// An absolutely positioned child of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub object: u32,
}

/// One TOC stream record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocRecord {
    pub page: u32,
    pub object: u32,
    pub label: String,
}

/// Parse a page (or mini-page) content stream.
pub fn parse_page_stream(object: u32, data: &[u8], ctx: &LoadContext) -> Result<Vec<PageItem>> {
    let mut items = Vec::new();
    for tag in TagReader::new(data) {
        let tag = match tag {
            Ok(tag) => tag,
            Err(err @ Error::UnknownTag { .. }) => {
                ctx.recover(object, err)?;
                continue;
            }
            Err(err) => return Err(err),
        };
        match (tag.id, &tag.value) {
            (ids::LINK, TagValue::Ref(id)) => items.push(PageItem::Object(*id)),
            (ids::RULED_LINE, TagValue::Tuple(v)) => {
                if let Some(line) = RuledLine::from_tuple(v) {
                    items.push(PageItem::RuledLine(line));
                }
            }
            (ids::WAIT, value) => items.push(PageItem::Wait(value.as_int().unwrap_or(0) as u16)),
            (ids::CONTAINED_OBJECTS, TagValue::Ids(list)) => {
                tracing::trace!(object, count = list.len(), "contained objects list");
            }
            (id, _) => ctx.recover(object, Error::UnknownObjectTag { object, tag: id })?,
        }
    }
    Ok(items)
}

/// Parse a block stream; the first `Link` is the block body.
pub fn parse_block_stream(object: u32, data: &[u8], ctx: &LoadContext) -> Result<Option<u32>> {
    let mut child = None;
    for tag in TagReader::new(data) {
        let tag = match tag {
            Ok(tag) => tag,
            Err(err @ Error::UnknownTag { .. }) => {
                ctx.recover(object, err)?;
                continue;
            }
            Err(err) => return Err(err),
        };
        match (tag.id, tag.value.as_ref_id()) {
            (ids::LINK, Some(id)) if child.is_none() => child = Some(id),
            (ids::LINK, Some(id)) => {
                tracing::debug!(object, extra = id, "block has more than one body; ignored");
            }
            (id, _) => ctx.recover(object, Error::UnknownObjectTag { object, tag: id })?,
        }
    }
    Ok(child)
}

/// Parse a canvas, header or footer stream of `PutObj` placements.
pub fn parse_canvas_stream(object: u32, data: &[u8], ctx: &LoadContext) -> Result<Vec<Placement>> {
    let mut placements = Vec::new();
    for tag in TagReader::new(data) {
        let tag = match tag {
            Ok(tag) => tag,
            Err(err @ Error::UnknownTag { .. }) => {
                ctx.recover(object, err)?;
                continue;
            }
            Err(err) => return Err(err),
        };
        match (tag.id, tag.value.as_tuple()) {
            (ids::PUT_OBJ, Some(&[x, y, child])) => placements.push(Placement {
                x: x as i32,
                y: y as i32,
                object: child as u32,
            }),
            (id, _) => ctx.recover(object, Error::UnknownObjectTag { object, tag: id })?,
        }
    }
    Ok(placements)
}

/// Parse a TOC stream.
///
/// ```text
/// u32 count                 (readers only use the low 16 bits)
/// count × u32               record offsets, relative to the first record
/// count × (u32 page id, u32 object id, u16 byte length, UTF-16LE label)
/// ```
///
/// Records are read back to back from `4 * (count + 1)`.
pub fn parse_toc_stream(object: u32, data: &[u8]) -> Result<Vec<TocRecord>> {
    let truncated = || Error::bad_stream(object, "TOC stream truncated");
    let u16_at = |at: usize| -> Result<u16> {
        data.get(at..at + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(truncated)
    };
    let u32_at = |at: usize| -> Result<u32> {
        data.get(at..at + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(truncated)
    };

    let count = u16_at(0)? as usize;
    let mut records = Vec::with_capacity(count);
    let mut pos = 4 * (count + 1);
    for _ in 0..count {
        let page = u32_at(pos)?;
        let target = u32_at(pos + 4)?;
        let len = u16_at(pos + 8)? as usize;
        pos += 10;
        let bytes = data.get(pos..pos + len).ok_or_else(truncated)?;
        pos += len;
        records.push(TocRecord {
            page,
            object: target,
            label: decode_utf16le(bytes),
        });
    }
    Ok(records)
}

/// Serialise TOC records in the layout read by [`parse_toc_stream`].
pub fn write_toc_stream(records: &[TocRecord]) -> Vec<u8> {
    let labels: Vec<Vec<u8>> = records
        .iter()
        .map(|r| crate::util::encode_utf16le(&r.label))
        .collect();
    let mut out = Vec::new();
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    let mut offset = 0u32;
    for label in &labels {
        out.extend_from_slice(&offset.to_le_bytes());
        offset += 10 + label.len() as u32;
    }
    for (record, label) in records.iter().zip(&labels) {
        out.extend_from_slice(&record.page.to_le_bytes());
        out.extend_from_slice(&record.object.to_le_bytes());
        out.extend_from_slice(&(label.len() as u16).to_le_bytes());
        out.extend_from_slice(label);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrf::tags::TagWriter;

    #[test]
    fn test_page_stream() {
        let mut w = TagWriter::new();
        w.reference(ids::LINK, 10)
            .tuple(ids::RULED_LINE, &[100, 0x10, 2, 0])
            .reference(ids::LINK, 11);
        let items = parse_page_stream(1, w.as_bytes(), &LoadContext::default()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], PageItem::Object(10));
        assert!(matches!(
            items[1],
            PageItem::RuledLine(RuledLine { length: 100, style: LineStyle::Solid, .. })
        ));
    }

    #[test]
    fn test_canvas_stream() {
        let mut w = TagWriter::new();
        w.tuple(ids::PUT_OBJ, &[5, 7, 33]);
        let placements = parse_canvas_stream(1, w.as_bytes(), &LoadContext::default()).unwrap();
        assert_eq!(placements, vec![Placement { x: 5, y: 7, object: 33 }]);
    }

    #[test]
    fn test_unexpected_tag_in_block_stream() {
        let mut w = TagWriter::new();
        w.reference(ids::LINK, 4).int(ids::FONT_SIZE, 10);
        let lenient = parse_block_stream(2, w.as_bytes(), &LoadContext::default()).unwrap();
        assert_eq!(lenient, Some(4));
        let strict = LoadContext {
            strict: true,
            ..LoadContext::default()
        };
        assert!(matches!(
            parse_block_stream(2, w.as_bytes(), &strict),
            Err(Error::UnknownObjectTag { object: 2, tag: ids::FONT_SIZE })
        ));
    }

    #[test]
    fn test_toc_stream() {
        let records = vec![
            TocRecord { page: 3, object: 30, label: "One".into() },
            TocRecord { page: 4, object: 40, label: "Two \u{e9}".into() },
        ];
        let bytes = write_toc_stream(&records);
        // Count, two offsets, then the first record.
        assert_eq!(&bytes[..12], &[2, 0, 0, 0, 0, 0, 0, 0, 16, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes());
        assert_eq!(parse_toc_stream(1, &bytes).unwrap(), records);
        assert!(parse_toc_stream(1, &bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_toc_records_follow_the_offset_table() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&6u16.to_le_bytes());
        bytes.extend_from_slice(&[b'C', 0, b'h', 0, b'1', 0]);
        assert_eq!(
            parse_toc_stream(1, &bytes).unwrap(),
            vec![TocRecord { page: 7, object: 9, label: "Ch1".into() }]
        );
    }
}
