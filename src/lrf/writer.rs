//! Serialising LRF files.
//!
//! [`LrfWriter`] lays out a complete file:
//!
//! ```text
//! header | thumbnail | DocInfo block | objects … | object table
//! ```
//!
//! [`rewrite_metadata`] replaces the thumbnail and DocInfo of an existing
//! file and shifts every later offset by the size difference.

use crate::error::{Error, Result};
use crate::lrf::container::{ObjectEntry, ObjectTable};
use crate::lrf::docinfo::DocInfo;
use crate::lrf::header::Header;
use crate::lrf::objects::ObjectKind;
use crate::lrf::stream::{self, ImageEncoding, StreamFlags};
use crate::lrf::tags::{TagWriter, ids};

/// One object to be written.
#[derive(Debug, Clone)]
pub struct LrfObject {
    pub id: u32,
    pub kind: ObjectKind,
    tags: TagWriter,
    stream: Option<(StreamFlags, Vec<u8>)>,
}

impl LrfObject {
    pub fn new(id: u32, kind: ObjectKind) -> Self {
        Self {
            id,
            kind,
            tags: TagWriter::new(),
            stream: None,
        }
    }

    /// Body tags (written between `ObjectStart` and the stream).
    pub fn tags(&mut self) -> &mut TagWriter {
        &mut self.tags
    }

    /// Attach stream content; it is compressed and scrambled per `flags`.
    pub fn with_stream(mut self, flags: StreamFlags, content: Vec<u8>) -> Self {
        self.stream = Some((flags, content));
        self
    }

    pub fn with_tags(mut self, build: impl FnOnce(&mut TagWriter)) -> Self {
        build(&mut self.tags);
        self
    }

    fn encode(&self, xor_key: u16) -> Result<Vec<u8>> {
        let mut w = TagWriter::new();
        w.tuple(ids::OBJECT_START, &[self.id as i64, self.kind.code() as i64]);
        w.raw(self.tags.as_bytes());
        if let Some((flags, content)) = &self.stream {
            let encoded = stream::encode(
                content,
                *flags,
                xor_key,
                self.kind.scrambles_prefix_only(),
            )?;
            w.int(ids::STREAM_FLAGS, flags.0 as i64)
                .int(ids::STREAM_SIZE, encoded.len() as i64)
                .empty(ids::STREAM_START)
                .raw(&encoded)
                .empty(ids::STREAM_END);
        }
        w.empty(ids::OBJECT_END);
        Ok(w.into_bytes())
    }
}

/// Builds a complete LRF file.
#[derive(Debug, Clone)]
pub struct LrfWriter {
    header: Header,
    doc_info: DocInfo,
    thumbnail: Option<(ImageEncoding, Vec<u8>)>,
    objects: Vec<LrfObject>,
}

impl LrfWriter {
    pub fn new(version: u16) -> Self {
        Self {
            header: Header::new(version),
            doc_info: DocInfo::new(),
            thumbnail: None,
            objects: Vec::new(),
        }
    }

    /// Header template; counts, offsets and sizes are filled on write.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn doc_info_mut(&mut self) -> &mut DocInfo {
        &mut self.doc_info
    }

    pub fn set_doc_info(&mut self, doc_info: DocInfo) -> &mut Self {
        self.doc_info = doc_info;
        self
    }

    pub fn set_thumbnail(&mut self, encoding: ImageEncoding, data: Vec<u8>) -> &mut Self {
        self.thumbnail = Some((encoding, data));
        self
    }

    pub fn set_root(&mut self, id: u32) -> &mut Self {
        self.header.root_object_id = id;
        self
    }

    pub fn set_toc(&mut self, id: u32) -> &mut Self {
        self.header.toc_object_id = id;
        self
    }

    pub fn add(&mut self, object: LrfObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header = self.header.clone();
        let doc_block = self.doc_info.encode()?;

        let thumbnail: &[u8] = match (&self.thumbnail, header.has_thumbnail_block()) {
            (Some((encoding, data)), true) => {
                header.thumbnail_type = Some(*encoding);
                data
            }
            (Some(_), false) => {
                tracing::warn!(version = header.version, "thumbnail dropped: version has no thumbnail block");
                &[]
            }
            (None, _) => &[],
        };
        header.thumbnail_size = thumbnail.len() as u32;
        header.compressed_doc_info_size = doc_block.len() as u16;

        let mut body = Vec::new();
        body.extend_from_slice(thumbnail);
        body.extend_from_slice(&doc_block);

        let mut pos = header.len() + body.len();
        let mut entries = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let bytes = object.encode(header.xor_key)?;
            let offset = u32::try_from(pos)
                .map_err(|_| Error::BadHeader("file exceeds 4 GiB".to_string()))?;
            entries.push(ObjectEntry {
                id: object.id,
                offset,
                size: bytes.len() as u32,
            });
            if object.id == header.toc_object_id && header.toc_object_id != 0 {
                header.toc_object_offset = offset;
            }
            pos += bytes.len();
            body.extend_from_slice(&bytes);
        }

        header.object_count = entries.len() as u64;
        header.object_table_offset = pos as u64;
        let table = ObjectTable::new(entries);

        let mut out = header.to_bytes();
        out.extend_from_slice(&body);
        out.extend_from_slice(&table.to_bytes());
        Ok(out)
    }
}

/// Re-emit `file` with a new DocInfo and, optionally, a new thumbnail.
///
/// Every object offset, the object table offset and the TOC offset move by
/// the change in size of the metadata region.
pub fn rewrite_metadata(
    file: &[u8],
    doc_info: &DocInfo,
    thumbnail: Option<(ImageEncoding, &[u8])>,
) -> Result<Vec<u8>> {
    let mut header = Header::parse(file, file.len() as u64)?;
    let region_start = header.thumbnail_offset() as usize;
    let region_end = (header.doc_info_offset() + header.compressed_doc_info_size as u64) as usize;

    let old_thumbnail = &file[region_start..header.doc_info_offset() as usize];
    let thumb: &[u8] = match thumbnail {
        Some((encoding, data)) if header.has_thumbnail_block() => {
            header.thumbnail_type = Some(encoding);
            data
        }
        Some(_) => {
            tracing::warn!(version = header.version, "thumbnail dropped: version has no thumbnail block");
            old_thumbnail
        }
        None => old_thumbnail,
    };
    let doc_block = doc_info.encode()?;
    header.thumbnail_size = thumb.len() as u32;
    header.compressed_doc_info_size = doc_block.len() as u16;

    let new_len = thumb.len() + doc_block.len();
    let delta = new_len as i64 - (region_end - region_start) as i64;

    let table_offset = header.object_table_offset as usize;
    let count = header.object_count as usize;
    let mut table = ObjectTable::parse(&file[table_offset..], count)?;
    table.shift_from(region_end as u32, delta);
    if header.toc_object_offset as usize >= region_end {
        header.toc_object_offset = (header.toc_object_offset as i64 + delta) as u32;
    }
    if table_offset < region_end {
        return Err(Error::BadHeader("object table overlaps DocInfo".to_string()));
    }
    header.object_table_offset = (table_offset as i64 + delta) as u64;

    let table_bytes = table.to_bytes();
    let table_end = table_offset + count * crate::lrf::container::ENTRY_LEN;

    let mut out = header.to_bytes();
    out.extend_from_slice(thumb);
    out.extend_from_slice(&doc_block);
    out.extend_from_slice(&file[region_end..table_offset]);
    out.extend_from_slice(&table_bytes);
    out.extend_from_slice(&file[table_end.min(file.len())..]);
    tracing::debug!(delta, "metadata region rewritten");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrf::container::object_bytes;
    use crate::lrf::objects::{LoadContext, ObjectBody, load_object};

    fn sample() -> LrfWriter {
        let mut writer = LrfWriter::new(800);
        writer.header_mut().xor_key = 42;
        writer.doc_info_mut().set_title("Sample").unwrap();
        writer.set_root(1).set_toc(3);
        writer.add(LrfObject::new(1, ObjectKind::BookAttr).with_tags(|w| {
            w.reference(ids::CHILD_PAGE_TREE, 2);
        }));
        writer.add(LrfObject::new(2, ObjectKind::PageTree).with_tags(|w| {
            w.ids(ids::PAGE_LIST, &[]);
        }));
        writer.add(
            LrfObject::new(3, ObjectKind::Toc).with_stream(StreamFlags(0x0100), vec![0, 0]),
        );
        writer
    }

    #[test]
    fn test_written_file_parses() {
        let bytes = sample().to_bytes().unwrap();
        let header = Header::parse(&bytes, bytes.len() as u64).unwrap();
        assert_eq!(header.object_count, 3);
        assert_eq!(header.root_object_id, 1);
        let table = ObjectTable::parse(
            &bytes[header.object_table_offset as usize..],
            header.object_count as usize,
        )
        .unwrap();
        let toc = table.get(3).unwrap();
        assert_eq!(header.toc_object_offset, toc.offset);
        assert!(object_bytes(&bytes, toc).is_ok());

        let ctx = LoadContext {
            strict: true,
            xor_key: header.xor_key,
        };
        let book_attr = load_object(&bytes, table.get(1).unwrap(), &ctx).unwrap();
        assert!(matches!(book_attr.body, ObjectBody::BookAttr(ref b) if b.page_tree == Some(2)));
    }

    #[test]
    fn test_rewrite_metadata_shifts_offsets() {
        let bytes = sample().to_bytes().unwrap();
        let mut info = DocInfo::decode(&bytes[Header::parse(&bytes, bytes.len() as u64)
            .unwrap()
            .doc_info_offset() as usize..])
        .unwrap();
        info.set_title(&"A much longer title ".repeat(20)).unwrap();
        let thumb = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let rewritten = rewrite_metadata(&bytes, &info, Some((ImageEncoding::Jpeg, &thumb))).unwrap();

        let header = Header::parse(&rewritten, rewritten.len() as u64).unwrap();
        assert_eq!(header.thumbnail_size, 4);
        assert_eq!(header.thumbnail_type, Some(ImageEncoding::Jpeg));
        let start = header.doc_info_offset() as usize;
        let end = start + header.compressed_doc_info_size as usize;
        let reread = DocInfo::decode(&rewritten[start..end]).unwrap();
        assert_eq!(reread.title().unwrap(), info.title().unwrap());

        let table = ObjectTable::parse(
            &rewritten[header.object_table_offset as usize..],
            header.object_count as usize,
        )
        .unwrap();
        let ctx = LoadContext {
            strict: true,
            xor_key: header.xor_key,
        };
        for entry in table.entries() {
            load_object(&rewritten, entry, &ctx).unwrap();
        }
        assert_eq!(header.toc_object_offset, table.get(3).unwrap().offset);
    }
}
