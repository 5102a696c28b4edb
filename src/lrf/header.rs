//! LRF container header.
//!
//! ```text
//! 0x00  "L\0R\0F\0\0\0"        magic
//! 0x08  version                u16
//! 0x0A  xor key                u16
//! 0x0C  root object id         u32
//! 0x10  object count           u64
//! 0x18  object table offset    u64
//! 0x24  binding                u8   (1 = left-to-right, 16 = right-to-left)
//! 0x26  dpi                    u16
//! 0x2A  width                  u16
//! 0x2C  height                 u16
//! 0x2E  colour depth           u8
//! 0x44  TOC object id          u32
//! 0x48  TOC object offset      u32
//! 0x4C  compressed DocInfo size u16 (includes the 4-byte length prefix)
//! 0x4E  thumbnail type         u16  (version >= 800 only)
//! 0x50  thumbnail size         u32  (version >= 800 only)
//! ```
//!
//! Bytes not named above are carried verbatim so that an unchanged header
//! serialises to the bytes it was parsed from.

use crate::error::{Error, Result};

use super::stream::ImageEncoding;

pub const LRF_MAGIC: [u8; 8] = *b"L\0R\0F\0\0\0";

/// Length of the fixed header for versions without a thumbnail block.
pub const BASE_HEADER_LEN: usize = 0x4E;
/// Length of the fixed header when the thumbnail block is present.
pub const THUMB_HEADER_LEN: usize = 0x54;
/// First version carrying the thumbnail block.
pub const THUMBNAIL_VERSION: u16 = 800;

const OBJECT_ENTRY_LEN: u64 = 16;

/// Page binding direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    LeftToRight,
    RightToLeft,
    Other(u8),
}

impl Binding {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Binding::LeftToRight,
            16 => Binding::RightToLeft,
            n => Binding::Other(n),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Binding::LeftToRight => 1,
            Binding::RightToLeft => 16,
            Binding::Other(n) => n,
        }
    }
}

/// Parsed LRF header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub xor_key: u16,
    pub root_object_id: u32,
    pub object_count: u64,
    pub object_table_offset: u64,
    pub binding: Binding,
    pub dpi: u16,
    pub width: u16,
    pub height: u16,
    pub color_depth: u8,
    pub toc_object_id: u32,
    pub toc_object_offset: u32,
    pub compressed_doc_info_size: u16,
    pub thumbnail_type: Option<ImageEncoding>,
    pub thumbnail_size: u32,
    /// The fixed header bytes as read; unnamed bytes are preserved from here.
    raw: Vec<u8>,
}

#[inline]
fn u16_at(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

#[inline]
fn u32_at(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[inline]
fn u64_at(data: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(b)
}

impl Header {
    /// A blank header for a new file of the given version.
    pub fn new(version: u16) -> Self {
        let len = if version >= THUMBNAIL_VERSION {
            THUMB_HEADER_LEN
        } else {
            BASE_HEADER_LEN
        };
        let mut raw = vec![0u8; len];
        raw[..8].copy_from_slice(&LRF_MAGIC);
        Self {
            version,
            xor_key: 0x30,
            root_object_id: 0,
            object_count: 0,
            object_table_offset: 0,
            binding: Binding::LeftToRight,
            dpi: 1660,
            width: 600,
            height: 800,
            color_depth: 24,
            toc_object_id: 0,
            toc_object_offset: 0,
            compressed_doc_info_size: 0,
            thumbnail_type: None,
            thumbnail_size: 0,
            raw,
        }
    }

    /// Parse the header from the start of a file of `file_len` bytes.
    ///
    /// `data` must hold at least [`THUMB_HEADER_LEN`] bytes when the file is
    /// that long; sanity checks compare the declared regions with `file_len`.
    pub fn parse(data: &[u8], file_len: u64) -> Result<Self> {
        if data.len() < 8 || data[..8] != LRF_MAGIC {
            return Err(Error::BadMagic);
        }
        if data.len() < BASE_HEADER_LEN {
            return Err(Error::BadHeader(format!(
                "header needs {BASE_HEADER_LEN} bytes, file has {}",
                data.len()
            )));
        }

        let version = u16_at(data, 0x08);
        let has_thumbnail = version >= THUMBNAIL_VERSION;
        let header_len = if has_thumbnail {
            THUMB_HEADER_LEN
        } else {
            BASE_HEADER_LEN
        };
        if data.len() < header_len {
            return Err(Error::BadHeader(format!(
                "version {version} header needs {header_len} bytes"
            )));
        }

        let (thumbnail_type, thumbnail_size) = if has_thumbnail {
            (
                Some(ImageEncoding::from_code(u16_at(data, 0x4E))),
                u32_at(data, 0x50),
            )
        } else {
            (None, 0)
        };

        let header = Self {
            version,
            xor_key: u16_at(data, 0x0A),
            root_object_id: u32_at(data, 0x0C),
            object_count: u64_at(data, 0x10),
            object_table_offset: u64_at(data, 0x18),
            binding: Binding::from_code(data[0x24]),
            dpi: u16_at(data, 0x26),
            width: u16_at(data, 0x2A),
            height: u16_at(data, 0x2C),
            color_depth: data[0x2E],
            toc_object_id: u32_at(data, 0x44),
            toc_object_offset: u32_at(data, 0x48),
            compressed_doc_info_size: u16_at(data, 0x4C),
            thumbnail_type,
            thumbnail_size,
            raw: data[..header_len].to_vec(),
        };
        header.check_extents(file_len)?;
        Ok(header)
    }

    fn check_extents(&self, file_len: u64) -> Result<()> {
        let table_end = self
            .object_count
            .checked_mul(OBJECT_ENTRY_LEN)
            .and_then(|len| len.checked_add(self.object_table_offset));
        match table_end {
            Some(end) if end <= file_len => {}
            _ => {
                return Err(Error::BadHeader(format!(
                    "{} objects at offset {} run past end of file ({file_len} bytes)",
                    self.object_count, self.object_table_offset
                )));
            }
        }
        if self.compressed_doc_info_size < 4 {
            return Err(Error::BadHeader(format!(
                "DocInfo size {} is smaller than its length prefix",
                self.compressed_doc_info_size
            )));
        }
        if self.doc_info_offset() + self.compressed_doc_info_size as u64 > file_len {
            return Err(Error::BadHeader(
                "thumbnail or DocInfo runs past end of file".to_string(),
            ));
        }
        Ok(())
    }

    /// Length of the fixed header for this version.
    pub fn len(&self) -> usize {
        if self.has_thumbnail_block() {
            THUMB_HEADER_LEN
        } else {
            BASE_HEADER_LEN
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn has_thumbnail_block(&self) -> bool {
        self.version >= THUMBNAIL_VERSION
    }

    /// File offset of the thumbnail bytes.
    pub fn thumbnail_offset(&self) -> u64 {
        self.len() as u64
    }

    /// File offset of the compressed DocInfo block.
    pub fn doc_info_offset(&self) -> u64 {
        self.thumbnail_offset() + self.thumbnail_size as u64
    }

    /// Serialise the header. Unnamed bytes come from the parsed original.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.raw.clone();
        out.resize(self.len(), 0);
        out[..8].copy_from_slice(&LRF_MAGIC);
        out[0x08..0x0A].copy_from_slice(&self.version.to_le_bytes());
        out[0x0A..0x0C].copy_from_slice(&self.xor_key.to_le_bytes());
        out[0x0C..0x10].copy_from_slice(&self.root_object_id.to_le_bytes());
        out[0x10..0x18].copy_from_slice(&self.object_count.to_le_bytes());
        out[0x18..0x20].copy_from_slice(&self.object_table_offset.to_le_bytes());
        out[0x24] = self.binding.code();
        out[0x26..0x28].copy_from_slice(&self.dpi.to_le_bytes());
        out[0x2A..0x2C].copy_from_slice(&self.width.to_le_bytes());
        out[0x2C..0x2E].copy_from_slice(&self.height.to_le_bytes());
        out[0x2E] = self.color_depth;
        out[0x44..0x48].copy_from_slice(&self.toc_object_id.to_le_bytes());
        out[0x48..0x4C].copy_from_slice(&self.toc_object_offset.to_le_bytes());
        out[0x4C..0x4E].copy_from_slice(&self.compressed_doc_info_size.to_le_bytes());
        if self.has_thumbnail_block() {
            let code = self.thumbnail_type.map(ImageEncoding::code).unwrap_or(0);
            out[0x4E..0x50].copy_from_slice(&code.to_le_bytes());
            out[0x50..0x54].copy_from_slice(&self.thumbnail_size.to_le_bytes());
        }
        out
    }
}
