//! Object table and object framing.
//!
//! This module contains pure functions over byte slices; it performs no I/O.
//! The table is `count` packed 16-byte entries: `id`, `offset`, `size` and a
//! zero pad, all `u32` little-endian. Each object's bytes start with an
//! `ObjectStart` tag carrying `(id, type code)` and end with `ObjectEnd`.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::io::ByteSource;

use super::tags::ids;

pub const ENTRY_LEN: usize = 16;

/// Location of one object in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEntry {
    pub id: u32,
    pub offset: u32,
    pub size: u32,
}

impl ObjectEntry {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }
}

/// Read a little-endian u32 from a byte slice at the given offset.
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Immutable id-indexed object table, in file order.
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    entries: Vec<ObjectEntry>,
    by_id: HashMap<u32, usize>,
}

impl ObjectTable {
    pub fn new(entries: Vec<ObjectEntry>) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        Self { entries, by_id }
    }

    /// Parse `count` entries from the table bytes.
    ///
    /// Ids are unique; a repeated id keeps its first entry.
    pub fn parse(data: &[u8], count: usize) -> Result<Self> {
        let needed = count
            .checked_mul(ENTRY_LEN)
            .ok_or_else(|| Error::BadHeader(format!("object count {count} overflows")))?;
        if data.len() < needed {
            return Err(Error::BadHeader(format!(
                "object table needs {needed} bytes, found {}",
                data.len()
            )));
        }

        let mut entries = Vec::with_capacity(count);
        let mut by_id = HashMap::with_capacity(count);
        for chunk in data[..needed].chunks_exact(ENTRY_LEN) {
            let entry = ObjectEntry {
                id: read_u32_le(chunk, 0),
                offset: read_u32_le(chunk, 4),
                size: read_u32_le(chunk, 8),
            };
            if by_id.contains_key(&entry.id) {
                tracing::warn!(object = entry.id, "duplicate object table entry ignored");
                continue;
            }
            by_id.insert(entry.id, entries.len());
            entries.push(entry);
        }
        Ok(Self { entries, by_id })
    }

    /// Read and parse `count` entries at `offset` in `source`.
    pub fn read(source: &dyn ByteSource, offset: u64, count: usize) -> Result<Self> {
        let needed = count
            .checked_mul(ENTRY_LEN)
            .ok_or_else(|| Error::BadHeader(format!("object count {count} overflows")))?;
        if offset.saturating_add(needed as u64) > source.len() {
            return Err(Error::BadHeader(format!(
                "object table of {needed} bytes at {offset} runs past end of file"
            )));
        }
        Self::parse(&source.read_at(offset, needed)?, count)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * ENTRY_LEN);
        for entry in &self.entries {
            out.extend_from_slice(&entry.id.to_le_bytes());
            out.extend_from_slice(&entry.offset.to_le_bytes());
            out.extend_from_slice(&entry.size.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
        }
        out
    }

    pub fn get(&self, id: u32) -> Option<&ObjectEntry> {
        self.by_id.get(&id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn entries(&self) -> &[ObjectEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shift every object at or after `from` by `delta` bytes.
    pub fn shift_from(&mut self, from: u32, delta: i64) {
        for entry in &mut self.entries {
            if entry.offset >= from {
                entry.offset = (entry.offset as i64 + delta) as u32;
            }
        }
    }
}

/// Borrow an object's bytes, checking the extent against the file.
pub fn object_bytes<'a>(file: &'a [u8], entry: &ObjectEntry) -> Result<&'a [u8]> {
    let start = entry.offset as usize;
    let end = start
        .checked_add(entry.size as usize)
        .filter(|&end| end <= file.len())
        .ok_or_else(|| {
            Error::bad_stream(
                entry.id,
                format!(
                    "extent {}+{} runs past end of file ({} bytes)",
                    entry.offset,
                    entry.size,
                    file.len()
                ),
            )
        })?;
    Ok(&file[start..end])
}

/// Fetch an object's bytes from `source`, checking the extent first.
pub fn read_object(source: &dyn ByteSource, entry: &ObjectEntry) -> Result<Vec<u8>> {
    let end = (entry.offset as u64).checked_add(entry.size as u64);
    if end.is_none_or(|end| end > source.len()) {
        return Err(Error::bad_stream(
            entry.id,
            format!(
                "extent {}+{} runs past end of file ({} bytes)",
                entry.offset,
                entry.size,
                source.len()
            ),
        ));
    }
    Ok(source.read_at(entry.offset as u64, entry.size as usize)?)
}

/// Decode the `ObjectStart` frame: `(id, type code)`.
pub fn parse_object_start(object: u32, data: &[u8]) -> Result<(u32, u16)> {
    if data.len() < 8 || u16::from_le_bytes([data[0], data[1]]) != ids::OBJECT_START {
        return Err(Error::bad_stream(object, "object does not begin with ObjectStart"));
    }
    let id = read_u32_le(data, 2);
    let type_code = u16::from_le_bytes([data[6], data[7]]);
    Ok((id, type_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32_le(&data, 0), 0x04030201);
    }

    #[test]
    fn test_table_roundtrip_and_lookup() {
        let table = ObjectTable::new(vec![
            ObjectEntry { id: 5, offset: 100, size: 20 },
            ObjectEntry { id: 2, offset: 120, size: 8 },
        ]);
        let bytes = table.to_bytes();
        assert_eq!(bytes.len(), 32);
        let parsed = ObjectTable::parse(&bytes, 2).unwrap();
        assert_eq!(parsed.entries(), table.entries());
        assert_eq!(parsed.get(2).map(|e| e.offset), Some(120));
        assert!(parsed.get(3).is_none());
    }

    #[test]
    fn test_short_table_is_bad_header() {
        assert!(matches!(
            ObjectTable::parse(&[0u8; 20], 2),
            Err(Error::BadHeader(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut bytes = ObjectTable::new(vec![ObjectEntry { id: 1, offset: 10, size: 1 }]).to_bytes();
        bytes.extend(ObjectTable::new(vec![ObjectEntry { id: 1, offset: 99, size: 1 }]).to_bytes());
        let table = ObjectTable::parse(&bytes, 2).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(1).map(|e| e.offset), Some(10));
    }

    #[test]
    fn test_object_bytes_checks_extent() {
        let file = [0u8; 10];
        let entry = ObjectEntry { id: 4, offset: 8, size: 4 };
        assert!(matches!(
            object_bytes(&file, &entry),
            Err(Error::BadStream { object: 4, .. })
        ));
    }

    #[test]
    fn test_parse_object_start() {
        let mut data = vec![0x00, 0xF5];
        data.extend_from_slice(&7u32.to_le_bytes());
        data.extend_from_slice(&0x0Au16.to_le_bytes());
        assert_eq!(parse_object_start(7, &data).unwrap(), (7, 0x0A));
        assert!(parse_object_start(7, &data[..4]).is_err());
    }

    #[test]
    fn test_shift_from() {
        let mut table = ObjectTable::new(vec![
            ObjectEntry { id: 1, offset: 50, size: 10 },
            ObjectEntry { id: 2, offset: 200, size: 10 },
        ]);
        table.shift_from(100, -20);
        assert_eq!(table.get(1).map(|e| e.offset), Some(50));
        assert_eq!(table.get(2).map(|e| e.offset), Some(180));
    }
}
