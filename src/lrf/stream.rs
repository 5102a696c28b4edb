//! Stream bodies: compression and scrambling.
//!
//! A stream object carries `StreamFlags`, `StreamSize` and the body between
//! `StreamStart` and `StreamEnd`. Flag bits:
//!
//! - `0x0100`: zlib-compressed, prefixed by the `u32` uncompressed length
//! - `0x0200`: scrambled with a key derived from the body length and the
//!   header xor key
//!
//! The low byte carries the content encoding for image and thumbnail data.
//! Decoding descrambles first, then inflates; encoding does the reverse.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Error, Result};

pub const COMPRESSED: u16 = 0x0100;
pub const SCRAMBLED: u16 = 0x0200;

/// Only this many leading bytes are scrambled in image, font and sound streams.
pub const SCRAMBLE_PREFIX_LEN: usize = 0x400;

/// Stream flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamFlags(pub u16);

impl StreamFlags {
    #[inline]
    pub fn is_compressed(self) -> bool {
        self.0 & COMPRESSED != 0
    }

    #[inline]
    pub fn is_scrambled(self) -> bool {
        self.0 & SCRAMBLED != 0
    }

    /// Encoding named by the low byte, if it is an image encoding.
    pub fn encoding(self) -> ImageEncoding {
        ImageEncoding::from_code(self.0 & 0xFF)
    }

    pub fn with(self, bits: u16) -> Self {
        Self(self.0 | bits)
    }
}

/// Encoding of image and thumbnail bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageEncoding {
    Jpeg,
    Png,
    Bmp,
    Gif,
    Unknown(u16),
}

impl ImageEncoding {
    pub fn from_code(code: u16) -> Self {
        match code {
            0x11 => ImageEncoding::Jpeg,
            0x12 => ImageEncoding::Png,
            0x13 => ImageEncoding::Bmp,
            0x14 => ImageEncoding::Gif,
            other => ImageEncoding::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            ImageEncoding::Jpeg => 0x11,
            ImageEncoding::Png => 0x12,
            ImageEncoding::Bmp => 0x13,
            ImageEncoding::Gif => 0x14,
            ImageEncoding::Unknown(other) => other,
        }
    }

    /// Guess the encoding from magic bytes.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [0xFF, 0xD8, ..] => ImageEncoding::Jpeg,
            [0x89, b'P', b'N', b'G', ..] => ImageEncoding::Png,
            [b'B', b'M', ..] => ImageEncoding::Bmp,
            [b'G', b'I', b'F', ..] => ImageEncoding::Gif,
            _ => ImageEncoding::Unknown(0),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Png => "png",
            ImageEncoding::Bmp => "bmp",
            ImageEncoding::Gif => "gif",
            ImageEncoding::Unknown(_) => "bin",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
            ImageEncoding::Bmp => "image/bmp",
            ImageEncoding::Gif => "image/gif",
            ImageEncoding::Unknown(_) => "application/octet-stream",
        }
    }
}

/// Scramble key for a body of `len` bytes.
///
/// The key is a single byte: with header keys above 241 the sum can pass
/// 255, and only its low byte is applied.
#[inline]
pub fn scramble_key(len: usize, xor_key: u16) -> u8 {
    let rem = len.checked_rem(xor_key as usize).unwrap_or(0);
    ((rem + 15) % 256) as u8
}

/// XOR the body in place. The operation is its own inverse.
pub fn scramble(data: &mut [u8], xor_key: u16, prefix_only: bool) {
    let key = scramble_key(data.len(), xor_key);
    let end = if prefix_only {
        data.len().min(SCRAMBLE_PREFIX_LEN)
    } else {
        data.len()
    };
    for byte in &mut data[..end] {
        *byte ^= key;
    }
}

/// Inflate a body with a `u32` uncompressed-length prefix.
pub fn decompress(object: u32, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 4 {
        return Err(Error::bad_stream(object, "compressed body shorter than its length prefix"));
    }
    let expected = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let mut out = Vec::with_capacity(expected);
    ZlibDecoder::new(&data[4..])
        .take(expected as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| Error::bad_stream(object, format!("inflate failed: {e}")))?;
    if out.len() != expected {
        return Err(Error::bad_stream(
            object,
            format!(
                "declared uncompressed length {expected}, inflated {} bytes",
                out.len()
            ),
        ));
    }
    Ok(out)
}

/// Deflate a body and prepend its uncompressed length.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2 + 4);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    let mut encoder = ZlibEncoder::new(out, Compression::new(6));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Turn on-disk stream bytes into content.
pub fn decode(
    object: u32,
    raw: &[u8],
    flags: StreamFlags,
    xor_key: u16,
    prefix_only: bool,
) -> Result<Vec<u8>> {
    let mut data = raw.to_vec();
    if flags.is_scrambled() {
        scramble(&mut data, xor_key, prefix_only);
    }
    if flags.is_compressed() {
        data = decompress(object, &data)?;
    }
    Ok(data)
}

/// Turn content into on-disk stream bytes.
pub fn encode(
    content: &[u8],
    flags: StreamFlags,
    xor_key: u16,
    prefix_only: bool,
) -> Result<Vec<u8>> {
    let mut data = if flags.is_compressed() {
        compress(content)?
    } else {
        content.to_vec()
    };
    if flags.is_scrambled() {
        scramble(&mut data, xor_key, prefix_only);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrambled_stream_uses_length_key() {
        let raw: Vec<u8> = (0..300u32).map(|i| (i * 7 % 251) as u8).collect();
        let decoded = decode(1, &raw, StreamFlags(SCRAMBLED), 42, false).unwrap();
        assert_eq!(decoded.len(), 300);
        let key = (300 % 42 + 15) as u8;
        assert_eq!(key, 21);
        for (i, byte) in decoded.iter().enumerate() {
            assert_eq!(*byte, raw[i] ^ key);
        }
    }

    #[test]
    fn test_prefix_only_scramble() {
        let raw = vec![0u8; 0x500];
        let decoded = decode(1, &raw, StreamFlags(SCRAMBLED), 42, true).unwrap();
        let key = scramble_key(0x500, 42);
        assert!(decoded[..0x400].iter().all(|&b| b == key));
        assert!(decoded[0x400..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_large_xor_key_wraps_to_one_byte() {
        assert_eq!(scramble_key(241, 300), 0);
        assert_eq!(scramble_key(300, 1000), 59);
        let mut data = vec![0u8; 300];
        scramble(&mut data, 1000, false);
        assert!(data.iter().all(|&b| b == 59));
    }

    #[test]
    fn test_zero_xor_key_does_not_panic() {
        let mut data = vec![1u8; 10];
        scramble(&mut data, 0, false);
        assert!(data.iter().all(|&b| b == 1 ^ 15));
    }

    #[test]
    fn test_compressed_stream_length_checked() {
        let content = vec![b'x'; 1000];
        let encoded = compress(&content).unwrap();
        let decoded = decode(7, &encoded, StreamFlags(COMPRESSED), 42, false).unwrap();
        assert_eq!(decoded.len(), 1000);

        let short = compress(&content[..999]).unwrap();
        let mut lying = short.clone();
        lying[..4].copy_from_slice(&1000u32.to_le_bytes());
        let err = decode(7, &lying, StreamFlags(COMPRESSED), 42, false).unwrap_err();
        assert!(matches!(err, Error::BadStream { object: 7, .. }));
    }

    #[test]
    fn test_compressed_and_scrambled_roundtrip() {
        let content: Vec<u8> = (0..5000u32).map(|i| (i % 13) as u8).collect();
        let flags = StreamFlags(COMPRESSED | SCRAMBLED | 0x11);
        let encoded = encode(&content, flags, 0x30, true).unwrap();
        assert_eq!(decode(3, &encoded, flags, 0x30, true).unwrap(), content);
        assert_eq!(flags.encoding(), ImageEncoding::Jpeg);
    }

    #[test]
    fn test_garbage_compressed_body_is_bad_stream() {
        let body = [10, 0, 0, 0, 1, 2, 3, 4];
        assert!(matches!(
            decompress(9, &body),
            Err(Error::BadStream { object: 9, .. })
        ));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scramble_is_an_involution(
                data in proptest::collection::vec(any::<u8>(), 0..2048),
                xor_key in any::<u16>(),
                prefix_only in any::<bool>(),
            ) {
                let mut twice = data.clone();
                scramble(&mut twice, xor_key, prefix_only);
                scramble(&mut twice, xor_key, prefix_only);
                prop_assert_eq!(twice, data);
            }
        }
    }
}
