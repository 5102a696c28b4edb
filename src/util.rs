//! Text and image helpers shared by the codec and the renderer.

use std::borrow::Cow;

/// Decode bytes to a string, handling the encodings found in LRF files.
///
/// This function:
/// 1. Honours a byte-order mark (DocInfo blobs are usually UTF-16LE with BOM)
/// 2. Otherwise tries UTF-8
/// 3. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 4. Falls back to Windows-1252
///
/// Returns the decoded string and whether the input was UTF-16.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> (Cow<'a, str>, bool) {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let (result, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        let utf16 = encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE;
        return (result, utf16);
    }

    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return (result, false);
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        let utf16 = encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE;
        return (result, utf16);
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    (result, false)
}

/// Decode a UTF-16LE byte run (no BOM). A trailing odd byte is ignored.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let even = bytes.len() & !1;
    let (result, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(&bytes[..even]);
    result.into_owned()
}

/// Encode a string as UTF-16LE (no BOM).
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Extract encoding from XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` to extract the encoding name.
/// Only the first 100 bytes are checked.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    if after_enc.is_empty() {
        return None;
    }

    let quote = after_enc[0];
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Extract image dimensions from raw image data.
///
/// Supports PNG, JPEG, GIF and BMP by parsing header bytes.
/// Returns `(width, height)` or `None` if the format is unrecognized.
pub fn extract_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 {
        return None;
    }

    // PNG: width/height at bytes 16-23 in IHDR chunk
    if data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47 {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((width, height));
    }

    if data[0] == 0xFF && data[1] == 0xD8 {
        return extract_jpeg_dimensions(data);
    }

    // GIF: width/height at bytes 6-9 (little-endian)
    if data[0] == 0x47 && data[1] == 0x49 && data[2] == 0x46 {
        let width = u16::from_le_bytes([data[6], data[7]]) as u32;
        let height = u16::from_le_bytes([data[8], data[9]]) as u32;
        return Some((width, height));
    }

    // BMP: BITMAPINFOHEADER width/height at 18-25, height may be negative
    if data.len() >= 26 && data[0] == b'B' && data[1] == b'M' {
        let width = i32::from_le_bytes([data[18], data[19], data[20], data[21]]);
        let height = i32::from_le_bytes([data[22], data[23], data[24], data[25]]);
        return Some((width.unsigned_abs(), height.unsigned_abs()));
    }

    None
}

/// Extract dimensions from JPEG data by parsing SOF markers.
fn extract_jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            match memchr::memchr(0xFF, &data[i..]) {
                Some(skip) => i += skip,
                None => break,
            }
            continue;
        }

        let marker = data[i + 1];

        if matches!(
            marker,
            0xC0 | 0xC1
                | 0xC2
                | 0xC3
                | 0xC5
                | 0xC6
                | 0xC7
                | 0xC9
                | 0xCA
                | 0xCB
                | 0xCD
                | 0xCE
                | 0xCF
        ) && i + 9 < data.len()
        {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height));
        }

        if i + 3 < data.len() {
            let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + length;
        } else {
            break;
        }
    }
    None
}
