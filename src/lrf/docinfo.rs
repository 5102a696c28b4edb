//! DocInfo: the XML metadata blob stored after the header.
//!
//! On disk the blob is UTF-16LE (with BOM), deflated, and prefixed with its
//! uncompressed length. Reads go through quick-xml; writes patch the named
//! element in place with a regex so the rest of the document is untouched.
//!
//! ```xml
//! <Info version="1.1">
//!   <BookInfo><Title reading="">…</Title><Author reading="">…</Author>…</BookInfo>
//!   <DocInfo><Language>…</Language>…</DocInfo>
//! </Info>
//! ```

use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::lrf::stream;
use crate::util::{decode_text, decode_utf16le, encode_utf16le, extract_xml_encoding};

const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-16" ?>
<Info version="1.1">
<BookInfo>
<Title reading=""></Title>
<Author reading=""></Author>
<BookID></BookID>
<Publisher></Publisher>
<Label></Label>
<Category></Category>
<Classification></Classification>
<FreeText></FreeText>
</BookInfo>
<DocInfo>
<Language></Language>
<Creator></Creator>
<CreationDate></CreationDate>
<Producer></Producer>
<SumPage>0</SumPage>
</DocInfo>
</Info>
"#;

/// Separator between authors inside the single `Author` element.
pub const AUTHOR_SEPARATOR: &str = " & ";

/// Elements exposed by the metadata facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    Title,
    Author,
    BookId,
    Publisher,
    Label,
    Category,
    Classification,
    FreeText,
    Language,
    Creator,
    CreationDate,
    Producer,
    SumPage,
}

impl InfoField {
    pub const ALL: [InfoField; 13] = [
        InfoField::Title,
        InfoField::Author,
        InfoField::BookId,
        InfoField::Publisher,
        InfoField::Label,
        InfoField::Category,
        InfoField::Classification,
        InfoField::FreeText,
        InfoField::Language,
        InfoField::Creator,
        InfoField::CreationDate,
        InfoField::Producer,
        InfoField::SumPage,
    ];

    pub fn element(self) -> &'static str {
        match self {
            InfoField::Title => "Title",
            InfoField::Author => "Author",
            InfoField::BookId => "BookID",
            InfoField::Publisher => "Publisher",
            InfoField::Label => "Label",
            InfoField::Category => "Category",
            InfoField::Classification => "Classification",
            InfoField::FreeText => "FreeText",
            InfoField::Language => "Language",
            InfoField::Creator => "Creator",
            InfoField::CreationDate => "CreationDate",
            InfoField::Producer => "Producer",
            InfoField::SumPage => "SumPage",
        }
    }

    /// Enclosing section element.
    pub fn section(self) -> &'static str {
        match self {
            InfoField::Language
            | InfoField::Creator
            | InfoField::CreationDate
            | InfoField::Producer
            | InfoField::SumPage => "DocInfo",
            _ => "BookInfo",
        }
    }

    pub fn from_element(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.element().eq_ignore_ascii_case(name))
    }
}

/// The DocInfo document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocInfo {
    xml: String,
    utf16: bool,
}

impl Default for DocInfo {
    fn default() -> Self {
        Self {
            xml: TEMPLATE.to_string(),
            utf16: true,
        }
    }
}

impl DocInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_xml(xml: impl Into<String>) -> Self {
        Self {
            xml: xml.into(),
            utf16: true,
        }
    }

    /// Decode the on-disk block (length prefix + zlib).
    pub fn decode(block: &[u8]) -> Result<Self> {
        let raw = stream::decompress(0, block).map_err(|e| Error::BadDocInfo(e.to_string()))?;
        Ok(Self::from_raw(&raw))
    }

    /// Decode uncompressed bytes.
    pub fn from_raw(raw: &[u8]) -> Self {
        // UTF-16LE without BOM still starts with "<\0".
        if raw.len() >= 2 && raw[0] == b'<' && raw[1] == 0 {
            return Self {
                xml: decode_utf16le(raw),
                utf16: true,
            };
        }
        let (text, utf16) = decode_text(raw, extract_xml_encoding(raw));
        Self {
            xml: text.into_owned(),
            utf16,
        }
    }

    /// Uncompressed bytes as they are stored.
    pub fn to_raw(&self) -> Vec<u8> {
        if self.utf16 {
            let mut out = vec![0xFF, 0xFE];
            out.extend(encode_utf16le(&self.xml));
            out
        } else {
            self.xml.as_bytes().to_vec()
        }
    }

    /// Encode the on-disk block. Fails if it does not fit the `u16` size field.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let block = stream::compress(&self.to_raw())?;
        if block.len() > u16::MAX as usize {
            return Err(Error::BadDocInfo(format!(
                "compressed DocInfo is {} bytes, limit is {}",
                block.len(),
                u16::MAX
            )));
        }
        Ok(block)
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Replace the whole document.
    pub fn set_xml(&mut self, xml: impl Into<String>) {
        self.xml = xml.into();
    }

    /// Text content of an element, or `None` when absent.
    pub fn get(&self, field: InfoField) -> Result<Option<String>> {
        Ok(self
            .read_element(field.element())?
            .map(|(text, _)| text.trim().to_string()))
    }

    /// The `reading` (sort key) attribute of an element.
    pub fn reading(&self, field: InfoField) -> Result<Option<String>> {
        Ok(self
            .read_element(field.element())?
            .and_then(|(_, reading)| reading))
    }

    fn read_element(&self, name: &str) -> Result<Option<(String, Option<String>)>> {
        let mut reader = Reader::from_str(&self.xml);
        let mut found: Option<(String, Option<String>)> = None;
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) if found.is_none() && e.name().as_ref() == name.as_bytes() => {
                    let reading = attribute(&e, "reading")?;
                    found = Some((String::new(), reading));
                    depth = 1;
                }
                Event::Empty(e) if found.is_none() && e.name().as_ref() == name.as_bytes() => {
                    let reading = attribute(&e, "reading")?;
                    return Ok(Some((String::new(), reading)));
                }
                Event::Start(_) if depth > 0 => depth += 1,
                Event::Text(t) if depth > 0 => {
                    if let Some((text, _)) = found.as_mut() {
                        text.push_str(&String::from_utf8_lossy(t.as_ref()));
                    }
                }
                Event::GeneralRef(r) if depth > 0 => {
                    if let Some((text, _)) = found.as_mut()
                        && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(r.as_ref()))
                    {
                        text.push_str(&resolved);
                    }
                }
                Event::End(_) if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(found);
                    }
                }
                Event::Eof => return Ok(found),
                _ => {}
            }
        }
    }

    fn element_regex(name: &str) -> Result<(Regex, Regex)> {
        let open = Regex::new(&format!(r"(?s)(<{name}\b[^>]*[^/]>|<{name}>)(.*?)(</{name}\s*>)"))
            .map_err(|e| Error::BadDocInfo(e.to_string()))?;
        let empty = Regex::new(&format!(r"<{name}\b([^>]*?)\s*/>"))
            .map_err(|e| Error::BadDocInfo(e.to_string()))?;
        Ok((open, empty))
    }

    /// Set an element's text, creating the element (and section) if needed.
    pub fn set(&mut self, field: InfoField, value: &str) -> Result<()> {
        let name = field.element();
        let escaped = escape(value);
        let (open, empty) = Self::element_regex(name)?;

        if open.is_match(&self.xml) {
            self.xml = open
                .replace(&self.xml, |caps: &Captures| {
                    format!("{}{}{}", &caps[1], escaped, &caps[3])
                })
                .into_owned();
            return Ok(());
        }
        if empty.is_match(&self.xml) {
            self.xml = empty
                .replace(&self.xml, |caps: &Captures| {
                    format!("<{name}{}>{escaped}</{name}>", &caps[1])
                })
                .into_owned();
            return Ok(());
        }

        let element = format!("<{name}>{escaped}</{name}>\n");
        let section_end = format!("</{}>", field.section());
        if let Some(at) = self.xml.find(&section_end) {
            self.xml.insert_str(at, &element);
            return Ok(());
        }
        let Some(at) = self.xml.rfind("</Info>") else {
            return Err(Error::BadDocInfo("no <Info> root element".to_string()));
        };
        let section = format!("<{0}>\n{element}</{0}>\n", field.section());
        self.xml.insert_str(at, &section);
        Ok(())
    }

    /// Set the `reading` attribute of an element, creating the element if needed.
    pub fn set_reading(&mut self, field: InfoField, value: &str) -> Result<()> {
        if self.get(field)?.is_none() {
            self.set(field, "")?;
        }
        let name = field.element();
        let escaped = escape(value);
        let with_attr = Regex::new(&format!(r#"(<{name}\b[^>]*?\breading=")([^"]*)(")"#))
            .map_err(|e| Error::BadDocInfo(e.to_string()))?;
        if with_attr.is_match(&self.xml) {
            self.xml = with_attr
                .replace(&self.xml, |caps: &Captures| {
                    format!("{}{}{}", &caps[1], escaped, &caps[3])
                })
                .into_owned();
            return Ok(());
        }
        let tag = Regex::new(&format!(r"<{name}\b")).map_err(|e| Error::BadDocInfo(e.to_string()))?;
        self.xml = tag
            .replace(&self.xml, |_: &Captures| format!(r#"<{name} reading="{escaped}""#))
            .into_owned();
        Ok(())
    }

    pub fn title(&self) -> Result<String> {
        Ok(self.get(InfoField::Title)?.unwrap_or_default())
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.set(InfoField::Title, title)
    }

    /// Authors, split on `&`.
    pub fn authors(&self) -> Result<Vec<String>> {
        Ok(self
            .get(InfoField::Author)?
            .map(|joined| {
                joined
                    .split('&')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn set_authors<S: AsRef<str>>(&mut self, authors: &[S]) -> Result<()> {
        let joined = authors
            .iter()
            .map(|a| a.as_ref().trim())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>()
            .join(AUTHOR_SEPARATOR);
        self.set(InfoField::Author, &joined)
    }

    pub fn uid(&self) -> Result<Option<String>> {
        self.get(InfoField::BookId)
    }

    /// All present fields in declaration order.
    pub fn fields(&self) -> Result<Vec<(InfoField, String)>> {
        let mut out = Vec::new();
        for field in InfoField::ALL {
            if let Some(value) = self.get(field)? {
                out.push((field, value));
            }
        }
        Ok(out)
    }
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let Some(attr) = e.try_get_attribute(name).map_err(quick_xml::Error::from)? else {
        return Ok(None);
    };
    let raw = String::from_utf8_lossy(&attr.value).into_owned();
    Ok(Some(match unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw,
    }))
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }
    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    code.and_then(char::from_u32).map(|c| c.to_string())
}
