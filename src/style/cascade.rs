//! Style cascade.
//!
//! Attribute sets are laid over each other weakest first:
//!
//! ```text
//! BookAttr defaults → PageAttr → BlockAttr → TextAttr → inline Span
//! ```
//!
//! The last writer of a tag wins. The merged set is then resolved into an
//! immutable style value; inline changes produce copies.

use std::collections::HashMap;

use crate::lrf::objects::{Attrs, Object, ObjectBody};

use super::resolved::{ResolvedBlockStyle, ResolvedPageStyle, ResolvedTextStyle, Scale};

/// Read-only access to the attributes of objects by id.
pub trait AttrSource {
    fn attrs_of(&self, id: u32) -> Option<&Attrs>;
}

impl AttrSource for HashMap<u32, Attrs> {
    fn attrs_of(&self, id: u32) -> Option<&Attrs> {
        self.get(&id)
    }
}

/// Book-wide defaults and the scale every text style is resolved at.
#[derive(Debug, Clone, Default)]
pub struct StyleContext {
    scale: Scale,
    text: Attrs,
    block: Attrs,
    page: Attrs,
}

impl StyleContext {
    pub fn new(scale: Scale) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Seed defaults from the BookAttr object.
    ///
    /// The referenced default TextAttr, BlockAttr and PageAttr come first;
    /// text attributes set directly on the BookAttr override them.
    pub fn from_book(book_attr: &Object, source: &dyn AttrSource, scale: Scale) -> Self {
        let mut ctx = Self::new(scale);
        if let ObjectBody::BookAttr(refs) = &book_attr.body {
            let lookup = |id: Option<u32>| id.and_then(|id| source.attrs_of(id)).cloned();
            ctx.text = lookup(refs.text_attr).unwrap_or_default();
            ctx.block = lookup(refs.block_attr).unwrap_or_default();
            ctx.page = lookup(refs.page_attr).unwrap_or_default();
        }
        ctx.text.merge(&book_attr.attrs);
        ctx
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Merge `layers` (weakest first) over the book defaults.
    pub fn cascade(base: &Attrs, layers: &[&Attrs]) -> Attrs {
        let mut merged = base.clone();
        for layer in layers {
            merged.merge(layer);
        }
        merged
    }

    pub fn text_style(&self, layers: &[&Attrs]) -> ResolvedTextStyle {
        ResolvedTextStyle::from_attrs(&Self::cascade(&self.text, layers), self.scale)
    }

    pub fn block_style(&self, layers: &[&Attrs]) -> ResolvedBlockStyle {
        ResolvedBlockStyle::from_attrs(&Self::cascade(&self.block, layers))
    }

    pub fn page_style(&self, layers: &[&Attrs]) -> ResolvedPageStyle {
        ResolvedPageStyle::from_attrs(&Self::cascade(&self.page, layers))
    }
}
