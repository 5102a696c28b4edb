//! Table of contents and object → page lookup.

use std::collections::HashMap;

use crate::book::Book;
use crate::layout::Pagination;
use crate::lrf::objects::{ObjectBody, ObjectKind};

/// One table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Empty for entries derived from the page tree.
    pub label: String,
    /// Source Page object.
    pub page: u32,
    /// Object the entry points at, or 0 for the page itself.
    pub object: u32,
}

impl TocEntry {
    /// The object to navigate to.
    pub fn target(&self) -> u32 {
        if self.object != 0 { self.object } else { self.page }
    }
}

/// Entries of the book's TOC object, or one unlabeled entry per page when
/// the book has none.
pub fn build_toc(book: &Book) -> Vec<TocEntry> {
    let toc = book
        .objects()
        .iter()
        .find(|o| o.id == book.header().toc_object_id && o.kind == ObjectKind::Toc)
        .or_else(|| book.objects().iter().find(|o| o.kind == ObjectKind::Toc));

    if let Some(toc) = toc
        && let ObjectBody::Toc(records) = &toc.body
    {
        tracing::debug!(object = toc.id, entries = records.len(), "toc from TOC object");
        return records
            .iter()
            .map(|r| TocEntry {
                label: r.label.clone(),
                page: r.page,
                object: r.object,
            })
            .collect();
    }

    book.page_ids()
        .into_iter()
        .map(|page| TocEntry {
            label: String::new(),
            page,
            object: 0,
        })
        .collect()
}

/// Where each laid-out object starts, flattened across chapters.
#[derive(Debug, Clone, Default)]
pub struct PageMap {
    pages: HashMap<u32, usize>,
}

impl PageMap {
    pub fn from_pagination(pagination: &Pagination) -> Self {
        let mut pages = HashMap::new();
        for chapter in &pagination.chapters {
            for (&object, &page) in &chapter.object_pages {
                pages.entry(object).or_insert(page);
            }
        }
        Self { pages }
    }

    /// 1-based page number where `object` starts.
    pub fn page_number_of(&self, object: u32) -> Option<usize> {
        self.pages.get(&object).copied()
    }

    /// Page number for a TOC entry, falling back to its page when the
    /// object was not laid out.
    pub fn resolve(&self, entry: &TocEntry) -> Option<usize> {
        self.page_number_of(entry.object)
            .or_else(|| self.page_number_of(entry.page))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Chapter, Screen};
    use crate::style::{ResolvedPageStyle, StylePool};

    #[test]
    fn test_page_map_resolves_entries() {
        let chapter = Chapter {
            index: 0,
            page_attr: None,
            style: ResolvedPageStyle::default(),
            odd: Screen::default(),
            even: Screen::default(),
            first_page: 1,
            page_count: 3,
            object_pages: [(10, 1), (20, 3)].into_iter().collect(),
        };
        let map = PageMap::from_pagination(&Pagination {
            chapters: vec![chapter],
            pages: Vec::new(),
            styles: StylePool::new(),
        });
        assert_eq!(map.page_number_of(20), Some(3));
        assert_eq!(map.page_number_of(30), None);
        let entry = TocEntry {
            label: "One".into(),
            page: 10,
            object: 99,
        };
        assert_eq!(map.resolve(&entry), Some(1));
        assert_eq!(entry.target(), 99);
    }
}
