//! Pagination output: pages, screens and chapters.

use std::collections::HashMap;

use crate::lrf::objects::LineStyle;
use crate::style::{Color, FrameMode, ResolvedPageStyle, StyleId, StylePool};

/// An axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Overlap with `other`, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn covers(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Background and frame of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxStyle {
    pub bg: Color,
    pub frame_width: i32,
    pub frame_color: Color,
    pub frame_mode: FrameMode,
}

/// A positioned drawable produced by layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text {
        x: i32,
        baseline: i32,
        width: i32,
        height: i32,
        text: String,
        style: StyleId,
    },
    Image {
        rect: Rect,
        /// Image object id.
        image: u32,
        stream: Option<u32>,
    },
    Rule {
        x: i32,
        y: i32,
        length: i32,
        width: i32,
        style: LineStyle,
        color: Color,
    },
    Box {
        rect: Rect,
        style: BoxStyle,
    },
}

impl Fragment {
    pub fn bounds(&self) -> Rect {
        match self {
            Fragment::Text {
                x,
                baseline,
                width,
                height,
                ..
            } => Rect::new(*x, baseline - height, *width, *height),
            Fragment::Image { rect, .. } | Fragment::Box { rect, .. } => *rect,
            Fragment::Rule {
                x, y, length, width, ..
            } => Rect::new(*x, *y, *length, *width),
        }
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        match self {
            Fragment::Text {
                x,
                baseline,
                width,
                height,
                text,
                style,
            } => Fragment::Text {
                x: x + dx,
                baseline: baseline + dy,
                width,
                height,
                text,
                style,
            },
            Fragment::Image { rect, image, stream } => Fragment::Image {
                rect: rect.translate(dx, dy),
                image,
                stream,
            },
            Fragment::Rule {
                x,
                y,
                length,
                width,
                style,
                color,
            } => Fragment::Rule {
                x: x + dx,
                y: y + dy,
                length,
                width,
                style,
                color,
            },
            Fragment::Box { rect, style } => Fragment::Box {
                rect: rect.translate(dx, dy),
                style,
            },
        }
    }

    /// Clip to `bounds`. Text is kept whole or dropped; boxes, images and
    /// rules are cut down.
    pub fn clip(self, bounds: &Rect) -> Option<Self> {
        let own = self.bounds();
        if bounds.covers(&own) {
            return Some(self);
        }
        let cut = bounds.intersect(&own)?;
        match self {
            Fragment::Text { .. } => None,
            Fragment::Image { image, stream, .. } => Some(Fragment::Image {
                rect: cut,
                image,
                stream,
            }),
            Fragment::Box { style, .. } => Some(Fragment::Box { rect: cut, style }),
            Fragment::Rule {
                style, color, ..
            } => Some(Fragment::Rule {
                x: cut.x,
                y: cut.y,
                length: cut.width,
                width: cut.height,
                style,
                color,
            }),
        }
    }
}

/// A hot region materialised on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub rect: Rect,
    pub target: u32,
}

impl Link {
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            rect: self.rect.translate(dx, dy),
            target: self.target,
        }
    }
}

/// Inner content area of one screen, in text-area coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number in the book.
    pub number: usize,
    pub chapter: usize,
    /// The source Page object.
    pub source: u32,
    pub fragments: Vec<Fragment>,
    pub link_map: Vec<Link>,
    /// Objects that start on this page.
    pub objects: Vec<u32>,
    pub used_height: i32,
}

impl Page {
    pub(crate) fn new(number: usize, chapter: usize, source: u32) -> Self {
        Self {
            number,
            chapter,
            source,
            fragments: Vec::new(),
            link_map: Vec::new(),
            objects: Vec::new(),
            used_height: 0,
        }
    }

    pub fn is_odd(&self) -> bool {
        self.number % 2 == 1
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Text of the page, one laid-out line per output line.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut last_baseline = None;
        for fragment in &self.fragments {
            if let Fragment::Text { baseline, text, .. } = fragment {
                match last_baseline {
                    Some(b) if b == *baseline => out.push(' '),
                    Some(_) => out.push('\n'),
                    None => {}
                }
                out.push_str(text);
                last_baseline = Some(*baseline);
            }
        }
        out
    }
}

/// A physical page: size, text-area placement and header/footer chrome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    pub width: i32,
    pub height: i32,
    pub text_area: Rect,
    /// Header and footer content in screen coordinates.
    pub chrome: Vec<Fragment>,
    pub links: Vec<Link>,
}

/// Consecutive pages sharing one PageAttr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub index: usize,
    pub page_attr: Option<u32>,
    pub style: ResolvedPageStyle,
    pub odd: Screen,
    pub even: Screen,
    /// 1-based number of the chapter's first page.
    pub first_page: usize,
    pub page_count: usize,
    /// Object id → 1-based page number where it starts.
    pub object_pages: HashMap<u32, usize>,
}

impl Chapter {
    pub fn screen(&self, odd: bool) -> &Screen {
        if odd { &self.odd } else { &self.even }
    }

    pub fn pages(&self) -> std::ops::Range<usize> {
        self.first_page..self.first_page + self.page_count
    }

    pub fn contains_page(&self, number: usize) -> bool {
        self.pages().contains(&number)
    }
}

/// The paginated book.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub chapters: Vec<Chapter>,
    pub pages: Vec<Page>,
    pub styles: StylePool,
}

impl Pagination {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Page by 1-based number.
    pub fn page(&self, number: usize) -> Option<&Page> {
        number.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    pub fn chapter_of(&self, number: usize) -> Option<&Chapter> {
        self.page(number).and_then(|p| self.chapters.get(p.chapter))
    }

    /// Screen template for a page.
    pub fn screen_for(&self, number: usize) -> Option<&Screen> {
        let page = self.page(number)?;
        Some(self.chapters.get(page.chapter)?.screen(page.is_odd()))
    }

    /// `(chapter index, page number)` where `object` starts.
    pub fn locate(&self, object: u32) -> Option<(usize, usize)> {
        self.chapters
            .iter()
            .find_map(|c| c.object_pages.get(&object).map(|&page| (c.index, page)))
    }

    pub fn links_on(&self, number: usize) -> &[Link] {
        self.page(number).map(|p| p.link_map.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(20, 20, 1, 1)), None);
        assert!(a.covers(&Rect::new(1, 1, 2, 2)));
        assert!(a.contains(9, 9) && !a.contains(10, 0));
    }

    #[test]
    fn test_clip_fragments() {
        let bounds = Rect::new(0, 0, 100, 50);
        let image = Fragment::Image {
            rect: Rect::new(80, 10, 40, 20),
            image: 1,
            stream: None,
        };
        assert_eq!(
            image.clip(&bounds).map(|f| f.bounds()),
            Some(Rect::new(80, 10, 20, 20))
        );
        let text = Fragment::Text {
            x: 90,
            baseline: 20,
            width: 30,
            height: 10,
            text: "x".into(),
            style: StyleId::DEFAULT,
        };
        assert_eq!(text.clip(&bounds), None);
    }
}
