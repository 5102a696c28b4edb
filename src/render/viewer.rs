//! Navigation over a paginated book.

use std::collections::VecDeque;

use crate::layout::{Link, Pagination, Screen};
use crate::lrf::objects::ButtonAction;

use super::display::DisplayList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Pages remembered for `back`.
    pub history_capacity: usize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self { history_capacity: 64 }
    }
}

/// A passive page viewer driven by the host's event loop.
///
/// Page numbers are 1-based. Requests for pages outside the book change
/// nothing and return `false`.
#[derive(Debug, Clone)]
pub struct Viewer<'p> {
    pagination: &'p Pagination,
    options: ViewerOptions,
    current: usize,
    back: VecDeque<usize>,
    forward: Vec<usize>,
}

impl<'p> Viewer<'p> {
    pub fn new(pagination: &'p Pagination) -> Self {
        Self::with_options(pagination, ViewerOptions::default())
    }

    pub fn with_options(pagination: &'p Pagination, options: ViewerOptions) -> Self {
        Self {
            pagination,
            options,
            current: if pagination.total_pages() > 0 { 1 } else { 0 },
            back: VecDeque::new(),
            forward: Vec::new(),
        }
    }

    /// The current page, or 0 for a book without pages.
    pub fn current_page(&self) -> usize {
        self.current
    }

    pub fn total_pages(&self) -> usize {
        self.pagination.total_pages()
    }

    pub fn current_chapter(&self) -> Option<usize> {
        self.pagination.page(self.current).map(|p| p.chapter)
    }

    pub fn show_page(&mut self, number: usize) -> bool {
        if number == 0 || number > self.total_pages() {
            return false;
        }
        self.current = number;
        true
    }

    pub fn next(&mut self) -> bool {
        self.show_page(self.current + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.current > 1 && self.show_page(self.current - 1)
    }

    /// First page of the following chapter.
    pub fn next_chapter(&mut self) -> bool {
        let Some(index) = self.current_chapter() else {
            return false;
        };
        match self.pagination.chapters.get(index + 1) {
            Some(chapter) => self.show_page(chapter.first_page),
            None => false,
        }
    }

    /// First page of the preceding chapter.
    pub fn previous_chapter(&mut self) -> bool {
        let Some(index) = self.current_chapter() else {
            return false;
        };
        match index.checked_sub(1).and_then(|i| self.pagination.chapters.get(i)) {
            Some(chapter) => self.show_page(chapter.first_page),
            None => false,
        }
    }

    /// Jump to the page `percent` of the way through the book.
    pub fn percent(&mut self, percent: f64) -> bool {
        let total = self.total_pages();
        if total == 0 || !percent.is_finite() {
            return false;
        }
        let page = (percent.clamp(0.0, 100.0) / 100.0 * total as f64).ceil() as usize;
        self.show_page(page.clamp(1, total))
    }

    /// Position of the current page as a percentage.
    pub fn progress(&self) -> f64 {
        match self.total_pages() {
            0 => 0.0,
            total => self.current as f64 * 100.0 / total as f64,
        }
    }

    /// Jump to the page where object `target` starts, remembering the
    /// current page for [`Viewer::back`].
    pub fn follow_link(&mut self, target: u32) -> bool {
        let Some((_, page)) = self.pagination.locate(target) else {
            tracing::debug!(target, "link target not on any page");
            return false;
        };
        if self.current != 0 {
            if self.back.len() == self.options.history_capacity {
                self.back.pop_front();
            }
            if self.options.history_capacity > 0 {
                self.back.push_back(self.current);
            }
        }
        self.forward.clear();
        self.show_page(page)
    }

    pub fn back(&mut self) -> bool {
        let Some(page) = self.back.pop_back() else {
            return false;
        };
        self.forward.push(self.current);
        self.show_page(page)
    }

    pub fn forward(&mut self) -> bool {
        let Some(page) = self.forward.pop() else {
            return false;
        };
        self.back.push_back(self.current);
        self.show_page(page)
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Links on the current page, in text-area coordinates.
    pub fn links(&self) -> &[Link] {
        self.pagination.links_on(self.current)
    }

    /// The chrome shared by every page of the current chapter.
    pub fn screen(&self) -> Option<&'p Screen> {
        self.pagination.screen_for(self.current)
    }

    /// Draw the current page. Does not change viewer state.
    pub fn render(&self) -> Option<DisplayList> {
        DisplayList::compose(self.pagination, self.current)
    }

    /// Follow the link under a screen point, if any.
    pub fn click(&mut self, x: i32, y: i32) -> bool {
        let target = self.render().and_then(|list| list.link_at(x, y).map(|l| l.target));
        target.is_some_and(|t| self.follow_link(t))
    }

    /// Run button actions until one navigates.
    pub fn activate(&mut self, actions: &[ButtonAction]) -> bool {
        actions.iter().any(|action| match action {
            ButtonAction::JumpTo { page, object } => {
                let target = if *object != 0 { *object } else { *page };
                self.follow_link(target)
            }
            other => {
                tracing::debug!(action = ?other, "button action not handled by the viewer");
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::layout::{Chapter, Page, Rect};
    use crate::style::{ResolvedPageStyle, StylePool};

    fn chapter(index: usize, first_page: usize, page_count: usize, objects: &[(u32, usize)]) -> Chapter {
        Chapter {
            index,
            page_attr: None,
            style: ResolvedPageStyle::default(),
            odd: Screen::default(),
            even: Screen::default(),
            first_page,
            page_count,
            object_pages: objects.iter().copied().collect::<HashMap<_, _>>(),
        }
    }

    fn pagination() -> Pagination {
        let mut first = Page {
            number: 1,
            chapter: 0,
            source: 100,
            fragments: Vec::new(),
            link_map: Vec::new(),
            objects: vec![100],
            used_height: 0,
        };
        first.link_map.push(Link {
            rect: Rect::new(0, 0, 10, 10),
            target: 300,
        });
        let pages = (2..=4)
            .map(|n| Page {
                number: n,
                chapter: if n < 3 { 0 } else { 1 },
                source: 100 + n as u32,
                ..first.clone()
            })
            .collect::<Vec<_>>();
        Pagination {
            chapters: vec![chapter(0, 1, 2, &[(100, 1)]), chapter(1, 3, 2, &[(300, 4)])],
            pages: std::iter::once(first).chain(pages).collect(),
            styles: StylePool::new(),
        }
    }

    #[test]
    fn test_linear_navigation() {
        let p = pagination();
        let mut viewer = Viewer::new(&p);
        assert_eq!(viewer.current_page(), 1);
        assert!(!viewer.previous());
        assert!(viewer.next() && viewer.next() && viewer.next());
        assert!(!viewer.next());
        assert_eq!(viewer.current_page(), 4);
        assert!(!viewer.show_page(5));
        assert_eq!(viewer.current_page(), 4);
    }

    #[test]
    fn test_chapter_navigation() {
        let p = pagination();
        let mut viewer = Viewer::new(&p);
        assert!(viewer.next_chapter());
        assert_eq!(viewer.current_page(), 3);
        assert!(!viewer.next_chapter());
        assert!(viewer.previous_chapter());
        assert_eq!(viewer.current_page(), 1);
    }

    #[test]
    fn test_percent() {
        let p = pagination();
        let mut viewer = Viewer::new(&p);
        assert!(viewer.percent(50.0));
        assert_eq!(viewer.current_page(), 2);
        assert!(viewer.percent(0.0));
        assert_eq!(viewer.current_page(), 1);
        assert!(viewer.percent(100.0));
        assert_eq!(viewer.current_page(), 4);
    }

    #[test]
    fn test_follow_back_forward() {
        let p = pagination();
        let mut viewer = Viewer::new(&p);
        assert!(viewer.follow_link(300));
        assert_eq!(viewer.current_page(), 4);
        assert!(viewer.back());
        assert_eq!(viewer.current_page(), 1);
        assert!(!viewer.back());
        assert!(viewer.forward());
        assert_eq!(viewer.current_page(), 4);
        assert!(!viewer.forward());
        assert!(!viewer.follow_link(999));
    }

    #[test]
    fn test_history_capacity() {
        let p = pagination();
        let mut viewer = Viewer::with_options(&p, ViewerOptions { history_capacity: 1 });
        viewer.show_page(2);
        viewer.follow_link(100);
        viewer.follow_link(300);
        assert!(viewer.back());
        assert_eq!(viewer.current_page(), 1);
        assert!(!viewer.back());
    }

    #[test]
    fn test_empty_book() {
        let p = Pagination {
            chapters: Vec::new(),
            pages: Vec::new(),
            styles: StylePool::new(),
        };
        let mut viewer = Viewer::new(&p);
        assert_eq!(viewer.current_page(), 0);
        assert!(!viewer.show_page(1));
        assert!(!viewer.next());
        assert!(!viewer.previous());
        assert!(!viewer.percent(50.0));
        assert!(viewer.render().is_none());
    }

    #[test]
    fn test_activate_jump() {
        let p = pagination();
        let mut viewer = Viewer::new(&p);
        let actions = [ButtonAction::SoundStop, ButtonAction::JumpTo { page: 0, object: 300 }];
        assert!(viewer.activate(&actions));
        assert_eq!(viewer.current_page(), 4);
    }
}
