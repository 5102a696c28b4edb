//! The pagination driver.
//!
//! Source pages are walked in page-tree order. Each one starts a fresh
//! screen; its blocks are stacked down the text area and spill onto further
//! screens when they run out of room. Text blocks of adjustable height break
//! between lines, everything else moves as a unit.

use crate::book::Book;
use crate::error::{Error, Result};
use crate::lrf::objects::{Attrs, ObjectBody, PageItem, RuledLine};
use crate::render::ImageDecoder;
use crate::style::{BgImageMode, ResolvedPageStyle, ResolvedTextStyle, StyleContext, StylePool};

use super::LayoutConfig;
use super::block::{BlockBody, BlockLayout, Placed};
use super::line::Line;
use super::measure::TextMeasurer;
use super::page::{BoxStyle, Chapter, Fragment, Link, Page, Pagination, Rect, Screen};

pub(super) struct Paginator<'b> {
    pub(super) book: &'b Book,
    pub(super) config: &'b LayoutConfig,
    pub(super) measurer: &'b dyn TextMeasurer,
    pub(super) images: &'b dyn ImageDecoder,
    pub(super) styles: StyleContext,
    pub(super) pool: StylePool,
    /// The next placement starts a new page.
    break_pending: bool,
    chapters: Vec<Chapter>,
    pages: Vec<Page>,
    source: u32,
    y: i32,
    placed_on_page: bool,
    page_height: i32,
    text_width: i32,
}

impl<'b> Paginator<'b> {
    pub(super) fn new(
        book: &'b Book,
        config: &'b LayoutConfig,
        measurer: &'b dyn TextMeasurer,
        images: &'b dyn ImageDecoder,
    ) -> Self {
        let defaults = ResolvedPageStyle::default();
        let scale = config.scale();
        Self {
            book,
            config,
            measurer,
            images,
            styles: book.style_context(scale),
            pool: StylePool::with_default(ResolvedTextStyle::base(scale)),
            break_pending: false,
            chapters: Vec::new(),
            pages: Vec::new(),
            source: 0,
            y: 0,
            placed_on_page: false,
            page_height: defaults.text_height,
            text_width: defaults.text_width,
        }
    }

    pub(super) fn check_cancelled(&self) -> Result<()> {
        if self.book.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    pub(super) fn recover(&self, object: u32, err: Error) -> Result<()> {
        self.book.load_context().recover(object, err)
    }

    pub(super) fn run(mut self) -> Result<Pagination> {
        for page_id in self.book.page_ids() {
            self.check_cancelled()?;
            let Some(page) = self.book.object(page_id) else {
                tracing::warn!(object = page_id, "page tree lists a missing page");
                continue;
            };
            let ObjectBody::Page { attr, contents } = &page.body else {
                tracing::warn!(object = page_id, kind = page.kind.name(), "page tree entry is not a page");
                continue;
            };
            let layers: Vec<&Attrs> = self.attrs_of(*attr).into_iter().chain([&page.attrs]).collect();
            self.begin_source_page(page_id, *attr, &layers)?;

            for item in contents {
                self.check_cancelled()?;
                match item {
                    PageItem::Object(id) => {
                        let Some(object) = self.book.object(*id) else {
                            self.recover(page_id, Error::DanglingReference { from: page_id, to: *id })?;
                            continue;
                        };
                        if let Some(layout) = self.layout_object(object, &layers, self.text_width)? {
                            self.place(layout);
                        }
                    }
                    PageItem::RuledLine(rule) => self.place_rule(rule),
                    PageItem::Wait(_) => {}
                }
            }
        }
        self.sync_used_height();
        tracing::debug!(
            pages = self.pages.len(),
            chapters = self.chapters.len(),
            styles = self.pool.len(),
            "pagination finished"
        );
        Ok(Pagination {
            chapters: self.chapters,
            pages: self.pages,
            styles: self.pool,
        })
    }

    fn begin_source_page(&mut self, page_id: u32, attr: Option<u32>, layers: &[&Attrs]) -> Result<()> {
        let same_chapter = self.chapters.last().is_some_and(|c| c.page_attr == attr);
        if !same_chapter {
            let style = self.styles.page_style(layers);
            let odd = self.screen(&style, true, layers)?;
            let even = self.screen(&style, false, layers)?;
            self.page_height = style.text_height;
            self.text_width = style.text_width;
            self.chapters.push(Chapter {
                index: self.chapters.len(),
                page_attr: attr,
                style,
                odd,
                even,
                first_page: self.pages.len() + 1,
                page_count: 0,
                object_pages: Default::default(),
            });
        }
        self.source = page_id;
        self.new_page();
        self.record(page_id);
        Ok(())
    }

    /// Screen template with header and footer chrome.
    fn screen(&mut self, style: &ResolvedPageStyle, odd: bool, layers: &[&Attrs]) -> Result<Screen> {
        let header = self.book.header();
        let (width, height) = self
            .config
            .screen
            .map(|(w, h)| (w as i32, h as i32))
            .unwrap_or((header.width as i32, header.height as i32));
        let side = style.side_margin(odd);
        let mut screen = Screen {
            width,
            height,
            text_area: Rect::new(side, style.text_top(), style.text_width, style.text_height),
            ..Screen::default()
        };

        if let Some(bg) = &style.bg_image
            && bg.mode != BgImageMode::None
            && let Some(image) = self.book.object(bg.image)
        {
            let (w, h, stream) = self.image_size(image);
            let rect = match bg.mode {
                BgImageMode::Centering => Rect::new((width - w) / 2, (height - h) / 2, w, h),
                _ => Rect::new(0, 0, width, height),
            };
            screen.chrome.push(Fragment::Image {
                rect,
                image: image.id,
                stream,
            });
        }

        let (head, foot) = if odd {
            (style.odd_header, style.odd_footer)
        } else {
            (style.even_header, style.even_footer)
        };
        let areas = [
            (head, Rect::new(side, style.top_margin, style.text_width, style.head_height)),
            (foot, Rect::new(side, style.footer_top(), style.text_width, style.foot_height)),
        ];
        for (id, area) in areas {
            let Some(object) = id.and_then(|id| self.book.object(id)) else {
                continue;
            };
            let placed = self.layout_canvas(object, layers)?;
            let bounds = Rect::new(0, 0, area.width, area.height);
            let mut clipped = false;
            for fragment in placed.fragments {
                let before = fragment.bounds();
                let kept = fragment.clip(&bounds);
                if kept.as_ref().map(Fragment::bounds) != Some(before) {
                    clipped = true;
                }
                screen.chrome.extend(kept.map(|f| f.translate(area.x, area.y)));
            }
            if clipped {
                tracing::warn!(object = object.id, odd, "header or footer clipped to its area");
            }
            screen.links.extend(placed.links.into_iter().map(|l| l.translate(area.x, area.y)));
        }
        Ok(screen)
    }

    fn new_page(&mut self) {
        self.sync_used_height();
        let chapter = self.chapters.len().saturating_sub(1);
        self.pages.push(Page::new(self.pages.len() + 1, chapter, self.source));
        if let Some(c) = self.chapters.last_mut() {
            c.page_count += 1;
        }
        self.y = 0;
        self.placed_on_page = false;
        self.break_pending = false;
    }

    fn sync_used_height(&mut self) {
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.used_height = y;
        }
    }

    fn page_mut(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.new_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Note that `object` starts on the current page.
    fn record(&mut self, object: u32) {
        let number = self.page_mut().number;
        let page = self.page_mut();
        if !page.objects.contains(&object) {
            page.objects.push(object);
        }
        if let Some(c) = self.chapters.last_mut() {
            c.object_pages.entry(object).or_insert(number);
        }
    }

    fn place(&mut self, layout: BlockLayout) {
        if self.break_pending {
            self.new_page();
        }
        let needed = match &layout.body {
            BlockBody::Flow { lines, top, .. } => lines.first().map_or(0, |l| top + l.height),
            BlockBody::Atomic(placed) => placed.height,
        };
        let remaining = self.page_height - self.y;
        let tolerated = remaining >= self.page_height - self.config.image_tolerance;
        if needed > remaining && self.placed_on_page && !tolerated {
            self.new_page();
        }
        for &id in &layout.objects {
            self.record(id);
        }
        match layout.body {
            BlockBody::Flow {
                lines,
                content_x,
                top,
                bottom,
                width,
                box_style,
            } => self.place_flow(&lines, content_x, top, bottom, width, box_style),
            BlockBody::Atomic(placed) => self.place_atomic(placed),
        }
    }

    fn place_flow(
        &mut self,
        lines: &[Line],
        content_x: i32,
        top: i32,
        bottom: i32,
        width: i32,
        box_style: Option<BoxStyle>,
    ) {
        let mut segment = (self.page_mut().fragments.len(), self.y);
        self.y += top;
        for line in lines {
            if self.y + line.height > self.page_height && self.placed_on_page {
                self.close_box(box_style, segment, width);
                self.new_page();
                segment = (0, 0);
            }
            let mut fragments = Vec::new();
            let mut links = Vec::new();
            self.line_fragments(line, content_x, self.y, &mut fragments, &mut links);
            let page = self.page_mut();
            page.fragments.extend(fragments);
            page.link_map.extend(links);
            self.y += line.advance();
            self.placed_on_page = true;
        }
        self.y += bottom;
        self.close_box(box_style, segment, width);
    }

    /// Put the box behind the lines placed since `segment` began.
    fn close_box(&mut self, style: Option<BoxStyle>, segment: (usize, i32), width: i32) {
        let Some(style) = style else {
            return;
        };
        let (index, top) = segment;
        let bottom = self.y.min(self.page_height.max(top));
        let page = self.page_mut();
        let index = index.min(page.fragments.len());
        page.fragments.insert(
            index,
            Fragment::Box {
                rect: Rect::new(0, top, width, bottom - top),
                style,
            },
        );
    }

    /// Place a unit that has already been moved to a page with room, or to
    /// the top of one.
    fn place_atomic(&mut self, placed: Placed) {
        let y = self.y;
        let page = self.page_mut();
        page.fragments
            .extend(placed.fragments.into_iter().map(|f| f.translate(0, y)));
        page.link_map
            .extend(placed.links.into_iter().map(|l: Link| l.translate(0, y)));
        self.y += placed.height;
        self.placed_on_page = true;
        self.break_pending = placed.break_after;
        if self.y > self.page_height {
            tracing::debug!(page = self.pages.len(), "oversized block clipped by the page");
            self.y = self.page_height;
        }
    }

    fn place_rule(&mut self, rule: &RuledLine) {
        if self.break_pending {
            self.new_page();
        }
        let y = self.y;
        self.page_mut().fragments.push(Fragment::Rule {
            x: 0,
            y,
            length: rule.length as i32,
            width: rule.width as i32,
            style: rule.style,
            color: rule.color,
        });
        self.y += rule.width as i32;
        self.placed_on_page = true;
        self.y = self.y.min(self.page_height);
    }
}
