//! Display lists: what a screen looks like, independent of any backend.

use crate::layout::{Fragment, Link, Pagination, Rect};
use crate::lrf::objects::LineStyle;
use crate::style::{Color, FrameMode};

use super::fonts::FontKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    Frame {
        rect: Rect,
        width: i32,
        color: Color,
        mode: FrameMode,
    },
    Text {
        x: i32,
        baseline: i32,
        text: String,
        font: FontKey,
        color: Color,
        background: Color,
    },
    Image {
        rect: Rect,
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
}

/// Everything drawn on one screen, in screen coordinates and paint order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayList {
    pub page: usize,
    pub width: i32,
    pub height: i32,
    pub commands: Vec<DrawCommand>,
    pub links: Vec<Link>,
}

impl DisplayList {
    /// Compose the screen for page `number`: the chapter's chrome with the
    /// page's content placed in the text area.
    pub fn compose(pagination: &Pagination, number: usize) -> Option<Self> {
        let page = pagination.page(number)?;
        let screen = pagination.screen_for(number)?;
        let mut list = DisplayList {
            page: number,
            width: screen.width,
            height: screen.height,
            commands: Vec::with_capacity(screen.chrome.len() + page.fragments.len()),
            links: screen.links.clone(),
        };
        for fragment in &screen.chrome {
            list.push(pagination, fragment);
        }
        let area = screen.text_area;
        for fragment in &page.fragments {
            list.push(pagination, &fragment.clone().translate(area.x, area.y));
        }
        list.links
            .extend(page.link_map.iter().map(|l| l.translate(area.x, area.y)));
        Some(list)
    }

    fn push(&mut self, pagination: &Pagination, fragment: &Fragment) {
        match fragment {
            Fragment::Text {
                x,
                baseline,
                text,
                style,
                ..
            } => {
                let Some(resolved) = pagination.styles.get(*style) else {
                    return;
                };
                self.commands.push(DrawCommand::Text {
                    x: *x,
                    baseline: *baseline,
                    text: text.clone(),
                    font: FontKey::for_style(resolved),
                    color: resolved.text_color,
                    background: resolved.text_bg_color,
                });
            }
            Fragment::Image { rect, image, stream } => self.commands.push(DrawCommand::Image {
                rect: *rect,
                image: *image,
                stream: *stream,
            }),
            Fragment::Rule {
                x,
                y,
                length,
                width,
                style,
                color,
            } => self.commands.push(DrawCommand::Rule {
                x: *x,
                y: *y,
                length: *length,
                width: *width,
                style: *style,
                color: *color,
            }),
            Fragment::Box { rect, style } => {
                if !style.bg.is_transparent() {
                    self.commands.push(DrawCommand::FillRect {
                        rect: *rect,
                        color: style.bg,
                    });
                }
                if style.frame_width > 0 && style.frame_mode != FrameMode::None {
                    self.commands.push(DrawCommand::Frame {
                        rect: *rect,
                        width: style.frame_width,
                        color: style.frame_color,
                        mode: style.frame_mode,
                    });
                }
            }
        }
    }

    /// The link under a screen point.
    pub fn link_at(&self, x: i32, y: i32) -> Option<&Link> {
        self.links.iter().find(|l| l.rect.contains(x, y))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}
