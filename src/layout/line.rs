//! Laid-out lines.

use crate::lrf::objects::Plot;
use crate::style::{Align, StyleId};

/// Outcome of offering a token to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFitResult {
    /// The whole token fits.
    Fit,
    /// Put the first `n` bytes plus a hyphen on this line.
    Hyphenate(usize),
    /// Nothing fits; close the line and retry on the next.
    Overflow,
    /// Unbreakable token on an empty line: split at this byte offset.
    ForceBreak(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContent {
    Text(String),
    Plot(Plot),
}

/// A horizontally positioned piece of a line in one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Offset from the line's start.
    pub x: i32,
    pub width: i32,
    pub style: StyleId,
    /// Preceded by a word space (for text extraction).
    pub space_before: bool,
    pub content: RunContent,
}

/// A hot region on a line, in line coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotRegion {
    pub x0: i32,
    pub x1: i32,
    pub target: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineKind {
    #[default]
    Text,
    /// Vertical space standing in for an empty paragraph.
    ParSkip,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub kind: LineKind,
    /// Start of the line after indent and alignment.
    pub offset: i32,
    pub width: i32,
    pub height: i32,
    /// Baseline distance from the top of the line.
    pub ascent: i32,
    /// Extra space below the line (paragraph skip).
    pub space_after: i32,
    pub align: Align,
    pub hyphenated: bool,
    pub runs: Vec<Run>,
    pub links: Vec<HotRegion>,
}

impl Line {
    pub fn par_skip(height: i32) -> Self {
        Self {
            kind: LineKind::ParSkip,
            height,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Vertical advance to the next line.
    pub fn advance(&self) -> i32 {
        self.height + self.space_after
    }

    /// The line's text, words separated by single spaces.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            if let RunContent::Text(text) = &run.content {
                if run.space_before && !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(text);
            }
        }
        out
    }
}

/// A line under construction.
#[derive(Debug, Clone, Default)]
pub(crate) struct LineBuf {
    pub indent: i32,
    pub avail: i32,
    pub width: i32,
    pub height: i32,
    pub ascent: i32,
    pub hyphenated: bool,
    pub runs: Vec<Run>,
    pub links: Vec<HotRegion>,
}

impl LineBuf {
    pub fn new(indent: i32, avail: i32) -> Self {
        Self {
            indent,
            avail,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Width left after a gap of `gap`.
    pub fn room(&self, gap: i32) -> i32 {
        self.avail - self.width - gap
    }

    /// Classify a token of `width` preceded by `gap`; breaking decisions are
    /// made by the caller when this returns `Overflow`.
    pub fn fit(&self, width: i32, gap: i32) -> LineFitResult {
        if width <= self.room(gap) {
            LineFitResult::Fit
        } else {
            LineFitResult::Overflow
        }
    }

    pub fn push_text(&mut self, text: &str, width: i32, gap: i32, style: StyleId, line_height: i32, ascent: i32) {
        let space_before = gap > 0;
        match self.runs.last_mut() {
            Some(Run {
                style: last_style,
                content: RunContent::Text(last),
                width: last_width,
                ..
            }) if *last_style == style => {
                if space_before {
                    last.push(' ');
                }
                last.push_str(text);
                *last_width += gap + width;
            }
            _ => self.runs.push(Run {
                x: self.width + gap,
                width,
                style,
                space_before,
                content: RunContent::Text(text.to_string()),
            }),
        }
        self.width += gap + width;
        self.grow(line_height, ascent);
    }

    pub fn push_plot(&mut self, plot: Plot, gap: i32, style: StyleId) {
        self.runs.push(Run {
            x: self.width + gap,
            width: plot.width as i32,
            style,
            space_before: gap > 0,
            content: RunContent::Plot(plot),
        });
        self.width += gap + plot.width as i32;
        self.grow(plot.height as i32, plot.height as i32);
    }

    pub fn advance(&mut self, dx: i32) {
        self.width += dx;
    }

    fn grow(&mut self, height: i32, ascent: i32) {
        self.height = self.height.max(height);
        self.ascent = self.ascent.max(ascent);
    }

    /// Finish the line with the given alignment.
    pub fn finish(self, align: Align, empty_height: i32) -> Line {
        let slack = (self.avail - self.width).max(0);
        let offset = self.indent
            + match align {
                Align::Head => 0,
                Align::Center => slack / 2,
                Align::Foot => slack,
            };
        let height = if self.height == 0 { empty_height } else { self.height };
        Line {
            kind: LineKind::Text,
            offset,
            width: self.width,
            height,
            ascent: if self.ascent == 0 { height } else { self.ascent },
            space_after: 0,
            align,
            hyphenated: self.hyphenated,
            runs: self.runs,
            links: self.links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_merge_in_one_style() {
        let mut buf = LineBuf::new(0, 100);
        buf.push_text("The", 22, 0, StyleId(0), 12, 10);
        buf.push_text("quick", 10, 5, StyleId(0), 12, 10);
        buf.push_text("brown", 10, 5, StyleId(1), 14, 12);
        let line = buf.finish(Align::Head, 12);
        assert_eq!(line.runs.len(), 2);
        assert_eq!(line.width, 52);
        assert_eq!(line.runs[1].x, 42);
        assert_eq!(line.text(), "The quick brown");
        assert_eq!(line.height, 14);
    }

    #[test]
    fn test_alignment_offsets() {
        let mut buf = LineBuf::new(4, 100);
        buf.push_text("x", 20, 0, StyleId(0), 10, 8);
        assert_eq!(buf.clone().finish(Align::Head, 10).offset, 4);
        assert_eq!(buf.clone().finish(Align::Center, 10).offset, 44);
        assert_eq!(buf.finish(Align::Foot, 10).offset, 84);
    }

    #[test]
    fn test_fit() {
        let mut buf = LineBuf::new(0, 40);
        buf.push_text("The", 22, 0, StyleId(0), 10, 8);
        assert_eq!(buf.fit(10, 5), LineFitResult::Fit);
        assert_eq!(buf.fit(14, 5), LineFitResult::Overflow);
    }
}
