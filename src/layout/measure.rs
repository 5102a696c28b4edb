//! Text measurement.

use std::collections::HashMap;

use crate::style::ResolvedTextStyle;

/// Measures runs of text in a resolved style, in pixels.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &ResolvedTextStyle) -> i32;

    /// Gap between two words.
    fn word_space(&self, style: &ResolvedTextStyle) -> i32 {
        self.measure(" ", style)
    }
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for &T {
    fn measure(&self, text: &str, style: &ResolvedTextStyle) -> i32 {
        (**self).measure(text, style)
    }

    fn word_space(&self, style: &ResolvedTextStyle) -> i32 {
        (**self).word_space(style)
    }
}

/// Every character advances half the font size plus letter spacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceMeasurer;

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, style: &ResolvedTextStyle) -> i32 {
        let advance = (style.font_size / 2).max(1) + style.letter_space;
        text.chars().count() as i32 * advance
    }
}

/// Fixed per-character widths, independent of style.
#[derive(Debug, Clone, Default)]
pub struct CharWidthMeasurer {
    widths: HashMap<char, i32>,
    fallback: i32,
}

impl CharWidthMeasurer {
    pub fn new(fallback: i32) -> Self {
        Self {
            widths: HashMap::new(),
            fallback,
        }
    }

    pub fn with(mut self, ch: char, width: i32) -> Self {
        self.widths.insert(ch, width);
        self
    }

    pub fn with_all(mut self, chars: &str, width: i32) -> Self {
        for ch in chars.chars() {
            self.widths.insert(ch, width);
        }
        self
    }
}

impl TextMeasurer for CharWidthMeasurer {
    fn measure(&self, text: &str, _style: &ResolvedTextStyle) -> i32 {
        text.chars()
            .map(|ch| self.widths.get(&ch).copied().unwrap_or(self.fallback))
            .sum()
    }
}
