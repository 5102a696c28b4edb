//! Word breaking for tokens that do not fit the rest of a line.
//!
//! Three strategies are tried in order:
//!
//! 1. the longest syllable prefix that fits with a trailing hyphen;
//! 2. for tokens wider than a whole line, prefixes shortened by a fixed
//!    number of characters at a time, again with a hyphen;
//! 3. on an empty line, a forced break at character-chunk boundaries.
//!
//! The first two need a syllabifier; without one only forced breaks apply.

use std::sync::Arc;

/// Splits a word into syllables.
pub type Syllabifier = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

pub const HYPHEN: &str = "-";

/// Byte offset of the `n`th character, or the length if there are fewer.
pub fn char_offset(word: &str, n: usize) -> usize {
    word.char_indices().nth(n).map(|(i, _)| i).unwrap_or(word.len())
}

#[derive(Clone, Copy)]
pub struct Hyphenator<'a> {
    syllabify: Option<&'a Syllabifier>,
    step: usize,
}

impl<'a> Hyphenator<'a> {
    pub fn new(syllabify: Option<&'a Syllabifier>, step: usize) -> Self {
        Self {
            syllabify,
            step: step.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.syllabify.is_some()
    }

    /// Longest syllable prefix whose width with a hyphen is at most `room`.
    ///
    /// Returns the byte offset to split at.
    pub fn syllable_break(&self, word: &str, room: i32, measure: impl Fn(&str) -> i32) -> Option<usize> {
        let syllabify = self.syllabify?;
        let syllables = syllabify(word);
        let total = word.chars().count();
        let mut prefix_chars: Vec<usize> = Vec::with_capacity(syllables.len());
        let mut acc = 0;
        for s in &syllables {
            acc += s.chars().count();
            prefix_chars.push(acc);
        }
        for i in (0..syllables.len()).rev() {
            let chars = prefix_chars[i];
            if chars == 0 || chars >= total {
                continue;
            }
            let at = char_offset(word, chars);
            if fits_with_hyphen(&word[..at], room, &measure) {
                return Some(at);
            }
        }
        None
    }

    /// Prefixes shortened `step` characters at a time.
    pub fn fallback_break(&self, word: &str, room: i32, measure: impl Fn(&str) -> i32) -> Option<usize> {
        self.syllabify?;
        let total = word.chars().count();
        let mut chars = total.checked_sub(self.step)?;
        while chars > 0 {
            let at = char_offset(word, chars);
            if fits_with_hyphen(&word[..at], room, &measure) {
                return Some(at);
            }
            chars = chars.checked_sub(self.step)?;
        }
        None
    }

    /// Break an unbreakable token on an empty line.
    ///
    /// Takes as many whole chunks as fit; if not even one chunk fits, as
    /// many single characters as fit. Always makes progress.
    pub fn force_break(&self, word: &str, room: i32, measure: impl Fn(&str) -> i32) -> usize {
        let total = word.chars().count();
        let mut chunks = 0;
        while (chunks + 1) * self.step < total {
            let at = char_offset(word, (chunks + 1) * self.step);
            if measure(&word[..at]) > room {
                break;
            }
            chunks += 1;
        }
        if chunks > 0 {
            return char_offset(word, chunks * self.step);
        }
        let mut chars = 1;
        while chars + 1 < total && measure(&word[..char_offset(word, chars + 1)]) <= room {
            chars += 1;
        }
        char_offset(word, chars)
    }
}

fn fits_with_hyphen(prefix: &str, room: i32, measure: &impl Fn(&str) -> i32) -> bool {
    measure(prefix) + measure(HYPHEN) <= room
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width(s: &str) -> i32 {
        s.chars().count() as i32 * 2
    }

    fn syllables() -> Syllabifier {
        Arc::new(|word: &str| {
            if word == "incomprehensibilities" {
                ["in", "com", "pre", "hen", "si", "bil", "ities"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            } else {
                vec![word.to_string()]
            }
        })
    }

    #[test]
    fn test_largest_syllable_prefix() {
        let syl = syllables();
        let h = Hyphenator::new(Some(&syl), 5);
        // "incomprehen-" is 12 chars = 24; "incomprehensi-" = 28; "incomprehensibil-" = 34.
        let at = h.syllable_break("incomprehensibilities", 30, width).unwrap();
        assert_eq!(&"incomprehensibilities"[..at], "incomprehensi");
        assert_eq!(h.syllable_break("incomprehensibilities", 3, width), None);
    }

    #[test]
    fn test_fallback_decrements() {
        let syl = syllables();
        let h = Hyphenator::new(Some(&syl), 5);
        // 20 chars; tries 15 (32 with hyphen), 10 (22), ...
        let at = h.fallback_break("abcdefghijklmnopqrst", 25, width).unwrap();
        assert_eq!(at, 10);
        let off = Hyphenator::new(None, 5);
        assert_eq!(off.fallback_break("abcdefghijklmnopqrst", 25, width), None);
    }

    #[test]
    fn test_force_break_makes_progress() {
        let h = Hyphenator::new(None, 5);
        assert_eq!(h.force_break("abcdefghijkl", 20, width), 10);
        assert_eq!(h.force_break("abcdefghijkl", 4, width), 2);
        assert_eq!(h.force_break("abcdefghijkl", 0, width), 1);
        assert_eq!(h.force_break("ab", 0, width), 1);
    }
}
