//! Greedy text flow: Text object elements into lines.

use crate::lrf::objects::{Inline, InlineKind, Plot, TextElement};
use crate::style::{ResolvedTextStyle, Scale, StyleId, StylePool};

use super::hyphenate::{HYPHEN, Hyphenator};
use super::line::{HotRegion, Line, LineBuf, LineFitResult, LineKind};
use super::measure::TextMeasurer;

/// Shared services for flowing text.
pub struct FlowEnv<'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub hyphenator: Hyphenator<'a>,
    pub pool: &'a mut StylePool,
    pub scale: Scale,
}

/// Flow `elements` into lines of `width` pixels.
pub fn flow_text(
    elements: &[TextElement],
    base: &ResolvedTextStyle,
    width: i32,
    env: &mut FlowEnv<'_>,
) -> Vec<Line> {
    let mut flow = TextFlow::new(base, width, env);
    for element in elements {
        flow.element(element);
    }
    flow.finish()
}

struct TextFlow<'e, 'a> {
    env: &'e mut FlowEnv<'a>,
    width: i32,
    base: ResolvedTextStyle,
    span: ResolvedTextStyle,
    inlines: Vec<Inline>,
    style: ResolvedTextStyle,
    style_id: StyleId,
    lines: Vec<Line>,
    line: LineBuf,
    pending_space: bool,
    in_paragraph: bool,
    paragraph_has_content: bool,
    first_line: bool,
    /// Open CharButtons and where their region starts on the current line.
    buttons: Vec<(u32, Option<i32>)>,
}

impl<'e, 'a> TextFlow<'e, 'a> {
    fn new(base: &ResolvedTextStyle, width: i32, env: &'e mut FlowEnv<'a>) -> Self {
        let style_id = env.pool.intern(base.clone());
        Self {
            env,
            width,
            base: base.clone(),
            span: base.clone(),
            inlines: Vec::new(),
            style: base.clone(),
            style_id,
            lines: Vec::new(),
            line: LineBuf::new(0, width),
            pending_space: false,
            in_paragraph: false,
            paragraph_has_content: false,
            first_line: true,
            buttons: Vec::new(),
        }
    }

    fn element(&mut self, element: &TextElement) {
        match element {
            TextElement::ParagraphStart => {
                if self.in_paragraph {
                    self.end_paragraph();
                }
                self.begin_paragraph();
            }
            TextElement::ParagraphEnd => {
                if self.in_paragraph {
                    self.end_paragraph();
                }
            }
            TextElement::Text(text) => self.text(text),
            TextElement::LineBreak => {
                self.ensure_paragraph();
                self.paragraph_has_content = true;
                self.close_line();
            }
            TextElement::Span(tag, value) => {
                self.span = self.span.with_span(*tag, value, self.env.scale);
                self.restyle();
                if self.first_line && self.line.is_empty() {
                    self.line = self.new_line();
                }
            }
            TextElement::Open(inline) => {
                if let Inline::CharButton(target) = inline {
                    self.buttons.push((*target, None));
                }
                self.inlines.push(*inline);
                self.restyle();
            }
            TextElement::Close(kind) => self.close_inline(*kind),
            TextElement::Plot(plot) => {
                self.ensure_paragraph();
                self.plot(*plot);
            }
            TextElement::Space(dx) => {
                self.ensure_paragraph();
                self.line.advance(self.env.scale.px(*dx as i64));
                self.pending_space = false;
            }
        }
    }

    fn finish(mut self) -> Vec<Line> {
        if self.in_paragraph {
            self.end_paragraph();
        } else if !self.line.is_empty() {
            self.close_line();
        }
        self.lines
    }

    fn begin_paragraph(&mut self) {
        self.in_paragraph = true;
        self.paragraph_has_content = false;
        self.first_line = true;
        self.line = self.new_line();
    }

    fn ensure_paragraph(&mut self) {
        if !self.in_paragraph {
            self.begin_paragraph();
        }
    }

    fn end_paragraph(&mut self) {
        if !self.line.is_empty() {
            self.close_line();
        }
        if self.paragraph_has_content {
            if let Some(last) = self.lines.last_mut() {
                last.space_after += self.style.par_skip;
            }
        } else {
            let previous_skip = matches!(self.lines.last(), Some(l) if l.kind == LineKind::ParSkip);
            let extra = if previous_skip { self.style.baseline_skip } else { 0 };
            self.lines.push(Line::par_skip(self.style.par_skip + extra));
        }
        self.in_paragraph = false;
        self.pending_space = false;
        self.span = self.base.clone();
        self.restyle();
    }

    fn new_line(&self) -> LineBuf {
        let indent = if self.first_line {
            self.style.par_indent.clamp(0, self.width.max(0))
        } else {
            0
        };
        LineBuf::new(indent, self.width - indent)
    }

    fn close_line(&mut self) {
        let mut line = std::mem::replace(&mut self.line, LineBuf::default());
        for (target, start) in &mut self.buttons {
            if let Some(x0) = start.take()
                && line.width > x0
            {
                line.links.push(HotRegion {
                    x0,
                    x1: line.width,
                    target: *target,
                });
            }
        }
        self.lines.push(line.finish(self.style.align, self.style.line_height()));
        self.first_line = false;
        self.pending_space = false;
        self.line = self.new_line();
    }

    fn restyle(&mut self) {
        let style = self
            .inlines
            .iter()
            .fold(self.span.clone(), |style, inline| style.with_inline(*inline));
        self.style_id = self.env.pool.intern(style.clone());
        self.style = style;
    }

    /// A close applies to the most recent matching open.
    fn close_inline(&mut self, kind: InlineKind) {
        let Some(pos) = self.inlines.iter().rposition(|i| i.kind() == kind) else {
            tracing::trace!(?kind, "close without open ignored");
            return;
        };
        let inline = self.inlines.remove(pos);
        if let Inline::CharButton(target) = inline
            && let Some(bpos) = self.buttons.iter().rposition(|(t, _)| *t == target)
        {
            let (target, start) = self.buttons.remove(bpos);
            if let Some(x0) = start
                && self.line.width > x0
            {
                self.line.links.push(HotRegion {
                    x0,
                    x1: self.line.width,
                    target,
                });
            }
        }
        self.restyle();
    }

    fn gap(&self) -> i32 {
        if self.pending_space && !self.line.is_empty() {
            self.env.measurer.word_space(&self.style)
        } else {
            0
        }
    }

    fn measure(&self, text: &str) -> i32 {
        self.env.measurer.measure(text, &self.style)
    }

    fn text(&mut self, text: &str) {
        self.ensure_paragraph();
        for (i, piece) in text.split(char::is_whitespace).enumerate() {
            if i > 0 {
                self.pending_space = true;
            }
            if !piece.is_empty() {
                self.word(piece);
            }
        }
    }

    fn word(&mut self, word: &str) {
        let mut rest = word;
        while !rest.is_empty() {
            let gap = self.gap();
            match self.fit_word(rest, gap) {
                LineFitResult::Fit => {
                    self.push(rest, gap);
                    rest = "";
                }
                LineFitResult::Overflow => self.close_line(),
                LineFitResult::Hyphenate(at) => {
                    let head = format!("{}{HYPHEN}", &rest[..at]);
                    self.push(&head, gap);
                    self.line.hyphenated = true;
                    self.close_line();
                    rest = &rest[at..];
                }
                LineFitResult::ForceBreak(at) => {
                    self.push(&rest[..at], gap);
                    rest = &rest[at..];
                    if !rest.is_empty() {
                        self.close_line();
                    }
                }
            }
        }
    }

    fn fit_word(&self, word: &str, gap: i32) -> LineFitResult {
        let width = self.measure(word);
        let fit = self.line.fit(width, gap);
        if fit == LineFitResult::Fit {
            return fit;
        }
        let room = self.line.room(gap);
        let measure = |s: &str| self.measure(s);
        let hyphenator = self.env.hyphenator;
        if let Some(at) = hyphenator.syllable_break(word, room, measure) {
            return LineFitResult::Hyphenate(at);
        }
        if width > self.line.avail
            && let Some(at) = hyphenator.fallback_break(word, room, measure)
        {
            return LineFitResult::Hyphenate(at);
        }
        if self.line.is_empty() {
            LineFitResult::ForceBreak(hyphenator.force_break(word, room, measure))
        } else {
            LineFitResult::Overflow
        }
    }

    /// Open buttons start at the first content placed after them.
    fn mark_buttons(&mut self, gap: i32) {
        let x = self.line.width + gap;
        for (_, start) in &mut self.buttons {
            start.get_or_insert(x);
        }
    }

    fn push(&mut self, text: &str, gap: i32) {
        let width = self.measure(text);
        self.mark_buttons(gap);
        self.line.push_text(
            text,
            width,
            gap,
            self.style_id,
            self.style.line_height(),
            self.style.font_size,
        );
        self.pending_space = false;
        self.paragraph_has_content = true;
    }

    fn plot(&mut self, plot: Plot) {
        let mut gap = self.gap();
        if self.line.fit(plot.width as i32, gap) == LineFitResult::Overflow && !self.line.is_empty() {
            self.close_line();
            gap = 0;
        }
        self.mark_buttons(gap);
        self.line.push_plot(plot, gap, self.style_id);
        self.pending_space = false;
        self.paragraph_has_content = true;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::layout::hyphenate::Syllabifier;
    use crate::layout::measure::CharWidthMeasurer;
    use crate::lrf::tags::{TagValue, ids};

    fn measurer() -> CharWidthMeasurer {
        CharWidthMeasurer::new(2)
            .with('T', 10)
            .with_all("he", 6)
            .with(' ', 5)
    }

    fn run(elements: &[TextElement], width: i32, syllabify: Option<&Syllabifier>) -> (Vec<Line>, StylePool) {
        let m = measurer();
        let mut pool = StylePool::new();
        let mut env = FlowEnv {
            measurer: &m,
            hyphenator: Hyphenator::new(syllabify, 5),
            pool: &mut pool,
            scale: Scale::UNIT,
        };
        let lines = flow_text(elements, &ResolvedTextStyle::default(), width, &mut env);
        (lines, pool)
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().filter(|l| l.kind == LineKind::Text).map(Line::text).collect()
    }

    fn para(text: &str) -> Vec<TextElement> {
        vec![
            TextElement::ParagraphStart,
            TextElement::Text(text.to_string()),
            TextElement::ParagraphEnd,
        ]
    }

    #[test]
    fn test_greedy_word_flow() {
        let (lines, _) = run(&para("The quick brown fox"), 40, None);
        assert_eq!(texts(&lines), vec!["The quick", "brown fox"]);
        assert!(lines.iter().all(|l| l.width <= 40));
    }

    #[test]
    fn test_syllable_hyphenation() {
        let syl: Syllabifier = Arc::new(|_: &str| {
            ["in", "com", "pre", "hen", "si", "bil", "ities"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        let (lines, _) = run(&para("incomprehensibilities"), 30, Some(&syl));
        let texts = texts(&lines);
        // 'h' and 'e' are 6 wide: "incompre-" is 22, "incomprehen-" is 36.
        assert_eq!(texts[0], "incompre-");
        assert!(lines[0].hyphenated);
        assert_eq!(texts.concat().replace('-', ""), "incomprehensibilities");
    }

    #[test]
    fn test_wide_token_without_hyphenation() {
        let (lines, _) = run(&para("abcdefghijklmnopqrstuvwxyz"), 20, None);
        let texts = texts(&lines);
        assert!(texts.len() >= 2);
        assert!(texts.iter().all(|t| !t.is_empty()));
        assert_eq!(texts.concat(), "abcdefghijklmnopqrstuvwxyz");
    }

    #[test]
    fn test_empty_paragraphs_collapse_to_par_skip() {
        let mut elements = para("x");
        elements.extend([TextElement::ParagraphStart, TextElement::ParagraphEnd]);
        elements.extend([TextElement::ParagraphStart, TextElement::ParagraphEnd]);
        let base = ResolvedTextStyle::default();
        let (lines, _) = run(&elements, 40, None);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].kind, LineKind::ParSkip);
        assert_eq!(lines[1].height, base.par_skip);
        assert_eq!(lines[2].height, base.par_skip + base.baseline_skip);
    }

    #[test]
    fn test_inline_stack_is_lifo() {
        let elements = vec![
            TextElement::ParagraphStart,
            TextElement::Open(Inline::Italic),
            TextElement::Text("a".into()),
            TextElement::Open(Inline::Italic),
            TextElement::Span(ids::FONT_SIZE, TagValue::Int(200)),
            TextElement::Close(InlineKind::Italic),
            TextElement::Text(" b".into()),
            TextElement::Close(InlineKind::Italic),
            TextElement::Text(" c".into()),
            TextElement::ParagraphEnd,
        ];
        let (lines, pool) = run(&elements, 400, None);
        let styles: Vec<_> = lines[0]
            .runs
            .iter()
            .map(|r| pool.get(r.style).unwrap().clone())
            .collect();
        assert!(styles[0].italic);
        assert!(styles[1].italic && styles[1].font_size == 200);
        assert!(!styles[2].italic && styles[2].font_size == 200);
    }

    #[test]
    fn test_char_button_hot_region() {
        let elements = vec![
            TextElement::ParagraphStart,
            TextElement::Text("The ".into()),
            TextElement::Open(Inline::CharButton(77)),
            TextElement::Text("quick".into()),
            TextElement::Close(InlineKind::CharButton),
            TextElement::ParagraphEnd,
        ];
        let (lines, _) = run(&elements, 100, None);
        assert_eq!(lines[0].links, vec![HotRegion { x0: 27, x1: 37, target: 77 }]);
    }

    #[test]
    fn test_char_button_region_follows_its_text_onto_the_next_line() {
        let elements = vec![
            TextElement::ParagraphStart,
            TextElement::Text("The ".into()),
            TextElement::Open(Inline::CharButton(9)),
            TextElement::Text("quick brown".into()),
            TextElement::Close(InlineKind::CharButton),
            TextElement::ParagraphEnd,
        ];
        let (lines, _) = run(&elements, 30, None);
        assert_eq!(texts(&lines), vec!["The", "quick brown"]);
        assert!(lines[0].links.is_empty());
        assert_eq!(lines[1].links, vec![HotRegion { x0: 0, x1: 25, target: 9 }]);
    }

    #[test]
    fn test_line_break_and_indent() {
        let elements = vec![
            TextElement::ParagraphStart,
            TextElement::Span(ids::PAR_INDENT, TagValue::Int(8)),
            TextElement::Text("The".into()),
            TextElement::LineBreak,
            TextElement::Text("The".into()),
            TextElement::ParagraphEnd,
        ];
        let (lines, _) = run(&elements, 100, None);
        assert_eq!(texts(&lines), vec!["The", "The"]);
        assert_eq!(lines[0].offset, 8);
        assert_eq!(lines[1].offset, 0);
    }
}
