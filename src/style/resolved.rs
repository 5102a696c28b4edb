//! Resolved styles: every attribute has a concrete value.
//!
//! Text sizes are stored in the file unscaled and multiplied by
//! [`Scale`] (`dpi / 720`) here. Block and page geometry is already in
//! screen pixels and is taken as is.

use crate::lrf::objects::{Attrs, Inline, LineStyle};
use crate::lrf::tags::{TagValue, ids};

use super::color::Color;
use super::properties::{Align, BgImageMode, BlockRule, EmpLinePosition, FrameMode, LayoutDirection};

/// Face used when nothing in the cascade names one.
pub const DEFAULT_FONT_FACE: &str = "Dutch801 Rm BT Roman";

/// Multiplier from stored text units to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scale {
    pub dpi: u16,
}

impl Scale {
    /// The identity scale.
    pub const UNIT: Scale = Scale { dpi: 720 };

    pub fn new(dpi: u16) -> Self {
        Self { dpi }
    }

    /// Scale a stored size. A zero dpi is treated as the identity.
    #[inline]
    pub fn px(self, value: i64) -> i32 {
        if self.dpi == 0 {
            return value as i32;
        }
        (value * self.dpi as i64 / 720) as i32
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Map a stored font weight (100..900) to the display weight.
#[inline]
pub fn display_weight(weight: i64) -> i32 {
    (weight / 10) as i32 - 1
}

/// Vertical shift applied by `Sup`/`Sub`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalShift {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedTextStyle {
    pub font_face: String,
    pub font_size: i32,
    pub font_width: i32,
    pub escapement: i32,
    pub orientation: i32,
    /// Display weight (`stored / 10 - 1`).
    pub font_weight: i32,
    pub italic: bool,
    pub text_color: Color,
    pub text_bg_color: Color,
    pub word_space: i32,
    pub letter_space: i32,
    pub baseline_skip: i32,
    pub line_space: i32,
    pub par_indent: i32,
    pub par_skip: i32,
    pub align: Align,
    pub column: u16,
    pub column_sep: i32,
    pub emp_line_position: EmpLinePosition,
    pub emp_line_type: LineStyle,
    /// Inside an `EmpLine` run.
    pub emphasis: bool,
    pub shift: VerticalShift,
}

impl ResolvedTextStyle {
    /// Built-in defaults at the given scale.
    pub fn base(scale: Scale) -> Self {
        Self {
            font_face: DEFAULT_FONT_FACE.to_string(),
            font_size: scale.px(100),
            font_width: -10,
            escapement: 0,
            orientation: 0,
            font_weight: display_weight(400),
            italic: false,
            text_color: Color::BLACK,
            text_bg_color: Color::TRANSPARENT,
            word_space: scale.px(25),
            letter_space: 0,
            baseline_skip: scale.px(120),
            line_space: scale.px(10),
            par_indent: 0,
            par_skip: 0,
            align: Align::Head,
            column: 1,
            column_sep: 0,
            emp_line_position: EmpLinePosition::None,
            emp_line_type: LineStyle::None,
            emphasis: false,
            shift: VerticalShift::Baseline,
        }
    }

    /// Resolve a merged attribute set over the defaults.
    pub fn from_attrs(attrs: &Attrs, scale: Scale) -> Self {
        let mut style = Self::base(scale);
        for (tag, value) in attrs.iter() {
            style.apply(tag, value, scale);
        }
        style
    }

    /// A copy with one inline `Span` attribute applied.
    pub fn with_span(&self, tag: u16, value: &TagValue, scale: Scale) -> Self {
        let mut style = self.clone();
        style.apply(tag, value, scale);
        style
    }

    /// A copy with an inline construct opened.
    pub fn with_inline(&self, inline: Inline) -> Self {
        let mut style = self.clone();
        match inline {
            Inline::Italic => style.italic = true,
            Inline::Sup => {
                style.shift = VerticalShift::Superscript;
                style.font_size = style.font_size * 2 / 3;
            }
            Inline::Sub => {
                style.shift = VerticalShift::Subscript;
                style.font_size = style.font_size * 2 / 3;
            }
            Inline::EmpLine => style.emphasis = true,
            _ => {}
        }
        style
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight >= display_weight(600)
    }

    /// `(underline, overline)` for the current emphasis run.
    pub fn decorations(&self) -> (bool, bool) {
        if !self.emphasis || self.emp_line_type == LineStyle::None {
            return (false, false);
        }
        match self.emp_line_position {
            EmpLinePosition::After => (true, false),
            EmpLinePosition::Before => (false, true),
            EmpLinePosition::None => (true, false),
        }
    }

    /// Height of one line of this style.
    pub fn line_height(&self) -> i32 {
        self.baseline_skip.max(self.font_size) + self.line_space
    }

    fn apply(&mut self, tag: u16, value: &TagValue, scale: Scale) {
        if let TagValue::Str(face) = value {
            if tag == ids::FONT_FACE {
                self.font_face = face.clone();
            }
            return;
        }
        if let TagValue::Color(color) = value {
            match tag {
                ids::TEXT_COLOR => self.text_color = *color,
                ids::TEXT_BG_COLOR => self.text_bg_color = *color,
                _ => {}
            }
            return;
        }
        let Some(v) = value.as_int() else {
            return;
        };
        match tag {
            ids::FONT_SIZE => self.font_size = scale.px(v),
            ids::FONT_WIDTH => self.font_width = v as i32,
            ids::FONT_ESCAPEMENT => self.escapement = v as i32,
            ids::FONT_ORIENTATION => self.orientation = v as i32,
            ids::FONT_WEIGHT => self.font_weight = display_weight(v),
            ids::WORD_SPACE => self.word_space = scale.px(v),
            ids::LETTER_SPACE => self.letter_space = scale.px(v),
            ids::BASELINE_SKIP => self.baseline_skip = scale.px(v),
            ids::LINE_SPACE => self.line_space = scale.px(v),
            ids::PAR_INDENT => self.par_indent = scale.px(v),
            ids::PAR_SKIP => self.par_skip = scale.px(v),
            ids::ALIGN => self.align = Align::from_code(v).unwrap_or_default(),
            ids::COLUMN => self.column = (v as u16).max(1),
            ids::COLUMN_SEP => self.column_sep = v as i32,
            ids::EMP_LINE_POSITION => {
                self.emp_line_position = EmpLinePosition::from_code(v).unwrap_or_default()
            }
            ids::EMP_LINE_TYPE => self.emp_line_type = LineStyle::from_code(v),
            _ => {}
        }
    }
}

impl Default for ResolvedTextStyle {
    fn default() -> Self {
        Self::base(Scale::UNIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BgImage {
    pub mode: BgImageMode,
    pub image: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBlockStyle {
    pub width: i32,
    pub height: i32,
    pub rule: BlockRule,
    pub bg_color: Color,
    pub layout: LayoutDirection,
    pub frame_width: i32,
    pub frame_color: Color,
    pub frame_mode: FrameMode,
    pub top_skip: i32,
    pub side_margin: i32,
    pub foot_skip: i32,
    pub bg_image: Option<BgImage>,
}

impl Default for ResolvedBlockStyle {
    fn default() -> Self {
        Self {
            width: 575,
            height: 747,
            rule: BlockRule::default(),
            bg_color: Color::TRANSPARENT,
            layout: LayoutDirection::LrTb,
            frame_width: 0,
            frame_color: Color::BLACK,
            frame_mode: FrameMode::None,
            top_skip: 0,
            side_margin: 0,
            foot_skip: 0,
            bg_image: None,
        }
    }
}

impl ResolvedBlockStyle {
    pub fn from_attrs(attrs: &Attrs) -> Self {
        let mut style = Self::default();
        let int = |tag, default: i32| attrs.int(tag).map(|v| v as i32).unwrap_or(default);
        style.width = int(ids::BLOCK_WIDTH, style.width);
        style.height = int(ids::BLOCK_HEIGHT, style.height);
        if let Some(rule) = attrs.int(ids::BLOCK_RULE).and_then(BlockRule::from_code) {
            style.rule = rule;
        }
        if let Some(color) = attrs.color(ids::BG_COLOR) {
            style.bg_color = color;
        }
        if let Some(layout) = attrs.int(ids::LAYOUT).and_then(LayoutDirection::from_code) {
            style.layout = layout;
        }
        style.frame_width = int(ids::FRAME_WIDTH, 0);
        if let Some(color) = attrs.color(ids::FRAME_COLOR) {
            style.frame_color = color;
        }
        if let Some(mode) = attrs.int(ids::FRAME_MODE).and_then(FrameMode::from_code) {
            style.frame_mode = mode;
        }
        style.top_skip = int(ids::TOP_SKIP, 0);
        style.side_margin = int(ids::SIDE_MARGIN, 0);
        style.foot_skip = int(ids::FOOT_SKIP, 0);
        style.bg_image = bg_image(attrs);
        style
    }

    /// Vertical limit for content, if the block's height is fixed.
    pub fn max_y(&self) -> Option<i32> {
        self.rule.is_vert_fixed().then_some(self.height)
    }

    /// Width available to text inside the frame and side margins.
    pub fn inner_width(&self) -> i32 {
        (self.width - 2 * self.side_margin - 2 * self.frame_width).max(0)
    }
}

fn bg_image(attrs: &Attrs) -> Option<BgImage> {
    let &[mode, image] = attrs.tuple(ids::BG_IMAGE)? else {
        return None;
    };
    (image != 0).then(|| BgImage {
        mode: BgImageMode::from_code(mode).unwrap_or_default(),
        image: image as u32,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPageStyle {
    pub top_margin: i32,
    pub head_height: i32,
    pub head_sep: i32,
    pub odd_side_margin: i32,
    pub even_side_margin: i32,
    pub text_width: i32,
    pub text_height: i32,
    pub foot_space: i32,
    pub foot_height: i32,
    pub layout: LayoutDirection,
    pub odd_header: Option<u32>,
    pub even_header: Option<u32>,
    pub odd_footer: Option<u32>,
    pub even_footer: Option<u32>,
    pub bg_image: Option<BgImage>,
}

impl Default for ResolvedPageStyle {
    fn default() -> Self {
        Self {
            top_margin: 20,
            head_height: 0,
            head_sep: 0,
            odd_side_margin: 20,
            even_side_margin: 20,
            text_width: 575,
            text_height: 747,
            foot_space: 0,
            foot_height: 0,
            layout: LayoutDirection::LrTb,
            odd_header: None,
            even_header: None,
            odd_footer: None,
            even_footer: None,
            bg_image: None,
        }
    }
}

impl ResolvedPageStyle {
    pub fn from_attrs(attrs: &Attrs) -> Self {
        let d = Self::default();
        let int = |tag, default: i32| attrs.int(tag).map(|v| v as i32).unwrap_or(default);
        Self {
            top_margin: int(ids::TOP_MARGIN, d.top_margin),
            head_height: int(ids::HEAD_HEIGHT, d.head_height),
            head_sep: int(ids::HEAD_SEP, d.head_sep),
            odd_side_margin: int(ids::ODD_SIDE_MARGIN, d.odd_side_margin),
            even_side_margin: int(ids::EVEN_SIDE_MARGIN, d.even_side_margin),
            text_width: int(ids::TEXT_WIDTH, d.text_width),
            text_height: int(ids::TEXT_HEIGHT, d.text_height),
            foot_space: int(ids::FOOT_SPACE, d.foot_space),
            foot_height: int(ids::FOOT_HEIGHT, d.foot_height),
            layout: attrs
                .int(ids::LAYOUT)
                .and_then(LayoutDirection::from_code)
                .unwrap_or_default(),
            odd_header: attrs.reference(ids::ODD_HEADER),
            even_header: attrs.reference(ids::EVEN_HEADER),
            odd_footer: attrs.reference(ids::ODD_FOOTER),
            even_footer: attrs.reference(ids::EVEN_FOOTER),
            bg_image: bg_image(attrs),
        }
    }

    /// Left margin of the text area on an odd or even screen.
    pub fn side_margin(&self, odd: bool) -> i32 {
        if odd {
            self.odd_side_margin
        } else {
            self.even_side_margin
        }
    }

    /// Top of the text area, below the header and its separation.
    pub fn text_top(&self) -> i32 {
        self.top_margin + self.head_height + self.head_sep
    }

    /// Top of the footer area.
    pub fn footer_top(&self) -> i32 {
        self.text_top() + self.text_height + self.foot_space
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(items: &[(u16, TagValue)]) -> Attrs {
        items.iter().cloned().collect()
    }

    #[test]
    fn test_text_sizes_are_scaled() {
        let a = attrs(&[
            (ids::FONT_SIZE, TagValue::Int(100)),
            (ids::BASELINE_SKIP, TagValue::Int(144)),
        ]);
        let style = ResolvedTextStyle::from_attrs(&a, Scale::new(1440));
        assert_eq!(style.font_size, 200);
        assert_eq!(style.baseline_skip, 288);
        let unit = ResolvedTextStyle::from_attrs(&a, Scale::UNIT);
        assert_eq!(unit.font_size, 100);
    }

    #[test]
    fn test_weight_mapping() {
        assert_eq!(display_weight(400), 39);
        assert_eq!(display_weight(700), 69);
        let bold = ResolvedTextStyle::from_attrs(&attrs(&[(ids::FONT_WEIGHT, TagValue::Int(700))]), Scale::UNIT);
        assert!(bold.is_bold());
        assert!(!ResolvedTextStyle::default().is_bold());
    }

    #[test]
    fn test_span_copies() {
        let base = ResolvedTextStyle::default();
        let big = base.with_span(ids::FONT_SIZE, &TagValue::Int(200), Scale::UNIT);
        assert_eq!(big.font_size, 200);
        assert_eq!(base.font_size, 100);
        let italic = base.with_inline(Inline::Italic);
        assert!(italic.italic && !base.italic);
    }

    #[test]
    fn test_emphasis_decorations() {
        let style = ResolvedTextStyle::from_attrs(
            &attrs(&[
                (ids::EMP_LINE_POSITION, TagValue::Int(1)),
                (ids::EMP_LINE_TYPE, TagValue::Int(0x10)),
            ]),
            Scale::UNIT,
        );
        assert_eq!(style.decorations(), (false, false));
        assert_eq!(style.with_inline(Inline::EmpLine).decorations(), (false, true));
    }

    #[test]
    fn test_block_max_y() {
        let fixed = ResolvedBlockStyle::from_attrs(&attrs(&[
            (ids::BLOCK_HEIGHT, TagValue::Int(300)),
            (ids::BLOCK_RULE, TagValue::Int(0x44)),
        ]));
        assert_eq!(fixed.max_y(), Some(300));
        let adjustable = ResolvedBlockStyle::from_attrs(&attrs(&[(ids::BLOCK_RULE, TagValue::Int(0x22))]));
        assert_eq!(adjustable.max_y(), None);
    }

    #[test]
    fn test_page_style_geometry() {
        let page = ResolvedPageStyle::from_attrs(&attrs(&[
            (ids::TOP_MARGIN, TagValue::Int(10)),
            (ids::HEAD_HEIGHT, TagValue::Int(30)),
            (ids::HEAD_SEP, TagValue::Int(5)),
            (ids::ODD_HEADER, TagValue::Ref(12)),
            (ids::EVEN_HEADER, TagValue::Ref(0)),
        ]));
        assert_eq!(page.text_top(), 45);
        assert_eq!(page.odd_header, Some(12));
        assert_eq!(page.even_header, None);
    }
}
