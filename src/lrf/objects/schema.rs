//! Declarative tag rules for every object kind.
//!
//! Each kind owns a [`RuleSet`]: the tags it accepts directly plus the rule
//! sets it inherits. The loader never sees the hierarchy; [`rules_for`]
//! flattens it once per kind into a single `tag → Action` map where a
//! child's rule overrides an inherited one.
//!
//! ```text
//!   Text ──► STREAM ──► COMMON
//!     └────► TEXT_STYLE
//!   Block ─► STREAM, BLOCK_STYLE, TEXT_STYLE
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::Result;
use crate::lrf::tags::{Tag, ids::*};

use super::{ObjectBuilder, ObjectKind};

/// Decoder for tags whose payload feeds more than one attribute.
pub type Decoder = fn(&mut ObjectBuilder, &Tag) -> Result<()>;

/// What the loader does with a tag.
#[derive(Clone, Copy)]
pub enum Action {
    /// Store the decoded value in the attribute map under the tag id.
    Attr,
    /// Hand the tag to a named decoder.
    Decode(&'static str, Decoder),
    /// Accept and drop.
    Ignore,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Attr => f.write_str("Attr"),
            Action::Decode(name, _) => write!(f, "Decode({name})"),
            Action::Ignore => f.write_str("Ignore"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TagRule {
    pub tag: u16,
    pub action: Action,
}

const fn attr(tag: u16) -> TagRule {
    TagRule {
        tag,
        action: Action::Attr,
    }
}

const fn decode(tag: u16, name: &'static str, decoder: Decoder) -> TagRule {
    TagRule {
        tag,
        action: Action::Decode(name, decoder),
    }
}

const fn ignore(tag: u16) -> TagRule {
    TagRule {
        tag,
        action: Action::Ignore,
    }
}

/// A named group of rules with inherited groups.
pub struct RuleSet {
    pub name: &'static str,
    pub rules: &'static [TagRule],
    pub parents: &'static [&'static RuleSet],
}

// ============================================================================
// Shared groups
// ============================================================================

pub static COMMON: RuleSet = RuleSet {
    name: "Common",
    rules: &[attr(OBJECT_INFO_LINK)],
    parents: &[],
};

pub static STREAM: RuleSet = RuleSet {
    name: "Stream",
    rules: &[
        attr(STREAM_FLAGS),
        attr(STREAM_SIZE),
        ignore(STREAM_START),
        ignore(STREAM_END),
    ],
    parents: &[&COMMON],
};

pub static TEXT_STYLE: RuleSet = RuleSet {
    name: "TextStyle",
    rules: &[
        attr(FONT_SIZE),
        attr(FONT_WIDTH),
        attr(FONT_ESCAPEMENT),
        attr(FONT_ORIENTATION),
        attr(FONT_WEIGHT),
        attr(FONT_FACE),
        attr(TEXT_COLOR),
        attr(TEXT_BG_COLOR),
        attr(WORD_SPACE),
        attr(LETTER_SPACE),
        attr(BASELINE_SKIP),
        attr(LINE_SPACE),
        attr(PAR_INDENT),
        attr(PAR_SKIP),
        attr(ALIGN),
        attr(COLUMN),
        attr(COLUMN_SEP),
        attr(RUBY_ALIGN),
        attr(RUBY_OVERHANG),
        attr(EMP_DOTS_POSITION),
        attr(EMP_DOTS_CODE),
        attr(EMP_LINE_POSITION),
        attr(EMP_LINE_TYPE),
    ],
    parents: &[],
};

pub static BLOCK_STYLE: RuleSet = RuleSet {
    name: "BlockStyle",
    rules: &[
        attr(BLOCK_WIDTH),
        attr(BLOCK_HEIGHT),
        attr(BLOCK_RULE),
        attr(BG_COLOR),
        attr(LAYOUT),
        attr(FRAME_WIDTH),
        attr(FRAME_COLOR),
        attr(FRAME_MODE),
        attr(TOP_SKIP),
        attr(SIDE_MARGIN),
        attr(FOOT_SKIP),
        decode(BG_IMAGE, "bg_image", decode_bg_image),
    ],
    parents: &[],
};

pub static PAGE_STYLE: RuleSet = RuleSet {
    name: "PageStyle",
    rules: &[
        attr(TOP_MARGIN),
        attr(HEAD_HEIGHT),
        attr(HEAD_SEP),
        attr(ODD_SIDE_MARGIN),
        attr(EVEN_SIDE_MARGIN),
        attr(TEXT_HEIGHT),
        attr(TEXT_WIDTH),
        attr(FOOT_SPACE),
        attr(FOOT_HEIGHT),
        attr(EMPTY_VIEW),
        attr(LAYOUT),
        attr(ODD_HEADER),
        attr(EVEN_HEADER),
        attr(ODD_FOOTER),
        attr(EVEN_FOOTER),
        decode(BG_IMAGE, "bg_image", decode_bg_image),
    ],
    parents: &[],
};

// ============================================================================
// Kinds
// ============================================================================

static PAGE_TREE: RuleSet = RuleSet {
    name: "PageTree",
    rules: &[attr(PAGE_LIST), attr(PARENT_PAGE_TREE)],
    parents: &[&STREAM],
};

static PAGE: RuleSet = RuleSet {
    name: "Page",
    rules: &[attr(LINK), attr(CONTAINED_OBJECTS), attr(PARENT_PAGE_TREE)],
    parents: &[&STREAM, &PAGE_STYLE],
};

static CANVAS: RuleSet = RuleSet {
    name: "Canvas",
    rules: &[attr(LINK), attr(CANVAS_WIDTH), attr(CANVAS_HEIGHT)],
    parents: &[&STREAM, &BLOCK_STYLE],
};

static PAGE_ATTR: RuleSet = RuleSet {
    name: "PageAttr",
    rules: &[],
    parents: &[&COMMON, &PAGE_STYLE],
};

static BLOCK: RuleSet = RuleSet {
    name: "Block",
    rules: &[attr(LINK)],
    parents: &[&STREAM, &BLOCK_STYLE, &TEXT_STYLE],
};

static BLOCK_ATTR: RuleSet = RuleSet {
    name: "BlockAttr",
    rules: &[],
    parents: &[&COMMON, &BLOCK_STYLE],
};

static MINI_PAGE: RuleSet = RuleSet {
    name: "MiniPage",
    rules: &[
        attr(LINK),
        attr(MINI_PAGE_HEIGHT),
        attr(MINI_PAGE_WIDTH),
        attr(LOCATION_X),
        attr(LOCATION_Y),
    ],
    parents: &[&STREAM, &BLOCK_STYLE],
};

static PLAIN_STREAM: RuleSet = RuleSet {
    name: "PlainStream",
    rules: &[],
    parents: &[&STREAM],
};

static TEXT: RuleSet = RuleSet {
    name: "Text",
    rules: &[attr(LINK)],
    parents: &[&STREAM, &TEXT_STYLE],
};

static TEXT_ATTR: RuleSet = RuleSet {
    name: "TextAttr",
    rules: &[],
    parents: &[&COMMON, &TEXT_STYLE],
};

static IMAGE: RuleSet = RuleSet {
    name: "Image",
    rules: &[attr(IMAGE_RECT), attr(IMAGE_SIZE), attr(IMAGE_STREAM)],
    parents: &[&COMMON],
};

static BUTTON: RuleSet = RuleSet {
    name: "Button",
    rules: &[
        attr(BUTTON_FLAGS),
        decode(LINK, "button", super::button::feed),
        decode(BASE_BUTTON_START, "button", super::button::feed),
        decode(BASE_BUTTON_END, "button", super::button::feed),
        decode(FOCUS_IN_BUTTON_START, "button", super::button::feed),
        decode(FOCUS_IN_BUTTON_END, "button", super::button::feed),
        decode(PUSH_BUTTON_START, "button", super::button::feed),
        decode(PUSH_BUTTON_END, "button", super::button::feed),
        decode(UP_BUTTON_START, "button", super::button::feed),
        decode(UP_BUTTON_END, "button", super::button::feed),
        decode(ACTIONS_START, "button", super::button::feed),
        decode(ACTIONS_END, "button", super::button::feed),
        decode(JUMP_TO, "button", super::button::feed),
        decode(SEND_MESSAGE, "button", super::button::feed),
        decode(CLOSE_WINDOW, "button", super::button::feed),
        decode(SOUND_STOP, "button", super::button::feed),
        decode(RUN, "button", super::button::feed),
    ],
    parents: &[&COMMON],
};

static WINDOW: RuleSet = RuleSet {
    name: "Window",
    rules: &[attr(LINK), attr(CANVAS_WIDTH), attr(CANVAS_HEIGHT)],
    parents: &[&STREAM, &BLOCK_STYLE],
};

static SOUND: RuleSet = RuleSet {
    name: "Sound",
    rules: &[attr(PUT_SOUND), attr(LINK)],
    parents: &[&STREAM],
};

static FONT: RuleSet = RuleSet {
    name: "Font",
    rules: &[attr(FONT_FILE_NAME), attr(FONT_FACE_NAME)],
    parents: &[&STREAM],
};

static IMPORT: RuleSet = RuleSet {
    name: "Import",
    rules: &[attr(FONT_FILE_NAME)],
    parents: &[&STREAM],
};

static BOOK_ATTR: RuleSet = RuleSet {
    name: "BookAttr",
    rules: &[
        attr(CHILD_PAGE_TREE),
        attr(BOOK_TEXT_ATTR),
        attr(BOOK_BLOCK_ATTR),
        attr(BOOK_PAGE_ATTR),
        attr(FONT_LIST),
    ],
    parents: &[&COMMON, &TEXT_STYLE],
};

/// The declared rule set of a kind (before flattening).
pub fn rule_set(kind: ObjectKind) -> &'static RuleSet {
    match kind {
        ObjectKind::PageTree => &PAGE_TREE,
        ObjectKind::Page => &PAGE,
        ObjectKind::Header | ObjectKind::Footer | ObjectKind::Canvas => &CANVAS,
        ObjectKind::PageAttr => &PAGE_ATTR,
        ObjectKind::Block => &BLOCK,
        ObjectKind::BlockAttr => &BLOCK_ATTR,
        ObjectKind::MiniPage => &MINI_PAGE,
        ObjectKind::BlockList
        | ObjectKind::ImageStream
        | ObjectKind::SoundStream
        | ObjectKind::ObjectInfo
        | ObjectKind::Toc => &PLAIN_STREAM,
        ObjectKind::Text | ObjectKind::SimpleText => &TEXT,
        ObjectKind::TextAttr | ObjectKind::ParagraphAttr => &TEXT_ATTR,
        ObjectKind::Image => &IMAGE,
        ObjectKind::Button => &BUTTON,
        ObjectKind::Window | ObjectKind::PopUpWindow => &WINDOW,
        ObjectKind::Sound => &SOUND,
        ObjectKind::Font => &FONT,
        ObjectKind::Import => &IMPORT,
        ObjectKind::BookAttr => &BOOK_ATTR,
    }
}

fn flatten_into(set: &RuleSet, out: &mut HashMap<u16, Action>) {
    for parent in set.parents {
        flatten_into(parent, out);
    }
    for rule in set.rules {
        out.insert(rule.tag, rule.action);
    }
}

type FlatTables = HashMap<ObjectKind, HashMap<u16, Action>>;

fn flat_tables() -> &'static FlatTables {
    static TABLES: OnceLock<FlatTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        ObjectKind::ALL
            .iter()
            .map(|&kind| {
                let mut flat = HashMap::new();
                flatten_into(rule_set(kind), &mut flat);
                (kind, flat)
            })
            .collect()
    })
}

/// The flattened `tag → action` map for a kind.
pub fn rules_for(kind: ObjectKind) -> &'static HashMap<u16, Action> {
    static EMPTY: OnceLock<HashMap<u16, Action>> = OnceLock::new();
    flat_tables()
        .get(&kind)
        .unwrap_or_else(|| EMPTY.get_or_init(HashMap::new))
}

/// Look up the action for one tag.
#[inline]
pub fn lookup(kind: ObjectKind, tag: u16) -> Option<Action> {
    rules_for(kind).get(&tag).copied()
}

/// `BgImage` carries `(mode, image id)`; the id doubles as a reference.
fn decode_bg_image(builder: &mut ObjectBuilder, tag: &Tag) -> Result<()> {
    if let Some(&[mode, image]) = tag.value.as_tuple() {
        builder.attrs.set(tag.id, tag.value.clone());
        if image != 0 {
            builder.note_reference(image as u32);
        }
        tracing::trace!(mode, image, "background image");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrf::tags::tag_info;

    #[test]
    fn test_every_rule_names_a_known_tag() {
        for kind in ObjectKind::ALL {
            for tag in rules_for(kind).keys() {
                assert!(tag_info(*tag).is_some(), "{kind:?} has unknown tag {tag:#06x}");
            }
        }
    }

    #[test]
    fn test_inheritance_is_flattened() {
        assert!(matches!(lookup(ObjectKind::Text, FONT_SIZE), Some(Action::Attr)));
        assert!(matches!(lookup(ObjectKind::Text, STREAM_SIZE), Some(Action::Attr)));
        assert!(matches!(lookup(ObjectKind::Text, OBJECT_INFO_LINK), Some(Action::Attr)));
        assert!(matches!(lookup(ObjectKind::Block, BLOCK_RULE), Some(Action::Attr)));
        assert!(lookup(ObjectKind::TextAttr, PAGE_LIST).is_none());
    }

    #[test]
    fn test_child_rule_overrides_parent() {
        assert!(matches!(
            lookup(ObjectKind::Button, LINK),
            Some(Action::Decode("button", _))
        ));
        assert!(matches!(lookup(ObjectKind::Page, LINK), Some(Action::Attr)));
    }
}
