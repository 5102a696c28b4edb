//! Viewer navigation, links and buttons over paginated books.

mod common;

use common::{BookBuilder, words};
use lrfkit::layout::{CharWidthMeasurer, LayoutConfig, Pagination};
use lrfkit::lrf::objects::{Button, ButtonAction, ObjectBody, SubState};
use lrfkit::lrf::tags::{TagWriter, ids};
use lrfkit::lrf::{LrfObject, ObjectKind, StreamFlags};
use lrfkit::render::{ButtonEvent, ButtonMachine, Viewer};
use lrfkit::{Book, LoadOptions, PageMap};

fn paginate(book: &Book) -> Pagination {
    book.paginate(&LayoutConfig::default(), &CharWidthMeasurer::new(10))
        .unwrap()
}

/// Page A links to a block on page B.
fn linked_book() -> (Book, u32) {
    let mut builder = BookBuilder::new();
    let target = builder.paragraph("destination");
    let source = builder.text(|w| {
        w.empty(ids::P)
            .text("see ")
            .reference(ids::CHAR_BUTTON, target)
            .text("there")
            .empty(ids::CHAR_BUTTON_END)
            .empty(ids::P_END);
    });
    let source_block = builder.block(source, |_| {});
    builder.page(None, &[source_block]);
    builder.page(None, &[target]);
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    (book, target)
}

fn button(book: &Book, id: u32) -> &Button {
    match &book.object(id).unwrap().body {
        ObjectBody::Button(button) => button,
        other => panic!("object {id} is not a button: {other:?}"),
    }
}

// ============================================================================
// Links
// ============================================================================

#[test]
fn test_follow_link_back_and_forward() {
    let (book, target) = linked_book();
    let pagination = paginate(&book);
    assert_eq!(pagination.total_pages(), 2);

    let mut viewer = Viewer::new(&pagination);
    assert_eq!(viewer.current_page(), 1);
    assert!(viewer.links().iter().any(|l| l.target == target));

    assert!(viewer.follow_link(target));
    assert_eq!(viewer.current_page(), 2);
    assert!(viewer.can_go_back());
    assert!(viewer.back());
    assert_eq!(viewer.current_page(), 1);
    assert!(viewer.can_go_forward());
    assert!(viewer.forward());
    assert_eq!(viewer.current_page(), 2);
    assert!(!viewer.forward());
}

#[test]
fn test_click_on_link() {
    let (book, target) = linked_book();
    let pagination = paginate(&book);
    let mut viewer = Viewer::new(&pagination);

    let list = viewer.render().unwrap();
    assert_eq!(list.page, 1);
    let rect = list.links.iter().find(|l| l.target == target).unwrap().rect;
    assert!(rect.width > 0 && rect.height > 0);

    assert!(!viewer.click(rect.x - 1, rect.y - 1));
    assert_eq!(viewer.current_page(), 1);
    assert!(viewer.click(rect.x + 1, rect.y + 1));
    assert_eq!(viewer.current_page(), 2);
    assert!(viewer.render().unwrap().texts().any(|t| t == "destination"));
}

#[test]
fn test_new_link_clears_forward_history() {
    let (book, target) = linked_book();
    let pagination = paginate(&book);
    let mut viewer = Viewer::new(&pagination);
    viewer.follow_link(target);
    viewer.back();
    assert!(viewer.can_go_forward());
    viewer.follow_link(target);
    assert!(!viewer.can_go_forward());
    assert!(viewer.back());
    assert_eq!(viewer.current_page(), 1);
}

#[test]
fn test_follow_link_into_canvas_child() {
    let mut builder = BookBuilder::new();
    let target = builder.paragraph("framed");
    let source = builder.text(|w| {
        w.empty(ids::P)
            .reference(ids::CHAR_BUTTON, target)
            .text("jump")
            .empty(ids::CHAR_BUTTON_END)
            .empty(ids::P_END);
    });
    let source_block = builder.block(source, |_| {});
    let canvas = builder.alloc();
    let mut placements = TagWriter::new();
    placements.tuple(ids::PUT_OBJ, &[40, 80, target as i64]);
    builder.add(
        LrfObject::new(canvas, ObjectKind::Canvas)
            .with_tags(|w| {
                w.int(ids::CANVAS_WIDTH, 400).int(ids::CANVAS_HEIGHT, 300);
            })
            .with_stream(StreamFlags(0), placements.into_bytes()),
    );
    builder.page(None, &[source_block]);
    builder.page(None, &[canvas]);
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let pagination = paginate(&book);

    assert_eq!(pagination.locate(target), Some((0, 2)));
    assert_eq!(pagination.locate(canvas), Some((0, 2)));
    let mut viewer = Viewer::new(&pagination);
    assert!(viewer.links().iter().any(|l| l.target == target));
    assert!(viewer.follow_link(target));
    assert_eq!(viewer.current_page(), 2);
    assert!(viewer.render().unwrap().texts().any(|t| t == "framed"));
}

// ============================================================================
// Paging
// ============================================================================

#[test]
fn test_linear_paging_and_percent() {
    let mut builder = BookBuilder::new();
    let block = builder.paragraph(&words(300));
    builder.page(None, &[block]);
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let pagination = paginate(&book);
    let total = pagination.total_pages();
    assert!(total >= 3);

    let mut viewer = Viewer::new(&pagination);
    assert!(!viewer.previous());
    let mut steps = 0;
    while viewer.next() {
        steps += 1;
    }
    assert_eq!(steps, total - 1);
    assert_eq!(viewer.current_page(), total);
    assert_eq!(viewer.progress(), 100.0);

    assert!(viewer.percent(0.0));
    assert_eq!(viewer.current_page(), 1);
    assert!(viewer.percent(100.0));
    assert_eq!(viewer.current_page(), total);
    assert!(!viewer.show_page(total + 1));
    assert_eq!(viewer.current_page(), total);
}

#[test]
fn test_zero_page_viewer() {
    let book = Book::from_bytes(BookBuilder::new().finish(), LoadOptions::strict()).unwrap();
    let pagination = paginate(&book);
    let mut viewer = Viewer::new(&pagination);
    assert_eq!(viewer.total_pages(), 0);
    assert!(!viewer.show_page(1));
    assert!(!viewer.next());
    assert!(!viewer.previous());
    assert!(!viewer.next_chapter());
    assert_eq!(viewer.current_page(), 0);
    assert!(viewer.links().is_empty());
}

#[test]
fn test_chapter_navigation() {
    let mut builder = BookBuilder::new();
    let first = builder.page_attr(|w| {
        w.int(ids::TEXT_WIDTH, 400);
    });
    let second = builder.page_attr(|w| {
        w.int(ids::TEXT_WIDTH, 500);
    });
    for attr in [first, first, second] {
        let block = builder.paragraph("page");
        builder.page(Some(attr), &[block]);
    }
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let pagination = paginate(&book);

    let mut viewer = Viewer::new(&pagination);
    assert_eq!(viewer.current_chapter(), Some(0));
    assert!(viewer.next_chapter());
    assert_eq!(viewer.current_page(), 3);
    assert_eq!(viewer.current_chapter(), Some(1));
    assert!(!viewer.next_chapter());
    assert!(viewer.previous_chapter());
    assert_eq!(viewer.current_page(), 1);
}

// ============================================================================
// Buttons
// ============================================================================

#[test]
fn test_push_button_jumps() {
    let mut builder = BookBuilder::new();
    let home = builder.paragraph("home");
    let home_page = builder.page(None, &[home]);
    let away = builder.paragraph("away");
    let away_page = builder.page(None, &[away]);

    let button_id = builder.alloc();
    builder.add(LrfObject::new(button_id, ObjectKind::Button).with_tags(|w| {
        w.empty(ids::PUSH_BUTTON_START)
            .empty(ids::ACTIONS_START)
            .tuple(ids::JUMP_TO, &[away_page as i64, away as i64])
            .empty(ids::ACTIONS_END)
            .empty(ids::PUSH_BUTTON_END);
    }));
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let pagination = paginate(&book);
    assert_eq!(pagination.locate(home_page), Some((0, 1)));

    let button = button(&book, button_id);
    let mut machine = ButtonMachine::new(button);
    assert!(machine.handle(ButtonEvent::Hover).is_empty());
    let actions = machine.handle(ButtonEvent::Press);
    assert_eq!(actions, vec![ButtonAction::JumpTo { page: away_page, object: away }]);

    let mut viewer = Viewer::new(&pagination);
    assert!(viewer.activate(&actions));
    assert_eq!(viewer.current_page(), 2);
}

#[test]
fn test_button_with_empty_states_is_inert() {
    let mut builder = BookBuilder::new();
    let button_id = builder.alloc();
    builder.add(LrfObject::new(button_id, ObjectKind::Button).with_tags(|w| {
        for (start, end) in [
            (ids::BASE_BUTTON_START, ids::BASE_BUTTON_END),
            (ids::FOCUS_IN_BUTTON_START, ids::FOCUS_IN_BUTTON_END),
            (ids::PUSH_BUTTON_START, ids::PUSH_BUTTON_END),
            (ids::UP_BUTTON_START, ids::UP_BUTTON_END),
        ] {
            w.empty(start)
                .empty(ids::ACTIONS_START)
                .empty(ids::ACTIONS_END)
                .empty(end);
        }
    }));
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let button = button(&book, button_id);
    assert!(SubState::ALL.iter().all(|&s| button.state(s).is_some()));
    assert_eq!(button.jump_target(), None);

    let mut machine = ButtonMachine::new(button);
    for event in [ButtonEvent::Hover, ButtonEvent::Press, ButtonEvent::Release, ButtonEvent::Leave] {
        assert!(machine.handle(event).is_empty());
    }
    assert_eq!(machine.state(), SubState::Base);
}

// ============================================================================
// Table of contents
// ============================================================================

#[test]
fn test_toc_entries_resolve_to_page_numbers() {
    let mut builder = BookBuilder::new();
    let long = builder.paragraph(&words(200));
    builder.page(None, &[long]);
    let tail = builder.paragraph("tail");
    let tail_page = builder.page(None, &[tail]);
    let book = Book::from_bytes(builder.finish(), LoadOptions::strict()).unwrap();
    let pagination = paginate(&book);

    let map = PageMap::from_pagination(&pagination);
    let toc = book.toc();
    assert_eq!(toc.len(), 2);
    assert_eq!(map.resolve(&toc[0]), Some(1));
    assert_eq!(map.resolve(&toc[1]), Some(pagination.total_pages()));
    assert_eq!(toc[1].page, tail_page);
}
