//! Button objects: up to four sub-states, each with an image and actions.

use crate::error::{Error, Result};
use crate::lrf::tags::{Tag, TagValue, ids};

use super::ObjectBuilder;

/// Button sub-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubState {
    Base,
    FocusIn,
    Push,
    Up,
}

impl SubState {
    pub const ALL: [SubState; 4] = [
        SubState::Base,
        SubState::FocusIn,
        SubState::Push,
        SubState::Up,
    ];

    fn index(self) -> usize {
        match self {
            SubState::Base => 0,
            SubState::FocusIn => 1,
            SubState::Push => 2,
            SubState::Up => 3,
        }
    }

    fn from_start(tag: u16) -> Option<Self> {
        match tag {
            ids::BASE_BUTTON_START => Some(SubState::Base),
            ids::FOCUS_IN_BUTTON_START => Some(SubState::FocusIn),
            ids::PUSH_BUTTON_START => Some(SubState::Push),
            ids::UP_BUTTON_START => Some(SubState::Up),
            _ => None,
        }
    }

    fn from_end(tag: u16) -> Option<Self> {
        match tag {
            ids::BASE_BUTTON_END => Some(SubState::Base),
            ids::FOCUS_IN_BUTTON_END => Some(SubState::FocusIn),
            ids::PUSH_BUTTON_END => Some(SubState::Push),
            ids::UP_BUTTON_END => Some(SubState::Up),
            _ => None,
        }
    }
}

/// An action run when a button enters a sub-state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    JumpTo { page: u32, object: u32 },
    SendMessage { kind: u16, message: String, label: String },
    CloseWindow,
    SoundStop,
    Run { option: u16, object: u32 },
}

/// Contents of one sub-state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateContent {
    pub image: Option<u32>,
    pub actions: Vec<ButtonAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Button {
    pub flags: u16,
    states: [Option<StateContent>; 4],
}

impl Button {
    pub fn state(&self, state: SubState) -> Option<&StateContent> {
        self.states[state.index()].as_ref()
    }

    pub fn set_state(&mut self, state: SubState, content: StateContent) {
        self.states[state.index()] = Some(content);
    }

    /// The jump target of the first `JumpTo` reachable from a push.
    pub fn jump_target(&self) -> Option<(u32, u32)> {
        [SubState::Push, SubState::Up, SubState::Base, SubState::FocusIn]
            .into_iter()
            .filter_map(|s| self.state(s))
            .flat_map(|c| c.actions.iter())
            .find_map(|a| match a {
                ButtonAction::JumpTo { page, object } => Some((*page, *object)),
                _ => None,
            })
    }

    pub fn references(&self) -> impl Iterator<Item = u32> + '_ {
        self.states.iter().flatten().flat_map(|content| {
            let actions = content.actions.iter().flat_map(|a| match a {
                ButtonAction::JumpTo { page, object } => vec![*page, *object],
                ButtonAction::Run { object, .. } => vec![*object],
                _ => Vec::new(),
            });
            content.image.into_iter().chain(actions)
        })
    }
}

/// Incremental builder state while a button's tags are read.
#[derive(Debug, Default)]
pub struct ButtonBuilder {
    button: Button,
    current: Option<(SubState, StateContent)>,
    in_actions: bool,
}

impl ButtonBuilder {
    pub fn finish(mut self) -> Button {
        if let Some((state, content)) = self.current.take() {
            self.button.set_state(state, content);
        }
        self.button
    }
}

/// Decoder for every button tag.
pub(super) fn feed(builder: &mut ObjectBuilder, tag: &Tag) -> Result<()> {
    let object = builder.id;
    let bb = builder.button.get_or_insert_with(ButtonBuilder::default);

    if let Some(state) = SubState::from_start(tag.id) {
        if let Some((open, content)) = bb.current.take() {
            tracing::warn!(object, ?open, "button sub-state not closed");
            bb.button.set_state(open, content);
        }
        bb.current = Some((state, StateContent::default()));
        bb.in_actions = false;
        return Ok(());
    }
    if let Some(state) = SubState::from_end(tag.id) {
        match bb.current.take() {
            Some((open, content)) if open == state => bb.button.set_state(open, content),
            other => {
                bb.current = other;
                return Err(Error::bad_stream(object, format!("unbalanced {}", tag.name())));
            }
        }
        return Ok(());
    }

    match tag.id {
        ids::ACTIONS_START => bb.in_actions = true,
        ids::ACTIONS_END => bb.in_actions = false,
        ids::LINK => {
            let target = tag.value.as_ref_id();
            match bb.current.as_mut() {
                Some((_, content)) => content.image = target,
                None => return Err(Error::UnknownObjectTag { object, tag: tag.id }),
            }
        }
        _ => {
            let action = decode_action(object, &tag.value, tag.id)?;
            let Some((_, content)) = bb.current.as_mut() else {
                return Err(Error::bad_stream(object, "button action outside a sub-state"));
            };
            if !bb.in_actions {
                tracing::debug!(object, tag = %tag.name(), "button action outside action list");
            }
            let refs: Vec<u32> = match &action {
                ButtonAction::JumpTo { page, object } => vec![*page, *object],
                ButtonAction::Run { object, .. } => vec![*object],
                _ => Vec::new(),
            };
            content.actions.push(action);
            for r in refs {
                builder.note_reference(r);
            }
        }
    }
    Ok(())
}

fn decode_action(object: u32, value: &TagValue, id: u16) -> Result<ButtonAction> {
    Ok(match (id, value) {
        (ids::JUMP_TO, TagValue::Tuple(v)) if v.len() == 2 => ButtonAction::JumpTo {
            page: v[0] as u32,
            object: v[1] as u32,
        },
        (ids::RUN, TagValue::Tuple(v)) if v.len() == 2 => ButtonAction::Run {
            option: v[0] as u16,
            object: v[1] as u32,
        },
        (
            ids::SEND_MESSAGE,
            TagValue::Message {
                kind,
                message,
                label,
            },
        ) => ButtonAction::SendMessage {
            kind: *kind,
            message: message.clone(),
            label: label.clone(),
        },
        (ids::CLOSE_WINDOW, _) => ButtonAction::CloseWindow,
        (ids::SOUND_STOP, _) => ButtonAction::SoundStop,
        _ => return Err(Error::UnknownObjectTag { object, tag: id }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: u16, value: TagValue) -> Tag {
        Tag { id, value, offset: 0 }
    }

    #[test]
    fn test_states_and_actions() {
        let mut builder = ObjectBuilder::new(9);
        let tags = [
            tag(ids::PUSH_BUTTON_START, TagValue::Empty),
            tag(ids::LINK, TagValue::Ref(40)),
            tag(ids::ACTIONS_START, TagValue::Empty),
            tag(ids::JUMP_TO, TagValue::Tuple(vec![3, 30])),
            tag(ids::CLOSE_WINDOW, TagValue::Empty),
            tag(ids::ACTIONS_END, TagValue::Empty),
            tag(ids::PUSH_BUTTON_END, TagValue::Empty),
        ];
        for t in &tags {
            feed(&mut builder, t).unwrap();
        }
        let refs = builder.references.clone();
        let button = builder.button.take().unwrap().finish();
        let push = button.state(SubState::Push).unwrap();
        assert_eq!(push.image, Some(40));
        assert_eq!(
            push.actions,
            vec![
                ButtonAction::JumpTo { page: 3, object: 30 },
                ButtonAction::CloseWindow
            ]
        );
        assert!(button.state(SubState::Base).is_none());
        assert_eq!(button.jump_target(), Some((3, 30)));
        assert!(refs.contains(&30));
    }

    #[test]
    fn test_mismatched_end_is_error() {
        let mut builder = ObjectBuilder::new(9);
        feed(&mut builder, &tag(ids::BASE_BUTTON_START, TagValue::Empty)).unwrap();
        assert!(feed(&mut builder, &tag(ids::UP_BUTTON_END, TagValue::Empty)).is_err());
    }
}
