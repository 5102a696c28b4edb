//! Button sub-state machine.
//!
//! ```text
//!          hover          press          release
//!   Base ────────▶ FocusIn ──────▶ Push ────────▶ Up
//!    ▲                                            │
//!    └──────────────────── leave ─────────────────┘   (from any state)
//! ```

use crate::lrf::objects::{Button, ButtonAction, SubState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Hover,
    Press,
    Release,
    Leave,
}

/// Tracks one button's sub-state as the renderer feeds it pointer events.
#[derive(Debug, Clone)]
pub struct ButtonMachine<'a> {
    button: &'a Button,
    state: SubState,
}

impl<'a> ButtonMachine<'a> {
    pub fn new(button: &'a Button) -> Self {
        Self {
            button,
            state: SubState::Base,
        }
    }

    pub fn state(&self) -> SubState {
        self.state
    }

    /// Image to show in the current state, falling back to the base image.
    pub fn image(&self) -> Option<u32> {
        self.button
            .state(self.state)
            .and_then(|s| s.image)
            .or_else(|| self.button.state(SubState::Base).and_then(|s| s.image))
    }

    /// Apply an event and return the actions to run, in order.
    ///
    /// Events that do not apply in the current state change nothing. A
    /// `JumpTo` ends the action list.
    pub fn handle(&mut self, event: ButtonEvent) -> Vec<ButtonAction> {
        let next = match (self.state, event) {
            (SubState::Base, ButtonEvent::Hover) => SubState::FocusIn,
            (SubState::FocusIn, ButtonEvent::Press) => SubState::Push,
            (SubState::Push, ButtonEvent::Release) => SubState::Up,
            (state, ButtonEvent::Leave) if state != SubState::Base => SubState::Base,
            _ => return Vec::new(),
        };
        self.state = next;
        let Some(content) = self.button.state(next) else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        for action in &content.actions {
            actions.push(action.clone());
            if matches!(action, ButtonAction::JumpTo { .. }) {
                break;
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrf::objects::StateContent;

    fn button() -> Button {
        let mut button = Button::default();
        button.set_state(
            SubState::Base,
            StateContent {
                image: Some(10),
                actions: Vec::new(),
            },
        );
        button.set_state(
            SubState::Push,
            StateContent {
                image: Some(11),
                actions: vec![
                    ButtonAction::SoundStop,
                    ButtonAction::JumpTo { page: 5, object: 6 },
                    ButtonAction::CloseWindow,
                ],
            },
        );
        button
    }

    #[test]
    fn test_jump_ends_the_action_list() {
        let button = button();
        let mut machine = ButtonMachine::new(&button);
        assert!(machine.handle(ButtonEvent::Hover).is_empty());
        assert_eq!(machine.state(), SubState::FocusIn);
        assert_eq!(machine.image(), Some(10));
        let actions = machine.handle(ButtonEvent::Press);
        assert_eq!(
            actions,
            vec![ButtonAction::SoundStop, ButtonAction::JumpTo { page: 5, object: 6 }]
        );
        assert_eq!(machine.image(), Some(11));
    }

    #[test]
    fn test_invalid_events_are_ignored() {
        let button = button();
        let mut machine = ButtonMachine::new(&button);
        assert!(machine.handle(ButtonEvent::Press).is_empty());
        assert!(machine.handle(ButtonEvent::Leave).is_empty());
        assert_eq!(machine.state(), SubState::Base);
    }

    #[test]
    fn test_empty_button_is_inert() {
        let mut button = Button::default();
        for state in SubState::ALL {
            button.set_state(state, StateContent::default());
        }
        let mut machine = ButtonMachine::new(&button);
        for event in [ButtonEvent::Hover, ButtonEvent::Press, ButtonEvent::Release, ButtonEvent::Leave] {
            assert!(machine.handle(event).is_empty());
        }
        assert_eq!(machine.state(), SubState::Base);
        assert_eq!(machine.image(), None);
    }
}
