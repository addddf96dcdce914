//! Commands that change controller state.
//!
//! Produced by the front-panel button and the power-on alarm, consumed by
//! [`Controller::handle_command`](super::service::Controller::handle_command).

use crate::config::Mode;
use crate::drivers::button::ButtonEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    SetPower(bool),
    TogglePower,
    SetMode(Mode),
    ToggleMode,
}

impl From<ButtonEvent> for AppCommand {
    fn from(event: ButtonEvent) -> Self {
        match event {
            ButtonEvent::ShortPress => Self::TogglePower,
            ButtonEvent::LongPress => Self::ToggleMode,
        }
    }
}
