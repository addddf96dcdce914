//! Polled front-panel button with short / long press detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with the internal pull-up enabled.  The
//! button task samples the pin every 50 ms, which also acts as the
//! debounce, and feeds the level into [`ButtonDriver::tick`].
//!
//! ## Gestures
//!
//! | Gesture     | Condition                          | Fires       |
//! |-------------|------------------------------------|-------------|
//! | Long press  | held longer than 2 s               | once, while still held |
//! | Short press | released before the long threshold | on release  |
//!
//! A release that follows a long press is swallowed.

use embedded_hal::digital::InputPin;
use log::warn;

pub const LONG_PRESS_MS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    Pressed { since_ms: u32, long_fired: bool },
}

pub struct ButtonDriver {
    state: GestureState,
    long_press_ms: u32,
}

impl Default for ButtonDriver {
    fn default() -> Self {
        Self::new(LONG_PRESS_MS)
    }
}

impl ButtonDriver {
    pub fn new(long_press_ms: u32) -> Self {
        Self {
            state: GestureState::Idle,
            long_press_ms,
        }
    }

    /// Feed one sample.  `now_ms` is monotonic milliseconds since boot.
    pub fn tick(&mut self, pressed: bool, now_ms: u32) -> Option<ButtonEvent> {
        match (self.state, pressed) {
            (GestureState::Idle, true) => {
                self.state = GestureState::Pressed {
                    since_ms: now_ms,
                    long_fired: false,
                };
                None
            }
            (GestureState::Idle, false) => None,
            (GestureState::Pressed { since_ms, long_fired }, true) => {
                if !long_fired && now_ms.wrapping_sub(since_ms) > self.long_press_ms {
                    self.state = GestureState::Pressed {
                        since_ms,
                        long_fired: true,
                    };
                    return Some(ButtonEvent::LongPress);
                }
                None
            }
            (GestureState::Pressed { long_fired, .. }, false) => {
                self.state = GestureState::Idle;
                (!long_fired).then_some(ButtonEvent::ShortPress)
            }
        }
    }

    /// Sample an active-low pin and classify.  Read errors count as released.
    pub fn poll<P: InputPin>(&mut self, pin: &mut P, now_ms: u32) -> Option<ButtonEvent> {
        let pressed = match pin.is_low() {
            Ok(level) => level,
            Err(e) => {
                warn!("button: read failed: {:?}", e);
                false
            }
        };
        self.tick(pressed, now_ms)
    }
}
